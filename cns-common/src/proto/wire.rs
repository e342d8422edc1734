// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error::serrno::SENAMETOOLONG;
use crate::error::NsError;
use crate::proto::CA_MAXPATHLEN;
use crate::NsResult;
use orpc::codec::{CodecError, Marshaller, Unmarshaller};

/// Field readers with the status codes the name server uses for bad input.
pub trait NsReader {
    /// A path; an oversized one is `SENAMETOOLONG`.
    fn get_path(&mut self) -> NsResult<String>;

    /// A bounded string; an oversized one is `EINVAL`.
    fn get_str(&mut self, max: usize) -> NsResult<String>;

    /// A LONG carrying a uid or gid; -1 is kept as `u32::MAX`.
    fn get_id(&mut self) -> NsResult<u32>;
}

impl NsReader for Unmarshaller<'_> {
    fn get_path(&mut self) -> NsResult<String> {
        self.get_string(CA_MAXPATHLEN).map_err(|e| match e {
            CodecError::StringTooLong { .. } => NsError::new(SENAMETOOLONG),
            e => e.into(),
        })
    }

    fn get_str(&mut self, max: usize) -> NsResult<String> {
        self.get_string(max).map_err(|e| match e {
            CodecError::StringTooLong { .. } => NsError::new(libc::EINVAL),
            e => e.into(),
        })
    }

    fn get_id(&mut self) -> NsResult<u32> {
        Ok(self.get_long()? as u32)
    }
}

/// Writers for fields whose wire width differs from the in-memory type.
pub trait NsWriter {
    fn put_id(&mut self, id: u32) -> NsResult<()>;

    fn put_mode(&mut self, mode: u32) -> NsResult<()>;
}

impl NsWriter for Marshaller {
    fn put_id(&mut self, id: u32) -> NsResult<()> {
        Ok(self.put_long(id as i32)?)
    }

    // File modes travel as a WORD; type and permission bits fit in 16 bits.
    fn put_mode(&mut self, mode: u32) -> NsResult<()> {
        Ok(self.put_word(mode as u16)?)
    }
}
