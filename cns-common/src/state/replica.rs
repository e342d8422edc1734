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

use crate::proto::{NsReader, CA_MAXFSNAMELEN, CA_MAXHOSTNAMELEN, CA_MAXPOOLNAMELEN, CA_MAXSFNLEN};
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};
use serde::{Deserialize, Serialize};

/// A disk copy of a file, identified by its storage file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReplica {
    pub fileid: u64,
    pub nbaccesses: u64,
    pub atime: i64,
    pub ptime: i64,
    pub status: u8,
    pub f_type: u8,
    pub poolname: String,
    pub host: String,
    pub fs: String,
    pub sfn: String,
}

impl FileReplica {
    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        m.put_hyper(self.fileid)?;
        m.put_hyper(self.nbaccesses)?;
        m.put_time(self.atime)?;
        m.put_time(self.ptime)?;
        m.put_byte(self.status)?;
        m.put_byte(self.f_type)?;
        m.put_string(&self.poolname)?;
        m.put_string(&self.host)?;
        m.put_string(&self.fs)?;
        m.put_string(&self.sfn)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            fileid: u.get_hyper()?,
            nbaccesses: u.get_hyper()?,
            atime: u.get_time()?,
            ptime: u.get_time()?,
            status: u.get_byte()?,
            f_type: u.get_byte()?,
            poolname: u.get_str(CA_MAXPOOLNAMELEN)?,
            host: u.get_str(CA_MAXHOSTNAMELEN)?,
            fs: u.get_str(CA_MAXFSNAMELEN)?,
            sfn: u.get_str(CA_MAXSFNLEN)?,
        })
    }

    pub fn wire_size(&self) -> usize {
        8 + 8 + 8 + 8 + 1 + 1
            + self.poolname.len()
            + self.host.len()
            + self.fs.len()
            + self.sfn.len()
            + 4
    }
}
