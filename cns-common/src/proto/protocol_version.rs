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

use crate::error::serrno::SEBADVERSION;
use crate::error::NsError;
use crate::NsResult;
use std::fmt::{Display, Formatter};

/// Protocol revision, identified by the request magic. Each revision only
/// adds fields; what a request body contains is looked up once through
/// [`Capabilities`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
    V4,
}

impl ProtocolVersion {
    pub const CNS_MAGIC: u32 = 0x030E1301;
    pub const CNS_MAGIC2: u32 = 0x030E1302;
    pub const CNS_MAGIC3: u32 = 0x030E1303;
    pub const CNS_MAGIC4: u32 = 0x030E1304;

    pub const LATEST: ProtocolVersion = ProtocolVersion::V4;

    pub fn from_magic(magic: u32) -> NsResult<Self> {
        match magic {
            Self::CNS_MAGIC => Ok(Self::V1),
            Self::CNS_MAGIC2 => Ok(Self::V2),
            Self::CNS_MAGIC3 => Ok(Self::V3),
            Self::CNS_MAGIC4 => Ok(Self::V4),
            m => Err(NsError::with_msg(SEBADVERSION, format!("bad magic {:#010x}", m))),
        }
    }

    pub fn magic(&self) -> u32 {
        match self {
            Self::V1 => Self::CNS_MAGIC,
            Self::V2 => Self::CNS_MAGIC2,
            Self::V3 => Self::CNS_MAGIC3,
            Self::V4 => Self::CNS_MAGIC4,
        }
    }

    pub fn caps(&self) -> Capabilities {
        Capabilities {
            segment_side: *self >= Self::V2,
            segment_fileid: *self >= Self::V3,
            replace_checksum: *self >= Self::V3,
            segment_checksum: *self >= Self::V4,
        }
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.magic())
    }
}

/// Optional fields present at a given protocol revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Tape side in segment records.
    pub segment_side: bool,
    /// Segment owner fileid in DIRXT listing entries.
    pub segment_fileid: bool,
    /// Checksum of the new segment in replaceseg.
    pub replace_checksum: bool,
    /// Checksum in getsegattrs, setsegattrs and DIRXT.
    pub segment_checksum: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        let v1 = ProtocolVersion::V1.caps();
        assert!(!v1.segment_side && !v1.segment_checksum);

        let v3 = ProtocolVersion::from_magic(0x030E1303).unwrap().caps();
        assert!(v3.segment_side && v3.segment_fileid && v3.replace_checksum);
        assert!(!v3.segment_checksum);

        assert!(ProtocolVersion::LATEST.caps().segment_checksum);
        assert!(ProtocolVersion::from_magic(0x12345678).is_err());
    }
}
