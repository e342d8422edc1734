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

use crate::proto::{NsReader, NsWriter, CA_MAXCKSUMLEN, CA_MAXCKSUMNAMELEN, CA_MAXGUIDLEN};
use crate::utils::{FileMode, STATUS_DELETED};
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};
use serde::{Deserialize, Serialize};

/// A namespace entry: file, directory or symbolic link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub fileid: u64,
    pub parent_fileid: u64,
    pub guid: String,
    pub name: String,
    pub filemode: u32,
    pub nlink: i32,
    pub uid: u32,
    pub gid: u32,
    pub filesize: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub fileclass: i16,
    pub status: u8,
    pub csumtype: String,
    pub csumvalue: String,
    // Serialized sorted ACL, empty when the entry has none.
    pub acl: String,
}

impl FileMetadata {
    pub fn is_dir(&self) -> bool {
        FileMode::is_dir(self.filemode)
    }

    pub fn is_link(&self) -> bool {
        FileMode::is_link(self.filemode)
    }

    pub fn is_deleted(&self) -> bool {
        self.status == STATUS_DELETED
    }

    pub fn to_stat(&self) -> FileStat {
        FileStat {
            fileid: self.fileid,
            filemode: self.filemode,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            filesize: self.filesize,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
            fileclass: self.fileclass,
            status: self.status,
        }
    }

    pub fn to_statg(&self) -> FileStatG {
        FileStatG {
            stat: self.to_stat(),
            guid: self.guid.clone(),
            csumtype: self.csumtype.clone(),
            csumvalue: self.csumvalue.clone(),
        }
    }
}

/// Attributes returned by the stat family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStat {
    pub fileid: u64,
    pub filemode: u32,
    pub nlink: i32,
    pub uid: u32,
    pub gid: u32,
    pub filesize: u64,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub fileclass: i16,
    pub status: u8,
}

impl FileStat {
    pub const WIRE_SIZE: usize = 57;

    pub fn is_dir(&self) -> bool {
        FileMode::is_dir(self.filemode)
    }

    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        m.put_hyper(self.fileid)?;
        m.put_mode(self.filemode)?;
        m.put_long(self.nlink)?;
        m.put_id(self.uid)?;
        m.put_id(self.gid)?;
        m.put_hyper(self.filesize)?;
        m.put_time(self.atime)?;
        m.put_time(self.mtime)?;
        m.put_time(self.ctime)?;
        m.put_word(self.fileclass as u16)?;
        m.put_byte(self.status)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            fileid: u.get_hyper()?,
            filemode: u.get_word()? as u32,
            nlink: u.get_long()?,
            uid: u.get_id()?,
            gid: u.get_id()?,
            filesize: u.get_hyper()?,
            atime: u.get_time()?,
            mtime: u.get_time()?,
            ctime: u.get_time()?,
            fileclass: u.get_word()? as i16,
            status: u.get_byte()?,
        })
    }
}

/// Stat attributes plus the grid identity and checksum of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStatG {
    pub stat: FileStat,
    pub guid: String,
    pub csumtype: String,
    pub csumvalue: String,
}

impl FileStatG {
    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        self.stat.encode(m)?;
        m.put_string(&self.guid)?;
        m.put_string(&self.csumtype)?;
        m.put_string(&self.csumvalue)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            stat: FileStat::decode(u)?,
            guid: u.get_str(CA_MAXGUIDLEN)?,
            csumtype: u.get_str(CA_MAXCKSUMNAMELEN)?,
            csumvalue: u.get_str(CA_MAXCKSUMLEN)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::S_IFREG;

    #[test]
    fn stat_wire_size() {
        let stat = FileStat {
            fileid: 42,
            filemode: S_IFREG | 0o644,
            nlink: 1,
            uid: 101,
            gid: u32::MAX,
            filesize: u64::MAX,
            atime: 1,
            mtime: 2,
            ctime: 3,
            fileclass: 7,
            status: b'm',
        };
        let mut m = Marshaller::new(100);
        stat.encode(&mut m).unwrap();
        assert_eq!(m.len(), FileStat::WIRE_SIZE);

        let decoded = FileStat::decode(&mut Unmarshaller::new(m.as_slice())).unwrap();
        assert_eq!(decoded, stat);
    }
}
