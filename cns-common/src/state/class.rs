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

use crate::error::NsError;
use crate::proto::{NsReader, CA_MAXCLASNAMELEN, CA_MAXPOOLNAMELEN, CA_MAXTAPEPOOLS};
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};
use serde::{Deserialize, Serialize};

/// A file class: migration policy shared by the directories tagged with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    pub classid: i32,
    pub name: String,
    pub uid: i32,
    pub gid: i32,
    pub min_filesize: i32,
    pub max_filesize: i32,
    pub flags: i32,
    pub maxdrives: i32,
    pub max_segsize: i32,
    pub migr_time_interval: i32,
    pub mintime_beforemigr: i32,
    pub nbcopies: i32,
    pub retenp_on_disk: i32,
    pub tppools: Vec<String>,
    // Server side reference count, not sent on the wire.
    pub nbdirs_using_class: i32,
}

impl ClassMetadata {
    /// Template for modifyclass: every field left as is keeps the stored
    /// value.
    pub fn unchanged() -> Self {
        Self {
            classid: -1,
            name: String::new(),
            uid: -1,
            gid: -1,
            min_filesize: -1,
            max_filesize: -1,
            flags: -1,
            maxdrives: -1,
            max_segsize: -1,
            migr_time_interval: -1,
            mintime_beforemigr: -1,
            nbcopies: -1,
            retenp_on_disk: -1,
            tppools: vec![],
            nbdirs_using_class: 0,
        }
    }

    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        m.put_long(self.classid)?;
        m.put_string(&self.name)?;
        m.put_long(self.uid)?;
        m.put_long(self.gid)?;
        m.put_long(self.min_filesize)?;
        m.put_long(self.max_filesize)?;
        m.put_long(self.flags)?;
        m.put_long(self.maxdrives)?;
        m.put_long(self.max_segsize)?;
        m.put_long(self.migr_time_interval)?;
        m.put_long(self.mintime_beforemigr)?;
        m.put_long(self.nbcopies)?;
        m.put_long(self.retenp_on_disk)?;
        m.put_long(self.tppools.len() as i32)?;
        for pool in &self.tppools {
            m.put_string(pool)?;
        }
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        let mut class = ClassMetadata {
            classid: u.get_long()?,
            name: u.get_str(CA_MAXCLASNAMELEN)?,
            uid: u.get_long()?,
            gid: u.get_long()?,
            min_filesize: u.get_long()?,
            max_filesize: u.get_long()?,
            flags: u.get_long()?,
            maxdrives: u.get_long()?,
            max_segsize: u.get_long()?,
            migr_time_interval: u.get_long()?,
            mintime_beforemigr: u.get_long()?,
            nbcopies: u.get_long()?,
            retenp_on_disk: u.get_long()?,
            ..Default::default()
        };
        for _ in 0..Self::pool_count(u.get_long()?)? {
            class.tppools.push(u.get_str(CA_MAXPOOLNAMELEN)?);
        }
        Ok(class)
    }

    /// Validated tape pool count of a class on the wire.
    pub fn pool_count(nbtppools: i32) -> NsResult<usize> {
        let n = nbtppools.max(0) as usize;
        if n > CA_MAXTAPEPOOLS {
            return Err(NsError::with_msg(libc::EINVAL, format!("{} tape pools", nbtppools)));
        }
        Ok(n)
    }

    pub fn wire_size(&self) -> usize {
        // 13 LONGs, the name and each pool with their terminators.
        13 * 4
            + self.name.len()
            + 1
            + self.tppools.iter().map(|p| p.len() + 1).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_layout() {
        let class = ClassMetadata {
            classid: 5,
            name: "tape2".to_string(),
            nbcopies: 2,
            tppools: vec!["p1".to_string(), "p2".to_string()],
            nbdirs_using_class: 3,
            ..Default::default()
        };
        let mut m = Marshaller::new(512);
        class.encode(&mut m).unwrap();
        assert_eq!(m.len(), class.wire_size());

        let back = ClassMetadata::decode(&mut Unmarshaller::new(m.as_slice())).unwrap();
        assert_eq!(back.tppools, class.tppools);
        assert_eq!(back.nbdirs_using_class, 0);
    }

    #[test]
    fn largest_class_fits_a_listing_block() {
        let class = ClassMetadata {
            name: "x".repeat(CA_MAXCLASNAMELEN),
            tppools: vec!["p".repeat(CA_MAXPOOLNAMELEN); CA_MAXTAPEPOOLS],
            ..Default::default()
        };
        assert!(class.wire_size() <= crate::proto::LISTBUFSZ);

        let mut too_many = class.clone();
        too_many.tppools.push("extra".to_string());
        let mut m = Marshaller::new(8192);
        too_many.encode(&mut m).unwrap();
        let err = ClassMetadata::decode(&mut Unmarshaller::new(m.as_slice())).unwrap_err();
        assert_eq!(err.code(), libc::EINVAL);
    }
}
