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

//! POSIX access control lists.
//!
//! An ACL is a sorted list of `(type, id, perm)` entries. Access entries
//! come first, followed by the default entries (type with `CNS_ACL_DEFAULT`
//! set) that directories hand down to new children. In storage the list is
//! kept as text, one `<type letter><id>:<perm>` item per entry separated by
//! commas, the letter being `'@' + type` (upper case for access entries,
//! lower case for default entries).

use crate::error::NsError;
use crate::proto::CA_MAXACLENTRIES;
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};
use serde::{Deserialize, Serialize};

pub const CNS_ACL_USER_OBJ: u8 = 1;
pub const CNS_ACL_USER: u8 = 2;
pub const CNS_ACL_GROUP_OBJ: u8 = 3;
pub const CNS_ACL_GROUP: u8 = 4;
pub const CNS_ACL_MASK: u8 = 5;
pub const CNS_ACL_OTHER: u8 = 6;
pub const CNS_ACL_DEFAULT: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    pub a_type: u8,
    pub a_id: u32,
    pub a_perm: u8,
}

impl AclEntry {
    pub fn new(a_type: u8, a_id: u32, a_perm: u8) -> Self {
        Self {
            a_type,
            a_id,
            a_perm,
        }
    }

    pub fn is_default(&self) -> bool {
        self.a_type & CNS_ACL_DEFAULT != 0
    }

    /// Type without the default bit.
    pub fn base_type(&self) -> u8 {
        self.a_type & !CNS_ACL_DEFAULT
    }

    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        m.put_byte(self.a_type)?;
        m.put_long(self.a_id as i32)?;
        m.put_byte(self.a_perm)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            a_type: u.get_byte()?,
            a_id: u.get_long()? as u32,
            a_perm: u.get_byte()?,
        })
    }
}

pub struct Acl;

impl Acl {
    fn invalid(msg: impl Into<String>) -> NsError {
        NsError::with_msg(libc::EINVAL, msg)
    }

    /// Sort the entries and check the structural rules.
    pub fn validate(entries: &mut [AclEntry]) -> NsResult<()> {
        if entries.len() > CA_MAXACLENTRIES {
            return Err(Self::invalid(format!("{} acl entries", entries.len())));
        }
        entries.sort_by_key(|e| (e.a_type, e.a_id));

        // index 0: access entries, 1: default entries
        let mut counts = [[0usize; 7]; 2];
        let mut prev: Option<&AclEntry> = None;
        for e in entries.iter() {
            let base = e.base_type();
            if !(CNS_ACL_USER_OBJ..=CNS_ACL_OTHER).contains(&base)
                || e.a_type & !(CNS_ACL_DEFAULT | 7) != 0
            {
                return Err(Self::invalid(format!("bad acl entry type {}", e.a_type)));
            }
            if e.a_perm > 7 {
                return Err(Self::invalid(format!("bad acl permission {}", e.a_perm)));
            }
            if let Some(p) = prev {
                let named = matches!(base, CNS_ACL_USER | CNS_ACL_GROUP);
                if p.a_type == e.a_type && (!named || p.a_id == e.a_id) {
                    return Err(Self::invalid("duplicate acl entry"));
                }
            }
            counts[e.is_default() as usize][base as usize] += 1;
            prev = Some(e);
        }

        let access = &counts[0];
        if access[CNS_ACL_USER_OBJ as usize] != 1
            || access[CNS_ACL_GROUP_OBJ as usize] != 1
            || access[CNS_ACL_OTHER as usize] != 1
        {
            return Err(Self::invalid("acl needs exactly one user_obj, group_obj and other"));
        }
        Self::check_mask(access)?;

        let default = &counts[1];
        if default.iter().any(|n| *n > 0) {
            if default[CNS_ACL_USER_OBJ as usize] != 1
                || default[CNS_ACL_GROUP_OBJ as usize] != 1
                || default[CNS_ACL_OTHER as usize] != 1
            {
                return Err(Self::invalid(
                    "default acl needs exactly one user_obj, group_obj and other",
                ));
            }
            Self::check_mask(default)?;
        }
        Ok(())
    }

    fn check_mask(counts: &[usize; 7]) -> NsResult<()> {
        let named = counts[CNS_ACL_USER as usize] + counts[CNS_ACL_GROUP as usize];
        let mask = counts[CNS_ACL_MASK as usize];
        if (named > 0 && mask != 1) || (named == 0 && mask > 0) {
            Err(Self::invalid("acl mask required exactly when named entries exist"))
        } else {
            Ok(())
        }
    }

    /// True when the list carries more than what the mode bits express.
    pub fn is_extended(entries: &[AclEntry]) -> bool {
        entries
            .iter()
            .any(|e| e.is_default() || !matches!(e.a_type, CNS_ACL_USER_OBJ | CNS_ACL_GROUP_OBJ | CNS_ACL_OTHER))
    }

    pub fn has_default(entries: &[AclEntry]) -> bool {
        entries.iter().any(|e| e.is_default())
    }

    pub fn find(entries: &[AclEntry], a_type: u8) -> Option<&AclEntry> {
        entries.iter().find(|e| e.a_type == a_type)
    }

    pub fn serialize(entries: &[AclEntry]) -> String {
        entries
            .iter()
            .map(|e| format!("{}{}:{}", (b'@' + e.a_type) as char, e.a_id, e.a_perm))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn parse(s: &str) -> NsResult<Vec<AclEntry>> {
        let mut entries = vec![];
        for item in s.split(',').filter(|x| !x.is_empty()) {
            let letter = item.as_bytes()[0];
            let rest = &item[1..];
            let (id, perm) = match rest.split_once(':') {
                Some(v) => v,
                None => return Err(Self::invalid(format!("bad stored acl item {}", item))),
            };
            let a_id = id
                .parse::<u32>()
                .map_err(|_| Self::invalid(format!("bad stored acl id {}", item)))?;
            let a_perm = perm
                .parse::<u8>()
                .map_err(|_| Self::invalid(format!("bad stored acl perm {}", item)))?;
            entries.push(AclEntry::new(letter.wrapping_sub(b'@'), a_id, a_perm));
        }
        Ok(entries)
    }

    /// Base entries equivalent to the permission bits of `mode`.
    pub fn from_mode(mode: u32, uid: u32, gid: u32) -> Vec<AclEntry> {
        vec![
            AclEntry::new(CNS_ACL_USER_OBJ, uid, ((mode >> 6) & 7) as u8),
            AclEntry::new(CNS_ACL_GROUP_OBJ, gid, ((mode >> 3) & 7) as u8),
            AclEntry::new(CNS_ACL_OTHER, 0, (mode & 7) as u8),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<AclEntry> {
        vec![
            AclEntry::new(CNS_ACL_OTHER, 0, 4),
            AclEntry::new(CNS_ACL_USER_OBJ, 100, 7),
            AclEntry::new(CNS_ACL_GROUP_OBJ, 10, 5),
        ]
    }

    #[test]
    fn base_acl_is_valid_and_sorted() {
        let mut acl = base();
        Acl::validate(&mut acl).unwrap();
        assert_eq!(acl[0].a_type, CNS_ACL_USER_OBJ);
        assert_eq!(acl[2].a_type, CNS_ACL_OTHER);
        assert!(!Acl::is_extended(&acl));
    }

    #[test]
    fn mask_rules() {
        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_USER, 200, 6));
        assert_eq!(Acl::validate(&mut acl).unwrap_err().code(), libc::EINVAL);

        acl.push(AclEntry::new(CNS_ACL_MASK, 0, 6));
        Acl::validate(&mut acl).unwrap();

        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_MASK, 0, 6));
        assert!(Acl::validate(&mut acl).is_err());
    }

    #[test]
    fn duplicates_and_missing() {
        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_OTHER, 0, 1));
        assert!(Acl::validate(&mut acl).is_err());

        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_USER, 200, 6));
        acl.push(AclEntry::new(CNS_ACL_USER, 200, 4));
        acl.push(AclEntry::new(CNS_ACL_MASK, 0, 6));
        assert!(Acl::validate(&mut acl).is_err());

        let mut acl = base();
        acl.remove(0);
        assert!(Acl::validate(&mut acl).is_err());

        let mut acl = base();
        acl[0].a_perm = 8;
        assert!(Acl::validate(&mut acl).is_err());
    }

    #[test]
    fn default_set_rules() {
        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_USER_OBJ, 0, 7));
        assert!(Acl::validate(&mut acl).is_err());

        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_GROUP_OBJ, 0, 5));
        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_OTHER, 0, 0));
        Acl::validate(&mut acl).unwrap();
        assert!(Acl::has_default(&acl));
        assert!(acl.last().unwrap().is_default());
    }

    #[test]
    fn stored_text() {
        let mut acl = base();
        acl.push(AclEntry::new(CNS_ACL_GROUP, 20, 7));
        acl.push(AclEntry::new(CNS_ACL_MASK, 0, 7));
        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_USER_OBJ, 0, 7));
        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_GROUP_OBJ, 0, 5));
        acl.push(AclEntry::new(CNS_ACL_DEFAULT | CNS_ACL_OTHER, 0, 0));
        Acl::validate(&mut acl).unwrap();

        let text = Acl::serialize(&acl);
        assert!(text.starts_with("A100:7,C10:5,D20:7,E0:7,F0:4,a0:7"));
        assert_eq!(Acl::parse(&text).unwrap(), acl);
    }
}
