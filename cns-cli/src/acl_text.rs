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

use cns_common::error::NsError;
use cns_common::state::*;
use cns_common::NsResult;
use nix::unistd::{Group, User};

/// How nssetacl combines the given entries with the current ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AclEdit {
    /// Replace the whole ACL.
    Set,
    /// Add the entries or change the permissions of existing ones.
    Modify,
    /// Remove the entries.
    Delete,
}

/// Entries given on the command line. A mask given there is kept as is,
/// otherwise the mask is recomputed after the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclSpec {
    pub entries: Vec<AclEntry>,
}

fn invalid(msg: impl Into<String>) -> NsError {
    NsError::with_msg(libc::EINVAL, msg)
}

fn parse_perm(s: &str) -> NsResult<u8> {
    if s.len() == 1 {
        if let Some(d) = s.chars().next().and_then(|c| c.to_digit(8)) {
            return Ok(d as u8);
        }
    }
    if s.len() != 3 {
        return Err(invalid(format!("bad permission {}", s)));
    }
    let mut perm = 0;
    for (c, (set, bit)) in s.chars().zip([('r', 4), ('w', 2), ('x', 1)]) {
        if c == set {
            perm |= bit;
        } else if c != '-' {
            return Err(invalid(format!("bad permission {}", s)));
        }
    }
    Ok(perm)
}

fn parse_user(s: &str) -> NsResult<u32> {
    if let Ok(id) = s.parse::<u32>() {
        return Ok(id);
    }
    match User::from_name(s) {
        Ok(Some(u)) => Ok(u.uid.as_raw()),
        _ => Err(invalid(format!("unknown user {}", s))),
    }
}

fn parse_group(s: &str) -> NsResult<u32> {
    if let Ok(id) = s.parse::<u32>() {
        return Ok(id);
    }
    match Group::from_name(s) {
        Ok(Some(g)) => Ok(g.gid.as_raw()),
        _ => Err(invalid(format!("unknown group {}", s))),
    }
}

impl AclSpec {
    /// Parse `[d[efault]:]type:[qualifier][:perm]` items separated by
    /// commas. The permission may be left out when deleting.
    pub fn parse(text: &str, edit: AclEdit) -> NsResult<Self> {
        let mut entries = vec![];
        for item in text.split(',').filter(|x| !x.is_empty()) {
            let mut fields: Vec<&str> = item.split(':').collect();
            let mut default = 0;
            if matches!(fields.first(), Some(&"d") | Some(&"default")) {
                default = CNS_ACL_DEFAULT;
                fields.remove(0);
            }
            let (kind, qualifier, perm) = match (fields.len(), edit) {
                (3, _) => (fields[0], fields[1], Some(fields[2])),
                (2, AclEdit::Delete) => (fields[0], fields[1], None),
                _ => return Err(invalid(format!("bad acl entry {}", item))),
            };

            let (base, id) = match (kind, qualifier.is_empty()) {
                ("u" | "user", true) => (CNS_ACL_USER_OBJ, 0),
                ("u" | "user", false) => (CNS_ACL_USER, parse_user(qualifier)?),
                ("g" | "group", true) => (CNS_ACL_GROUP_OBJ, 0),
                ("g" | "group", false) => (CNS_ACL_GROUP, parse_group(qualifier)?),
                ("m" | "mask", true) => (CNS_ACL_MASK, 0),
                ("o" | "other", true) => (CNS_ACL_OTHER, 0),
                _ => return Err(invalid(format!("bad acl entry {}", item))),
            };
            let perm = match perm {
                Some(p) => parse_perm(p)?,
                None => 0,
            };
            entries.push(AclEntry::new(base | default, id, perm));
        }
        if entries.is_empty() {
            return Err(invalid("no acl entry"));
        }
        Ok(Self { entries })
    }

    fn same_slot(a: &AclEntry, b: &AclEntry) -> bool {
        a.a_type == b.a_type && (!matches!(a.base_type(), CNS_ACL_USER | CNS_ACL_GROUP) || a.a_id == b.a_id)
    }

    fn has_mask(&self, default: u8) -> bool {
        self.entries.iter().any(|e| e.a_type == CNS_ACL_MASK | default)
    }

    /// The ACL to store, given the current one.
    pub fn apply(&self, edit: AclEdit, current: &[AclEntry]) -> Vec<AclEntry> {
        let mut acl: Vec<AclEntry> = match edit {
            AclEdit::Set => self.entries.clone(),
            AclEdit::Modify => {
                let mut acl = current.to_vec();
                for e in &self.entries {
                    match acl.iter_mut().find(|c| Self::same_slot(c, e)) {
                        Some(c) => c.a_perm = e.a_perm,
                        None => acl.push(*e),
                    }
                }
                acl
            }
            AclEdit::Delete => current
                .iter()
                .filter(|c| !self.entries.iter().any(|e| Self::same_slot(c, e)))
                .copied()
                .collect(),
        };

        for default in [0, CNS_ACL_DEFAULT] {
            if !self.has_mask(default) {
                Self::recompute_mask(&mut acl, default);
            }
        }
        acl
    }

    /// Keep a mask exactly when named entries exist, covering the group
    /// class permissions.
    fn recompute_mask(acl: &mut Vec<AclEntry>, default: u8) {
        let named = acl
            .iter()
            .any(|e| e.a_type == CNS_ACL_USER | default || e.a_type == CNS_ACL_GROUP | default);
        acl.retain(|e| e.a_type != CNS_ACL_MASK | default);
        if named {
            let perm = acl
                .iter()
                .filter(|e| {
                    matches!(e.a_type & !CNS_ACL_DEFAULT, CNS_ACL_USER | CNS_ACL_GROUP | CNS_ACL_GROUP_OBJ)
                        && e.a_type & CNS_ACL_DEFAULT == default
                })
                .fold(0, |p, e| p | e.a_perm);
            acl.push(AclEntry::new(CNS_ACL_MASK | default, 0, perm));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Vec<AclEntry> {
        Acl::from_mode(0o750, 100, 10)
    }

    #[test]
    fn parse_forms() {
        let spec = AclSpec::parse("u::rwx,g::r-x,o::4,u:200:rw-,d:m::7", AclEdit::Set).unwrap();
        assert_eq!(
            spec.entries,
            vec![
                AclEntry::new(CNS_ACL_USER_OBJ, 0, 7),
                AclEntry::new(CNS_ACL_GROUP_OBJ, 0, 5),
                AclEntry::new(CNS_ACL_OTHER, 0, 4),
                AclEntry::new(CNS_ACL_USER, 200, 6),
                AclEntry::new(CNS_ACL_MASK | CNS_ACL_DEFAULT, 0, 7),
            ]
        );
        assert!(AclSpec::parse("u:200", AclEdit::Modify).is_err());
        assert!(AclSpec::parse("u:200", AclEdit::Delete).is_ok());
        assert!(AclSpec::parse("o::rwz", AclEdit::Set).is_err());
        assert!(AclSpec::parse("x::7", AclEdit::Set).is_err());
        assert!(AclSpec::parse("m:5:7", AclEdit::Set).is_err());
    }

    #[test]
    fn modify_adds_entry_and_mask() {
        let spec = AclSpec::parse("u:200:r--", AclEdit::Modify).unwrap();
        let mut acl = spec.apply(AclEdit::Modify, &current());
        Acl::validate(&mut acl).unwrap();
        assert!(acl.contains(&AclEntry::new(CNS_ACL_USER, 200, 4)));
        assert_eq!(Acl::find(&acl, CNS_ACL_MASK).unwrap().a_perm, 5);
    }

    #[test]
    fn delete_last_named_entry_drops_mask() {
        let spec = AclSpec::parse("u:200:r--", AclEdit::Modify).unwrap();
        let acl = spec.apply(AclEdit::Modify, &current());

        let spec = AclSpec::parse("u:200", AclEdit::Delete).unwrap();
        let mut acl = spec.apply(AclEdit::Delete, &acl);
        Acl::validate(&mut acl).unwrap();
        assert_eq!(acl.len(), 3);
        assert!(Acl::find(&acl, CNS_ACL_MASK).is_none());
    }

    #[test]
    fn explicit_mask_is_kept() {
        let spec = AclSpec::parse("u::7,g::5,o::0,g:20:7,m::1", AclEdit::Set).unwrap();
        let acl = spec.apply(AclEdit::Set, &[]);
        assert_eq!(Acl::find(&acl, CNS_ACL_MASK).unwrap().a_perm, 1);
    }
}
