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


use crate::ns::Credentials;
use cns_common::conf::PrivilegeConf;
use cns_common::state::{Acl, AclEntry, FileMetadata};
use cns_common::state::{CNS_ACL_GROUP, CNS_ACL_GROUP_OBJ, CNS_ACL_MASK, CNS_ACL_OTHER, CNS_ACL_USER, CNS_ACL_USER_OBJ};
use cns_common::{err_ns, NsResult};
use log::debug;
use std::collections::HashSet;

/// Administrative capabilities granted by configuration.
#[derive(Debug, Clone, Default)]
pub struct Privileges {
    admins: HashSet<u32>,
    group_admins: HashSet<u32>,
}

impl Privileges {
    pub fn new(conf: &PrivilegeConf) -> Self {
        Self {
            admins: conf.admins.iter().copied().collect(),
            group_admins: conf.group_admins.iter().copied().collect(),
        }
    }

    pub fn is_admin(&self, cred: &Credentials) -> bool {
        self.admins.contains(&cred.uid)
    }

    pub fn is_group_admin(&self, cred: &Credentials) -> bool {
        self.is_admin(cred) || self.group_admins.contains(&cred.uid)
    }
}

/// Access decisions on namespace entries. Requested bits are given in the
/// owner position (`S_IREAD`, `S_IWRITE`, `S_IEXEC`).
pub struct PermChecker {
    privileges: Privileges,
}

impl PermChecker {
    pub fn new(privileges: Privileges) -> Self {
        Self { privileges }
    }

    pub fn privileges(&self) -> &Privileges {
        &self.privileges
    }

    pub fn is_admin(&self, cred: &Credentials) -> bool {
        self.privileges.is_admin(cred)
    }

    pub fn require_admin(&self, cred: &Credentials) -> NsResult<()> {
        if self.is_admin(cred) {
            Ok(())
        } else {
            err_ns!(libc::EACCES, "uid {} is not an administrator", cred.uid)
        }
    }

    /// Check `mode` on `entry`, falling back to the ADMIN capability.
    pub fn check(&self, entry: &FileMetadata, mode: u32, cred: &Credentials) -> NsResult<()> {
        if self.allows(entry, mode, cred) {
            return Ok(());
        }
        if self.is_admin(cred) {
            debug!("{} granted {:o} on {} as administrator", cred, mode, entry.fileid);
            return Ok(());
        }
        err_ns!(libc::EACCES, "{}", entry.name)
    }

    /// The entry's own rules, without the administrator fallback.
    pub fn allows(&self, entry: &FileMetadata, mode: u32, cred: &Credentials) -> bool {
        if entry.acl.is_empty() {
            return Self::mode_allows(entry, mode, cred);
        }
        match Acl::parse(&entry.acl) {
            Ok(acl) => Self::acl_allows(&acl, entry, mode, cred),
            Err(_) => Self::mode_allows(entry, mode, cred),
        }
    }

    fn mode_allows(entry: &FileMetadata, mode: u32, cred: &Credentials) -> bool {
        let mut mode = mode;
        if cred.uid != entry.uid {
            mode >>= 3;
            if cred.gid != entry.gid {
                mode >>= 3;
            }
        }
        entry.filemode & mode == mode
    }

    /// Owner, then named users, then the owning and named groups, then
    /// other. The mask limits every class but the owner and other.
    fn acl_allows(acl: &[AclEntry], entry: &FileMetadata, mode: u32, cred: &Credentials) -> bool {
        let want = ((mode >> 6) & 7) as u8;
        let granted = |perm: u8| perm & want == want;
        let mask = Acl::find(acl, CNS_ACL_MASK).map(|e| e.a_perm).unwrap_or(7);

        if cred.uid == entry.uid {
            return Acl::find(acl, CNS_ACL_USER_OBJ).is_some_and(|e| granted(e.a_perm));
        }

        // Entries are kept sorted by type then id.
        for e in acl.iter().filter(|e| e.a_type == CNS_ACL_USER) {
            if e.a_id > cred.uid {
                break;
            }
            if e.a_id == cred.uid {
                return granted(e.a_perm & mask);
            }
        }

        let mut in_group = false;
        if cred.gid == entry.gid {
            in_group = true;
            if Acl::find(acl, CNS_ACL_GROUP_OBJ).is_some_and(|e| granted(e.a_perm & mask)) {
                return true;
            }
        }
        for e in acl.iter().filter(|e| e.a_type == CNS_ACL_GROUP && e.a_id == cred.gid) {
            in_group = true;
            if granted(e.a_perm & mask) {
                return true;
            }
        }
        if in_group {
            return false;
        }

        Acl::find(acl, CNS_ACL_OTHER).is_some_and(|e| granted(e.a_perm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::utils::{S_IEXEC, S_IFDIR, S_IFREG, S_IREAD, S_IWRITE};

    fn entry(mode: u32, acl: &str) -> FileMetadata {
        FileMetadata {
            fileid: 10,
            name: "f".to_string(),
            filemode: mode,
            uid: 100,
            gid: 10,
            acl: acl.to_string(),
            ..Default::default()
        }
    }

    fn checker() -> PermChecker {
        PermChecker::new(Privileges::new(&PrivilegeConf::default()))
    }

    #[test]
    fn mode_bits_by_class() {
        let c = checker();
        let f = entry(S_IFREG | 0o640, "");
        let owner = Credentials::new(100, 10, "h");
        let group = Credentials::new(200, 10, "h");
        let other = Credentials::new(300, 30, "h");

        assert!(c.allows(&f, S_IREAD | S_IWRITE, &owner));
        assert!(c.allows(&f, S_IREAD, &group));
        assert!(!c.allows(&f, S_IWRITE, &group));
        assert!(!c.allows(&f, S_IREAD, &other));
        assert_eq!(c.check(&f, S_IREAD, &other).unwrap_err().code(), libc::EACCES);
    }

    #[test]
    fn admin_fallback() {
        let c = checker();
        let d = entry(S_IFDIR | 0o700, "");
        let root = Credentials::new(0, 0, "h");
        assert!(!c.allows(&d, S_IEXEC, &root));
        assert!(c.check(&d, S_IEXEC, &root).is_ok());
    }

    #[test]
    fn acl_named_user_and_mask() {
        let c = checker();
        // user_obj rwx, user 200 rwx, group_obj r-x, mask r--, other ---
        let f = entry(S_IFREG | 0o740, "A100:7,B200:7,C10:5,E0:4,F0:0");
        let named = Credentials::new(200, 99, "h");
        assert!(c.allows(&f, S_IREAD, &named));
        assert!(!c.allows(&f, S_IWRITE, &named));

        let group = Credentials::new(300, 10, "h");
        assert!(c.allows(&f, S_IREAD, &group));
        assert!(!c.allows(&f, S_IEXEC, &group));

        let other = Credentials::new(400, 40, "h");
        assert!(!c.allows(&f, S_IREAD, &other));
    }

    #[test]
    fn acl_named_group() {
        let c = checker();
        let f = entry(S_IFREG | 0o700, "A100:7,C10:0,D50:6,E0:7,F0:0");
        let member = Credentials::new(300, 50, "h");
        assert!(c.allows(&f, S_IREAD | S_IWRITE, &member));
        assert!(!c.allows(&f, S_IEXEC, &member));
    }
}
