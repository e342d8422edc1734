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


use cns_common::state::{Acl, AclEntry, FileMetadata};
use cns_common::state::{CNS_ACL_DEFAULT, CNS_ACL_GROUP_OBJ, CNS_ACL_MASK, CNS_ACL_OTHER, CNS_ACL_USER_OBJ};
use cns_common::utils::{S_IFMT, S_ISGID, S_ISUID, S_ISVTX};
use cns_common::NsResult;

/// Keeps stored ACLs consistent with mode and ownership changes, and
/// derives the ACL of new entries from the default ACL of their parent.
pub struct AclEngine;

impl AclEngine {
    /// Rewrite the owner, group class and other digits after a chmod.
    /// The group class is the mask when there is one.
    pub fn chmod(acl: &str, mode: u32) -> NsResult<String> {
        let mut entries = Acl::parse(acl)?;
        let has_mask = Acl::find(&entries, CNS_ACL_MASK).is_some();
        for e in entries.iter_mut() {
            match e.a_type {
                CNS_ACL_USER_OBJ => e.a_perm = ((mode >> 6) & 7) as u8,
                CNS_ACL_MASK => e.a_perm = ((mode >> 3) & 7) as u8,
                CNS_ACL_GROUP_OBJ if !has_mask => e.a_perm = ((mode >> 3) & 7) as u8,
                CNS_ACL_OTHER => e.a_perm = (mode & 7) as u8,
                _ => (),
            }
        }
        Ok(Acl::serialize(&entries))
    }

    /// Rewrite the owner and owning group ids after a chown.
    pub fn chown(acl: &str, uid: u32, gid: u32) -> NsResult<String> {
        let mut entries = Acl::parse(acl)?;
        for e in entries.iter_mut() {
            match e.a_type {
                CNS_ACL_USER_OBJ => e.a_id = uid,
                CNS_ACL_GROUP_OBJ => e.a_id = gid,
                _ => (),
            }
        }
        Ok(Acl::serialize(&entries))
    }

    /// Mode bits that follow a validated ACL.
    pub fn mode_of(entries: &[AclEntry], filemode: u32) -> u32 {
        let perm = |t: u8| Acl::find(entries, t).map(|e| e.a_perm as u32).unwrap_or(0);
        let group = match Acl::find(entries, CNS_ACL_MASK) {
            Some(m) => m.a_perm as u32,
            None => perm(CNS_ACL_GROUP_OBJ),
        };
        (filemode & (S_IFMT | S_ISUID | S_ISGID | S_ISVTX))
            | (perm(CNS_ACL_USER_OBJ) << 6)
            | (group << 3)
            | perm(CNS_ACL_OTHER)
    }

    /// Apply the default ACL of `parent` to `entry`, created with the
    /// permission bits `mode`. Returns false when the parent has no default
    /// ACL, in which case the caller applies its umask instead.
    pub fn inherit(parent: &FileMetadata, entry: &mut FileMetadata, mode: u32) -> NsResult<bool> {
        if parent.acl.is_empty() {
            return Ok(false);
        }
        let parent_acl = Acl::parse(&parent.acl)?;
        let defaults: Vec<AclEntry> = parent_acl.into_iter().filter(|e| e.is_default()).collect();
        if defaults.is_empty() {
            return Ok(false);
        }

        let dperm = |t: u8| {
            Acl::find(&defaults, CNS_ACL_DEFAULT | t)
                .map(|e| e.a_perm as u32)
                .unwrap_or(0)
        };
        let special = mode & (S_ISUID | S_ISGID | S_ISVTX);
        let has_mask = Acl::find(&defaults, CNS_ACL_DEFAULT | CNS_ACL_MASK).is_some();

        if !has_mask && !entry.is_dir() {
            // Plain default ACL on a file: it only narrows the mode.
            let allowed = (dperm(CNS_ACL_USER_OBJ) << 6) | (dperm(CNS_ACL_GROUP_OBJ) << 3) | dperm(CNS_ACL_OTHER);
            entry.filemode = (entry.filemode & S_IFMT) | special | (mode & 0o777 & allowed);
            entry.acl.clear();
            return Ok(true);
        }

        let mut access = Vec::with_capacity(defaults.len() * 2);
        for d in &defaults {
            let mut e = AclEntry::new(d.base_type(), d.a_id, d.a_perm);
            match e.a_type {
                CNS_ACL_USER_OBJ => {
                    e.a_id = entry.uid;
                    e.a_perm &= ((mode >> 6) & 7) as u8;
                }
                CNS_ACL_GROUP_OBJ => {
                    e.a_id = entry.gid;
                    if !has_mask {
                        e.a_perm &= ((mode >> 3) & 7) as u8;
                    }
                }
                CNS_ACL_MASK => e.a_perm &= ((mode >> 3) & 7) as u8,
                CNS_ACL_OTHER => e.a_perm &= (mode & 7) as u8,
                _ => (),
            }
            access.push(e);
        }
        if entry.is_dir() {
            access.extend(defaults.iter().copied());
        }
        Acl::validate(&mut access)?;

        entry.filemode = Self::mode_of(&access, (entry.filemode & S_IFMT) | special);
        entry.acl = Acl::serialize(&access);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::utils::{S_IFDIR, S_IFREG};

    fn dir_with_acl(acl: &str) -> FileMetadata {
        FileMetadata {
            fileid: 5,
            filemode: S_IFDIR | 0o755,
            uid: 100,
            gid: 10,
            acl: acl.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn chmod_rewrites_mask_not_group() {
        let acl = "A100:7,B200:7,C10:5,E0:7,F0:5";
        let out = AclEngine::chmod(acl, 0o640).unwrap();
        assert_eq!(out, "A100:6,B200:7,C10:5,E0:4,F0:0");
        // Idempotent.
        assert_eq!(AclEngine::chmod(&out, 0o640).unwrap(), out);
    }

    #[test]
    fn chmod_without_mask_rewrites_group() {
        assert_eq!(AclEngine::chmod("A1:7,C2:7,F0:7", 0o751).unwrap(), "A1:7,C2:5,F0:1");
    }

    #[test]
    fn chown_rewrites_owner_ids() {
        let out = AclEngine::chown("A100:7,B200:7,C10:5,E0:7,F0:5", 300, 30).unwrap();
        assert_eq!(out, "A300:7,B200:7,C30:5,E0:7,F0:5");
    }

    #[test]
    fn plain_default_narrows_file_mode() {
        // default: user_obj rwx, group_obj r-x, other ---
        let parent = dir_with_acl("A100:7,C10:5,F0:5,a100:7,c10:5,f0:0");
        let mut f = FileMetadata {
            filemode: S_IFREG,
            uid: 100,
            gid: 10,
            ..Default::default()
        };
        assert!(AclEngine::inherit(&parent, &mut f, 0o666).unwrap());
        assert_eq!(f.filemode, S_IFREG | 0o640);
        assert!(f.acl.is_empty());
    }

    #[test]
    fn named_default_materializes_access_acl() {
        // default: user_obj rwx, group 50 rwx, group_obj r-x, mask rwx, other r-x
        let parent = dir_with_acl("A100:7,C10:5,F0:5,a100:7,c10:5,d50:7,e0:7,f0:5");
        let mut f = FileMetadata {
            filemode: S_IFREG,
            uid: 300,
            gid: 30,
            ..Default::default()
        };
        AclEngine::inherit(&parent, &mut f, 0o640).unwrap();
        assert_eq!(f.filemode, S_IFREG | 0o640);
        assert_eq!(f.acl, "A300:6,C30:5,D50:7,E0:4,F0:0");

        let mut d = FileMetadata {
            filemode: S_IFDIR,
            uid: 300,
            gid: 30,
            ..Default::default()
        };
        AclEngine::inherit(&parent, &mut d, 0o755).unwrap();
        assert_eq!(d.filemode, S_IFDIR | 0o755);
        assert!(d.acl.ends_with("a100:7,c10:5,d50:7,e0:7,f0:5"));
    }

    #[test]
    fn no_default_acl() {
        let parent = dir_with_acl("A100:7,C10:5,F0:5");
        let mut f = FileMetadata::default();
        assert!(!AclEngine::inherit(&parent, &mut f, 0o644).unwrap());
    }
}
