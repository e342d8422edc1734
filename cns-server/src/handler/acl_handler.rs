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


use crate::handler::NsHandler;
use crate::ns::{AclEngine, Credentials, ReqLog};
use cns_common::proto::{NsReader, CA_MAXACLENTRIES};
use cns_common::state::{Acl, AclEntry, FileMetadata, CNS_ACL_GROUP_OBJ, CNS_ACL_USER_OBJ};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

/// Entries describing `entry`: the stored ACL or, without one, the three
/// entries equivalent to its mode.
fn effective_acl(entry: &FileMetadata) -> NsResult<Vec<AclEntry>> {
    if entry.acl.is_empty() {
        Ok(Acl::from_mode(entry.filemode, entry.uid, entry.gid))
    } else {
        Acl::parse(&entry.acl)
    }
}

impl NsHandler {
    pub(crate) fn getacl(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let nentries = u.get_word()? as usize;
        ReqLog::log("getacl", &format!("getacl {}", path));

        let entry = self.ctx.resolver(cred).lookup(cwd, &path, true)?;
        let entries = effective_acl(&entry)?;
        if nentries != 0 && nentries < entries.len() {
            return err_ns!(libc::ENOSPC, "{} acl entries for {} slots", entries.len(), nentries);
        }
        self.sink.data(|m| {
            m.put_word(entries.len() as u16)?;
            if nentries != 0 {
                for e in &entries {
                    e.encode(m)?;
                }
            }
            Ok(())
        })
    }

    pub(crate) fn setacl(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let nentries = u.get_word()? as usize;
        ReqLog::log("setacl", &format!("setacl {} {}", path, nentries));

        if nentries == 0 || nentries > CA_MAXACLENTRIES {
            return err_ns!(libc::EINVAL, "{} acl entries", nentries);
        }
        let mut entries = Vec::with_capacity(nentries);
        for _ in 0..nentries {
            entries.push(AclEntry::decode(u)?);
        }

        let (mut entry, lease) = self.locate(cred, cwd, 0, &path, true)?;
        if cred.uid != entry.uid && !self.ctx.perm().is_admin(cred) {
            return err_ns!(libc::EPERM, "{}", path);
        }
        Acl::validate(&mut entries)?;
        if Acl::has_default(&entries) && !entry.is_dir() {
            return err_ns!(libc::EINVAL, "default acl on {}, not a directory", path);
        }

        // The owner entries always name the current owner.
        for e in entries.iter_mut() {
            match e.a_type {
                CNS_ACL_USER_OBJ => e.a_id = entry.uid,
                CNS_ACL_GROUP_OBJ => e.a_id = entry.gid,
                _ => (),
            }
        }
        entry.filemode = AclEngine::mode_of(&entries, entry.filemode);
        entry.acl = if Acl::is_extended(&entries) {
            Acl::serialize(&entries)
        } else {
            String::new()
        };
        entry.ctime = Self::now();
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::state::CNS_ACL_OTHER;
    use cns_common::utils::S_IFREG;

    #[test]
    fn mode_bits_stand_in_for_missing_acl() {
        let entry = FileMetadata {
            filemode: S_IFREG | 0o640,
            uid: 100,
            gid: 10,
            ..Default::default()
        };
        let acl = effective_acl(&entry).unwrap();
        assert_eq!(acl.len(), 3);
        assert_eq!(Acl::find(&acl, CNS_ACL_USER_OBJ).unwrap().a_perm, 6);
        assert_eq!(Acl::find(&acl, CNS_ACL_GROUP_OBJ).unwrap().a_id, 10);
        assert_eq!(Acl::find(&acl, CNS_ACL_OTHER).unwrap().a_perm, 0);
    }
}
