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
use crate::ns::{Credentials, ReqLog};
use cns_common::proto::{NsReader, CA_MAXFSNAMELEN, CA_MAXGUIDLEN, CA_MAXHOSTNAMELEN, CA_MAXPOOLNAMELEN, CA_MAXSFNLEN};
use cns_common::state::{FileMetadata, FileReplica};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

impl NsHandler {
    /// The file a replica request is about, by fileid or else by guid.
    fn replica_owner(&self, cred: &Credentials, fileid: u64, guid: &str) -> NsResult<FileMetadata> {
        let resolver = self.ctx.resolver(cred);
        let entry = if fileid != 0 {
            resolver.by_fileid(fileid)?
        } else {
            resolver.by_guid(guid)?
        };
        if entry.is_dir() {
            return err_ns!(libc::EISDIR, "{}", entry.name);
        }
        Ok(entry)
    }

    pub(crate) fn addreplica(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        let host = u.get_str(CA_MAXHOSTNAMELEN)?;
        let sfn = u.get_str(CA_MAXSFNLEN)?;
        let status = u.get_byte()?;
        let f_type = u.get_byte()?;
        let poolname = u.get_str(CA_MAXPOOLNAMELEN)?;
        let fs = u.get_str(CA_MAXFSNAMELEN)?;
        ReqLog::log("addreplica", &format!("addreplica {} {} {}:{}", fileid, guid, host, sfn));

        self.ctx.perm().require_admin(cred)?;
        if sfn.is_empty() {
            return err_ns!(libc::EINVAL, "empty sfn");
        }
        let found = self.replica_owner(cred, fileid, &guid)?;
        let store = self.ctx.store().clone();
        // Hold the file so it cannot be removed under the new replica.
        let (entry, _lease) = store.lock_file(self.db.start_tr(), found.fileid)?;

        let now = Self::now();
        let replica = FileReplica {
            fileid: entry.fileid,
            nbaccesses: 0,
            atime: now,
            ptime: now,
            status,
            f_type,
            poolname,
            host,
            fs,
            sfn,
        };
        store.insert_replica(self.db.start_tr(), replica)
    }

    pub(crate) fn delreplica(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        let sfn = u.get_str(CA_MAXSFNLEN)?;
        ReqLog::log("delreplica", &format!("delreplica {} {} {}", fileid, guid, sfn));

        self.ctx.perm().require_admin(cred)?;
        let entry = self.replica_owner(cred, fileid, &guid)?;
        let store = self.ctx.store().clone();
        let tx = self.db.start_tr();
        match store.lock_replica(tx, &sfn)? {
            Some((r, lease)) if r.fileid == entry.fileid => store.delete_replica(tx, &lease, &sfn),
            _ => err_ns!(libc::ENOENT, "no replica {} for {}", sfn, entry.fileid),
        }
    }
}
