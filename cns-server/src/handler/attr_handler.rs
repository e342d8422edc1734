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
use cns_common::proto::{NsReader, CA_MAXCKSUMLEN, CA_MAXCOMMENTLEN, CA_MAXGUIDLEN};
use cns_common::state::FileMetadata;
use cns_common::utils::{S_IFMT, S_IREAD, S_ISGID, S_ISVTX, S_IWRITE};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

// Checksum types are two letter codes such as "AD" or "MD".
const CSUMTYPE_LEN: usize = 2;

impl NsHandler {
    /// The owner passes, anybody else needs `mode` on the entry.
    pub(crate) fn owner_or(&self, entry: &FileMetadata, mode: u32, cred: &Credentials) -> NsResult<()> {
        if cred.uid == entry.uid {
            Ok(())
        } else {
            self.ctx.perm().check(entry, mode, cred)
        }
    }

    pub(crate) fn chmod(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let mut mode = u.get_long()? as u32;
        ReqLog::log("chmod", &format!("chmod {:o} {}", mode, path));

        let (mut entry, lease) = self.locate(cred, cwd, 0, &path, true)?;
        let admin = self.ctx.perm().is_admin(cred);
        if cred.uid != entry.uid && !admin {
            return err_ns!(libc::EPERM, "{}", path);
        }
        if !entry.is_dir() && !admin {
            mode &= !S_ISVTX;
        }
        if cred.gid != entry.gid && !admin {
            mode &= !S_ISGID;
        }

        entry.filemode = (entry.filemode & S_IFMT) | (mode & !S_IFMT);
        if !entry.acl.is_empty() {
            entry.acl = AclEngine::chmod(&entry.acl, entry.filemode)?;
        }
        entry.ctime = Self::now();
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn chown(&mut self, cred: &Credentials, u: &mut Unmarshaller, follow: bool) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let new_uid = u.get_id()?;
        let new_gid = u.get_id()?;
        let func = if follow { "chown" } else { "lchown" };
        ReqLog::log(func, &format!("{} {}:{} {}", func, new_uid as i32, new_gid as i32, path));

        let (mut entry, lease) = self.locate(cred, cwd, 0, &path, follow)?;
        let mut need_admin = false;
        let mut need_group_admin = false;
        if new_uid != u32::MAX && new_uid != entry.uid {
            if cred.gid == entry.gid {
                need_group_admin = true;
            } else {
                need_admin = true;
            }
        }
        if new_gid != u32::MAX && new_gid != entry.gid && (cred.uid != entry.uid || new_gid != cred.gid) {
            need_admin = true;
        }
        let privileges = self.ctx.perm().privileges();
        if (need_admin && !privileges.is_admin(cred)) || (need_group_admin && !privileges.is_group_admin(cred)) {
            return err_ns!(libc::EPERM, "{}", path);
        }

        if new_uid != u32::MAX {
            entry.uid = new_uid;
        }
        if new_gid != u32::MAX {
            entry.gid = new_gid;
        }
        if !entry.acl.is_empty() {
            entry.acl = AclEngine::chown(&entry.acl, entry.uid, entry.gid)?;
        }
        entry.ctime = Self::now();
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn setatime(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let fileid = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("setatime", &format!("setatime {} {}", fileid, path));

        let (mut entry, lease) = self.locate(cred, cwd, fileid, &path, false)?;
        if entry.is_dir() {
            return err_ns!(libc::EISDIR, "{}", path);
        }
        self.owner_or(&entry, S_IREAD, cred)?;
        entry.atime = Self::now();
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn setfsize(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let fileid = u.get_hyper()?;
        let path = u.get_path()?;
        let filesize = u.get_hyper()?;
        ReqLog::log("setfsize", &format!("setfsize {} {} {}", fileid, path, filesize));

        let (mut entry, lease) = self.locate(cred, cwd, fileid, &path, false)?;
        if entry.is_dir() {
            return err_ns!(libc::EISDIR, "{}", path);
        }
        self.owner_or(&entry, S_IWRITE, cred)?;
        let now = Self::now();
        entry.filesize = filesize;
        entry.mtime = now;
        entry.ctime = now;
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn setfsizeg(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        let filesize = u.get_hyper()?;
        let csumtype = u.get_str(CSUMTYPE_LEN)?;
        let csumvalue = u.get_str(CA_MAXCKSUMLEN)?;
        ReqLog::log(
            "setfsizeg",
            &format!("setfsizeg {} {} {} {}", guid, filesize, csumtype, csumvalue),
        );

        if csumtype.is_empty() != csumvalue.is_empty() {
            return err_ns!(libc::EINVAL, "checksum type {:?} value {:?}", csumtype, csumvalue);
        }
        let ctx = self.ctx.clone();
        let found = ctx.resolver(cred).by_guid(&guid)?;
        let (mut entry, lease) = ctx.store().lock_file(self.db.start_tr(), found.fileid)?;
        if entry.is_dir() {
            return err_ns!(libc::EISDIR, "guid {}", guid);
        }
        self.owner_or(&entry, S_IWRITE, cred)?;
        let now = Self::now();
        entry.filesize = filesize;
        entry.mtime = now;
        entry.ctime = now;
        entry.csumtype = csumtype;
        entry.csumvalue = csumvalue;
        ctx.store().update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn utime(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let user_specified = u.get_long()? != 0;
        let times = if user_specified {
            Some((u.get_time()?, u.get_time()?))
        } else {
            None
        };
        ReqLog::log("utime", &format!("utime {} {}", path, user_specified as i32));

        let (mut entry, lease) = self.locate(cred, cwd, 0, &path, false)?;
        if times.is_some() {
            if cred.uid != entry.uid && !self.ctx.perm().is_admin(cred) {
                return err_ns!(libc::EPERM, "{}", path);
            }
        } else {
            self.owner_or(&entry, S_IWRITE, cred)?;
        }

        let now = Self::now();
        entry.ctime = now;
        match times {
            Some((actime, modtime)) => {
                entry.atime = actime;
                entry.mtime = modtime;
            }
            None => {
                entry.atime = now;
                entry.mtime = now;
            }
        }
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), &lease, &entry)
    }

    pub(crate) fn getcomment(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("getcomment", &format!("getcomment {}", path));

        let entry = self.ctx.resolver(cred).lookup(cwd, &path, false)?;
        self.owner_or(&entry, S_IREAD, cred)?;
        let comment = match self.ctx.store().comment(entry.fileid) {
            Some(c) => c,
            None => return err_ns!(libc::ENOENT, "no comment on {}", path),
        };
        self.sink.data(|m| Ok(m.put_string(&comment)?))
    }

    pub(crate) fn setcomment(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let comment = u.get_str(CA_MAXCOMMENTLEN)?;
        ReqLog::log("setcomment", &format!("setcomment {}", path));

        let (entry, _lease) = self.locate(cred, cwd, 0, &path, false)?;
        self.owner_or(&entry, S_IWRITE, cred)?;
        let store = self.ctx.store().clone();
        let tx = self.db.start_tr();
        let (_, clock) = store.lock_comment(tx, entry.fileid)?;
        store.put_comment(tx, &clock, entry.fileid, &comment)
    }

    pub(crate) fn delcomment(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("delcomment", &format!("delcomment {}", path));

        let (entry, _lease) = self.locate(cred, cwd, 0, &path, false)?;
        self.owner_or(&entry, S_IWRITE, cred)?;
        let store = self.ctx.store().clone();
        let tx = self.db.start_tr();
        match store.lock_comment(tx, entry.fileid)? {
            (Some(_), clock) => store.delete_comment(tx, &clock, entry.fileid),
            (None, _) => err_ns!(libc::ENOENT, "no comment on {}", path),
        }
    }
}
