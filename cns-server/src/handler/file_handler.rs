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
use crate::meta::RecordLease;
use crate::ns::{AclEngine, Credentials, ReqLog};
use cns_common::error::serrno::ENSOVERWHENREP;
use cns_common::proto::{NsReader, CA_MAXGUIDLEN, CA_MAXSFNLEN};
use cns_common::state::FileMetadata;
use cns_common::utils::*;
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

fn is_special(name: &str) -> bool {
    name == "/" || name == "." || name == ".."
}

impl NsHandler {
    /// A new entry named `name` under `parent`, owned by the caller.
    pub(crate) fn new_entry(
        &self,
        parent: &FileMetadata,
        name: &str,
        ftype: u32,
        mode: u32,
        mask: u32,
        cred: &Credentials,
    ) -> NsResult<FileMetadata> {
        let now = Self::now();
        let mut entry = FileMetadata {
            fileid: self.ctx.store().next_fileid(),
            parent_fileid: parent.fileid,
            name: name.to_string(),
            filemode: ftype,
            nlink: if ftype == S_IFDIR { 0 } else { 1 },
            uid: cred.uid,
            gid: cred.gid,
            atime: now,
            mtime: now,
            ctime: now,
            fileclass: parent.fileclass,
            status: STATUS_ONLINE,
            ..Default::default()
        };

        let mut setgid = 0;
        if parent.filemode & S_ISGID != 0 {
            entry.gid = parent.gid;
            if cred.gid == parent.gid {
                setgid = S_ISGID;
            }
        }
        let mode = mode & !S_IFMT;
        if !AclEngine::inherit(parent, &mut entry, mode)? {
            entry.filemode = ftype | (mode & !mask);
        }
        entry.filemode |= setgid;
        Ok(entry)
    }

    /// Lock the entry `base` of `parent`. `/`, `.` and `..` are looked up
    /// through the resolver.
    fn lock_basename(
        &mut self,
        cred: &Credentials,
        cwd: u64,
        path: &str,
        parent: u64,
        base: &str,
    ) -> NsResult<Option<(FileMetadata, RecordLease)>> {
        let store = self.ctx.store().clone();
        if is_special(base) {
            let ctx = self.ctx.clone();
            let found = ctx.resolver(cred).lookup(cwd, path, false)?;
            return store.lock_file(self.db.start_tr(), found.fileid).map(Some);
        }
        store.lock_child(self.db.start_tr(), parent, base)
    }

    /// Truncate an existing file to a fresh online file without segments.
    fn reset_file(&mut self, cred: &Credentials, entry: &mut FileMetadata) -> NsResult<()> {
        if entry.is_dir() {
            return err_ns!(libc::EISDIR, "{}", entry.name);
        }
        let store = self.ctx.store().clone();
        if !store.replicas_of(entry.fileid).is_empty() && !self.ctx.perm().is_admin(cred) {
            return err_ns!(ENSOVERWHENREP, "{}", entry.name);
        }
        let purged = store.purge_segments(self.db.start_tr(), entry.fileid)?;
        let now = Self::now();
        entry.filesize = 0;
        entry.mtime = now;
        entry.ctime = now;
        entry.status = STATUS_ONLINE;
        entry.csumtype.clear();
        entry.csumvalue.clear();
        ReqLog::log("reset", &format!("file {} reset, {} segments purged", entry.fileid, purged));
        Ok(())
    }

    /// Account for a new child of `parent` and store it.
    fn add_child(&mut self, parent: &mut FileMetadata, lease: &RecordLease, delta: i32) -> NsResult<()> {
        let now = Self::now();
        parent.nlink = (parent.nlink + delta).max(0);
        parent.mtime = now;
        parent.ctime = now;
        let store = self.ctx.store().clone();
        store.update_file(self.db.start_tr(), lease, parent)
    }

    pub(crate) fn creat(&mut self, cred: &Credentials, u: &mut Unmarshaller, with_guid: bool) -> NsResult<()> {
        let mask = u.get_word()? as u32;
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let mode = u.get_long()? as u32;
        let guid = if with_guid { u.get_str(CA_MAXGUIDLEN)? } else { String::new() };
        ReqLog::log("creat", &format!("creat {} {:o} {:o} {}", path, mode, mask, guid));

        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if is_special(&base) {
            return err_ns!(libc::EISDIR, "{}", path);
        }

        let store = self.ctx.store().clone();
        let fileid = match store.lock_child(self.db.start_tr(), parent.fileid, &base)? {
            Some((mut entry, lease)) => {
                if entry.is_dir() {
                    return err_ns!(libc::EISDIR, "{}", path);
                }
                self.ctx.perm().check(&entry, S_IWRITE, cred)?;
                self.reset_file(cred, &mut entry)?;
                if !guid.is_empty() {
                    entry.guid = guid;
                }
                store.update_file(self.db.start_tr(), &lease, &entry)?;
                entry.fileid
            }
            None => {
                let mut entry = self.new_entry(&parent, &base, S_IFREG, mode, mask, cred)?;
                entry.guid = guid;
                store.insert_file(self.db.start_tr(), entry.clone())?;
                self.add_child(&mut parent, &plock, 1)?;
                ReqLog::log("creat", &format!("file {} created", entry.fileid));
                entry.fileid
            }
        };
        self.sink.data(|m| Ok(m.put_hyper(fileid)?))
    }

    pub(crate) fn open(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let mask = u.get_word()? as u32;
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let oflag = u.get_long()?;
        let mode = u.get_long()? as u32;
        ReqLog::log("open", &format!("open {} {:o} {:o} {:o}", path, oflag, mode, mask));

        let create = oflag & O_CREAT != 0;
        let writing = oflag & O_ACCMODE != O_RDONLY || oflag & O_TRUNC != 0;
        let pmode = if create { S_IWRITE } else { 0 };
        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, pmode)?;

        let store = self.ctx.store().clone();
        let existing = match self.lock_basename(cred, cwd, &path, parent.fileid, &base) {
            Ok(v) => v,
            Err(e) if e.is(libc::ENOENT) => None,
            Err(e) => return Err(e),
        };
        let fileid = match existing {
            Some((mut entry, lease)) if !entry.is_deleted() || create => {
                if create && oflag & O_EXCL != 0 && !entry.is_deleted() {
                    return err_ns!(libc::EEXIST, "{}", path);
                }
                if entry.is_dir() && writing {
                    return err_ns!(libc::EISDIR, "{}", path);
                }
                let perm = if writing { S_IWRITE } else { S_IREAD };
                self.ctx.perm().check(&entry, perm, cred)?;
                if oflag & O_TRUNC != 0 || entry.is_deleted() {
                    self.reset_file(cred, &mut entry)?;
                    store.update_file(self.db.start_tr(), &lease, &entry)?;
                }
                entry.fileid
            }
            _ => {
                if !create {
                    return err_ns!(libc::ENOENT, "{}", path);
                }
                let entry = self.new_entry(&parent, &base, S_IFREG, mode & !S_ISVTX, mask, cred)?;
                store.insert_file(self.db.start_tr(), entry.clone())?;
                self.add_child(&mut parent, &plock, 1)?;
                ReqLog::log("open", &format!("file {} created", entry.fileid));
                entry.fileid
            }
        };
        self.sink.data(|m| Ok(m.put_hyper(fileid)?))
    }

    pub(crate) fn mkdir(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let mask = u.get_word()? as u32;
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let mode = u.get_long()? as u32;
        ReqLog::log("mkdir", &format!("mkdir {} {:o} {:o}", path, mode, mask));

        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if is_special(&base) {
            return err_ns!(libc::EEXIST, "{}", path);
        }
        let store = self.ctx.store().clone();
        if store.lock_child(self.db.start_tr(), parent.fileid, &base)?.is_some() {
            return err_ns!(libc::EEXIST, "{}", path);
        }

        let entry = self.new_entry(&parent, &base, S_IFDIR, mode, mask, cred)?;
        store.insert_file(self.db.start_tr(), entry.clone())?;
        self.add_child(&mut parent, &plock, 1)?;
        store.adjust_class_usage(self.db.start_tr(), entry.fileclass as i32, 1)?;
        Ok(())
    }

    pub(crate) fn rmdir(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("rmdir", &format!("rmdir {} {}", cwd, path));

        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if is_special(&base) {
            return err_ns!(libc::EINVAL, "{}", path);
        }
        let (entry, lease) = self.lock_child(parent.fileid, &base)?;
        if !entry.is_dir() {
            return err_ns!(libc::ENOTDIR, "{}", path);
        }
        if entry.fileid == cwd {
            return err_ns!(libc::EINVAL, "{} is the current directory", path);
        }
        if entry.nlink > 0 {
            return err_ns!(libc::EEXIST, "{} is not empty", path);
        }
        self.check_sticky(&parent, &entry, cred)?;

        let store = self.ctx.store().clone();
        store.purge_comment(self.db.start_tr(), entry.fileid)?;
        store.delete_file(self.db.start_tr(), &lease, entry.fileid)?;
        store.adjust_class_usage(self.db.start_tr(), entry.fileclass as i32, -1)?;
        self.add_child(&mut parent, &plock, -1)
    }

    /// Drop an entry and everything attached to it: segments, replicas,
    /// comment and link target.
    fn purge_entry(&mut self, cred: &Credentials, entry: &FileMetadata, lease: &RecordLease) -> NsResult<()> {
        let store = self.ctx.store().clone();
        let replicas = store.replicas_of(entry.fileid);
        if !replicas.is_empty() {
            if !self.ctx.perm().is_admin(cred) {
                return err_ns!(libc::EEXIST, "{} has {} replicas", entry.name, replicas.len());
            }
            for r in replicas {
                if let Some((rep, rlock)) = store.lock_replica(self.db.start_tr(), &r.sfn)? {
                    store.delete_replica(self.db.start_tr(), &rlock, &rep.sfn)?;
                }
            }
        }
        let tx = self.db.start_tr();
        store.purge_segments(tx, entry.fileid)?;
        store.purge_comment(tx, entry.fileid)?;
        if entry.is_link() {
            store.delete_symlink(tx, lease, entry.fileid)?;
        }
        if entry.is_dir() {
            store.adjust_class_usage(tx, entry.fileclass as i32, -1)?;
        }
        store.delete_file(tx, lease, entry.fileid)
    }

    pub(crate) fn unlink(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("unlink", &format!("unlink {} {}", cwd, path));

        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if base == "/" {
            return err_ns!(libc::EINVAL, "{}", path);
        }
        let (entry, lease) = match self.lock_basename(cred, cwd, &path, parent.fileid, &base)? {
            Some(v) => v,
            None => return err_ns!(libc::ENOENT, "{}", path),
        };
        if entry.is_dir() {
            return err_ns!(libc::EPERM, "{} is a directory", path);
        }
        self.check_sticky(&parent, &entry, cred)?;
        self.purge_entry(cred, &entry, &lease)?;
        self.add_child(&mut parent, &plock, -1)
    }

    pub(crate) fn delete(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("delete", &format!("delete {} {}", cwd, path));

        if PathUtils::is_root(&path) {
            return err_ns!(libc::EINVAL, "cannot delete /");
        }
        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if is_special(&base) {
            return err_ns!(libc::EPERM, "{}", path);
        }
        let (mut entry, lease) = self.lock_child(parent.fileid, &base)?;
        if entry.is_dir() {
            return err_ns!(libc::EPERM, "{} is a directory", path);
        }
        self.check_sticky(&parent, &entry, cred)?;

        let store = self.ctx.store().clone();
        for (mut seg, slock) in store.lock_segments_of(self.db.start_tr(), entry.fileid)? {
            seg.s_status = STATUS_DELETED;
            store.update_segment(self.db.start_tr(), &slock, seg)?;
        }
        entry.status = STATUS_DELETED;
        entry.ctime = Self::now();
        store.update_file(self.db.start_tr(), &lease, &entry)?;
        self.add_child(&mut parent, &plock, 0)
    }

    pub(crate) fn undelete(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("undelete", &format!("undelete {} {}", cwd, path));

        if PathUtils::is_root(&path) {
            return err_ns!(libc::EINVAL, "cannot undelete /");
        }
        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &path, S_IWRITE)?;
        if is_special(&base) {
            return err_ns!(libc::EPERM, "{}", path);
        }
        let (mut entry, lease) = self.lock_child(parent.fileid, &base)?;
        if entry.is_dir() {
            return err_ns!(libc::EPERM, "{} is a directory", path);
        }
        self.check_sticky(&parent, &entry, cred)?;

        let store = self.ctx.store().clone();
        let segs = store.lock_segments_of(self.db.start_tr(), entry.fileid)?;
        entry.status = if segs.is_empty() { STATUS_ONLINE } else { STATUS_MIGRATED };
        for (mut seg, slock) in segs {
            seg.s_status = STATUS_ONLINE;
            store.update_segment(self.db.start_tr(), &slock, seg)?;
        }
        entry.ctime = Self::now();
        store.update_file(self.db.start_tr(), &lease, &entry)?;
        self.add_child(&mut parent, &plock, 0)
    }

    pub(crate) fn rename(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let oldpath = u.get_path()?;
        let newpath = u.get_path()?;
        ReqLog::log("rename", &format!("rename {} {}", oldpath, newpath));

        if oldpath == newpath {
            return Ok(());
        }
        let (mut old_parent, olock, oldname) = self.lock_parent(cred, cwd, &oldpath, S_IWRITE)?;
        let (mut new_parent, nlock, newname) = self.lock_parent(cred, cwd, &newpath, S_IWRITE)?;
        if is_special(&oldname) || is_special(&newname) {
            return err_ns!(libc::EINVAL, "{} {}", oldpath, newpath);
        }
        let same_parent = old_parent.fileid == new_parent.fileid;

        let (mut entry, elock) = self.lock_child(old_parent.fileid, &oldname)?;
        if entry.is_deleted() {
            return err_ns!(libc::ENOENT, "{}", oldpath);
        }
        if entry.is_dir() && !same_parent {
            let mut id = new_parent.fileid;
            while id != 0 {
                if id == entry.fileid {
                    return err_ns!(libc::EINVAL, "{} is below {}", newpath, oldpath);
                }
                id = match self.ctx.store().file(id) {
                    Some(f) => f.parent_fileid,
                    None => 0,
                };
            }
            self.ctx.perm().check(&entry, S_IWRITE, cred)?;
        }
        self.check_sticky(&old_parent, &entry, cred)?;

        let store = self.ctx.store().clone();
        let mut replaced = false;
        if let Some((dest, dlock)) = store.lock_child(self.db.start_tr(), new_parent.fileid, &newname)? {
            if dest.fileid == entry.fileid {
                return Ok(());
            }
            if entry.is_dir() && !dest.is_dir() {
                return err_ns!(libc::ENOTDIR, "{}", newpath);
            }
            if !entry.is_dir() && dest.is_dir() {
                return err_ns!(libc::EISDIR, "{}", newpath);
            }
            if dest.is_dir() && dest.nlink > 0 {
                return err_ns!(libc::EEXIST, "{} is not empty", newpath);
            }
            self.check_sticky(&new_parent, &dest, cred)?;
            self.purge_entry(cred, &dest, &dlock)?;
            replaced = true;
        }

        let now = Self::now();
        entry.parent_fileid = new_parent.fileid;
        entry.name = newname;
        entry.ctime = now;
        store.update_file(self.db.start_tr(), &elock, &entry)?;

        let gone = if replaced { 1 } else { 0 };
        if same_parent {
            self.add_child(&mut old_parent, &olock, -gone)?;
        } else {
            self.add_child(&mut old_parent, &olock, -1)?;
            self.add_child(&mut new_parent, &nlock, 1 - gone)?;
        }
        Ok(())
    }

    pub(crate) fn stat(&mut self, cred: &Credentials, u: &mut Unmarshaller, follow: bool) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let fileid = if follow { u.get_hyper()? } else { 0 };
        let path = u.get_path()?;
        let func = if follow { "stat" } else { "lstat" };
        ReqLog::log(func, &format!("{} {} {}", func, fileid, path));

        let entry = self.ctx.resolver(cred).lookup_or_id(cwd, fileid, &path, follow)?;
        self.sink.data(|m| entry.to_stat().encode(m))
    }

    pub(crate) fn statg(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        ReqLog::log("statg", &format!("statg {} {}", path, guid));

        let resolver = self.ctx.resolver(cred);
        let entry = if path.is_empty() {
            resolver.by_guid(&guid)?
        } else {
            resolver.lookup(cwd, &path, true)?
        };
        self.sink.data(|m| entry.to_statg().encode(m))
    }

    pub(crate) fn statr(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let sfn = u.get_str(CA_MAXSFNLEN)?;
        ReqLog::log("statr", &format!("statr {}", sfn));

        let replica = match self.ctx.store().replica(&sfn) {
            Some(r) => r,
            None => return err_ns!(libc::ENOENT, "{}", sfn),
        };
        let entry = self.ctx.resolver(cred).by_fileid(replica.fileid)?;
        self.sink.data(|m| entry.to_statg().encode(m))
    }

    pub(crate) fn access(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let amode = u.get_long()? as u32;
        ReqLog::log("access", &format!("access {} {}", amode, path));

        if amode & !(R_OK | W_OK | X_OK) != 0 {
            return err_ns!(libc::EINVAL, "access mode {}", amode);
        }
        let entry = self.ctx.resolver(cred).lookup(cwd, &path, true)?;
        if amode == F_OK {
            return Ok(());
        }
        self.ctx.perm().check(&entry, amode << 6, cred)
    }

    pub(crate) fn chdir(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("chdir", &format!("chdir {}", path));

        let dir = self.ctx.resolver(cred).dir(cwd, &path, S_IEXEC)?;
        self.sink.data(|m| Ok(m.put_hyper(dir.fileid)?))
    }

    pub(crate) fn getpath(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        ReqLog::log("getpath", &format!("getpath {}", fileid));

        let path = self.ctx.resolver(cred).path_of(fileid)?;
        self.sink.data(|m| Ok(m.put_string(&path)?))
    }
}
