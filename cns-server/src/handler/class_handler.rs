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
use crate::ns::{Credentials, ReqLog};
use cns_common::proto::{NsReader, CA_MAXCLASNAMELEN, CA_MAXPOOLNAMELEN};
use cns_common::state::ClassMetadata;
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

/// Class attributes of a modifyclass request; negative values keep the
/// current setting, as do an empty name and -1 ids.
#[derive(Debug, Default)]
struct ClassUpdate {
    name: String,
    uid: i32,
    gid: i32,
    min_filesize: i32,
    max_filesize: i32,
    flags: i32,
    maxdrives: i32,
    max_segsize: i32,
    migr_time_interval: i32,
    mintime_beforemigr: i32,
    nbcopies: i32,
    retenp_on_disk: i32,
    tppools: Vec<String>,
}

impl ClassUpdate {
    fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        let mut update = Self {
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
            tppools: vec![],
        };
        for _ in 0..ClassMetadata::pool_count(u.get_long()?)? {
            update.tppools.push(u.get_str(CA_MAXPOOLNAMELEN)?);
        }
        Ok(update)
    }

    fn apply(self, class: &mut ClassMetadata) {
        fn set(field: &mut i32, v: i32) {
            if v >= 0 {
                *field = v;
            }
        }

        if !self.name.is_empty() {
            class.name = self.name;
        }
        if self.uid != -1 {
            class.uid = self.uid;
        }
        if self.gid != -1 {
            class.gid = self.gid;
        }
        set(&mut class.min_filesize, self.min_filesize);
        set(&mut class.max_filesize, self.max_filesize);
        set(&mut class.flags, self.flags);
        set(&mut class.maxdrives, self.maxdrives);
        set(&mut class.max_segsize, self.max_segsize);
        set(&mut class.migr_time_interval, self.migr_time_interval);
        set(&mut class.mintime_beforemigr, self.mintime_beforemigr);
        set(&mut class.nbcopies, self.nbcopies);
        set(&mut class.retenp_on_disk, self.retenp_on_disk);
        if !self.tppools.is_empty() {
            class.tppools = self.tppools;
        }
    }
}

impl NsHandler {
    /// A class is named by a positive id, by name, or by both when they agree.
    fn find_class(&self, classid: i32, name: &str) -> NsResult<ClassMetadata> {
        let store = self.ctx.store();
        if classid > 0 {
            match store.class(classid) {
                Some(c) if !name.is_empty() && c.name != name => {
                    err_ns!(libc::EINVAL, "class {} is not named {}", classid, name)
                }
                Some(c) => Ok(c),
                None => err_ns!(libc::ENOENT, "class {}", classid),
            }
        } else {
            match store.class_by_name(name) {
                Some(c) => Ok(c),
                None => err_ns!(libc::ENOENT, "class {}", name),
            }
        }
    }

    fn lock_class(&mut self, classid: i32, name: &str) -> NsResult<(ClassMetadata, RecordLease)> {
        let found = self.find_class(classid, name)?;
        let store = self.ctx.store().clone();
        match store.lock_class(self.db.start_tr(), found.classid)? {
            Some(v) => Ok(v),
            None => err_ns!(libc::ENOENT, "class {}", found.classid),
        }
    }

    pub(crate) fn enterclass(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let class = ClassMetadata::decode(u)?;
        ReqLog::log("enterclass", &format!("enterclass {} {}", class.classid, class.name));

        self.ctx.perm().require_admin(cred)?;
        if class.classid <= 0 || class.name.is_empty() {
            return err_ns!(libc::EINVAL, "class {} {}", class.classid, class.name);
        }
        if class.max_filesize < class.min_filesize {
            return err_ns!(
                libc::EINVAL,
                "max_filesize {} below min_filesize {}",
                class.max_filesize,
                class.min_filesize
            );
        }
        let store = self.ctx.store().clone();
        store.insert_class(self.db.start_tr(), class)
    }

    pub(crate) fn modifyclass(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let classid = u.get_long()?;
        let name = u.get_str(CA_MAXCLASNAMELEN)?;
        let update = ClassUpdate::decode(u)?;
        ReqLog::log("modifyclass", &format!("modifyclass {} {}", classid, name));

        self.ctx.perm().require_admin(cred)?;
        let (mut class, lease) = self.lock_class(classid, &name)?;
        update.apply(&mut class);
        let store = self.ctx.store().clone();
        store.update_class(self.db.start_tr(), &lease, class)
    }

    pub(crate) fn deleteclass(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let classid = u.get_long()?;
        let name = u.get_str(CA_MAXCLASNAMELEN)?;
        ReqLog::log("deleteclass", &format!("deleteclass {} {}", classid, name));

        self.ctx.perm().require_admin(cred)?;
        let (class, lease) = self.lock_class(classid, &name)?;
        if class.nbdirs_using_class != 0 {
            return err_ns!(
                libc::EEXIST,
                "class {} used by {} directories",
                class.name,
                class.nbdirs_using_class
            );
        }
        let store = self.ctx.store().clone();
        store.delete_class(self.db.start_tr(), &lease, class.classid)
    }

    pub(crate) fn queryclass(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let classid = u.get_long()?;
        let name = u.get_str(CA_MAXCLASNAMELEN)?;
        ReqLog::log("queryclass", &format!("queryclass {} {}", classid, name));

        let class = self.find_class(classid, &name)?;
        self.sink.data(|m| class.encode(m))
    }

    pub(crate) fn chclass(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let classid = u.get_long()?;
        let name = u.get_str(CA_MAXCLASNAMELEN)?;
        ReqLog::log("chclass", &format!("chclass {} {} {}", path, classid, name));

        let (mut class, clock) = match self.lock_class(classid, &name) {
            Ok(v) => v,
            Err(e) if e.is(libc::ENOENT) => {
                self.sink.msg_err("No such class");
                return err_ns!(libc::EINVAL, "{}", e);
            }
            Err(e) => return Err(e),
        };
        let (mut entry, lease) = self.locate(cred, cwd, 0, &path, false)?;
        if cred.uid != entry.uid && !self.ctx.perm().is_admin(cred) {
            return err_ns!(libc::EPERM, "{}", path);
        }
        if !entry.is_dir() {
            return err_ns!(libc::ENOTDIR, "{}", path);
        }
        if entry.fileclass as i32 == class.classid {
            return Ok(());
        }

        let store = self.ctx.store().clone();
        let tx = self.db.start_tr();
        store.adjust_class_usage(tx, entry.fileclass as i32, -1)?;
        entry.fileclass = class.classid as i16;
        entry.ctime = Self::now();
        store.update_file(tx, &lease, &entry)?;
        class.nbdirs_using_class += 1;
        store.update_class(tx, &clock, class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_unset_fields() {
        let mut class = ClassMetadata {
            classid: 3,
            name: "disk".to_string(),
            uid: 10,
            gid: 20,
            nbcopies: 1,
            maxdrives: 2,
            tppools: vec!["p1".to_string()],
            ..Default::default()
        };
        let update = ClassUpdate {
            uid: -1,
            gid: 30,
            min_filesize: -1,
            max_filesize: -1,
            flags: -1,
            maxdrives: -1,
            max_segsize: -1,
            migr_time_interval: -1,
            mintime_beforemigr: -1,
            nbcopies: 2,
            retenp_on_disk: -1,
            ..Default::default()
        };
        update.apply(&mut class);
        assert_eq!(class.name, "disk");
        assert_eq!(class.uid, 10);
        assert_eq!(class.gid, 30);
        assert_eq!(class.nbcopies, 2);
        assert_eq!(class.maxdrives, 2);
        assert_eq!(class.tppools, vec!["p1".to_string()]);
    }
}
