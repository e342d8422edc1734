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
use cns_common::proto::{NsReader, NsWriter, CA_MAXGRPNAMELEN, CA_MAXUSRNAMELEN};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

impl NsHandler {
    /// Ids for a user and its groups, allocating the names seen for the
    /// first time.
    pub(crate) fn getidmap(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let username = u.get_str(CA_MAXUSRNAMELEN)?;
        let nbgroups = u.get_long()?;
        if nbgroups < 0 {
            return err_ns!(libc::EINVAL, "{} groups", nbgroups);
        }
        let mut groupnames = Vec::with_capacity(nbgroups as usize);
        for _ in 0..nbgroups {
            groupnames.push(u.get_str(CA_MAXGRPNAMELEN)?);
        }
        ReqLog::log("getidmap", &format!("getidmap {} {}", username, groupnames.join(",")));

        let ctx = self.ctx.clone();
        let tx = self.db.start_tr();
        let uid = ctx.ids().user_id(ctx.store(), tx, &username)?;
        let mut gids = Vec::with_capacity(groupnames.len());
        for name in &groupnames {
            gids.push(ctx.ids().group_id(ctx.store(), tx, name)?);
        }
        self.sink.data(|m| {
            m.put_id(uid)?;
            for gid in &gids {
                m.put_id(*gid)?;
            }
            Ok(())
        })
    }

    pub(crate) fn enterusrmap(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let uid = u.get_id()?;
        let name = u.get_str(CA_MAXUSRNAMELEN)?;
        ReqLog::log("enterusrmap", &format!("enterusrmap {} {}", uid, name));

        self.ctx.perm().require_admin(cred)?;
        if name.is_empty() {
            return err_ns!(libc::EINVAL, "empty user name");
        }
        let store = self.ctx.store().clone();
        store.insert_user(self.db.start_tr(), uid, &name)
    }

    pub(crate) fn entergrpmap(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let gid = u.get_id()?;
        let name = u.get_str(CA_MAXGRPNAMELEN)?;
        ReqLog::log("entergrpmap", &format!("entergrpmap {} {}", gid, name));

        self.ctx.perm().require_admin(cred)?;
        if name.is_empty() {
            return err_ns!(libc::EINVAL, "empty group name");
        }
        let store = self.ctx.store().clone();
        store.insert_group(self.db.start_tr(), gid, &name)
    }

    pub(crate) fn getusrbyuid(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let uid = u.get_id()?;
        ReqLog::log("getusrbyuid", &format!("getusrbyuid {}", uid));
        match self.ctx.store().user_name(uid) {
            Some(name) => self.sink.data(|m| Ok(m.put_string(&name)?)),
            None => err_ns!(libc::ENOENT, "uid {}", uid),
        }
    }

    pub(crate) fn getusrbynam(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let name = u.get_str(CA_MAXUSRNAMELEN)?;
        ReqLog::log("getusrbynam", &format!("getusrbynam {}", name));
        match self.ctx.store().user_id(&name) {
            Some(uid) => self.sink.data(|m| m.put_id(uid)),
            None => err_ns!(libc::ENOENT, "user {}", name),
        }
    }

    pub(crate) fn getgrpbygid(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let gid = u.get_id()?;
        ReqLog::log("getgrpbygid", &format!("getgrpbygid {}", gid));
        match self.ctx.store().group_name(gid) {
            Some(name) => self.sink.data(|m| Ok(m.put_string(&name)?)),
            None => err_ns!(libc::ENOENT, "gid {}", gid),
        }
    }

    pub(crate) fn getgrpbynam(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let name = u.get_str(CA_MAXGRPNAMELEN)?;
        ReqLog::log("getgrpbynam", &format!("getgrpbynam {}", name));
        match self.ctx.store().group_id(&name) {
            Some(gid) => self.sink.data(|m| m.put_id(gid)),
            None => err_ns!(libc::ENOENT, "group {}", name),
        }
    }
}
