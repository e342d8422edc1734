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

use crate::api::CnsSession;
use cns_common::proto::{NsOpcode, NsReader, NsWriter, CA_MAXGRPNAMELEN, CA_MAXUSRNAMELEN, REPBUFSZ};
use cns_common::{err_ns, NsResult};

/// Mapping between the user and group names of a grid identity and the
/// numeric ids the name server assigns them.
impl CnsSession {
    /// Ids of `username` and of each of `groupnames`, creating the missing
    /// mappings.
    pub async fn getidmap(&mut self, username: &str, groupnames: &[&str]) -> NsResult<(u32, Vec<u32>)> {
        if username.is_empty() || username.len() > CA_MAXUSRNAMELEN {
            return err_ns!(libc::EINVAL, "user name {:?}", username);
        }
        if groupnames.is_empty() {
            return err_ns!(libc::EINVAL, "no group");
        }
        let mut req = self.request(NsOpcode::GetIdMap)?;
        req.put_string(username)?;
        req.put_long(groupnames.len() as i32)?;
        for name in groupnames {
            if name.is_empty() || name.len() > CA_MAXGRPNAMELEN {
                return err_ns!(libc::EINVAL, "group name {:?}", name);
            }
            req.put_string(name)?;
        }
        let reply = self.call(None, req, REPBUFSZ).await?;

        let mut u = reply.reader();
        let uid = u.get_id()?;
        let mut gids = Vec::with_capacity(groupnames.len());
        for _ in groupnames {
            gids.push(u.get_id()?);
        }
        Ok((uid, gids))
    }

    pub async fn enterusrmap(&mut self, uid: u32, name: &str) -> NsResult<()> {
        self.enter_map(NsOpcode::EntUsrMap, uid, name, CA_MAXUSRNAMELEN).await
    }

    pub async fn entergrpmap(&mut self, gid: u32, name: &str) -> NsResult<()> {
        self.enter_map(NsOpcode::EntGrpMap, gid, name, CA_MAXGRPNAMELEN).await
    }

    async fn enter_map(&mut self, opcode: NsOpcode, id: u32, name: &str, max: usize) -> NsResult<()> {
        if name.is_empty() || name.len() > max {
            return err_ns!(libc::EINVAL, "name {:?}", name);
        }
        let mut req = self.request(opcode)?;
        req.put_id(id)?;
        req.put_string(name)?;
        self.call(None, req, 0).await?;
        Ok(())
    }

    pub async fn getusrbyuid(&mut self, uid: u32) -> NsResult<String> {
        self.map_name(NsOpcode::GetUsrNam, uid, CA_MAXUSRNAMELEN).await
    }

    pub async fn getgrpbygid(&mut self, gid: u32) -> NsResult<String> {
        self.map_name(NsOpcode::GetGrpNam, gid, CA_MAXGRPNAMELEN).await
    }

    async fn map_name(&mut self, opcode: NsOpcode, id: u32, max: usize) -> NsResult<String> {
        let mut req = self.request(opcode)?;
        req.put_id(id)?;
        let reply = self.call(None, req, REPBUFSZ).await?;
        let name = reply.reader().get_str(max)?;
        Ok(name)
    }

    pub async fn getusrbynam(&mut self, name: &str) -> NsResult<u32> {
        self.map_id(NsOpcode::GetUsrId, name, CA_MAXUSRNAMELEN).await
    }

    pub async fn getgrpbynam(&mut self, name: &str) -> NsResult<u32> {
        self.map_id(NsOpcode::GetGrpId, name, CA_MAXGRPNAMELEN).await
    }

    async fn map_id(&mut self, opcode: NsOpcode, name: &str, max: usize) -> NsResult<u32> {
        if name.is_empty() || name.len() > max {
            return err_ns!(libc::EINVAL, "name {:?}", name);
        }
        let mut req = self.request(opcode)?;
        req.put_string(name)?;
        let reply = self.call(None, req, REPBUFSZ).await?;
        let id = reply.reader().get_id()?;
        Ok(id)
    }
}
