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
use cns_common::proto::{NsOpcode, CA_MAXCLASNAMELEN, CA_MAXPOOLNAMELEN, REPBUFSZ};
use cns_common::state::ClassMetadata;
use cns_common::{err_ns, NsResult};

fn check_class_name(name: &str) -> NsResult<()> {
    if name.len() > CA_MAXCLASNAMELEN {
        return err_ns!(libc::EINVAL, "class name {}", name);
    }
    Ok(())
}

impl CnsSession {
    pub async fn enterclass(&mut self, server: Option<&str>, class: &ClassMetadata) -> NsResult<()> {
        check_class_name(&class.name)?;
        if class.tppools.iter().any(|p| p.len() > CA_MAXPOOLNAMELEN) {
            return err_ns!(libc::EINVAL, "tape pool name of class {}", class.name);
        }
        ClassMetadata::pool_count(class.tppools.len() as i32)?;
        let mut req = self.request(NsOpcode::EnterClass)?;
        class.encode(&mut req)?;
        self.call(server, req, 0).await?;
        Ok(())
    }

    /// Update the class named by `classid` and/or `name` with the fields of
    /// `update` that differ from [`ClassMetadata::unchanged`].
    pub async fn modifyclass(
        &mut self,
        server: Option<&str>,
        classid: i32,
        name: &str,
        update: &ClassMetadata,
    ) -> NsResult<()> {
        check_class_name(name)?;
        check_class_name(&update.name)?;
        ClassMetadata::pool_count(update.tppools.len() as i32)?;
        let mut req = self.request(NsOpcode::ModifyClass)?;
        req.put_long(classid)?;
        req.put_string(name)?;
        req.put_string(&update.name)?;
        for v in [
            update.uid,
            update.gid,
            update.min_filesize,
            update.max_filesize,
            update.flags,
            update.maxdrives,
            update.max_segsize,
            update.migr_time_interval,
            update.mintime_beforemigr,
            update.nbcopies,
            update.retenp_on_disk,
        ] {
            req.put_long(v)?;
        }
        req.put_long(update.tppools.len() as i32)?;
        for pool in &update.tppools {
            req.put_string(pool)?;
        }
        self.call(server, req, 0).await?;
        Ok(())
    }

    pub async fn deleteclass(&mut self, server: Option<&str>, classid: i32, name: &str) -> NsResult<()> {
        check_class_name(name)?;
        let mut req = self.request(NsOpcode::DeleteClass)?;
        req.put_long(classid)?;
        req.put_string(name)?;
        self.call(server, req, 0).await?;
        Ok(())
    }

    pub async fn queryclass(&mut self, server: Option<&str>, classid: i32, name: &str) -> NsResult<ClassMetadata> {
        check_class_name(name)?;
        let mut req = self.request(NsOpcode::QueryClass)?;
        req.put_long(classid)?;
        req.put_string(name)?;
        let reply = self.call(server, req, REPBUFSZ).await?;
        let class = ClassMetadata::decode(&mut reply.reader())?;
        Ok(class)
    }

    /// Tag directory `path` with a class.
    pub async fn chclass(&mut self, path: &str, classid: i32, name: &str) -> NsResult<()> {
        check_class_name(name)?;
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::ChClass)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(classid)?;
        req.put_string(name)?;
        self.call_path(server, req).await?;
        Ok(())
    }
}
