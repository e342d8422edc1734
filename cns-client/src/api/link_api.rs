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
use cns_common::proto::{NsOpcode, NsReader, CA_MAXGUIDLEN};
use cns_common::{err_ns, NsResult};

impl CnsSession {
    pub async fn symlink(&mut self, target: &str, linkname: &str) -> NsResult<()> {
        Self::check_path(target)?;
        let (server, linkname) = self.target(linkname)?;
        let mut req = self.request(NsOpcode::Symlink)?;
        req.put_hyper(self.cwd)?;
        req.put_string(target)?;
        req.put_string(&linkname)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn readlink(&mut self, path: &str) -> NsResult<String> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Readlink)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        let reply = self.call_path(server, req).await?;
        let target = reply.reader().get_path()?;
        Ok(target)
    }

    /// Path of the file named by `path` or `guid`, then the paths of every
    /// link pointing at it.
    pub async fn getlinks(&mut self, path: Option<&str>, guid: &str) -> NsResult<Vec<String>> {
        if path.map_or(true, |p| p.is_empty()) && guid.is_empty() {
            return err_ns!(libc::EFAULT, "neither path nor guid");
        }
        if guid.len() > CA_MAXGUIDLEN {
            return err_ns!(libc::EINVAL, "guid {}", guid);
        }
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(NsOpcode::GetLinks)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_string(guid)?;
        let reply = self.call_path(server, req).await?;
        Ok(reply.links)
    }
}
