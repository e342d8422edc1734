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
use cns_common::proto::{NsOpcode, CA_MAXACLENTRIES};
use cns_common::state::AclEntry;
use cns_common::{err_ns, NsResult};

impl CnsSession {
    /// Access control list of `path`. With `max_entries` 0 only the number
    /// of entries is asked for and the list comes back empty.
    pub async fn getacl(&mut self, path: &str, max_entries: usize) -> NsResult<(usize, Vec<AclEntry>)> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::GetAcl)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_word(max_entries.min(CA_MAXACLENTRIES) as u16)?;
        let reply = self.call_path(server, req).await?;

        let mut u = reply.reader();
        let count = u.get_word()? as usize;
        let mut entries = vec![];
        if max_entries != 0 {
            for _ in 0..count {
                entries.push(AclEntry::decode(&mut u)?);
            }
        }
        Ok((count, entries))
    }

    pub async fn setacl(&mut self, path: &str, entries: &[AclEntry]) -> NsResult<()> {
        if entries.is_empty() || entries.len() > CA_MAXACLENTRIES {
            return err_ns!(libc::EINVAL, "{} acl entries", entries.len());
        }
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::SetAcl)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_word(entries.len() as u16)?;
        for e in entries {
            e.encode(&mut req)?;
        }
        self.call_path(server, req).await?;
        Ok(())
    }
}
