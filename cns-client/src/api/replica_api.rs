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
use cns_common::proto::{NsOpcode, CA_MAXGUIDLEN, CA_MAXSFNLEN};
use cns_common::state::FileReplica;
use cns_common::{err_ns, NsResult};

fn check_replica_ids(guid: &str, sfn: &str) -> NsResult<()> {
    if guid.len() > CA_MAXGUIDLEN {
        return err_ns!(libc::EINVAL, "guid {}", guid);
    }
    if sfn.is_empty() {
        return err_ns!(libc::EFAULT, "empty sfn");
    }
    if sfn.len() > CA_MAXSFNLEN {
        return err_ns!(libc::ENAMETOOLONG, "sfn of {} bytes", sfn.len());
    }
    Ok(())
}

impl CnsSession {
    /// Register a disk copy of the file named by `fileid`, or by `guid`
    /// when `fileid` is 0. Only `host`, `sfn`, `status`, `f_type`,
    /// `poolname` and `fs` of `replica` are sent.
    pub async fn addreplica(&mut self, guid: &str, fileid: u64, replica: &FileReplica) -> NsResult<()> {
        check_replica_ids(guid, &replica.sfn)?;
        let mut req = self.request(NsOpcode::AddReplica)?;
        req.put_hyper(fileid)?;
        req.put_string(guid)?;
        req.put_string(&replica.host)?;
        req.put_string(&replica.sfn)?;
        req.put_byte(replica.status)?;
        req.put_byte(replica.f_type)?;
        req.put_string(&replica.poolname)?;
        req.put_string(&replica.fs)?;
        self.call(None, req, 0).await?;
        Ok(())
    }

    pub async fn delreplica(&mut self, guid: &str, fileid: u64, sfn: &str) -> NsResult<()> {
        check_replica_ids(guid, sfn)?;
        let mut req = self.request(NsOpcode::DelReplica)?;
        req.put_hyper(fileid)?;
        req.put_string(guid)?;
        req.put_string(sfn)?;
        self.call(None, req, 0).await?;
        Ok(())
    }
}
