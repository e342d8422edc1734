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
use cns_common::proto::NsOpcode;
use cns_common::NsResult;
use log::debug;

/// Transactions and sessions keep one connection open across calls; the
/// server rolls back or ends them when that connection drops.
impl CnsSession {
    pub async fn starttrans(&mut self, server: Option<&str>, comment: Option<&str>) -> NsResult<()> {
        let req = self.request(NsOpcode::StartTrans)?;
        self.call(server, req, 0).await?;
        if let Some(c) = comment {
            debug!("Transaction started: {}", c);
        }
        Ok(())
    }

    pub async fn endtrans(&mut self) -> NsResult<()> {
        self.end(NsOpcode::EndTrans).await
    }

    pub async fn aborttrans(&mut self) -> NsResult<()> {
        self.end(NsOpcode::AbortTrans).await
    }

    pub async fn startsess(&mut self, server: Option<&str>, comment: Option<&str>) -> NsResult<()> {
        let req = self.request(NsOpcode::StartSess)?;
        self.call(server, req, 0).await?;
        if let Some(c) = comment {
            debug!("Session started: {}", c);
        }
        Ok(())
    }

    pub async fn endsess(&mut self) -> NsResult<()> {
        self.end(NsOpcode::EndSess).await
    }

    // Without a connection there is nothing left open on the server.
    async fn end(&mut self, opcode: NsOpcode) -> NsResult<()> {
        if !self.is_connected() {
            debug!("{} without an open connection", opcode.name());
            return Ok(());
        }
        let req = self.request(opcode)?;
        let res = self.call(None, req, 0).await;
        self.disconnect();
        res.map(|_| ())
    }

    /// Stop the name server. Without `force` it waits for the requests in
    /// progress.
    pub async fn shutdown(&mut self, server: Option<&str>, force: bool) -> NsResult<()> {
        let mut req = self.request(NsOpcode::Shutdown)?;
        req.put_word(force as u16)?;
        self.call(server, req, 0).await?;
        Ok(())
    }
}
