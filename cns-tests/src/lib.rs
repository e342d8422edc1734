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

//! A name server started in process on ephemeral ports, for tests that
//! drive the client library against a real listener.

use cns_client::CnsSession;
use cns_common::conf::{ClientConf, NsConf};
use cns_common::NsResult;
use cns_server::server::NsServer;
use orpc::io::net::NetUtils;
use orpc::runtime::Runtime;
use std::future::Future;
use std::sync::Arc;

pub const ADMIN: (u32, u32) = (0, 0);
pub const USER: (u32, u32) = (501, 100);
pub const OTHER: (u32, u32) = (502, 200);

pub struct NsTestServer {
    conf: NsConf,
    rt: Arc<Runtime>,
}

impl NsTestServer {
    /// A server without security: clients use the plain port.
    pub fn start() -> NsResult<Self> {
        Self::with_conf(|conf| {
            conf.security.enable = false;
            conf.client.csec_disable = true;
        })
    }

    /// A server requiring a security context on its secure port.
    pub fn start_secure() -> NsResult<Self> {
        Self::with_conf(|conf| {
            conf.security.enable = true;
            conf.client.csec_disable = false;
        })
    }

    pub fn with_conf(f: impl FnOnce(&mut NsConf)) -> NsResult<Self> {
        let mut conf = NsConf::default();
        conf.server.hostname = "127.0.0.1".to_string();
        conf.server.port = NetUtils::get_available_port();
        conf.server.secure_port = NetUtils::get_available_port();
        conf.server.io_threads = 2;
        conf.server.worker_threads = 4;
        conf.client.host = "127.0.0.1".to_string();
        conf.client.port = conf.server.port;
        conf.client.secure_port = conf.server.secure_port;
        conf.client.conn_retries = 0;
        f(&mut conf);
        conf.init()?;

        let server = NsServer::new(conf.clone())?;
        let rt = server.clone_rt();
        let mut listener = server.start();
        rt.block_on(listener.wait_running())?;
        Ok(Self { conf, rt })
    }

    pub fn client_conf(&self) -> ClientConf {
        self.conf.client.clone()
    }

    pub fn session(&self, who: (u32, u32)) -> CnsSession {
        CnsSession::with_identity(self.client_conf(), who.0, who.1)
    }

    pub fn block_on<F: Future>(&self, f: F) -> F::Output {
        self.rt.block_on(f)
    }
}
