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

mod rpc_server;
mod server_monitor;

pub use self::rpc_server::RpcServer;
pub use self::server_monitor::{ServerMonitor, ServerState, ServerStateListener, ShutdownTrigger};

use crate::common::Utils;
use crate::io::IOResult;
use crate::runtime::Runtime;
use crate::CommonResult;
use futures::future::BoxFuture;
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Creates the per-connection task for every accepted stream.
pub trait HandlerService: Send + Sync + 'static {
    /// `local_port` is the listening port the connection arrived on.
    fn serve(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        local_port: u16,
    ) -> BoxFuture<'static, CommonResult<()>>;
}

#[derive(Debug, Clone)]
pub struct ServerConf {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    // Additional ports served by the same handler.
    pub extra_ports: Vec<u16>,
    pub io_threads: usize,
    pub worker_threads: usize,
}

impl ServerConf {
    pub fn with_hostname(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            ..Default::default()
        }
    }

    pub fn create_runtime(&self) -> IOResult<Runtime> {
        Runtime::new(&self.name, self.io_threads, self.worker_threads)
    }

    pub fn ports(&self) -> Vec<u16> {
        let mut ports = vec![self.port];
        ports.extend(self.extra_ports.iter().copied().filter(|p| *p != self.port));
        ports
    }
}

impl Default for ServerConf {
    fn default() -> Self {
        Self {
            name: "orpc".to_string(),
            hostname: "0.0.0.0".to_string(),
            port: 0,
            extra_ports: vec![],
            io_threads: Utils::cpu_nums().min(8),
            worker_threads: 32,
        }
    }
}
