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

use crate::ns::NsContext;
use crate::server::{Connection, SecurityGate};
use cns_common::conf::NsConf;
use cns_common::NsResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{error, info};
use orpc::runtime::Runtime;
use orpc::server::{HandlerService, RpcServer, ServerStateListener};
use orpc::CommonResult;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Hands every accepted connection to its own [`Connection`].
pub struct NsService {
    ctx: Arc<NsContext>,
    gate: Arc<SecurityGate>,
}

impl NsService {
    pub fn new(ctx: Arc<NsContext>) -> Self {
        let gate = Arc::new(SecurityGate::new(ctx.conf()));
        Self { ctx, gate }
    }

    pub fn ctx(&self) -> &Arc<NsContext> {
        &self.ctx
    }
}

impl HandlerService for NsService {
    fn serve(&self, stream: TcpStream, peer: SocketAddr, local_port: u16) -> BoxFuture<'static, CommonResult<()>> {
        let gate = if self.gate.required(local_port) {
            Some(self.gate.clone())
        } else {
            None
        };
        let conn = Connection::new(self.ctx.clone(), stream, peer, gate);
        async move {
            if let Err(e) = conn.run().await {
                error!("Connection from {} failed: {}", peer, e);
            }
            Ok(())
        }
        .boxed()
    }
}

/// The name server daemon: the listeners on the plain and secure ports
/// plus the shared namespace state.
pub struct NsServer {
    rpc: RpcServer<NsService>,
}

impl NsServer {
    pub fn with_rt(rt: Arc<Runtime>, conf: NsConf) -> NsResult<Self> {
        let ctx = Arc::new(NsContext::new(conf)?);
        let rpc_conf = ctx.conf().server.to_rpc_conf();
        let rpc = RpcServer::with_rt(rt, rpc_conf, NsService::new(ctx.clone()));
        ctx.set_shutdown_trigger(rpc.shutdown_trigger());

        if ctx.conf().store.snapshot {
            let hook_ctx = ctx.clone();
            rpc.add_shutdown_hook(move || match hook_ctx.store().save_snapshot() {
                Ok(()) => info!("Namespace snapshot saved"),
                Err(e) => error!("Failed to save namespace snapshot: {}", e),
            });
        }

        Ok(Self { rpc })
    }

    pub fn new(conf: NsConf) -> NsResult<Self> {
        let rt = Arc::new(conf.server.to_rpc_conf().create_runtime()?);
        Self::with_rt(rt, conf)
    }

    pub fn ctx(&self) -> &Arc<NsContext> {
        self.rpc.service().ctx()
    }

    pub fn clone_rt(&self) -> Arc<Runtime> {
        self.rpc.clone_rt()
    }

    /// Start accepting in the background.
    pub fn start(self) -> ServerStateListener {
        self.rpc.start()
    }

    /// Serve until a signal or an administrative shutdown stops the server.
    pub fn block_on_start(&self) {
        self.rpc.block_on_start()
    }
}
