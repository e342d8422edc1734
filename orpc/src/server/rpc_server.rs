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

use crate::io::net::InetAddr;
use crate::runtime::Runtime;
use crate::server::{HandlerService, ServerConf, ServerMonitor, ServerStateListener, ShutdownTrigger};
use crate::sync;
use crate::sys::SignalWatch;
use crate::CommonResult;
use futures::future::try_join_all;
use log::*;
use socket2::SockRef;
use std::env;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type ShutdownHook = Box<dyn FnOnce() + Send + Sync + 'static>;

pub struct RpcServer<S> {
    rt: Arc<Runtime>,
    service: Arc<S>,
    conf: ServerConf,
    addr: InetAddr,
    monitor: ServerMonitor,
    shutdown_hook: Mutex<Vec<ShutdownHook>>,
}

impl<S: HandlerService> RpcServer<S> {
    pub const ORPC_BIND_HOSTNAME: &'static str = "ORPC_BIND_HOSTNAME";

    pub fn with_rt(rt: Arc<Runtime>, conf: ServerConf, service: S) -> Self {
        let addr = InetAddr::new(conf.hostname.clone(), conf.port);

        RpcServer {
            rt,
            service: Arc::new(service),
            conf,
            addr,
            monitor: ServerMonitor::new(),
            shutdown_hook: Mutex::new(vec![]),
        }
    }

    pub fn run_server(server: RpcServer<S>) -> ServerStateListener {
        let rt = server.rt.clone();
        let listener = server.monitor.new_listener();

        rt.spawn(async move { server.start0().await });

        listener
    }

    // Blocking start server
    pub fn block_on_start(&self) {
        self.rt.block_on(self.start0())
    }

    pub fn start(self) -> ServerStateListener {
        Self::run_server(self)
    }

    async fn start0(&self) {
        let trigger = self.monitor.trigger();

        tokio::select! {
            res = self.run() => {
                if let Err(err) = res {
                    error!("failed to accept, cause = {:?}", err);
                }
            }

            sig = SignalWatch::wait_quit() => {
                match sig {
                    Ok(kind) => info!("Received {}, shutting down {} gracefully...", kind, self.conf.name),
                    Err(e) => warn!("Signal watch failed: {}, shutting down {}", e, self.conf.name),
                }
            }

            _ = trigger.triggered() => {
                info!("Shutdown requested, shutting down {}", self.conf.name);
            }
        }

        self.monitor.advance_shutdown();

        // Perform a cleanup operation.
        self.do_shutdown_hook();

        self.monitor.advance_stop();

        info!("The server has stopped")
    }

    pub async fn run(&self) -> CommonResult<()> {
        let mut loops = vec![];
        for port in self.conf.ports() {
            let bind_addr = self.get_bind_addr(port);
            let listener = TcpListener::bind(&bind_addr).await?;
            info!(
                "Tcp server [{}] start successfully, bind address: {}, io threads: {}, worker threads: {}",
                self.conf.name,
                bind_addr,
                self.rt.io_threads(),
                self.rt.worker_threads()
            );
            loops.push(self.accept_loop(listener, port));
        }

        self.monitor.advance_running();
        try_join_all(loops).await?;
        Ok(())
    }

    async fn accept_loop(&self, listener: TcpListener, local_port: u16) -> CommonResult<()> {
        loop {
            let (stream, client_addr) = listener.accept().await?;

            // Set the tcp parameter through socket2.
            let sock_ref = SockRef::from(&stream);
            sock_ref.set_keepalive(true)?;
            sock_ref.set_nodelay(true)?;

            let bind_addr = self.bind_addr().clone();
            let task = self.service.serve(stream, client_addr, local_port);
            self.rt.spawn(async move {
                if let Err(e) = task.await {
                    error!("Connection[{} -> {}]: {}", bind_addr, client_addr, e);
                }
            });
        }
    }

    pub fn rt(&self) -> &Runtime {
        &self.rt
    }

    pub fn clone_rt(&self) -> Arc<Runtime> {
        self.rt.clone()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn bind_addr(&self) -> &InetAddr {
        &self.addr
    }

    pub fn new_state_listener(&self) -> ServerStateListener {
        self.monitor.new_listener()
    }

    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.monitor.trigger()
    }

    pub fn add_shutdown_hook<T: FnOnce() + Send + Sync + 'static>(&self, hook: T) {
        sync::lock(&self.shutdown_hook).push(Box::new(hook));
    }

    fn do_shutdown_hook(&self) {
        let hooks: Vec<ShutdownHook> = sync::lock(&self.shutdown_hook).drain(..).rev().collect();
        for func in hooks {
            func()
        }
    }

    fn get_bind_addr(&self, port: u16) -> String {
        let hostname = env::var(Self::ORPC_BIND_HOSTNAME).unwrap_or(self.addr.hostname.to_string());
        format!("{}:{}", hostname, port)
    }
}
