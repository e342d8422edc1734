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

use crate::{err_box, CommonResult};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    Init,
    Running,
    Shutdown,
    Stop,
}

/// Publishes the server lifecycle and carries the remote shutdown trigger.
pub struct ServerMonitor {
    tx: watch::Sender<ServerState>,
    trigger: ShutdownTrigger,
}

impl ServerMonitor {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ServerState::Init);
        Self {
            tx,
            trigger: ShutdownTrigger(Arc::new(Notify::new())),
        }
    }

    pub fn new_listener(&self) -> ServerStateListener {
        ServerStateListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    pub fn state(&self) -> ServerState {
        *self.tx.borrow()
    }

    fn advance(&self, state: ServerState) {
        self.tx.send_if_modified(|cur| {
            if *cur < state {
                *cur = state;
                true
            } else {
                false
            }
        });
    }

    pub fn advance_running(&self) {
        self.advance(ServerState::Running)
    }

    pub fn advance_shutdown(&self) {
        self.advance(ServerState::Shutdown)
    }

    pub fn advance_stop(&self) {
        self.advance(ServerState::Stop)
    }
}

impl Default for ServerMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lets a request handler ask the accept loop to stop.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger(Arc<Notify>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.0.notify_one()
    }

    pub async fn triggered(&self) {
        self.0.notified().await
    }
}

pub struct ServerStateListener {
    rx: watch::Receiver<ServerState>,
}

impl ServerStateListener {
    async fn wait(&mut self, state: ServerState) -> CommonResult<()> {
        match self.rx.wait_for(|s| *s >= state).await {
            Ok(_) => Ok(()),
            Err(_) => err_box!("server monitor dropped before reaching {:?}", state),
        }
    }

    pub async fn wait_running(&mut self) -> CommonResult<()> {
        self.wait(ServerState::Running).await
    }

    pub async fn wait_shutdown(&mut self) -> CommonResult<()> {
        self.wait(ServerState::Shutdown).await
    }

    pub async fn wait_stop(&mut self) -> CommonResult<()> {
        self.wait(ServerState::Stop).await
    }
}
