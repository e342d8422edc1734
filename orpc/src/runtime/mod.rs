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

use crate::io::IOResult;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;

/// Multi-threaded tokio runtime with named threads.
pub struct Runtime {
    inner: tokio::runtime::Runtime,
    name: String,
    io_threads: usize,
    worker_threads: usize,
}

pub type AsyncRuntime = Runtime;

impl Runtime {
    pub fn new(name: impl Into<String>, io_threads: usize, worker_threads: usize) -> IOResult<Self> {
        let name = name.into();
        let io_threads = io_threads.max(1);
        let thread_name = name.clone();
        let counter = AtomicUsize::new(0);

        let inner = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(io_threads)
            .max_blocking_threads(worker_threads.max(1))
            .thread_name_fn(move || {
                let id = counter.fetch_add(1, Ordering::SeqCst);
                format!("{}-{}", thread_name, id)
            })
            .enable_all()
            .build()?;

        Ok(Self {
            inner,
            name,
            io_threads,
            worker_threads,
        })
    }

    /// A small runtime for tests and command line tools.
    pub fn single() -> IOResult<Self> {
        Self::new("single", 2, 2)
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.spawn(task)
    }

    pub fn block_on<F: Future>(&self, f: F) -> F::Output {
        self.inner.block_on(f)
    }

    pub fn handle(&self) -> &tokio::runtime::Handle {
        self.inner.handle()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn io_threads(&self) -> usize {
        self.io_threads
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }
}
