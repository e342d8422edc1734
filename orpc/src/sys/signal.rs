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

use crate::err_box;
use crate::io::IOResult;
use futures::future::{select_all, BoxFuture};
use futures::FutureExt;

/// Signals that stop a daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SignalKind {
    /// SIGHUP (1)
    Hangup = 1,

    /// SIGINT (2), ctrl-c
    Interrupt = 2,

    /// SIGTERM (15), plain `kill`
    Terminate = 15,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hangup => write!(f, "SIGHUP"),
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

pub struct SignalWatch;

impl SignalWatch {
    fn signal_future(kind: SignalKind) -> IOResult<BoxFuture<'static, Option<()>>> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind as TokioSignalKind};

            let tokio_kind = match kind {
                SignalKind::Hangup => TokioSignalKind::hangup(),
                SignalKind::Interrupt => TokioSignalKind::interrupt(),
                SignalKind::Terminate => TokioSignalKind::terminate(),
            };
            let mut sig = signal(tokio_kind)?;
            Ok(async move { sig.recv().await }.boxed())
        }

        #[cfg(not(unix))]
        {
            match kind {
                SignalKind::Interrupt => {
                    Ok(async move { tokio::signal::ctrl_c().await.ok() }.boxed())
                }
                _ => err_box!("signal {} not supported on this platform", kind),
            }
        }
    }

    /// Wait for the first of SIGTERM, SIGINT or SIGHUP.
    pub async fn wait_quit() -> IOResult<SignalKind> {
        #[cfg(unix)]
        let kinds = [
            SignalKind::Terminate,
            SignalKind::Interrupt,
            SignalKind::Hangup,
        ];
        #[cfg(not(unix))]
        let kinds = [SignalKind::Interrupt];

        let mut futures = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let fut = Self::signal_future(kind)?;
            futures.push(fut.map(move |opt| (kind, opt)).boxed());
        }

        let ((kind, opt), _, _) = select_all(futures).await;
        match opt {
            Some(_) => Ok(kind),
            None => err_box!("signal stream closed"),
        }
    }
}
