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

use crate::error::ErrorExt;
use crate::io::net::InetAddr;
use crate::io::retry::CountedRetryBuilder;
use crate::io::{IOError, IOResult};
use log::warn;
use socket2::SockRef;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct ConnectConf {
    // Per attempt.
    pub conn_timeout: Duration,
    pub conn_retries: u32,
    pub conn_retry_interval: Duration,
}

impl Default for ConnectConf {
    fn default() -> Self {
        Self {
            conn_timeout: Duration::from_secs(5),
            conn_retries: 3,
            conn_retry_interval: Duration::from_secs(1),
        }
    }
}

/// Opens tcp connections; only "connection refused" is retried, every other
/// failure is returned at once with its io kind preserved.
pub struct TcpConnector {
    conf: ConnectConf,
    retry_builder: CountedRetryBuilder,
}

impl TcpConnector {
    pub fn new(conf: ConnectConf) -> Self {
        let retry_builder = CountedRetryBuilder::new(conf.conn_retries, conf.conn_retry_interval);
        Self {
            conf,
            retry_builder,
        }
    }

    pub fn conf(&self) -> &ConnectConf {
        &self.conf
    }

    async fn connect0(&self, addr: &InetAddr) -> IOResult<TcpStream> {
        let candidates = addr.resolve().await?;
        let mut last_error = None;

        for sock_addr in candidates {
            let res = tokio::time::timeout(self.conf.conn_timeout, TcpStream::connect(sock_addr)).await;
            match res {
                Ok(Ok(stream)) => {
                    let sock_ref = SockRef::from(&stream);
                    sock_ref.set_keepalive(true)?;
                    sock_ref.set_nodelay(true)?;
                    return Ok(stream);
                }
                Ok(Err(e)) => last_error = Some(IOError::create(e)),
                Err(_) => {
                    last_error = Some(IOError::with_kind(
                        ErrorKind::TimedOut,
                        format!("connect to {} timed out after {:?}", addr, self.conf.conn_timeout),
                    ))
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            IOError::with_kind(ErrorKind::AddrNotAvailable, format!("no address for {}", addr))
        }))
    }

    pub async fn connect(&self, addr: &InetAddr) -> IOResult<TcpStream> {
        let mut policy = self.retry_builder.build();
        let mut last_error = None;

        while policy.attempt().await {
            match self.connect0(addr).await {
                Ok(stream) => return Ok(stream),

                Err(e) if e.is_refused() => {
                    warn!(
                        "Connect to {} refused, attempt {}/{}",
                        addr,
                        policy.attempts(),
                        policy.max_attempts()
                    );
                    last_error = Some(e);
                }

                Err(e) => return Err(e.ctx(format!("connect to {}", addr))),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(IOError::with_kind(
                ErrorKind::ConnectionRefused,
                format!("connect to {} refused", addr),
            )),
        }
    }
}
