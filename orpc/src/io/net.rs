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

use crate::io::{IOError, IOResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InetAddr {
    pub hostname: String,
    pub port: u16,
}

impl InetAddr {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Resolve the address, returning every candidate socket address.
    pub async fn resolve(&self) -> IOResult<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((self.hostname.as_str(), self.port))
            .await
            .map_err(|e| {
                IOError::with_kind(
                    ErrorKind::AddrNotAvailable,
                    format!("failed to resolve {}: {}", self, e),
                )
            })?
            .collect();

        if addrs.is_empty() {
            Err(IOError::with_kind(
                ErrorKind::AddrNotAvailable,
                format!("no address for {}", self),
            ))
        } else {
            Ok(addrs)
        }
    }
}

impl Display for InetAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

pub struct NetUtils;

impl NetUtils {
    pub fn local_hostname() -> String {
        let mut buf = [0u8; 256];
        let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
        if rc != 0 {
            return "localhost".to_string();
        }
        let len = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..len]).to_string()
    }

    /// Reserve an ephemeral port on the loopback interface.
    pub fn get_available_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|a| a.port())
            .unwrap_or(0)
    }
}
