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

use crate::proto::{CNS_PORT, CNS_SPORT, REQBUFSZ};
use crate::NsResult;
use orpc::common::{DurationUnit, Utils};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name server daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConf {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    // Port on which clients must establish a security context first.
    pub secure_port: u16,
    pub io_threads: usize,
    pub worker_threads: usize,

    // Largest request accepted, header included.
    pub max_request_size: usize,

    // Wait for the next request of a single request connection.
    #[serde(skip)]
    pub req_timeout: Duration,
    #[serde(alias = "req_timeout")]
    pub req_timeout_str: String,

    // Wait for the next request of an open listing.
    #[serde(skip)]
    pub dir_timeout: Duration,
    #[serde(alias = "dir_timeout")]
    pub dir_timeout_str: String,

    // Wait for the next request of an explicit transaction or session.
    #[serde(skip)]
    pub trans_timeout: Duration,
    #[serde(alias = "trans_timeout")]
    pub trans_timeout_str: String,
}

impl ServerConf {
    pub fn init(&mut self) -> NsResult<()> {
        self.req_timeout = DurationUnit::from_str(&self.req_timeout_str)?.as_duration();
        self.dir_timeout = DurationUnit::from_str(&self.dir_timeout_str)?.as_duration();
        self.trans_timeout = DurationUnit::from_str(&self.trans_timeout_str)?.as_duration();
        Ok(())
    }

    pub fn to_rpc_conf(&self) -> orpc::server::ServerConf {
        orpc::server::ServerConf {
            name: self.name.clone(),
            hostname: self.hostname.clone(),
            port: self.port,
            extra_ports: vec![self.secure_port],
            io_threads: self.io_threads,
            worker_threads: self.worker_threads,
        }
    }
}

impl Default for ServerConf {
    fn default() -> Self {
        Self {
            name: "cnsd".to_string(),
            hostname: "0.0.0.0".to_string(),
            port: CNS_PORT,
            secure_port: CNS_SPORT,
            io_threads: Utils::cpu_nums().min(8),
            worker_threads: 32,

            max_request_size: REQBUFSZ,

            req_timeout: Duration::from_secs(5),
            req_timeout_str: "5s".to_string(),

            dir_timeout: Duration::from_secs(300),
            dir_timeout_str: "300s".to_string(),

            trans_timeout: Duration::from_secs(60),
            trans_timeout_str: "60s".to_string(),
        }
    }
}
