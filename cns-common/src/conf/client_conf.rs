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

use crate::error::NsError;
use crate::proto::{ProtocolVersion, CNS_DEFAULT_HOST, CNS_PORT, CNS_SPORT, LISTBUFSZ};
use crate::NsResult;
use log::warn;
use orpc::client::ConnectConf;
use orpc::common::DurationUnit;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Client library settings. Values come from the config file and are then
/// overridden by the `CNS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConf {
    pub host: String,
    pub port: u16,
    pub secure_port: u16,

    // Use the plain port without establishing a security context.
    pub csec_disable: bool,

    // Home directory used to resolve relative paths without a cwd.
    pub home: String,

    #[serde(skip)]
    pub conn_timeout: Duration,
    #[serde(alias = "conn_timeout")]
    pub conn_timeout_str: String,

    pub conn_retries: u32,

    #[serde(skip)]
    pub conn_retry_interval: Duration,
    #[serde(alias = "conn_retry_interval")]
    pub conn_retry_interval_str: String,

    // Request magic sent to the server, lower it to talk to older servers.
    pub protocol_magic: u32,

    // Client side buffer of a listing, refilled from the server when drained.
    pub list_buf_size: usize,
}

impl ClientConf {
    pub const CNS_HOST: &'static str = "CNS_HOST";
    pub const CNS_PORT: &'static str = "CNS_PORT";
    pub const CNS_SPORT: &'static str = "CNS_SPORT";
    pub const CNS_HOME: &'static str = "CNS_HOME";
    pub const CNS_CONNTIMEOUT: &'static str = "CNS_CONNTIMEOUT";
    pub const CNS_CONRETRY: &'static str = "CNS_CONRETRY";
    pub const CNS_CONRETRYINT: &'static str = "CNS_CONRETRYINT";
    pub const CSEC_DISABLE: &'static str = "CSEC_DISABLE";

    pub fn init(&mut self) -> NsResult<()> {
        self.apply_env();
        self.conn_timeout = DurationUnit::from_str(&self.conn_timeout_str)?.as_duration();
        self.conn_retry_interval =
            DurationUnit::from_str(&self.conn_retry_interval_str)?.as_duration();
        ProtocolVersion::from_magic(self.protocol_magic)?;
        if self.host.is_empty() {
            return Err(NsError::new(crate::error::serrno::ENHOSTNOTSET));
        }
        Ok(())
    }

    fn env_parse<T: FromStr>(name: &str) -> Option<T> {
        let value = env::var(name).ok()?;
        match value.trim().parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid value of {}: {}", name, value);
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var(Self::CNS_HOST) {
            if !host.is_empty() {
                self.host = host;
            }
        }
        if let Some(port) = Self::env_parse(Self::CNS_PORT) {
            self.port = port;
        }
        if let Some(port) = Self::env_parse(Self::CNS_SPORT) {
            self.secure_port = port;
        }
        if let Ok(home) = env::var(Self::CNS_HOME) {
            self.home = home;
        }
        if let Some(secs) = Self::env_parse::<u64>(Self::CNS_CONNTIMEOUT) {
            self.conn_timeout_str = format!("{}s", secs);
        }
        if let Some(n) = Self::env_parse(Self::CNS_CONRETRY) {
            self.conn_retries = n;
        }
        if let Some(secs) = Self::env_parse::<u64>(Self::CNS_CONRETRYINT) {
            self.conn_retry_interval_str = format!("{}s", secs);
        }
        if env::var(Self::CSEC_DISABLE).is_ok() {
            self.csec_disable = true;
        }
    }

    /// Port to contact: the secure one unless security is disabled.
    pub fn effective_port(&self) -> u16 {
        if self.csec_disable {
            self.port
        } else {
            self.secure_port
        }
    }

    pub fn protocol(&self) -> ProtocolVersion {
        ProtocolVersion::from_magic(self.protocol_magic).unwrap_or(ProtocolVersion::LATEST)
    }

    pub fn connect_conf(&self) -> ConnectConf {
        ConnectConf {
            conn_timeout: self.conn_timeout,
            conn_retries: self.conn_retries,
            conn_retry_interval: self.conn_retry_interval,
        }
    }
}

impl Default for ClientConf {
    fn default() -> Self {
        Self {
            host: CNS_DEFAULT_HOST.to_string(),
            port: CNS_PORT,
            secure_port: CNS_SPORT,
            csec_disable: false,
            home: String::new(),

            conn_timeout: Duration::from_secs(5),
            conn_timeout_str: "5s".to_string(),

            conn_retries: 3,

            conn_retry_interval: Duration::from_secs(1),
            conn_retry_interval_str: "1s".to_string(),

            protocol_magic: ProtocolVersion::CNS_MAGIC4,

            list_buf_size: LISTBUFSZ,
        }
    }
}
