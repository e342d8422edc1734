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

use crate::conf::{ClientConf, ServerConf};
use crate::NsResult;
use orpc::common::{DurationUnit, LogConf};
use orpc::err_box;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs};

/// Metadata store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConf {
    // Directory of the snapshot file, empty keeps everything in memory.
    pub meta_dir: String,

    // Save a snapshot when the daemon stops and load it at start.
    pub snapshot: bool,

    // How long a request waits for a row locked by another transaction.
    #[serde(skip)]
    pub lock_timeout: Duration,
    #[serde(alias = "lock_timeout")]
    pub lock_timeout_str: String,
}

impl Default for StoreConf {
    fn default() -> Self {
        Self {
            meta_dir: String::new(),
            snapshot: false,
            lock_timeout: Duration::from_secs(10),
            lock_timeout_str: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConf {
    // Listen on the secure port and require a security context there.
    pub enable: bool,

    // Hosts whose security context is accepted. Empty trusts every host.
    pub trusted_hosts: Vec<String>,
}

impl SecurityConf {
    pub fn is_trusted(&self, host: &str) -> bool {
        self.trusted_hosts.is_empty() || self.trusted_hosts.iter().any(|h| h == host)
    }
}

impl Default for SecurityConf {
    fn default() -> Self {
        Self {
            enable: true,
            trusted_hosts: vec![],
        }
    }
}

/// Administrative capabilities. Uid 0 is an administrator unless removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConf {
    pub admins: Vec<u32>,
    pub group_admins: Vec<u32>,
}

impl Default for PrivilegeConf {
    fn default() -> Self {
        Self {
            admins: vec![0],
            group_admins: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NsConf {
    pub server: ServerConf,
    pub client: ClientConf,
    pub store: StoreConf,
    pub security: SecurityConf,
    pub privilege: PrivilegeConf,
    pub log: LogConf,
}

impl NsConf {
    pub const ENV_CONF_FILE: &'static str = "CNS_CONF_FILE";

    pub fn from<T: AsRef<str>>(path: T) -> NsResult<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(v) => v,
            Err(e) => return err_box!("failed to read config {}: {}", path, e),
        };
        let mut conf = Self::from_toml(&content)?;
        conf.init()?;
        Ok(conf)
    }

    pub fn from_toml(content: &str) -> NsResult<Self> {
        let conf: NsConf = match toml::from_str(content) {
            Ok(v) => v,
            Err(e) => return err_box!("invalid config: {}", e),
        };
        Ok(conf)
    }

    /// Config named by `--conf`, else by `CNS_CONF_FILE`, else the defaults.
    pub fn load(path: Option<&str>) -> NsResult<Self> {
        match path.map(|x| x.to_string()).or_else(|| env::var(Self::ENV_CONF_FILE).ok()) {
            Some(p) => Self::from(p),
            None => {
                let mut conf = Self::default();
                conf.init()?;
                Ok(conf)
            }
        }
    }

    pub fn init(&mut self) -> NsResult<()> {
        self.server.init()?;
        self.client.init()?;
        self.store.lock_timeout = DurationUnit::from_str(&self.store.lock_timeout_str)?.as_duration();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml() {
        let mut conf = NsConf::from_toml(
            r#"
            [server]
            port = 6010
            dir_timeout = "10s"

            [client]
            host = "nshost"
            conn_retries = 0

            [store]
            lock_timeout = "250ms"

            [security]
            trusted_hosts = ["nshost"]

            [privilege]
            admins = [0, 500]

            [log]
            level = "debug"
            "#,
        )
        .unwrap();
        conf.server.init().unwrap();
        conf.store.lock_timeout =
            DurationUnit::from_str(&conf.store.lock_timeout_str).unwrap().as_duration();

        assert_eq!(conf.server.port, 6010);
        assert_eq!(conf.server.secure_port, 5510);
        assert_eq!(conf.server.dir_timeout, Duration::from_secs(10));
        assert_eq!(conf.server.trans_timeout, Duration::from_secs(60));
        assert_eq!(conf.client.host, "nshost");
        assert_eq!(conf.store.lock_timeout, Duration::from_millis(250));
        assert_eq!(conf.privilege.admins, vec![0, 500]);
        assert!(conf.security.enable);
        assert!(conf.security.is_trusted("nshost"));
        assert!(!conf.security.is_trusted("other"));
        assert_eq!(conf.log.level, "debug");
    }
}
