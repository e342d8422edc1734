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

use crate::{CONFERR, SYERR};
use cns_client::CnsSession;
use cns_common::conf::NsConf;
use cns_common::error::sstrerror;
use cns_common::error::NsError;
use orpc::common::Logger;
use orpc::runtime::Runtime;
use std::process;

/// What every tool needs: a runtime to drive the client and a session.
pub struct NsCli {
    pub rt: Runtime,
    pub session: CnsSession,
}

impl NsCli {
    /// Load the configuration and build the session; exits with
    /// `CONFERR` or `SYERR` when that fails.
    pub fn init(tool: &str, conf: Option<&str>) -> Self {
        let conf = match NsConf::load(conf) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{}: {}", tool, e);
                process::exit(CONFERR);
            }
        };
        Logger::init(conf.log.clone());

        let rt = match Runtime::single() {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{}: {}", tool, e);
                process::exit(SYERR);
            }
        };
        Self {
            rt,
            session: CnsSession::new(conf.client),
        }
    }

    /// Print `<path>: <message>` for a failed argument.
    pub fn report(path: &str, err: &NsError) {
        log::debug!("{}: {}", path, err);
        eprintln!("{}: {}", path, sstrerror(err.code()));
    }
}
