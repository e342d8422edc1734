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

use clap::Parser;
use cns_common::conf::NsConf;
use cns_common::NsResult;
use cns_server::server::NsServer;
use log::info;
use orpc::common::Logger;

// Name server daemon.
// cargo run --bin cnsd -- --conf /etc/cns/cns.toml
fn main() -> NsResult<()> {
    let args = ServerArgs::parse();

    // A client closing early must not kill the daemon.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }

    let conf = NsConf::load(args.conf.as_deref())?;
    Logger::init(conf.log.clone());
    info!(
        "Starting {} on port {} (secure port {}, security {})",
        conf.server.name,
        conf.server.port,
        conf.server.secure_port,
        if conf.security.enable { "on" } else { "off" }
    );

    let server = NsServer::new(conf)?;
    server.block_on_start();
    Ok(())
}

#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct ServerArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    pub conf: Option<String>,
}
