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
use cns_cli::{NsCli, OK, USERR};
use std::process;

// Change the permission bits of name server entries.
// nschmod 0644 /castor/cern.ch/user/f1 /castor/cern.ch/user/f2
fn main() {
    let args = ChmodArgs::parse();
    let mode = match u32::from_str_radix(&args.mode, 8) {
        Ok(v) if v <= 0o7777 => v,
        _ => {
            eprintln!("nschmod: invalid mode {}", args.mode);
            process::exit(USERR);
        }
    };

    let NsCli { rt, mut session } = NsCli::init("nschmod", args.conf.as_deref());
    let status = rt.block_on(async {
        let mut status = OK;
        for path in &args.files {
            if let Err(e) = session.chmod(path, mode).await {
                NsCli::report(path, &e);
                status = USERR;
            }
        }
        status
    });
    process::exit(status);
}

#[derive(Debug, Parser)]
#[command(version, about = "Change the mode of name server entries")]
struct ChmodArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    conf: Option<String>,

    #[arg(help = "Absolute octal mode")]
    mode: String,

    #[arg(required = true)]
    files: Vec<String>,
}
