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

// Rename a name server entry.
// nsrename /castor/cern.ch/user/old /castor/cern.ch/user/new
fn main() {
    let args = RenameArgs::parse();
    let NsCli { rt, mut session } = NsCli::init("nsrename", args.conf.as_deref());

    let status = rt.block_on(async {
        match session.rename(&args.oldpath, &args.newpath).await {
            Ok(()) => OK,
            Err(e) => {
                NsCli::report(&args.oldpath, &e);
                USERR
            }
        }
    });
    process::exit(status);
}

#[derive(Debug, Parser)]
#[command(version, about = "Rename a name server entry")]
struct RenameArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    conf: Option<String>,

    oldpath: String,

    newpath: String,
}
