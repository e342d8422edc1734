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

// Remove the comments of name server entries.
// nsdelcomment /castor/cern.ch/user/f1
fn main() {
    let args = DelcommentArgs::parse();
    let NsCli { rt, mut session } = NsCli::init("nsdelcomment", args.conf.as_deref());

    let status = rt.block_on(async {
        let mut status = OK;
        for path in &args.paths {
            if let Err(e) = session.delcomment(path).await {
                NsCli::report(path, &e);
                status = USERR;
            }
        }
        status
    });
    process::exit(status);
}

#[derive(Debug, Parser)]
#[command(version, about = "Delete the comment of name server entries")]
struct DelcommentArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    conf: Option<String>,

    #[arg(required = true)]
    paths: Vec<String>,
}
