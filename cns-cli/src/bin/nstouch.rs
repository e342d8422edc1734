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
use cns_cli::{NsCli, TouchTime, OK, USERR};
use cns_client::CnsSession;
use cns_common::NsResult;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

// Create entries or update their access and modification times.
// nstouch -m -t 202401021530 /castor/cern.ch/user/f1
fn main() {
    let args = TouchArgs::parse();
    let time = match args.time.as_deref().map(TouchTime::parse).transpose() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("nstouch: {}", e);
            process::exit(USERR);
        }
    };

    let NsCli { rt, mut session } = NsCli::init("nstouch", args.conf.as_deref());
    let status = rt.block_on(async {
        let mut status = OK;
        for path in &args.files {
            if let Err(e) = touch(&mut session, &args, time, path).await {
                NsCli::report(path, &e);
                status = USERR;
            }
        }
        status
    });
    process::exit(status);
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn touch(session: &mut CnsSession, args: &TouchArgs, time: Option<i64>, path: &str) -> NsResult<()> {
    let stat = match session.stat(path).await {
        Ok(v) => Some(v),
        Err(e) if e.code() == libc::ENOENT => None,
        Err(e) => return Err(e),
    };
    let stat = match stat {
        Some(v) => v,
        None if args.no_create => return Ok(()),
        None => {
            session.creat(path, 0o666).await?;
            if time.is_none() {
                return Ok(());
            }
            session.stat(path).await?
        }
    };

    // Neither -a nor -m means both.
    let both = args.access == args.modification;
    if time.is_none() && both {
        return session.utime(path, None).await;
    }
    let t = time.unwrap_or_else(now);
    let atime = if both || args.access { t } else { stat.atime };
    let mtime = if both || args.modification { t } else { stat.mtime };
    session.utime(path, Some((atime, mtime))).await
}

#[derive(Debug, Parser)]
#[command(version, about = "Create name server entries or set their times")]
struct TouchArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    conf: Option<String>,

    #[arg(short = 'a', help = "Change the access time only")]
    access: bool,

    #[arg(short = 'c', help = "Do not create missing files")]
    no_create: bool,

    #[arg(short = 'm', help = "Change the modification time only")]
    modification: bool,

    #[arg(short = 't', value_name = "[[CC]YY]MMDDhhmm[.SS]", help = "Use this time instead of now")]
    time: Option<String>,

    #[arg(required = true)]
    files: Vec<String>,
}
