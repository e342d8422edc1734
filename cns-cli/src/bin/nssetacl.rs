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

use clap::{ArgGroup, Parser};
use cns_cli::{AclEdit, AclSpec, NsCli, OK, USERR};
use cns_client::CnsSession;
use cns_common::proto::CA_MAXACLENTRIES;
use cns_common::NsResult;
use std::process;

// Set, modify or delete access control list entries.
// nssetacl -m u:jdoe:rw-,g:zp:r-- /castor/cern.ch/user/f1
fn main() {
    let args = SetaclArgs::parse();
    let edit = if args.delete {
        AclEdit::Delete
    } else if args.modify {
        AclEdit::Modify
    } else {
        AclEdit::Set
    };
    let spec = match AclSpec::parse(&args.entries, edit) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("nssetacl: {}", e);
            process::exit(USERR);
        }
    };

    let NsCli { rt, mut session } = NsCli::init("nssetacl", args.conf.as_deref());
    let status = rt.block_on(async {
        let mut status = OK;
        for path in &args.files {
            if let Err(e) = setacl(&mut session, path, edit, &spec).await {
                NsCli::report(path, &e);
                status = USERR;
            }
        }
        status
    });
    process::exit(status);
}

async fn setacl(session: &mut CnsSession, path: &str, edit: AclEdit, spec: &AclSpec) -> NsResult<()> {
    let current = match edit {
        AclEdit::Set => vec![],
        _ => session.getacl(path, CA_MAXACLENTRIES).await?.1,
    };
    let acl = spec.apply(edit, &current);
    session.setacl(path, &acl).await
}

#[derive(Debug, Parser)]
#[command(version, about = "Change the access control list of name server entries")]
#[command(group(ArgGroup::new("edit").required(true).args(["delete", "modify", "set"])))]
struct SetaclArgs {
    #[arg(long, help = "Configuration file, defaults to $CNS_CONF_FILE")]
    conf: Option<String>,

    #[arg(short = 'd', help = "Remove the entries")]
    delete: bool,

    #[arg(short = 'm', help = "Add or change the entries")]
    modify: bool,

    #[arg(short = 's', help = "Replace the whole list")]
    set: bool,

    #[arg(help = "Entries as [d:]type:[id]:perm separated by commas")]
    entries: String,

    #[arg(required = true)]
    files: Vec<String>,
}
