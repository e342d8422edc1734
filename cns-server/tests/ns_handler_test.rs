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

use cns_common::conf::NsConf;
use cns_common::error::serrno::SEINTERNAL;
use cns_common::proto::{NsOpcode, ProtocolVersion, ReplyType, CA_MAXNAMELEN, CNS_RDD_NAMES, CNS_ROOT_FILEID};
use cns_common::state::FileStat;
use cns_common::utils::{S_IFDIR, S_IFREG};
use cns_server::handler::{NsHandler, NsRequest};
use cns_server::ns::NsContext;
use orpc::codec::{Marshaller, Unmarshaller};
use orpc::message::FrameHeader;
use std::sync::Arc;

const ROOT: (u32, u32) = (0, 0);
const USER: (u32, u32) = (501, 100);

struct Reply {
    code: i32,
    frames: Vec<(i32, Vec<u8>)>,
}

impl Reply {
    fn data(&self) -> Unmarshaller<'_> {
        let (_, body) = self
            .frames
            .iter()
            .find(|(t, _)| *t == i32::from(ReplyType::MsgData))
            .expect("no data frame");
        Unmarshaller::new(body)
    }
}

fn new_handler() -> NsHandler {
    let ctx = Arc::new(NsContext::new(NsConf::default()).unwrap());
    NsHandler::new(ctx, "127.0.0.1")
}

fn call<F>(h: &mut NsHandler, opcode: NsOpcode, who: (u32, u32), f: F) -> Reply
where
    F: FnOnce(&mut Marshaller),
{
    let mut m = Marshaller::new(20000);
    m.put_long(who.0 as i32).unwrap();
    m.put_long(who.1 as i32).unwrap();
    f(&mut m);
    let req = NsRequest::new(ProtocolVersion::LATEST, opcode, m.as_slice().to_vec());
    let code = h.process(&req);

    let frames = h
        .take_replies()
        .into_iter()
        .map(|buf| {
            let mut head = [0u8; FrameHeader::SIZE];
            head.copy_from_slice(&buf[..FrameHeader::SIZE]);
            let header = FrameHeader::decode(&head);
            (header.code, buf[FrameHeader::SIZE..].to_vec())
        })
        .collect();
    Reply { code, frames }
}

fn mkdir(h: &mut NsHandler, who: (u32, u32), path: &str, mode: i32) -> i32 {
    call(h, NsOpcode::Mkdir, who, |m| {
        m.put_word(0o022).unwrap();
        m.put_hyper(0).unwrap();
        m.put_string(path).unwrap();
        m.put_long(mode).unwrap();
    })
    .code
}

fn creat(h: &mut NsHandler, who: (u32, u32), path: &str) -> Reply {
    call(h, NsOpcode::Creat, who, |m| {
        m.put_word(0o022).unwrap();
        m.put_hyper(0).unwrap();
        m.put_string(path).unwrap();
        m.put_long(0o666).unwrap();
    })
}

fn stat(h: &mut NsHandler, who: (u32, u32), path: &str) -> Result<FileStat, i32> {
    let reply = call(h, NsOpcode::Stat, who, |m| {
        m.put_hyper(0).unwrap();
        m.put_hyper(0).unwrap();
        m.put_string(path).unwrap();
    });
    if reply.code != 0 {
        return Err(reply.code);
    }
    Ok(FileStat::decode(&mut reply.data()).unwrap())
}

fn chmod(h: &mut NsHandler, who: (u32, u32), path: &str, mode: i32) -> i32 {
    call(h, NsOpcode::Chmod, who, |m| {
        m.put_hyper(0).unwrap();
        m.put_string(path).unwrap();
        m.put_long(mode).unwrap();
    })
    .code
}

#[test]
fn create_applies_mask_and_caller_identity() {
    let mut h = new_handler();
    assert_eq!(mkdir(&mut h, ROOT, "/home", 0o755), 0);
    assert_eq!(chmod(&mut h, ROOT, "/home", 0o777), 0);

    let reply = creat(&mut h, USER, "/home/f1");
    assert_eq!(reply.code, 0);
    let fileid = reply.data().get_hyper().unwrap();

    let st = stat(&mut h, USER, "/home/f1").unwrap();
    assert_eq!(st.fileid, fileid);
    assert_eq!(st.filemode, S_IFREG | 0o644);
    assert_eq!((st.uid, st.gid), USER);

    let dir = stat(&mut h, USER, "/home").unwrap();
    assert_eq!(dir.filemode, S_IFDIR | 0o777);
    assert_eq!(dir.nlink, 1);
}

#[test]
fn permission_denied_in_foreign_directory() {
    let mut h = new_handler();
    assert_eq!(mkdir(&mut h, ROOT, "/adm", 0o755), 0);
    assert_eq!(creat(&mut h, USER, "/adm/f").code, libc::EACCES);
    assert_eq!(stat(&mut h, ROOT, "/adm/f").unwrap_err(), libc::ENOENT);
    assert_eq!(mkdir(&mut h, ROOT, "/adm", 0o755), libc::EEXIST);
}

#[test]
fn security_identity_overrides_wire_identity() {
    let mut h = new_handler();
    h.set_auth(USER.0, USER.1);
    // The request claims uid 0 but the context says 501.
    assert_eq!(mkdir(&mut h, ROOT, "/x", 0o755), libc::EACCES);
}

#[test]
fn aborted_transaction_leaves_no_trace() {
    let mut h = new_handler();
    assert_eq!(call(&mut h, NsOpcode::StartTrans, ROOT, |_| {}).code, 0);
    assert!(h.in_explicit_transaction());
    assert_eq!(mkdir(&mut h, ROOT, "/t1", 0o755), 0);
    assert!(stat(&mut h, ROOT, "/t1").is_ok());
    assert_eq!(call(&mut h, NsOpcode::AbortTrans, ROOT, |_| {}).code, 0);
    assert!(!h.in_explicit_transaction());

    assert_eq!(stat(&mut h, ROOT, "/t1").unwrap_err(), libc::ENOENT);
    assert_eq!(stat(&mut h, ROOT, "/").unwrap().nlink, 0);
}

#[test]
fn committed_transaction_is_kept() {
    let mut h = new_handler();
    call(&mut h, NsOpcode::StartTrans, ROOT, |_| {});
    assert_eq!(mkdir(&mut h, ROOT, "/t2", 0o755), 0);
    assert_eq!(mkdir(&mut h, ROOT, "/t2/sub", 0o755), 0);
    assert_eq!(call(&mut h, NsOpcode::EndTrans, ROOT, |_| {}).code, 0);
    h.close();

    let mut other = NsHandler::new(h.ctx().clone(), "127.0.0.1");
    assert!(stat(&mut other, ROOT, "/t2/sub").is_ok());
}

#[test]
fn readdir_lists_names_in_order() {
    let mut h = new_handler();
    assert_eq!(mkdir(&mut h, ROOT, "/d", 0o755), 0);
    for name in ["/d/b", "/d/a", "/d/c"] {
        assert_eq!(creat(&mut h, ROOT, name).code, 0);
    }

    let reply = call(&mut h, NsOpcode::Opendir, ROOT, |m| {
        m.put_hyper(0).unwrap();
        m.put_string("/d").unwrap();
    });
    assert_eq!(reply.code, 0);
    let dir_fileid = reply.data().get_hyper().unwrap();
    assert!(h.has_open_list());

    let reply = call(&mut h, NsOpcode::Readdir, ROOT, |m| {
        m.put_word(CNS_RDD_NAMES).unwrap();
        m.put_word(0).unwrap();
        m.put_hyper(dir_fileid).unwrap();
        m.put_word(1).unwrap();
    });
    assert_eq!(reply.code, 0);
    let mut u = reply.data();
    let nb = u.get_word().unwrap();
    let names: Vec<String> = (0..nb).map(|_| u.get_string(CA_MAXNAMELEN).unwrap()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(u.get_word().unwrap(), 1);

    assert_eq!(call(&mut h, NsOpcode::Closedir, ROOT, |_| {}).code, 0);
    assert!(!h.has_open_list());
}

#[test]
fn symlink_round_trip() {
    let mut h = new_handler();
    assert_eq!(mkdir(&mut h, ROOT, "/l", 0o755), 0);
    let code = call(&mut h, NsOpcode::Symlink, ROOT, |m| {
        m.put_hyper(0).unwrap();
        m.put_string("/l/target").unwrap();
        m.put_string("/l/link").unwrap();
    })
    .code;
    assert_eq!(code, 0);

    let reply = call(&mut h, NsOpcode::Readlink, ROOT, |m| {
        m.put_hyper(0).unwrap();
        m.put_string("/l/link").unwrap();
    });
    assert_eq!(reply.code, 0);
    assert_eq!(reply.data().get_string(1023).unwrap(), "/l/target");

    // Following a dangling link fails, lstat does not.
    assert_eq!(stat(&mut h, ROOT, "/l/link").unwrap_err(), libc::ENOENT);
}

#[test]
fn unknown_request_reports_illegal_function() {
    let mut h = new_handler();
    let reply = call(&mut h, NsOpcode::Unknown(99), ROOT, |_| {});
    assert_eq!(reply.code, SEINTERNAL);
    assert!(reply
        .frames
        .iter()
        .any(|(t, _)| *t == i32::from(ReplyType::MsgErr)));
}

#[test]
fn shutdown_requires_admin() {
    let mut h = new_handler();
    let code = call(&mut h, NsOpcode::Shutdown, USER, |m| m.put_word(0).unwrap()).code;
    assert_eq!(code, libc::EACCES);
    assert!(!h.ctx().is_shutting_down());

    let code = call(&mut h, NsOpcode::Shutdown, ROOT, |m| m.put_word(0).unwrap()).code;
    assert_eq!(code, 0);
    assert!(h.ctx().is_shutting_down());
}

#[test]
fn root_is_preinstalled() {
    let mut h = new_handler();
    let st = stat(&mut h, USER, "/").unwrap();
    assert_eq!(st.fileid, CNS_ROOT_FILEID);
    assert!(st.is_dir());
}

#[test]
fn root_cannot_be_deleted() {
    let mut h = new_handler();
    for opcode in [NsOpcode::Delete, NsOpcode::Undelete] {
        let code = call(&mut h, opcode, ROOT, |m| {
            m.put_hyper(0).unwrap();
            m.put_string("/").unwrap();
        })
        .code;
        assert_eq!(code, libc::EINVAL);
    }
    assert!(stat(&mut h, USER, "/").is_ok());
}
