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


use crate::handler::ReplySink;
use crate::meta::{DbConn, OpenList, RecordLease};
use crate::ns::{Credentials, NsContext, ReqLog};
use bytes::Bytes;
use cns_common::error::serrno::SEINTERNAL;
use cns_common::proto::{Capabilities, NsOpcode, NsReader, ProtocolVersion};
use cns_common::state::FileMetadata;
use cns_common::{err_ns, NsResult};
use log::{debug, error, info, warn};
use orpc::codec::Unmarshaller;
use orpc::common::LocalTime;
use std::sync::Arc;

/// One decoded request frame.
#[derive(Debug, Clone)]
pub struct NsRequest {
    pub version: ProtocolVersion,
    pub opcode: NsOpcode,
    pub body: Vec<u8>,
}

impl NsRequest {
    pub fn new(version: ProtocolVersion, opcode: NsOpcode, body: Vec<u8>) -> Self {
        Self { version, opcode, body }
    }
}

/// Request processor of one connection.
///
/// Owns the connection's store handle, its open listing and the reply
/// frames of the request in progress. Every request is decoded, checked,
/// applied inside a transaction and answered with exactly one status,
/// which [`NsHandler::process`] returns.
pub struct NsHandler {
    pub(crate) ctx: Arc<NsContext>,
    pub(crate) db: DbConn,
    pub(crate) host: String,
    // Identity established by the security handshake.
    pub(crate) auth: Option<(u32, u32)>,
    pub(crate) list: Option<OpenList>,
    pub(crate) sink: ReplySink,
    pub(crate) caps: Capabilities,
}

impl NsHandler {
    pub fn new(ctx: Arc<NsContext>, host: impl Into<String>) -> Self {
        let db = DbConn::new(ctx.store().clone());
        Self {
            ctx,
            db,
            host: host.into(),
            auth: None,
            list: None,
            sink: ReplySink::new(),
            caps: ProtocolVersion::LATEST.caps(),
        }
    }

    pub fn set_auth(&mut self, uid: u32, gid: u32) {
        self.auth = Some((uid, gid));
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ctx(&self) -> &Arc<NsContext> {
        &self.ctx
    }

    pub fn take_replies(&mut self) -> Vec<Bytes> {
        self.sink.take()
    }

    pub fn in_explicit_transaction(&self) -> bool {
        self.db.is_explicit()
    }

    pub fn has_open_list(&self) -> bool {
        self.list.is_some()
    }

    /// Drop the open listing, if any.
    pub fn release_list(&mut self) {
        if let Some(mut list) = self.list.take() {
            list.release();
        }
    }

    /// Abort whatever the client left open.
    pub fn close(&mut self) {
        self.release_list();
        if self.db.is_explicit() {
            warn!("Connection from {} closed inside a transaction", self.host);
            self.db.end_explicit(false);
        }
        self.db.end_request(false);
    }

    /// Run one request and return its status, 0 on success.
    pub fn process(&mut self, req: &NsRequest) -> i32 {
        self.caps = req.version.caps();
        let mut u = Unmarshaller::new(&req.body);
        let res = self.identify(&mut u).and_then(|cred| {
            ReqLog::request(req.opcode.name(), cred.uid, cred.gid, &cred.host);
            self.dispatch(req.opcode, &cred, &mut u)
        });

        let code = match res {
            Ok(()) => 0,
            Err(e) => {
                let code = e.code();
                if code == SEINTERNAL {
                    error!("{} from {} failed: {}", req.opcode.name(), self.host, e);
                } else {
                    debug!("{} from {} failed: {}", req.opcode.name(), self.host, e);
                }
                code
            }
        };
        self.end_request(req.opcode, code);
        info!("{}: returns {}", req.opcode.name(), code);
        code
    }

    fn identify(&self, u: &mut Unmarshaller) -> NsResult<Credentials> {
        let uid = u.get_id()?;
        let gid = u.get_id()?;
        let (uid, gid) = self.auth.unwrap_or((uid, gid));
        Ok(Credentials::new(uid, gid, self.host.clone()))
    }

    fn end_request(&mut self, opcode: NsOpcode, code: i32) {
        if matches!(opcode, NsOpcode::StartTrans | NsOpcode::EndTrans | NsOpcode::AbortTrans) {
            return;
        }
        if self.db.is_explicit() {
            if code != 0 && !opcode.is_read_only() {
                warn!("Client transaction aborted by failed {}", opcode.name());
                self.db.end_explicit(false);
            }
        } else {
            self.db.end_request(code == 0);
        }
    }

    fn dispatch(&mut self, opcode: NsOpcode, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        match opcode {
            NsOpcode::Access => self.access(cred, u),
            NsOpcode::Chdir => self.chdir(cred, u),
            NsOpcode::Chmod => self.chmod(cred, u),
            NsOpcode::Chown => self.chown(cred, u, true),
            NsOpcode::Lchown => self.chown(cred, u, false),
            NsOpcode::Creat => self.creat(cred, u, false),
            NsOpcode::CreatG => self.creat(cred, u, true),
            NsOpcode::Open => self.open(cred, u),
            NsOpcode::Mkdir => self.mkdir(cred, u),
            NsOpcode::Rename => self.rename(cred, u),
            NsOpcode::Rmdir => self.rmdir(cred, u),
            NsOpcode::Unlink => self.unlink(cred, u),
            NsOpcode::Delete => self.delete(cred, u),
            NsOpcode::Undelete => self.undelete(cred, u),
            NsOpcode::Stat => self.stat(cred, u, true),
            NsOpcode::Lstat => self.stat(cred, u, false),
            NsOpcode::StatG => self.statg(cred, u),
            NsOpcode::StatR => self.statr(cred, u),
            NsOpcode::GetPath => self.getpath(cred, u),
            NsOpcode::SetAtime => self.setatime(cred, u),
            NsOpcode::SetFsize => self.setfsize(cred, u),
            NsOpcode::SetFsizeG => self.setfsizeg(cred, u),
            NsOpcode::Utime => self.utime(cred, u),
            NsOpcode::GetComment => self.getcomment(cred, u),
            NsOpcode::SetComment => self.setcomment(cred, u),
            NsOpcode::DelComment => self.delcomment(cred, u),
            NsOpcode::Symlink => self.symlink(cred, u),
            NsOpcode::Readlink => self.readlink(cred, u),
            NsOpcode::GetLinks => self.getlinks(cred, u),
            NsOpcode::GetSegAttrs => self.getsegattrs(cred, u),
            NsOpcode::SetSegAttrs => self.setsegattrs(cred, u),
            NsOpcode::ReplaceSeg => self.replaceseg(cred, u),
            NsOpcode::ReplaceTapeCopy => self.replacetapecopy(cred, u),
            NsOpcode::UpdateSegChecksum => self.updateseg_checksum(cred, u),
            NsOpcode::GetAcl => self.getacl(cred, u),
            NsOpcode::SetAcl => self.setacl(cred, u),
            NsOpcode::AddReplica => self.addreplica(cred, u),
            NsOpcode::DelReplica => self.delreplica(cred, u),
            NsOpcode::EnterClass => self.enterclass(cred, u),
            NsOpcode::ModifyClass => self.modifyclass(cred, u),
            NsOpcode::DeleteClass => self.deleteclass(cred, u),
            NsOpcode::QueryClass => self.queryclass(cred, u),
            NsOpcode::ChClass => self.chclass(cred, u),
            NsOpcode::GetIdMap => self.getidmap(cred, u),
            NsOpcode::EntUsrMap => self.enterusrmap(cred, u),
            NsOpcode::EntGrpMap => self.entergrpmap(cred, u),
            NsOpcode::GetUsrId => self.getusrbynam(cred, u),
            NsOpcode::GetUsrNam => self.getusrbyuid(cred, u),
            NsOpcode::GetGrpId => self.getgrpbynam(cred, u),
            NsOpcode::GetGrpNam => self.getgrpbygid(cred, u),
            NsOpcode::Opendir => self.opendir(cred, u),
            NsOpcode::Readdir => self.readdir(cred, u),
            NsOpcode::ListClass => self.listclass(cred, u),
            NsOpcode::ListTape => self.listtape(cred, u),
            NsOpcode::ListReplica => self.listreplica(cred, u),
            NsOpcode::ListLinks => self.listlinks(cred, u),
            NsOpcode::Closedir | NsOpcode::EndList => {
                self.release_list();
                Ok(())
            }
            NsOpcode::StartTrans => {
                self.db.begin_explicit();
                Ok(())
            }
            NsOpcode::EndTrans => {
                self.db.end_explicit(true);
                Ok(())
            }
            NsOpcode::AbortTrans => {
                self.db.end_explicit(false);
                Ok(())
            }
            NsOpcode::StartSess | NsOpcode::EndSess | NsOpcode::Close => Ok(()),
            NsOpcode::Shutdown => self.shutdown(cred, u),
            NsOpcode::Unknown(code) => {
                self.sink.msg_err(&format!("illegal function {}", code));
                err_ns!(SEINTERNAL, "unknown request type {}", code)
            }
        }
    }

    fn shutdown(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let force = u.get_word()?;
        ReqLog::log("shutdown", &format!("shutdown {}", force));
        self.ctx.perm().require_admin(cred)?;
        self.ctx.begin_shutdown();
        Ok(())
    }

    pub(crate) fn now() -> i64 {
        LocalTime::now_secs()
    }

    /// Find the entry by fileid or by path and lock it.
    pub(crate) fn locate(
        &mut self,
        cred: &Credentials,
        cwd: u64,
        fileid: u64,
        path: &str,
        follow: bool,
    ) -> NsResult<(FileMetadata, RecordLease)> {
        let ctx = self.ctx.clone();
        let found = ctx.resolver(cred).lookup_or_id(cwd, fileid, path, follow)?;
        let tx = self.db.start_tr();
        let (entry, lease) = ctx.store().lock_file(tx, found.fileid)?;
        if entry.is_deleted() {
            return err_ns!(libc::ENOENT, "{}", path);
        }
        Ok((entry, lease))
    }

    /// Lock the parent directory of `path`, which must grant search plus
    /// `mode`. Returns the parent, its lease and the basename.
    pub(crate) fn lock_parent(
        &mut self,
        cred: &Credentials,
        cwd: u64,
        path: &str,
        mode: u32,
    ) -> NsResult<(FileMetadata, RecordLease, String)> {
        let ctx = self.ctx.clone();
        let (parent, base) = ctx.resolver(cred).parent(cwd, path, mode)?;
        let tx = self.db.start_tr();
        let (parent, lease) = ctx.store().lock_file(tx, parent.fileid)?;
        Ok((parent, lease, base))
    }

    /// Lock `name` under `parent`; soft deleted entries are returned.
    pub(crate) fn lock_child(&mut self, parent: u64, name: &str) -> NsResult<(FileMetadata, RecordLease)> {
        let store = self.ctx.store().clone();
        match store.lock_child(self.db.start_tr(), parent, name)? {
            Some(v) => Ok(v),
            None => err_ns!(libc::ENOENT, "{}", name),
        }
    }

    /// The sticky bit on `parent` restricts removal to the owner of the
    /// entry, the owner of the directory or a caller allowed to write the entry.
    pub(crate) fn check_sticky(&self, parent: &FileMetadata, entry: &FileMetadata, cred: &Credentials) -> NsResult<()> {
        use cns_common::utils::{S_ISVTX, S_IWRITE};
        if parent.filemode & S_ISVTX != 0 && cred.uid != parent.uid && cred.uid != entry.uid {
            self.ctx.perm().check(entry, S_IWRITE, cred)?;
        }
        Ok(())
    }
}
