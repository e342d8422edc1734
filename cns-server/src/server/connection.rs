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

use crate::handler::{NsHandler, NsRequest, ReplySink};
use crate::ns::NsContext;
use crate::server::SecurityGate;
use cns_common::error::serrno::{ENSNACT, ESEC_NO_CONTEXT, SEBADVERSION};
use cns_common::proto::{CsecInit, NsOpcode, ProtocolVersion, ReplyType};
use cns_common::NsResult;
use log::{debug, info, warn};
use orpc::message::{FrameHeader, FrameIO};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// What keeps a connection open between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnMode {
    Single,
    Trans,
    Sess,
}

/// One client connection: reads request frames, runs them through the
/// handler and writes the replies, until the conversation ends.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<NsContext>,
    handler: NsHandler,
    gate: Option<Arc<SecurityGate>>,
    mode: ConnMode,
    // The listing request that opened the handler's list.
    listing: Option<NsOpcode>,
}

impl Connection {
    pub fn new(ctx: Arc<NsContext>, stream: TcpStream, peer: SocketAddr, gate: Option<Arc<SecurityGate>>) -> Self {
        let handler = NsHandler::new(ctx.clone(), peer.ip().to_string());
        Self {
            stream,
            peer,
            ctx,
            handler,
            gate,
            mode: ConnMode::Single,
            listing: None,
        }
    }

    pub async fn run(mut self) -> NsResult<()> {
        let res = self.run0().await;
        tokio::task::block_in_place(|| self.handler.close());
        res
    }

    async fn run0(&mut self) -> NsResult<()> {
        if self.gate.is_some() && !self.establish_context().await? {
            return Ok(());
        }

        while let Some(req) = self.read_request().await? {
            if !self.serve(req).await? {
                break;
            }
        }
        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        let conf = &self.ctx.conf().server;
        if self.listing.is_some() {
            conf.dir_timeout
        } else if self.mode != ConnMode::Single {
            conf.trans_timeout
        } else {
            conf.req_timeout
        }
    }

    /// The first frame on the secure port must be a security context.
    async fn establish_context(&mut self) -> NsResult<bool> {
        let gate = match &self.gate {
            Some(v) => v.clone(),
            None => return Ok(true),
        };
        let timeout = Some(self.ctx.conf().server.req_timeout);
        let header = match FrameIO::read_header(&mut self.stream, timeout).await {
            Ok(v) => v,
            Err(e) if e.is_eof() || e.is_timeout() => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if !SecurityGate::is_init(&header) {
            warn!("{} sent {} before its security context", self.peer, header);
            self.write_status(ReplyType::Rc, ESEC_NO_CONTEXT).await?;
            return Ok(false);
        }

        let len = (header.len.max(0) as usize).saturating_sub(FrameHeader::SIZE);
        let body = FrameIO::read_body(&mut self.stream, len, SecurityGate::MAX_INIT_LEN, timeout).await?;
        match gate.accept(&self.peer.ip(), &header, &body) {
            Ok((uid, gid)) => {
                self.handler.set_auth(uid, gid);
                FrameIO::write_all(&mut self.stream, &CsecInit::reply(0), timeout).await?;
                Ok(true)
            }
            Err(e) => {
                FrameIO::write_all(&mut self.stream, &CsecInit::reply(e.code()), timeout).await?;
                Ok(false)
            }
        }
    }

    async fn read_request(&mut self) -> NsResult<Option<NsRequest>> {
        let timeout = self.read_timeout();
        let header = match FrameIO::read_header(&mut self.stream, Some(timeout)).await {
            Ok(v) => v,
            Err(e) if e.is_eof() => return Ok(None),
            Err(e) if e.is_timeout() => {
                debug!("Connection from {} idle for {:?}, closing", self.peer, timeout);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let version = match ProtocolVersion::from_magic(header.magic) {
            Ok(v) => v,
            Err(e) => {
                warn!("Request from {} rejected: {}", self.peer, e);
                self.write_status(ReplyType::Rc, SEBADVERSION).await?;
                return Ok(None);
            }
        };

        let max = self.ctx.conf().server.max_request_size.saturating_sub(FrameHeader::SIZE);
        let len = (header.len.max(0) as usize).saturating_sub(FrameHeader::SIZE);
        let body = match FrameIO::read_body(&mut self.stream, len, max, Some(self.ctx.conf().server.req_timeout)).await {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!("Request from {} rejected: {}", self.peer, e);
                self.write_status(ReplyType::Rc, libc::E2BIG).await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if self.ctx.is_shutting_down() {
            self.write_status(ReplyType::Rc, ENSNACT).await?;
            return Ok(None);
        }

        Ok(Some(NsRequest::new(version, NsOpcode::from(header.code), body)))
    }

    /// Run one request and answer it. Returns whether the connection
    /// stays open for another request.
    async fn serve(&mut self, req: NsRequest) -> NsResult<bool> {
        if let Some(open) = self.listing {
            let continues = open.continuation() == Some(req.opcode)
                || matches!(req.opcode, NsOpcode::Closedir | NsOpcode::EndList);
            if !continues {
                debug!("{} abandons the open {} listing", self.peer, open.name());
                self.listing = None;
                tokio::task::block_in_place(|| self.handler.release_list());
            }
        }

        let code = tokio::task::block_in_place(|| self.handler.process(&req));
        let replies = self.handler.take_replies();

        if req.opcode.is_list() && self.handler.has_open_list() {
            self.listing = Some(req.opcode);
        } else if !self.handler.has_open_list() {
            self.listing = None;
        }

        let keep = self.keep_open(req.opcode, code);
        let timeout = Some(self.ctx.conf().server.req_timeout);
        for frame in replies {
            FrameIO::write_all(&mut self.stream, &frame, timeout).await?;
        }
        let rtype = if keep { ReplyType::Irc } else { ReplyType::Rc };
        self.write_status(rtype, code).await?;
        Ok(keep)
    }

    fn keep_open(&mut self, opcode: NsOpcode, code: i32) -> bool {
        if code != 0 {
            return match self.mode {
                ConnMode::Trans => self.handler.in_explicit_transaction(),
                ConnMode::Sess => true,
                ConnMode::Single => self.listing.is_some(),
            };
        }

        match opcode {
            NsOpcode::StartTrans => {
                self.mode = ConnMode::Trans;
                true
            }
            NsOpcode::EndTrans | NsOpcode::AbortTrans | NsOpcode::EndSess => {
                self.mode = ConnMode::Single;
                false
            }
            NsOpcode::StartSess => {
                self.mode = ConnMode::Sess;
                true
            }
            _ => self.mode != ConnMode::Single || self.listing.is_some(),
        }
    }

    async fn write_status(&mut self, rtype: ReplyType, code: i32) -> NsResult<()> {
        let timeout = Some(self.ctx.conf().server.req_timeout);
        FrameIO::write_all(&mut self.stream, &ReplySink::status(rtype, code), timeout).await?;
        if rtype == ReplyType::Rc {
            info!("Connection from {} done, status {}", self.peer, code);
        }
        Ok(())
    }
}
