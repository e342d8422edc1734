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

use crate::transport::NsReply;
use cns_common::conf::ClientConf;
use cns_common::error::serrno::{SEBADVERSION, SEINTERNAL, SEUBUF2SMALL};
use cns_common::error::NsError;
use cns_common::proto::{CsecInit, ProtocolVersion, ReplyType, CA_MAXPATHLEN, CSEC_MAGIC};
use cns_common::{err_ns, NsResult};
use log::{debug, warn};
use orpc::client::TcpConnector;
use orpc::codec::Unmarshaller;
use orpc::io::net::InetAddr;
use orpc::message::{FrameHeader, FrameIO};
use tokio::net::TcpStream;

/// A connection to one name server.
pub struct NsChannel {
    stream: TcpStream,
    addr: InetAddr,
}

impl NsChannel {
    // Largest reply frame accepted, the extended blocks included.
    pub const RECV_BUF_SIZE: usize = 65536;

    /// Connect and, unless security is disabled, establish the security
    /// context carrying `uid`/`gid`.
    pub async fn connect(conf: &ClientConf, host: &str, uid: u32, gid: u32) -> NsResult<Self> {
        let addr = InetAddr::new(host, conf.effective_port());
        let connector = TcpConnector::new(conf.connect_conf());

        let mut attempt = 0;
        loop {
            let stream = connector.connect(&addr).await?;
            let mut channel = Self {
                stream,
                addr: addr.clone(),
            };
            if conf.csec_disable {
                return Ok(channel);
            }

            match channel.establish_context(conf, uid, gid).await {
                Ok(()) => return Ok(channel),
                // Only a timed out handshake is worth another attempt.
                Err(NsError::IO(e)) if e.is_timeout() && attempt < conf.conn_retries => {
                    attempt += 1;
                    warn!("Security handshake with {} timed out, attempt {}", addr, attempt);
                    tokio::time::sleep(conf.conn_retry_interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn establish_context(&mut self, conf: &ClientConf, uid: u32, gid: u32) -> NsResult<()> {
        let timeout = Some(conf.conn_timeout);
        let init = CsecInit::id(uid, gid).encode()?;
        FrameIO::write_all(&mut self.stream, &init, timeout).await?;

        let header = FrameIO::read_header(&mut self.stream, timeout).await?;
        if header.magic != CSEC_MAGIC {
            // A plain status: the server refused before reading the context.
            return err_ns!(header.len, "security context refused by {}", self.addr);
        }
        if header.code != 0 {
            return err_ns!(header.code, "security context refused by {}", self.addr);
        }
        debug!("Security context established with {}", self.addr);
        Ok(())
    }

    pub fn addr(&self) -> &InetAddr {
        &self.addr
    }

    pub async fn send(&mut self, req: &[u8]) -> NsResult<()> {
        FrameIO::write_all(&mut self.stream, req, None).await?;
        Ok(())
    }

    /// Read reply frames up to the status frame. MSG_DATA beyond
    /// `capacity` bytes fails with `SEUBUF2SMALL`. Returns whether the
    /// server keeps the connection open.
    pub async fn recv(&mut self, capacity: usize, reply: &mut NsReply) -> NsResult<bool> {
        loop {
            let header = FrameIO::read_header(&mut self.stream, None).await?;
            if ProtocolVersion::from_magic(header.magic).is_err() {
                return err_ns!(SEBADVERSION, "reply magic {:#010x} from {}", header.magic, self.addr);
            }
            let rtype = match ReplyType::try_from(header.code) {
                Ok(v) => v,
                Err(_) => return err_ns!(SEINTERNAL, "unknown reply type {} from {}", header.code, self.addr),
            };

            match rtype {
                ReplyType::Rc | ReplyType::Irc => {
                    reply.status = header.len;
                    return Ok(rtype == ReplyType::Irc);
                }
                _ => {
                    let body = self.read_payload(&header).await?;
                    Self::collect(rtype, body, capacity, reply)?;
                }
            }
        }
    }

    async fn read_payload(&mut self, header: &FrameHeader) -> NsResult<Vec<u8>> {
        if header.len < 0 || header.len as usize > Self::RECV_BUF_SIZE {
            return err_ns!(SEINTERNAL, "reply of {} bytes from {}", header.len, self.addr);
        }
        let body = FrameIO::read_body(&mut self.stream, header.len as usize, Self::RECV_BUF_SIZE, None).await?;
        Ok(body)
    }

    fn collect(rtype: ReplyType, body: Vec<u8>, capacity: usize, reply: &mut NsReply) -> NsResult<()> {
        match rtype {
            ReplyType::MsgErr => {
                let mut u = Unmarshaller::new(&body);
                let text = u
                    .get_string(body.len())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&body).to_string());
                debug!("Server message: {}", text);
                reply.errors.push(text);
            }
            ReplyType::MsgData => {
                if reply.data.len() + body.len() > capacity {
                    return err_ns!(
                        SEUBUF2SMALL,
                        "reply of {} bytes exceeds buffer of {}",
                        reply.data.len() + body.len(),
                        capacity
                    );
                }
                reply.data.extend_from_slice(&body);
            }
            ReplyType::MsgLinks => {
                let mut u = Unmarshaller::new(&body);
                while !u.is_empty() {
                    reply.links.push(u.get_string(CA_MAXPATHLEN)?);
                }
            }
            ReplyType::MsgReplic | ReplyType::MsgReplicP => reply.replicas.push(body),
            ReplyType::Rc | ReplyType::Irc => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_beyond_capacity_is_rejected() {
        let mut reply = NsReply::default();
        NsChannel::collect(ReplyType::MsgData, vec![0; 8], 10, &mut reply).unwrap();
        let err = NsChannel::collect(ReplyType::MsgData, vec![0; 8], 10, &mut reply).unwrap_err();
        assert_eq!(err.code(), SEUBUF2SMALL);
        assert_eq!(reply.data.len(), 8);
    }

    #[test]
    fn links_and_errors_accumulate() {
        let mut reply = NsReply::default();
        NsChannel::collect(ReplyType::MsgLinks, b"/a\0/b/c\0".to_vec(), 0, &mut reply).unwrap();
        NsChannel::collect(ReplyType::MsgLinks, b"/d\0".to_vec(), 0, &mut reply).unwrap();
        NsChannel::collect(ReplyType::MsgErr, b"No such class\0".to_vec(), 0, &mut reply).unwrap();
        assert_eq!(reply.links, vec!["/a", "/b/c", "/d"]);
        assert_eq!(reply.errors, vec!["No such class"]);
    }
}
