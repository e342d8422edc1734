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
use cns_common::error::serrno::{ESEC_BAD_CREDENTIALS, ESEC_NO_CONTEXT};
use cns_common::proto::{CsecInit, CSEC_MAGIC};
use cns_common::{err_ns, NsResult};
use log::{info, warn};
use orpc::message::FrameHeader;
use std::net::IpAddr;

/// Decides which connections must open with a security context and
/// validates the context they present.
#[derive(Debug, Clone)]
pub struct SecurityGate {
    enable: bool,
    secure_port: u16,
    trusted_hosts: Vec<String>,
}

impl SecurityGate {
    // Largest init frame body accepted before the context exists.
    pub const MAX_INIT_LEN: usize = 1024;

    pub fn new(conf: &NsConf) -> Self {
        Self {
            enable: conf.security.enable,
            secure_port: conf.server.secure_port,
            trusted_hosts: conf.security.trusted_hosts.clone(),
        }
    }

    /// Connections on the secure port need a context when security is on.
    pub fn required(&self, local_port: u16) -> bool {
        self.enable && local_port == self.secure_port
    }

    fn is_trusted(&self, ip: &IpAddr, host: &str) -> bool {
        if self.trusted_hosts.is_empty() {
            return true;
        }
        self.trusted_hosts
            .iter()
            .any(|h| h == host || (ip.is_loopback() && h == "localhost"))
    }

    pub fn is_init(header: &FrameHeader) -> bool {
        header.magic == CSEC_MAGIC
    }

    /// Validate the init frame; the identity it carries becomes the
    /// identity of every request on the connection.
    pub fn accept(&self, ip: &IpAddr, header: &FrameHeader, body: &[u8]) -> NsResult<(u32, u32)> {
        let host = ip.to_string();
        if !Self::is_init(header) {
            return err_ns!(ESEC_NO_CONTEXT, "{} sent a request before its security context", host);
        }
        let init = CsecInit::decode(header, body)?;
        if init.mech != CsecInit::MECH_ID {
            warn!("Unsupported security mechanism {} from {}", init.mech, host);
            return err_ns!(ESEC_BAD_CREDENTIALS, "mechanism {}", init.mech);
        }
        if !self.is_trusted(ip, &host) {
            warn!("Security context of {} refused, host is not trusted", host);
            return err_ns!(ESEC_BAD_CREDENTIALS, "untrusted host {}", host);
        }
        info!("Security context established for {}: uid {} gid {}", host, init.uid, init.gid);
        Ok((init.uid, init.gid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::proto::ProtocolVersion;

    fn init_frame(mech: &str) -> (FrameHeader, Vec<u8>) {
        let init = CsecInit {
            mech: mech.to_string(),
            uid: 501,
            gid: 20,
        };
        let buf = init.encode().unwrap();
        let mut head = [0u8; FrameHeader::SIZE];
        head.copy_from_slice(&buf[..FrameHeader::SIZE]);
        (FrameHeader::decode(&head), buf[FrameHeader::SIZE..].to_vec())
    }

    #[test]
    fn required_on_secure_port_only() {
        let mut conf = NsConf::default();
        let gate = SecurityGate::new(&conf);
        assert!(gate.required(conf.server.secure_port));
        assert!(!gate.required(conf.server.port));

        conf.security.enable = false;
        assert!(!SecurityGate::new(&conf).required(conf.server.secure_port));
    }

    #[test]
    fn trusted_host_gets_its_identity() {
        let mut conf = NsConf::default();
        conf.security.trusted_hosts = vec!["localhost".to_string()];
        let gate = SecurityGate::new(&conf);
        let (header, body) = init_frame(CsecInit::MECH_ID);

        let local: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(gate.accept(&local, &header, &body).unwrap(), (501, 20));

        let remote: IpAddr = "10.1.2.3".parse().unwrap();
        let err = gate.accept(&remote, &header, &body).unwrap_err();
        assert_eq!(err.code(), ESEC_BAD_CREDENTIALS);
    }

    #[test]
    fn rejects_unknown_mechanism_and_plain_requests() {
        let gate = SecurityGate::new(&NsConf::default());
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        let (header, body) = init_frame("KRB5");
        assert_eq!(gate.accept(&ip, &header, &body).unwrap_err().code(), ESEC_BAD_CREDENTIALS);

        let plain = FrameHeader::new(ProtocolVersion::CNS_MAGIC, 8, 40);
        assert_eq!(gate.accept(&ip, &plain, &[]).unwrap_err().code(), ESEC_NO_CONTEXT);
    }
}
