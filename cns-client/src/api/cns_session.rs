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

use crate::transport::{NsChannel, NsReply, RequestBuilder};
use cns_common::conf::ClientConf;
use cns_common::error::serrno::SENAMETOOLONG;
use cns_common::error::NsError;
use cns_common::proto::{Capabilities, NsOpcode, ProtocolVersion, CA_MAXPATHLEN, REPBUFSZ};
use cns_common::utils::PathUtils;
use cns_common::{err_ns, NsResult};
use log::debug;
use nix::unistd::{getegid, geteuid};

/// Client state of one caller: default server, identity, current
/// directory, umask and the connection kept open by listings,
/// transactions and sessions.
pub struct CnsSession {
    conf: ClientConf,
    version: ProtocolVersion,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) cwd: u64,
    pub(crate) mask: u32,
    channel: Option<NsChannel>,
    errors: Vec<String>,
}

impl CnsSession {
    pub const DEFAULT_MASK: u32 = 0o022;

    pub fn new(conf: ClientConf) -> Self {
        Self::with_identity(conf, geteuid().as_raw(), getegid().as_raw())
    }

    pub fn with_identity(conf: ClientConf, uid: u32, gid: u32) -> Self {
        let version = conf.protocol();
        Self {
            conf,
            version,
            uid,
            gid,
            cwd: 0,
            mask: Self::DEFAULT_MASK,
            channel: None,
            errors: vec![],
        }
    }

    pub fn conf(&self) -> &ClientConf {
        &self.conf
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub(crate) fn caps(&self) -> Capabilities {
        self.version.caps()
    }

    pub fn identity(&self) -> (u32, u32) {
        (self.uid, self.gid)
    }

    /// Set the file creation mask and return the previous one.
    pub fn umask(&mut self, mask: u32) -> u32 {
        std::mem::replace(&mut self.mask, mask & 0o777)
    }

    /// Fileid of the current directory, 0 before any chdir.
    pub fn cwd(&self) -> u64 {
        self.cwd
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Drop the persistent connection without telling the server; it
    /// aborts whatever was left open.
    pub fn disconnect(&mut self) {
        self.channel = None;
    }

    /// Diagnostics the server sent since the last call.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn request(&self, opcode: NsOpcode) -> NsResult<RequestBuilder> {
        RequestBuilder::new(self.version, opcode, self.uid, self.gid)
    }

    pub(crate) fn check_path(path: &str) -> NsResult<()> {
        if path.is_empty() {
            return err_ns!(libc::ENOENT, "empty path");
        }
        if path.len() > CA_MAXPATHLEN {
            return err_ns!(libc::ENAMETOOLONG, "path of {} bytes", path.len());
        }
        Ok(())
    }

    /// Split an optional `server:` prefix off `path` and anchor a relative
    /// path at the home directory when no current directory is set.
    pub(crate) fn target<'a>(&self, path: &'a str) -> NsResult<(Option<&'a str>, String)> {
        Self::check_path(path)?;
        let (server, path) = match PathUtils::split_server(path) {
            Some((s, p)) => (Some(s), p),
            None => (None, path),
        };
        let path = if !PathUtils::is_absolute(path) && self.cwd == 0 && !self.conf.home.is_empty() {
            PathUtils::join(&self.conf.home, path)
        } else {
            path.to_string()
        };
        Self::check_path(&path)?;
        Ok((server, path))
    }

    /// `target` for calls where a fileid or guid may replace the path.
    pub(crate) fn target_opt<'a>(&self, path: Option<&'a str>) -> NsResult<(Option<&'a str>, String)> {
        match path {
            Some(p) if !p.is_empty() => self.target(p),
            _ => Ok((None, String::new())),
        }
    }

    /// Send one request and collect its reply. A non-zero status becomes
    /// the error, with the server's diagnostics as its message.
    pub(crate) async fn call(
        &mut self,
        server: Option<&str>,
        req: RequestBuilder,
        capacity: usize,
    ) -> NsResult<NsReply> {
        let opcode = req.opcode();
        let buf = req.finish()?;

        let mut channel = match self.channel.take() {
            Some(c) => c,
            None => {
                let host = server.unwrap_or(self.conf.host.as_str()).to_string();
                NsChannel::connect(&self.conf, &host, self.uid, self.gid).await?
            }
        };

        let mut reply = NsReply::default();
        let res = async {
            channel.send(&buf).await?;
            channel.recv(capacity, &mut reply).await
        }
        .await;

        // Errors and the final status both end the connection.
        if let Ok(true) = res {
            self.channel = Some(channel);
        }
        self.errors.extend(reply.errors.iter().cloned());
        res?;

        if reply.status != 0 {
            debug!("{} returned {}", opcode.name(), reply.status);
            return if reply.errors.is_empty() {
                Err(NsError::new(reply.status))
            } else {
                Err(NsError::with_msg(reply.status, reply.errors.join("; ")))
            };
        }
        Ok(reply)
    }

    /// `call` for path bearing requests.
    pub(crate) async fn call_path(&mut self, server: Option<&str>, req: RequestBuilder) -> NsResult<NsReply> {
        self.call(server, req, REPBUFSZ)
            .await
            .map_err(|e| e.remap(SENAMETOOLONG, libc::ENAMETOOLONG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(home: &str) -> CnsSession {
        let conf = ClientConf {
            home: home.to_string(),
            ..Default::default()
        };
        CnsSession::with_identity(conf, 501, 100)
    }

    #[test]
    fn target_splits_server_and_anchors_home() {
        let s = session("/castor/home/u");
        let (server, path) = s.target("nshost:/a/b").unwrap();
        assert_eq!(server, Some("nshost"));
        assert_eq!(path, "/a/b");

        let (server, path) = s.target("f1").unwrap();
        assert_eq!(server, None);
        assert_eq!(path, "/castor/home/u/f1");
    }

    #[test]
    fn path_bounds_are_checked_locally() {
        let s = session("");
        assert_eq!(s.target("").unwrap_err().code(), libc::ENOENT);
        let long = format!("/{}", "a".repeat(CA_MAXPATHLEN));
        assert_eq!(s.target(&long).unwrap_err().code(), libc::ENAMETOOLONG);
    }

    #[test]
    fn umask_returns_previous() {
        let mut s = session("");
        assert_eq!(s.umask(0o077), CnsSession::DEFAULT_MASK);
        assert_eq!(s.umask(0o022), 0o077);
    }
}
