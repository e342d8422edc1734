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

use crate::api::CnsSession;
use cns_common::proto::{NsOpcode, NsReader, CA_MAXCOMMENTLEN, CA_MAXGUIDLEN, CA_MAXSFNLEN, CNS_ROOT_FILEID};
use cns_common::state::{FileStat, FileStatG};
use cns_common::{err_ns, NsResult};

/// Namespace operations: entries, attributes and comments.
impl CnsSession {
    pub async fn access(&mut self, path: &str, amode: u32) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Access)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(amode as i32)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Make `path` the current directory of this session.
    pub async fn chdir(&mut self, path: &str) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Chdir)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        let reply = self.call_path(server, req).await?;
        self.cwd = reply.reader().get_hyper()?;
        Ok(())
    }

    pub async fn getcwd(&mut self) -> NsResult<String> {
        let cwd = if self.cwd == 0 { CNS_ROOT_FILEID } else { self.cwd };
        self.getpath(None, cwd).await
    }

    pub async fn chmod(&mut self, path: &str, mode: u32) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Chmod)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(mode as i32)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Change owner and group; `u32::MAX` (-1) leaves one unchanged.
    pub async fn chown(&mut self, path: &str, uid: u32, gid: u32) -> NsResult<()> {
        self.chown0(NsOpcode::Chown, path, uid, gid).await
    }

    /// `chown` on a symbolic link itself.
    pub async fn lchown(&mut self, path: &str, uid: u32, gid: u32) -> NsResult<()> {
        self.chown0(NsOpcode::Lchown, path, uid, gid).await
    }

    async fn chown0(&mut self, opcode: NsOpcode, path: &str, uid: u32, gid: u32) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(opcode)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(uid as i32)?;
        req.put_long(gid as i32)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Create or truncate a regular file and return its fileid.
    pub async fn creat(&mut self, path: &str, mode: u32) -> NsResult<u64> {
        self.creat0(path, mode, None).await
    }

    /// `creat` recording a guid for the file.
    pub async fn creatg(&mut self, path: &str, guid: &str, mode: u32) -> NsResult<u64> {
        if guid.len() > CA_MAXGUIDLEN {
            return err_ns!(libc::EINVAL, "guid {}", guid);
        }
        self.creat0(path, mode, Some(guid)).await
    }

    async fn creat0(&mut self, path: &str, mode: u32, guid: Option<&str>) -> NsResult<u64> {
        let (server, path) = self.target(path)?;
        let opcode = if guid.is_some() { NsOpcode::CreatG } else { NsOpcode::Creat };
        let mut req = self.request(opcode)?;
        req.put_word(self.mask as u16)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(mode as i32)?;
        if let Some(guid) = guid {
            req.put_string(guid)?;
        }
        let reply = self.call_path(server, req).await?;
        let fileid = reply.reader().get_hyper()?;
        Ok(fileid)
    }

    /// Open with `O_CREAT`/`O_EXCL`/`O_TRUNC` semantics; returns the fileid.
    pub async fn open(&mut self, path: &str, oflag: i32, mode: u32) -> NsResult<u64> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Open)?;
        req.put_word(self.mask as u16)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(oflag)?;
        req.put_long(mode as i32)?;
        let reply = self.call_path(server, req).await?;
        let fileid = reply.reader().get_hyper()?;
        Ok(fileid)
    }

    pub async fn mkdir(&mut self, path: &str, mode: u32) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Mkdir)?;
        req.put_word(self.mask as u16)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_long(mode as i32)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn rename(&mut self, oldpath: &str, newpath: &str) -> NsResult<()> {
        let (server, oldpath) = self.target(oldpath)?;
        let (new_server, newpath) = self.target(newpath)?;
        if new_server.is_some() && new_server != server {
            return err_ns!(libc::EXDEV, "{} and {} are on different servers", oldpath, newpath);
        }
        let mut req = self.request(NsOpcode::Rename)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&oldpath)?;
        req.put_string(&newpath)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn rmdir(&mut self, path: &str) -> NsResult<()> {
        self.path_op(NsOpcode::Rmdir, path).await
    }

    pub async fn unlink(&mut self, path: &str) -> NsResult<()> {
        self.path_op(NsOpcode::Unlink, path).await
    }

    /// Logically delete a file, keeping its segments for undelete.
    pub async fn delete(&mut self, path: &str) -> NsResult<()> {
        self.path_op(NsOpcode::Delete, path).await
    }

    pub async fn undelete(&mut self, path: &str) -> NsResult<()> {
        self.path_op(NsOpcode::Undelete, path).await
    }

    pub async fn delcomment(&mut self, path: &str) -> NsResult<()> {
        self.path_op(NsOpcode::DelComment, path).await
    }

    async fn path_op(&mut self, opcode: NsOpcode, path: &str) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(opcode)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn stat(&mut self, path: &str) -> NsResult<FileStat> {
        self.stat0(NsOpcode::Stat, Some(path), 0).await
    }

    /// `stat` that does not follow a final symbolic link.
    pub async fn lstat(&mut self, path: &str) -> NsResult<FileStat> {
        self.stat0(NsOpcode::Lstat, Some(path), 0).await
    }

    /// `stat` by fileid.
    pub async fn statx(&mut self, fileid: u64) -> NsResult<FileStat> {
        if fileid == 0 {
            return err_ns!(libc::EINVAL, "fileid 0");
        }
        self.stat0(NsOpcode::Stat, None, fileid).await
    }

    async fn stat0(&mut self, opcode: NsOpcode, path: Option<&str>, fileid: u64) -> NsResult<FileStat> {
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(opcode)?;
        req.put_hyper(self.cwd)?;
        if opcode == NsOpcode::Stat {
            req.put_hyper(fileid)?;
        }
        req.put_string(&path)?;
        let reply = self.call_path(server, req).await?;
        let stat = FileStat::decode(&mut reply.reader())?;
        Ok(stat)
    }

    /// Attributes with guid and checksum, by path or, without a path, by guid.
    pub async fn statg(&mut self, path: Option<&str>, guid: &str) -> NsResult<FileStatG> {
        if path.map_or(true, |p| p.is_empty()) && guid.is_empty() {
            return err_ns!(libc::EFAULT, "neither path nor guid");
        }
        if guid.len() > CA_MAXGUIDLEN {
            return err_ns!(libc::EINVAL, "guid {}", guid);
        }
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(NsOpcode::StatG)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_string(guid)?;
        let reply = self.call_path(server, req).await?;
        let stat = FileStatG::decode(&mut reply.reader())?;
        Ok(stat)
    }

    /// Attributes of the file owning the replica `sfn`.
    pub async fn statr(&mut self, sfn: &str) -> NsResult<FileStatG> {
        if sfn.is_empty() {
            return err_ns!(libc::EFAULT, "empty sfn");
        }
        if sfn.len() > CA_MAXSFNLEN {
            return err_ns!(libc::ENAMETOOLONG, "sfn of {} bytes", sfn.len());
        }
        let mut req = self.request(NsOpcode::StatR)?;
        req.put_string(sfn)?;
        let reply = self.call_path(None, req).await?;
        let stat = FileStatG::decode(&mut reply.reader())?;
        Ok(stat)
    }

    /// Set the access time to now. The file is named by `fileid` when it
    /// is not 0, else by `path`.
    pub async fn setatime(&mut self, path: Option<&str>, fileid: u64) -> NsResult<()> {
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(NsOpcode::SetAtime)?;
        req.put_hyper(self.cwd)?;
        req.put_hyper(fileid)?;
        req.put_string(&path)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn setfsize(&mut self, path: Option<&str>, fileid: u64, filesize: u64) -> NsResult<()> {
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(NsOpcode::SetFsize)?;
        req.put_hyper(self.cwd)?;
        req.put_hyper(fileid)?;
        req.put_string(&path)?;
        req.put_hyper(filesize)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Set the size and checksum of the file with `guid`.
    pub async fn setfsizeg(&mut self, guid: &str, filesize: u64, csumtype: &str, csumvalue: &str) -> NsResult<()> {
        if guid.is_empty() {
            return err_ns!(libc::EFAULT, "empty guid");
        }
        if guid.len() > CA_MAXGUIDLEN || csumtype.len() > 2 || csumvalue.len() > 32 {
            return err_ns!(libc::EINVAL, "setfsizeg {} {} {}", guid, csumtype, csumvalue);
        }
        let mut req = self.request(NsOpcode::SetFsizeG)?;
        req.put_string(guid)?;
        req.put_hyper(filesize)?;
        req.put_string(csumtype)?;
        req.put_string(csumvalue)?;
        self.call(None, req, 0).await?;
        Ok(())
    }

    /// Set access and modification times, or both to now when `times` is None.
    pub async fn utime(&mut self, path: &str, times: Option<(i64, i64)>) -> NsResult<()> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Utime)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        match times {
            Some((atime, mtime)) => {
                req.put_long(1)?;
                req.put_time(atime)?;
                req.put_time(mtime)?;
            }
            None => req.put_long(0)?,
        }
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Full path of `fileid`.
    pub async fn getpath(&mut self, server: Option<&str>, fileid: u64) -> NsResult<String> {
        let mut req = self.request(NsOpcode::GetPath)?;
        req.put_hyper(fileid)?;
        let reply = self.call_path(server, req).await?;
        let path = reply.reader().get_path()?;
        Ok(path)
    }

    pub async fn setcomment(&mut self, path: &str, comment: &str) -> NsResult<()> {
        if comment.len() > CA_MAXCOMMENTLEN {
            return err_ns!(libc::EINVAL, "comment of {} bytes", comment.len());
        }
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::SetComment)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        req.put_string(comment)?;
        self.call_path(server, req).await?;
        Ok(())
    }

    pub async fn getcomment(&mut self, path: &str) -> NsResult<String> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::GetComment)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        let reply = self.call_path(server, req).await?;
        let comment = reply.reader().get_str(CA_MAXCOMMENTLEN)?;
        Ok(comment)
    }
}
