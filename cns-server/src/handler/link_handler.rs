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


use crate::handler::{NsHandler, ReplySink};
use crate::ns::{Credentials, ReqLog};
use cns_common::proto::{NsReader, ReplyType, CA_MAXGUIDLEN};
use cns_common::utils::{S_IFLNK, S_IWRITE};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

impl NsHandler {
    pub(crate) fn symlink(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let target = u.get_path()?;
        let linkname = u.get_path()?;
        ReqLog::log("symlink", &format!("symlink {} {}", target, linkname));

        if target.is_empty() {
            return err_ns!(libc::ENOENT, "empty link target");
        }
        let (mut parent, plock, base) = self.lock_parent(cred, cwd, &linkname, S_IWRITE)?;
        if base == "/" || base == "." || base == ".." {
            return err_ns!(libc::EEXIST, "{}", linkname);
        }
        let store = self.ctx.store().clone();
        if store.lock_child(self.db.start_tr(), parent.fileid, &base)?.is_some() {
            return err_ns!(libc::EEXIST, "{}", linkname);
        }

        let mut entry = self.new_entry(&parent, &base, S_IFLNK, 0o777, 0, cred)?;
        entry.filemode = S_IFLNK | 0o777;
        entry.acl.clear();
        let tx = self.db.start_tr();
        store.insert_file(tx, entry.clone())?;
        store.insert_symlink(tx, entry.fileid, &target)?;

        let now = Self::now();
        parent.nlink += 1;
        parent.mtime = now;
        parent.ctime = now;
        store.update_file(tx, &plock, &parent)
    }

    pub(crate) fn readlink(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("readlink", &format!("readlink {}", path));

        let entry = self.ctx.resolver(cred).lookup(cwd, &path, false)?;
        if !entry.is_link() {
            return err_ns!(libc::EINVAL, "{} is not a symbolic link", path);
        }
        let target = match self.ctx.store().symlink(entry.fileid) {
            Some(t) => t,
            None => return err_ns!(libc::ENOENT, "{}", path),
        };
        self.sink.data(|m| Ok(m.put_string(&target)?))
    }

    /// The path of the file named by `path` or `guid`, followed by the
    /// paths of the links whose target is that path.
    pub(crate) fn link_paths(&self, cred: &Credentials, cwd: u64, path: &str, guid: &str) -> NsResult<Vec<String>> {
        let resolver = self.ctx.resolver(cred);
        let entry = if path.is_empty() {
            resolver.by_guid(guid)?
        } else {
            resolver.lookup(cwd, path, true)?
        };
        let target = resolver.path_of(entry.fileid)?;

        let mut paths = vec![target.clone()];
        for id in self.ctx.store().links_to(&target) {
            match resolver.path_of(id) {
                Ok(p) => paths.push(p),
                Err(e) => log::warn!("Link {} to {} skipped: {}", id, target, e),
            }
        }
        Ok(paths)
    }

    pub(crate) fn getlinks(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        ReqLog::log("getlinks", &format!("getlinks {} {}", path, guid));

        let paths = self.link_paths(cred, cwd, &path, &guid)?;
        for chunk in Self::chunk_strings(&paths, ReplySink::MAX_BLOCK) {
            self.sink.block(ReplyType::MsgLinks, ReplySink::MAX_BLOCK, |m| {
                for p in chunk {
                    m.put_string(p)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Split strings into groups whose encoded size fits in `limit`.
    pub(crate) fn chunk_strings(items: &[String], limit: usize) -> Vec<&[String]> {
        let mut chunks = vec![];
        let mut start = 0;
        let mut size = 0;
        for (i, s) in items.iter().enumerate() {
            let n = s.len() + 1;
            if size + n > limit && i > start {
                chunks.push(&items[start..i]);
                start = i;
                size = 0;
            }
            size += n;
        }
        if start < items.len() {
            chunks.push(&items[start..]);
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_limit() {
        let items: Vec<String> = (0..10).map(|i| format!("/dir/f{}", i)).collect();
        let chunks = NsHandler::chunk_strings(&items, 20);
        assert_eq!(chunks.iter().map(|c| c.len()).sum::<usize>(), 10);
        for c in &chunks {
            assert!(c.iter().map(|s| s.len() + 1).sum::<usize>() <= 20);
        }
        assert!(NsHandler::chunk_strings(&[], 20).is_empty());
    }
}
