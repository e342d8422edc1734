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


use crate::meta::MetaStore;
use crate::ns::{Credentials, PermChecker};
use cns_common::error::serrno::{SELOOP, SENAMETOOLONG};
use cns_common::proto::{CA_MAXPATHLEN, CA_MAXSYMLINKS, CNS_ROOT_FILEID};
use cns_common::state::FileMetadata;
use cns_common::utils::{PathUtils, S_IEXEC};
use cns_common::{err_ns, NsResult};
use std::collections::VecDeque;

/// Walks paths through the namespace on behalf of one caller.
///
/// Resolution is a loop over a queue of remaining components: `.` is
/// skipped, `..` moves to the parent (staying at "/"), a symbolic link is
/// replaced by the components of its target. Every directory traversed
/// must grant search permission. Rows are read without locks; handlers
/// lock what they found by fileid, which re-reads the row.
pub struct PathResolver<'a> {
    store: &'a MetaStore,
    perm: &'a PermChecker,
    cred: &'a Credentials,
}

impl<'a> PathResolver<'a> {
    pub fn new(store: &'a MetaStore, perm: &'a PermChecker, cred: &'a Credentials) -> Self {
        Self { store, perm, cred }
    }

    fn file(&self, fileid: u64) -> NsResult<FileMetadata> {
        match self.store.file(fileid) {
            Some(f) => Ok(f),
            None => err_ns!(libc::ENOENT, "fileid {}", fileid),
        }
    }

    /// Where resolution of `path` begins: "/" or the current directory.
    fn start(&self, cwd: u64, path: &str) -> NsResult<FileMetadata> {
        if PathUtils::is_absolute(path) {
            return self.file(CNS_ROOT_FILEID);
        }
        if cwd == 0 {
            return if path.is_empty() {
                err_ns!(libc::ENOENT)
            } else {
                err_ns!(libc::EINVAL, "relative path {} without working directory", path)
            };
        }
        let dir = self.file(cwd)?;
        if !dir.is_dir() {
            return err_ns!(libc::ENOTDIR, "fileid {}", cwd);
        }
        Ok(dir)
    }

    fn search(&self, dir: &FileMetadata) -> NsResult<()> {
        if !dir.is_dir() {
            return err_ns!(libc::ENOTDIR, "{}", dir.name);
        }
        self.perm.check(dir, S_IEXEC, self.cred)
    }

    /// Resolve `path` from `start`. The last component is followed when it
    /// is a link and `follow_last` is set; soft deleted entries are returned.
    pub fn walk(&self, start: FileMetadata, path: &str, follow_last: bool) -> NsResult<FileMetadata> {
        let mut queue: VecDeque<String> = PathUtils::components(path).map(String::from).collect();
        let mut cur = start;
        let mut hops = 0;

        while let Some(comp) = queue.pop_front() {
            if comp == "." {
                continue;
            }
            self.search(&cur)?;
            if comp == ".." {
                if cur.fileid != CNS_ROOT_FILEID {
                    cur = self.file(cur.parent_fileid)?;
                }
                continue;
            }

            let child = match self.store.child(cur.fileid, &comp) {
                Some(c) => c,
                None => return err_ns!(libc::ENOENT, "{}", comp),
            };
            if child.is_link() && (follow_last || !queue.is_empty()) {
                hops += 1;
                if hops > CA_MAXSYMLINKS {
                    return err_ns!(SELOOP, "{}", path);
                }
                let target = match self.store.symlink(child.fileid) {
                    Some(t) => t,
                    None => return err_ns!(libc::ENOENT, "dangling link {}", comp),
                };
                if PathUtils::is_absolute(&target) {
                    cur = self.file(CNS_ROOT_FILEID)?;
                }
                for c in PathUtils::components(&target).rev() {
                    queue.push_front(c.to_string());
                }
                continue;
            }
            cur = child;
        }
        Ok(cur)
    }

    /// The live entry named by `path`.
    pub fn lookup(&self, cwd: u64, path: &str, follow: bool) -> NsResult<FileMetadata> {
        let start = self.start(cwd, path)?;
        let entry = self.walk(start, path, follow)?;
        if entry.is_deleted() {
            return err_ns!(libc::ENOENT, "{}", path);
        }
        Ok(entry)
    }

    /// The directory named by `path`, which must grant `mode`.
    pub fn dir(&self, cwd: u64, path: &str, mode: u32) -> NsResult<FileMetadata> {
        let dir = self.lookup(cwd, path, true)?;
        if !dir.is_dir() {
            return err_ns!(libc::ENOTDIR, "{}", path);
        }
        if mode != 0 {
            self.perm.check(&dir, mode, self.cred)?;
        }
        Ok(dir)
    }

    /// The parent directory of `path` and the basename. The parent must
    /// grant search permission plus `mode`. "/" is its own basename.
    pub fn parent(&self, cwd: u64, path: &str, mode: u32) -> NsResult<(FileMetadata, String)> {
        let (dir, base) = PathUtils::split_name(path)?;
        let start = self.start(cwd, path)?;
        let parent = self.walk(start, dir, true)?;
        if !parent.is_dir() {
            return err_ns!(libc::ENOTDIR, "{}", dir);
        }
        self.perm.check(&parent, S_IEXEC | mode, self.cred)?;
        Ok((parent, base.to_string()))
    }

    /// Search permission on `fileid` and every directory above it.
    pub fn back_perm(&self, fileid: u64) -> NsResult<()> {
        let mut id = fileid;
        while id != 0 {
            let dir = self.file(id)?;
            self.search(&dir)?;
            id = dir.parent_fileid;
        }
        Ok(())
    }

    /// The live entry `fileid`, reachable by the caller.
    pub fn by_fileid(&self, fileid: u64) -> NsResult<FileMetadata> {
        let entry = self.file(fileid)?;
        if entry.is_deleted() {
            return err_ns!(libc::ENOENT, "fileid {}", fileid);
        }
        self.back_perm(entry.parent_fileid)?;
        Ok(entry)
    }

    /// The live entry with `guid`, reachable by the caller.
    pub fn by_guid(&self, guid: &str) -> NsResult<FileMetadata> {
        let entry = match self.store.file_by_guid(guid) {
            Some(f) if !f.is_deleted() => f,
            _ => return err_ns!(libc::ENOENT, "guid {}", guid),
        };
        self.back_perm(entry.parent_fileid)?;
        Ok(entry)
    }

    /// `cwd`/`path` lookup, or by fileid when one is given.
    pub fn lookup_or_id(&self, cwd: u64, fileid: u64, path: &str, follow: bool) -> NsResult<FileMetadata> {
        if fileid != 0 {
            self.by_fileid(fileid)
        } else {
            self.lookup(cwd, path, follow)
        }
    }

    /// Absolute path of an entry.
    pub fn path_of(&self, fileid: u64) -> NsResult<String> {
        let mut names = vec![];
        let mut id = fileid;
        while id != CNS_ROOT_FILEID {
            let entry = self.file(id)?;
            names.push(entry.name);
            id = entry.parent_fileid;
            if id == 0 {
                return err_ns!(libc::ENOENT, "fileid {} is not attached", fileid);
            }
        }
        names.reverse();
        let path = format!("/{}", names.join("/"));
        if path.len() > CA_MAXPATHLEN {
            return err_ns!(SENAMETOOLONG, "path of {}", fileid);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ns::Privileges;
    use cns_common::conf::{PrivilegeConf, StoreConf};
    use cns_common::utils::{S_IFDIR, S_IFLNK, S_IFREG};

    struct Fixture {
        store: MetaStore,
        perm: PermChecker,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MetaStore::new(&StoreConf::default()).unwrap(),
                perm: PermChecker::new(Privileges::new(&PrivilegeConf::default())),
            }
        }

        fn add(&self, parent: u64, name: &str, mode: u32) -> u64 {
            let mut tx = self.store.begin();
            let fileid = self.store.next_fileid();
            let row = FileMetadata {
                fileid,
                parent_fileid: parent,
                name: name.to_string(),
                filemode: mode,
                uid: 100,
                gid: 10,
                status: b'-',
                ..Default::default()
            };
            self.store.insert_file(&mut tx, row).unwrap();
            self.store.commit(&mut tx);
            fileid
        }

        fn link(&self, parent: u64, name: &str, target: &str) -> u64 {
            let id = self.add(parent, name, S_IFLNK | 0o777);
            let mut tx = self.store.begin();
            self.store.insert_symlink(&mut tx, id, target).unwrap();
            self.store.commit(&mut tx);
            id
        }
    }

    #[test]
    fn dot_and_dotdot() {
        let f = Fixture::new();
        let a = f.add(CNS_ROOT_FILEID, "a", S_IFDIR | 0o755);
        let b = f.add(a, "b", S_IFREG | 0o644);
        let cred = Credentials::new(100, 10, "h");
        let r = PathResolver::new(&f.store, &f.perm, &cred);

        assert_eq!(r.lookup(0, "/a/./b", true).unwrap().fileid, b);
        assert_eq!(r.lookup(0, "/../../a/b", true).unwrap().fileid, b);
        assert_eq!(r.lookup(a, "../a//b", true).unwrap().fileid, b);
        assert_eq!(r.lookup(0, "/", true).unwrap().fileid, CNS_ROOT_FILEID);
        assert_eq!(r.lookup(0, "/a/b/c", true).unwrap_err().code(), libc::ENOTDIR);
        assert_eq!(r.lookup(0, "/a/x", true).unwrap_err().code(), libc::ENOENT);
        assert_eq!(r.lookup(0, "a/b", true).unwrap_err().code(), libc::EINVAL);
        assert_eq!(r.path_of(b).unwrap(), "/a/b");
    }

    #[test]
    fn links_are_followed_within_limit() {
        let f = Fixture::new();
        let d = f.add(CNS_ROOT_FILEID, "d", S_IFDIR | 0o755);
        let target = f.add(d, "t", S_IFREG | 0o644);
        f.link(CNS_ROOT_FILEID, "l0", "/d/t");
        for i in 1..=5 {
            f.link(CNS_ROOT_FILEID, &format!("l{}", i), &format!("l{}", i - 1));
        }
        f.link(CNS_ROOT_FILEID, "l6", "l5");

        let cred = Credentials::new(100, 10, "h");
        let r = PathResolver::new(&f.store, &f.perm, &cred);
        assert_eq!(r.lookup(0, "/l4", true).unwrap().fileid, target);
        // l5 needs six hops.
        assert_eq!(r.lookup(0, "/l5", true).unwrap_err().code(), SELOOP);
        assert_eq!(r.lookup(0, "/l6", true).unwrap_err().code(), SELOOP);
        assert!(r.lookup(0, "/l6", false).unwrap().is_link());
    }

    #[test]
    fn link_target_components_keep_their_order() {
        let f = Fixture::new();
        let d = f.add(CNS_ROOT_FILEID, "d", S_IFDIR | 0o755);
        let x = f.add(d, "x", S_IFDIR | 0o755);
        let y = f.add(x, "y", S_IFDIR | 0o755);
        let z = f.add(y, "z", S_IFREG | 0o644);
        f.link(CNS_ROOT_FILEID, "rel", "d/x");
        f.link(d, "abs", "/d/x/y");

        let cred = Credentials::new(100, 10, "h");
        let r = PathResolver::new(&f.store, &f.perm, &cred);
        assert_eq!(r.lookup(0, "/rel/y/z", true).unwrap().fileid, z);
        assert_eq!(r.lookup(0, "/d/abs/z", true).unwrap().fileid, z);
    }

    #[test]
    fn search_permission_required() {
        let f = Fixture::new();
        let p = f.add(CNS_ROOT_FILEID, "private", S_IFDIR | 0o700);
        let inner = f.add(p, "f", S_IFREG | 0o644);

        let stranger = Credentials::new(300, 30, "h");
        let r = PathResolver::new(&f.store, &f.perm, &stranger);
        assert_eq!(r.lookup(0, "/private/f", true).unwrap_err().code(), libc::EACCES);
        assert_eq!(r.by_fileid(inner).unwrap_err().code(), libc::EACCES);

        let (parent, base) = r.parent(0, "/private", 0).unwrap();
        assert_eq!(parent.fileid, CNS_ROOT_FILEID);
        assert_eq!(base, "private");
    }
}
