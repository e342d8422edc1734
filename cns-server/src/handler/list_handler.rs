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
use crate::meta::{DirItem, ListCursor, MetaStore, OpenList};
use crate::ns::{Credentials, ReqLog};
use cns_common::error::serrno::SEINTERNAL;
use cns_common::proto::*;
use cns_common::state::{DirEntry, DirEntryX, DirEntryXT, FileReplica};
use cns_common::utils::{S_IEXEC, S_IREAD};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

/// Client side size of one entry at `level`, never below what the entry
/// takes on the wire so that a full budget always fits in one reply.
fn dirent_size(level: u16, direntsz: usize) -> usize {
    let min = match level {
        CNS_RDD_NAMES => DIRENT_NAME_SIZE,
        CNS_RDD_DIRX | CNS_RDD_DIRXR => DIRENTX_SIZE,
        CNS_RDD_DIRXT => DIRENTXT_SIZE,
        CNS_RDD_COMMENT => DIRENTC_SIZE,
        _ => DIRENTXC_SIZE,
    };
    direntsz.max(min)
}

/// Budget taken by one entry: the client structure plus the variable part,
/// rounded up to 8 bytes.
fn charge(direntsz: usize, var_len: usize, with_comment: bool) -> usize {
    if with_comment {
        (direntsz + var_len + 9) / 8 * 8
    } else {
        (direntsz + var_len + 8) / 8 * 8
    }
}

/// Take cursor items while `cost` fits the budget. `cost` returns the size
/// checked against what is left and the size then taken from it. The first
/// item is always taken so that every block moves the cursor.
fn fill<T>(cursor: &mut ListCursor<T>, mut budget: usize, cost: impl Fn(&T) -> (usize, usize)) -> Vec<T> {
    let mut taken = vec![];
    while let Some(item) = cursor.peek() {
        let (need, take) = cost(item);
        if need > budget && !taken.is_empty() {
            break;
        }
        budget = budget.saturating_sub(take);
        if let Some(item) = cursor.advance() {
            taken.push(item);
        }
    }
    taken
}

/// The readdir form of one directory item, `None` when the entry went away
/// after the listing started.
fn dir_entry(store: &MetaStore, item: &DirItem, level: u16) -> Option<DirEntry> {
    let fileid = match item {
        DirItem::Seg(xt) => return Some(DirEntry::Xt(xt.clone())),
        DirItem::Entry(id) => *id,
    };
    let file = store.file(fileid).filter(|f| !f.is_deleted())?;
    let x = || DirEntryX {
        stat: file.to_stat(),
        name: file.name.clone(),
    };
    let entry = match level {
        CNS_RDD_NAMES => DirEntry::Name(file.name.clone()),
        CNS_RDD_DIRX => DirEntry::X(x()),
        CNS_RDD_COMMENT => DirEntry::C {
            name: file.name.clone(),
            comment: store.comment(fileid).unwrap_or_default(),
        },
        CNS_RDD_DIRXC => DirEntry::Xc {
            entry: x(),
            comment: store.comment(fileid).unwrap_or_default(),
        },
        _ => DirEntry::Xr {
            entry: x(),
            replicas: store.replicas_of(fileid),
        },
    };
    Some(entry)
}

impl NsHandler {
    pub(crate) fn opendir(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("opendir", &format!("opendir {}", path));

        if cwd == 0 && path.is_empty() {
            return err_ns!(libc::ENOENT, "empty path");
        }
        if cwd == 0 && !path.starts_with('/') {
            return err_ns!(libc::EINVAL, "relative path {} without a working directory", path);
        }
        let dir = if path == "." {
            match self.ctx.store().file(cwd) {
                Some(d) => d,
                None => return err_ns!(libc::ENOENT, "fileid {}", cwd),
            }
        } else {
            self.ctx.resolver(cred).dir(cwd, &path, S_IREAD | S_IEXEC)?
        };

        self.release_list();
        self.list = Some(OpenList::dir(dir.fileid));
        self.sink.data(|m| Ok(m.put_hyper(dir.fileid)?))
    }

    /// Snapshot of a directory for a listing at `level`.
    fn dir_items(&self, cred: &Credentials, dir_fileid: u64, level: u16) -> NsResult<Vec<DirItem>> {
        let dir = self.ctx.resolver(cred).by_fileid(dir_fileid)?;
        if !dir.is_dir() {
            return err_ns!(libc::ENOTDIR, "fileid {}", dir_fileid);
        }
        self.ctx.perm().check(&dir, S_IREAD, cred)?;

        let store = self.ctx.store();
        let mut items = vec![];
        for child in store.children(dir_fileid).into_iter().filter(|f| !f.is_deleted()) {
            if level != CNS_RDD_DIRXT {
                items.push(DirItem::Entry(child.fileid));
                continue;
            }
            for seg in store.segments_of(child.fileid) {
                items.push(DirItem::Seg(DirEntryXT {
                    parent_fileid: child.parent_fileid,
                    seg,
                    name: child.name.clone(),
                }));
            }
        }
        Ok(items)
    }

    pub(crate) fn readdir(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let level = u.get_word()?;
        let direntsz = u.get_word()? as usize;
        let dir_fileid = u.get_hyper()?;
        let bod = u.get_word()?;
        if level > CNS_RDD_DIRXR {
            return err_ns!(libc::EINVAL, "readdir level {}", level);
        }
        let direntsz = dirent_size(level, direntsz);

        let open = matches!(
            &self.list,
            Some(OpenList::Dir { fileid, level: l, cursor: Some(_) }) if *fileid == dir_fileid && *l == level
        );
        if bod != 0 || !open {
            let items = self.dir_items(cred, dir_fileid, level)?;
            self.release_list();
            self.list = Some(OpenList::Dir {
                fileid: dir_fileid,
                level,
                cursor: Some(ListCursor::new(items)),
            });
        }
        let cursor = match &mut self.list {
            Some(OpenList::Dir { cursor: Some(c), .. }) => c,
            _ => return err_ns!(SEINTERNAL, "no cursor on directory {}", dir_fileid),
        };

        let store = self.ctx.store().clone();
        let with_comment = matches!(level, CNS_RDD_COMMENT | CNS_RDD_DIRXC);
        let mut budget = DIRBUFSZ - direntsz;
        let mut entries = vec![];
        while let Some(item) = cursor.peek() {
            let entry = match dir_entry(&store, item, level) {
                Some(e) => e,
                None => {
                    cursor.advance();
                    continue;
                }
            };
            let var_len = entry.var_len();
            if var_len > budget && !entries.is_empty() {
                break;
            }
            budget = budget.saturating_sub(charge(direntsz, var_len, with_comment));
            entries.push(entry);
            cursor.advance();
        }
        let eod = cursor.is_exhausted();

        if eod {
            let tx = self.db.start_tr();
            let (mut dir, lease) = store.lock_file(tx, dir_fileid)?;
            dir.atime = Self::now();
            store.update_file(tx, &lease, &dir)?;
        }

        if level == CNS_RDD_DIRXR && !entries.is_empty() {
            self.sink.block(ReplyType::MsgReplicP, ReplySink::MAX_BLOCK, |m| {
                for e in &entries {
                    if let DirEntry::Xr { replicas, .. } = e {
                        m.put_word(replicas.len() as u16)?;
                        for r in replicas {
                            r.encode(m)?;
                        }
                    }
                }
                Ok(())
            })?;
        }
        let caps = self.caps;
        self.sink.data(|m| {
            m.put_word(entries.len() as u16)?;
            for e in &entries {
                e.encode(m, caps)?;
            }
            m.put_word(eod as u16)?;
            Ok(())
        })
    }

    pub(crate) fn listtape(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let direntsz = dirent_size(CNS_RDD_DIRXT, u.get_word()? as usize);
        let vid = u.get_str(CA_MAXVIDLEN)?;
        let bov = u.get_word()?;
        ReqLog::log("listtape", &format!("listtape {} {}", vid, bov));

        if bov != 0 || !matches!(self.list, Some(OpenList::Tape(_))) {
            let store = self.ctx.store();
            let items: Vec<DirEntryXT> = store
                .segments_on(&vid)
                .into_iter()
                .filter_map(|seg| {
                    let file = store.file(seg.s_fileid)?;
                    Some(DirEntryXT {
                        parent_fileid: file.parent_fileid,
                        seg,
                        name: file.name,
                    })
                })
                .collect();
            self.release_list();
            self.list = Some(OpenList::Tape(ListCursor::new(items)));
        }
        let cursor = match &mut self.list {
            Some(OpenList::Tape(c)) => c,
            _ => return err_ns!(SEINTERNAL, "no cursor on volume {}", vid),
        };
        let entries = fill(cursor, DIRBUFSZ - direntsz, |xt| {
            (xt.name.len(), charge(direntsz, xt.name.len(), false))
        });
        let eov = cursor.is_exhausted();

        let caps = self.caps;
        self.sink.data(|m| {
            m.put_word(entries.len() as u16)?;
            for xt in &entries {
                xt.encode(m, caps)?;
            }
            m.put_word(eov as u16)?;
            Ok(())
        })
    }

    pub(crate) fn listclass(&mut self, _cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let listentsz = u.get_word()? as usize;
        let bol = u.get_word()?;
        ReqLog::log("listclass", &format!("listclass {}", bol));

        if bol != 0 || !matches!(self.list, Some(OpenList::Class(_))) {
            let ids = self.ctx.store().class_ids();
            self.release_list();
            self.list = Some(OpenList::Class(ListCursor::new(ids)));
        }
        let cursor = match &mut self.list {
            Some(OpenList::Class(c)) => c,
            _ => return err_ns!(SEINTERNAL, "no class cursor"),
        };

        let store = self.ctx.store().clone();
        let mut budget = LISTBUFSZ;
        let mut classes = vec![];
        while let Some(classid) = cursor.peek() {
            let class = match store.class(*classid) {
                Some(c) => c,
                None => {
                    cursor.advance();
                    continue;
                }
            };
            let need = listentsz.max(class.wire_size());
            if need > budget && !classes.is_empty() {
                break;
            }
            budget = budget.saturating_sub(need);
            classes.push(class);
            cursor.advance();
        }
        let eol = cursor.is_exhausted();

        self.sink.block(ReplyType::MsgData, LISTBUFSZ + 4, |m| {
            m.put_word(classes.len() as u16)?;
            for c in &classes {
                c.encode(m)?;
            }
            m.put_word(eol as u16)?;
            Ok(())
        })
    }

    pub(crate) fn listreplica(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let listentsz = u.get_word()? as usize;
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        let bol = u.get_word()?;
        ReqLog::log("listreplica", &format!("listreplica {} {} {}", path, guid, bol));

        if bol != 0 || !matches!(self.list, Some(OpenList::Replica(_))) {
            let resolver = self.ctx.resolver(cred);
            let entry = if path.is_empty() {
                resolver.by_guid(&guid)?
            } else {
                resolver.lookup(cwd, &path, true)?
            };
            if entry.is_dir() {
                return err_ns!(libc::EISDIR, "{}", path);
            }
            let replicas = self.ctx.store().replicas_of(entry.fileid);
            self.release_list();
            self.list = Some(OpenList::Replica(ListCursor::new(replicas)));
        }
        let cursor = match &mut self.list {
            Some(OpenList::Replica(c)) => c,
            _ => return err_ns!(SEINTERNAL, "no replica cursor"),
        };
        let entries: Vec<FileReplica> = fill(cursor, LISTBUFSZ, |r| {
            let n = listentsz.max(r.wire_size());
            (n, n)
        });
        let eol = cursor.is_exhausted();

        self.sink.block(ReplyType::MsgData, LISTBUFSZ + 4, |m| {
            m.put_word(entries.len() as u16)?;
            for r in &entries {
                r.encode(m)?;
            }
            m.put_word(eol as u16)?;
            Ok(())
        })
    }

    pub(crate) fn listlinks(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let listentsz = u.get_word()? as usize;
        let cwd = u.get_hyper()?;
        let path = u.get_path()?;
        let guid = u.get_str(CA_MAXGUIDLEN)?;
        let bol = u.get_word()?;
        ReqLog::log("listlinks", &format!("listlinks {} {} {}", path, guid, bol));

        if bol != 0 || !matches!(self.list, Some(OpenList::Links(_))) {
            let paths = self.link_paths(cred, cwd, &path, &guid)?;
            self.release_list();
            self.list = Some(OpenList::Links(ListCursor::new(paths)));
        }
        let cursor = match &mut self.list {
            Some(OpenList::Links(c)) => c,
            _ => return err_ns!(SEINTERNAL, "no link cursor"),
        };
        let paths = fill(cursor, LISTBUFSZ, |p| {
            let n = listentsz.max(p.len() + 1);
            (n, n)
        });
        let eol = cursor.is_exhausted();

        self.sink.block(ReplyType::MsgData, LISTBUFSZ + 4, |m| {
            m.put_word(paths.len() as u16)?;
            for p in &paths {
                m.put_string(p)?;
            }
            m.put_word(eol as u16)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_sizes_round_to_eight() {
        assert_eq!(charge(12, 1, false), 16);
        assert_eq!(charge(12, 4, false), 24);
        assert_eq!(charge(16, 3, true), 24);
        assert_eq!(dirent_size(CNS_RDD_DIRX, 0), DIRENTX_SIZE);
        assert_eq!(dirent_size(CNS_RDD_NAMES, 100), 100);
    }

    #[test]
    fn fill_keeps_the_item_that_does_not_fit() {
        let mut cursor = ListCursor::new(vec![10usize, 10, 30, 5]);
        let first = fill(&mut cursor, 40, |n| (*n, *n));
        assert_eq!(first, vec![10, 10]);
        assert_eq!(cursor.peek(), Some(&30));
        let rest = fill(&mut cursor, 40, |n| (*n, *n));
        assert_eq!(rest, vec![30, 5]);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn fill_always_moves_past_an_oversized_item() {
        let mut cursor = ListCursor::new(vec![10usize, 500, 10]);
        assert_eq!(fill(&mut cursor, 40, |n| (*n, *n)), vec![10]);
        assert_eq!(fill(&mut cursor, 40, |n| (*n, *n)), vec![500]);
        assert_eq!(fill(&mut cursor, 40, |n| (*n, *n)), vec![10]);
        assert!(cursor.is_exhausted());
    }
}
