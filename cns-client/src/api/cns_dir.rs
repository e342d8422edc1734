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

use crate::api::cns_list::decode_block;
use crate::api::CnsSession;
use cns_common::proto::*;
use cns_common::state::{DirEntry, DirEntryX, DirEntryXT, FileReplica};
use cns_common::{err_ns, NsResult};
use log::debug;
use orpc::codec::Unmarshaller;
use std::collections::VecDeque;

/// An open directory. Entries are fetched from the server a buffer at a
/// time; the connection stays open until [`CnsSession::closedir`].
#[derive(Debug)]
pub struct CnsDir {
    fileid: u64,
    level: u16,
    bod: bool,
    eod: bool,
    entries: VecDeque<DirEntry>,
}

impl CnsDir {
    pub fn fileid(&self) -> u64 {
        self.fileid
    }

    fn reset(&mut self, level: u16) {
        self.level = level;
        self.bod = true;
        self.eod = false;
        self.entries.clear();
    }
}

fn dirent_size(level: u16) -> usize {
    match level {
        CNS_RDD_NAMES => DIRENT_NAME_SIZE,
        CNS_RDD_DIRX | CNS_RDD_DIRXR => DIRENTX_SIZE,
        CNS_RDD_DIRXT => DIRENTXT_SIZE,
        CNS_RDD_COMMENT => DIRENTC_SIZE,
        _ => DIRENTXC_SIZE,
    }
}

/// Replica lists of a readdirxr reply, one per entry in order.
fn decode_replicas(blocks: &[Vec<u8>], count: usize) -> NsResult<Vec<Vec<FileReplica>>> {
    let mut lists = Vec::with_capacity(count);
    for block in blocks {
        let mut u = Unmarshaller::new(block);
        while !u.is_empty() {
            let nrep = u.get_word()?;
            let mut replicas = Vec::with_capacity(nrep as usize);
            for _ in 0..nrep {
                replicas.push(FileReplica::decode(&mut u)?);
            }
            lists.push(replicas);
        }
    }
    lists.resize_with(count.max(lists.len()), Vec::new);
    Ok(lists)
}

impl CnsSession {
    pub async fn opendir(&mut self, path: &str) -> NsResult<CnsDir> {
        let (server, path) = self.target(path)?;
        let mut req = self.request(NsOpcode::Opendir)?;
        req.put_hyper(self.cwd)?;
        req.put_string(&path)?;
        let reply = self.call_path(server, req).await?;
        let fileid = reply.reader().get_hyper()?;
        Ok(CnsDir {
            fileid,
            level: CNS_RDD_NAMES,
            bod: true,
            eod: false,
            entries: VecDeque::new(),
        })
    }

    /// Next entry at `level`. Asking for another level than the previous
    /// call restarts the listing from the first entry.
    pub async fn readdir_at(&mut self, dir: &mut CnsDir, level: u16) -> NsResult<Option<DirEntry>> {
        if level > CNS_RDD_DIRXR {
            return err_ns!(libc::EINVAL, "readdir level {}", level);
        }
        if level != dir.level {
            dir.reset(level);
        }
        if dir.entries.is_empty() && !dir.eod {
            self.fetch_entries(dir).await?;
        }
        Ok(dir.entries.pop_front())
    }

    async fn fetch_entries(&mut self, dir: &mut CnsDir) -> NsResult<()> {
        let mut req = self.request(NsOpcode::Readdir)?;
        req.put_word(dir.level)?;
        req.put_word(dirent_size(dir.level) as u16)?;
        req.put_hyper(dir.fileid)?;
        req.put_word(dir.bod as u16)?;
        let reply = self.call(None, req, DIRBUFSZ + 4).await?;

        let caps = self.caps();
        let level = dir.level;
        let (mut entries, eod) = decode_block(&reply, |u| DirEntry::decode(u, level, caps))?;
        let nb = entries.len();
        dir.eod = eod;
        dir.bod = false;

        if dir.level == CNS_RDD_DIRXR {
            let lists = decode_replicas(&reply.replicas, entries.len())?;
            for (entry, list) in entries.iter_mut().zip(lists) {
                if let DirEntry::Xr { replicas, .. } = entry {
                    *replicas = list;
                }
            }
        }
        debug!("readdir of {} got {} entries, eod {}", dir.fileid, nb, dir.eod);
        dir.entries.extend(entries);
        Ok(())
    }

    /// Next entry name.
    pub async fn readdir(&mut self, dir: &mut CnsDir) -> NsResult<Option<String>> {
        match self.readdir_at(dir, CNS_RDD_NAMES).await? {
            Some(DirEntry::Name(n)) => Ok(Some(n)),
            Some(e) => Ok(Some(e.name().to_string())),
            None => Ok(None),
        }
    }

    /// Next entry with its attributes.
    pub async fn readdirx(&mut self, dir: &mut CnsDir) -> NsResult<Option<DirEntryX>> {
        match self.readdir_at(dir, CNS_RDD_DIRX).await? {
            Some(DirEntry::X(x)) => Ok(Some(x)),
            _ => Ok(None),
        }
    }

    /// Next tape segment of the directory's files.
    pub async fn readdirxt(&mut self, dir: &mut CnsDir) -> NsResult<Option<DirEntryXT>> {
        match self.readdir_at(dir, CNS_RDD_DIRXT).await? {
            Some(DirEntry::Xt(xt)) => Ok(Some(xt)),
            _ => Ok(None),
        }
    }

    /// Next entry name with its comment.
    pub async fn readdirc(&mut self, dir: &mut CnsDir) -> NsResult<Option<(String, String)>> {
        match self.readdir_at(dir, CNS_RDD_COMMENT).await? {
            Some(DirEntry::C { name, comment }) => Ok(Some((name, comment))),
            _ => Ok(None),
        }
    }

    pub async fn readdirxc(&mut self, dir: &mut CnsDir) -> NsResult<Option<(DirEntryX, String)>> {
        match self.readdir_at(dir, CNS_RDD_DIRXC).await? {
            Some(DirEntry::Xc { entry, comment }) => Ok(Some((entry, comment))),
            _ => Ok(None),
        }
    }

    /// Next entry with its attributes and disk replicas.
    pub async fn readdirxr(&mut self, dir: &mut CnsDir) -> NsResult<Option<(DirEntryX, Vec<FileReplica>)>> {
        match self.readdir_at(dir, CNS_RDD_DIRXR).await? {
            Some(DirEntry::Xr { entry, replicas }) => Ok(Some((entry, replicas))),
            _ => Ok(None),
        }
    }

    /// Start over from the first entry on the next read.
    pub fn rewinddir(&self, dir: &mut CnsDir) {
        let level = dir.level;
        dir.reset(level);
    }

    pub async fn closedir(&mut self, dir: CnsDir) -> NsResult<()> {
        if !self.is_connected() {
            return Ok(());
        }
        debug!("closedir {}", dir.fileid);
        let req = self.request(NsOpcode::Closedir)?;
        self.call(None, req, 0).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::codec::Marshaller;

    fn replica(sfn: &str) -> FileReplica {
        FileReplica {
            fileid: 7,
            status: b'-',
            f_type: b'P',
            host: "disk1".to_string(),
            sfn: sfn.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn replicas_follow_entry_order() {
        let mut m = Marshaller::new(1024);
        m.put_word(2).unwrap();
        replica("disk1:/a").encode(&mut m).unwrap();
        replica("disk2:/a").encode(&mut m).unwrap();
        m.put_word(0).unwrap();

        let lists = decode_replicas(&[m.as_slice().to_vec()], 3).unwrap();
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].len(), 2);
        assert_eq!(lists[0][1].sfn, "disk2:/a");
        assert!(lists[1].is_empty());
        assert!(lists[2].is_empty());
    }

    #[test]
    fn level_change_restarts_listing() {
        let mut dir = CnsDir {
            fileid: 9,
            level: CNS_RDD_NAMES,
            bod: false,
            eod: true,
            entries: VecDeque::from(vec![DirEntry::Name("a".to_string())]),
        };
        dir.reset(CNS_RDD_DIRX);
        assert!(dir.bod);
        assert!(!dir.eod);
        assert!(dir.entries.is_empty());
        assert_eq!(dirent_size(CNS_RDD_DIRXT), DIRENTXT_SIZE);
    }
}
