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

use cns_common::proto::{CNS_FIRST_FILEID, CNS_ROOT_FILEID};
use cns_common::state::{ClassMetadata, FileMetadata, FileReplica, SegMetadata};
use cns_common::utils::{STATUS_ONLINE, S_IFDIR};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type SegKey = (u64, u16, u16);

/// All namespace tables. Every setter replaces one row, keeps the secondary
/// indexes in step and returns the previous row, which is what the undo log
/// of a transaction records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsTables {
    files: HashMap<u64, FileMetadata>,
    // (parent_fileid, name) -> fileid
    names: BTreeMap<(u64, String), u64>,
    guids: HashMap<String, u64>,
    segments: BTreeMap<SegKey, SegMetadata>,
    replicas: BTreeMap<String, FileReplica>,
    symlinks: HashMap<u64, String>,
    comments: HashMap<u64, String>,
    classes: BTreeMap<i32, ClassMetadata>,
    users: BTreeMap<u32, String>,
    groups: BTreeMap<u32, String>,
    next_fileid: u64,
}

impl NsTables {
    pub fn with_root(now: i64) -> Self {
        let mut tables = Self {
            files: HashMap::new(),
            names: BTreeMap::new(),
            guids: HashMap::new(),
            segments: BTreeMap::new(),
            replicas: BTreeMap::new(),
            symlinks: HashMap::new(),
            comments: HashMap::new(),
            classes: BTreeMap::new(),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            next_fileid: CNS_FIRST_FILEID,
        };
        let root = FileMetadata {
            fileid: CNS_ROOT_FILEID,
            parent_fileid: 0,
            guid: String::new(),
            name: "/".to_string(),
            filemode: S_IFDIR | 0o755,
            nlink: 0,
            uid: 0,
            gid: 0,
            filesize: 0,
            atime: now,
            mtime: now,
            ctime: now,
            fileclass: 0,
            status: STATUS_ONLINE,
            csumtype: String::new(),
            csumvalue: String::new(),
            acl: String::new(),
        };
        tables.set_file(CNS_ROOT_FILEID, Some(root));
        tables
    }

    pub fn next_fileid(&mut self) -> u64 {
        let id = self.next_fileid;
        self.next_fileid += 1;
        id
    }

    pub fn file(&self, fileid: u64) -> Option<&FileMetadata> {
        self.files.get(&fileid)
    }

    pub fn child(&self, parent: u64, name: &str) -> Option<&FileMetadata> {
        self.names
            .get(&(parent, name.to_string()))
            .and_then(|id| self.files.get(id))
    }

    pub fn children(&self, parent: u64) -> impl Iterator<Item = &FileMetadata> {
        self.names
            .range((parent, String::new())..)
            .take_while(move |((p, _), _)| *p == parent)
            .filter_map(move |(_, id)| self.files.get(id))
    }

    pub fn file_by_guid(&self, guid: &str) -> Option<&FileMetadata> {
        self.guids.get(guid).and_then(|id| self.files.get(id))
    }

    pub fn set_file(&mut self, fileid: u64, row: Option<FileMetadata>) -> Option<FileMetadata> {
        let prev = self.files.remove(&fileid);
        if let Some(p) = &prev {
            self.names.remove(&(p.parent_fileid, p.name.clone()));
            if !p.guid.is_empty() {
                self.guids.remove(&p.guid);
            }
        }
        if let Some(r) = row {
            // The root is reachable by fileid only.
            if r.parent_fileid != 0 {
                self.names.insert((r.parent_fileid, r.name.clone()), fileid);
            }
            if !r.guid.is_empty() {
                self.guids.insert(r.guid.clone(), fileid);
            }
            self.files.insert(fileid, r);
        }
        prev
    }

    pub fn name_taken(&self, parent: u64, name: &str) -> bool {
        self.names.contains_key(&(parent, name.to_string()))
    }

    pub fn guid_taken(&self, guid: &str) -> bool {
        self.guids.contains_key(guid)
    }

    pub fn segment(&self, key: &SegKey) -> Option<&SegMetadata> {
        self.segments.get(key)
    }

    /// Segments of a file ordered by copy number and section.
    pub fn segments_of(&self, fileid: u64) -> impl Iterator<Item = &SegMetadata> {
        self.segments
            .range((fileid, 0, 0)..=(fileid, u16::MAX, u16::MAX))
            .map(|(_, s)| s)
    }

    pub fn segments_on(&self, vid: &str) -> Vec<SegMetadata> {
        let mut segs: Vec<SegMetadata> = self
            .segments
            .values()
            .filter(|s| s.vid == vid)
            .cloned()
            .collect();
        segs.sort_by_key(|s| (s.side, s.fseq, s.s_fileid, s.copyno, s.fsec));
        segs
    }

    pub fn set_segment(&mut self, key: SegKey, row: Option<SegMetadata>) -> Option<SegMetadata> {
        match row {
            Some(r) => self.segments.insert(key, r),
            None => self.segments.remove(&key),
        }
    }

    pub fn replica(&self, sfn: &str) -> Option<&FileReplica> {
        self.replicas.get(sfn)
    }

    pub fn replicas_of(&self, fileid: u64) -> Vec<FileReplica> {
        self.replicas
            .values()
            .filter(|r| r.fileid == fileid)
            .cloned()
            .collect()
    }

    pub fn set_replica(&mut self, sfn: &str, row: Option<FileReplica>) -> Option<FileReplica> {
        match row {
            Some(r) => self.replicas.insert(sfn.to_string(), r),
            None => self.replicas.remove(sfn),
        }
    }

    pub fn symlink(&self, fileid: u64) -> Option<&String> {
        self.symlinks.get(&fileid)
    }

    /// Links whose target text is exactly `target`.
    pub fn links_to(&self, target: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .symlinks
            .iter()
            .filter(|(_, t)| t.as_str() == target)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn set_symlink(&mut self, fileid: u64, row: Option<String>) -> Option<String> {
        match row {
            Some(r) => self.symlinks.insert(fileid, r),
            None => self.symlinks.remove(&fileid),
        }
    }

    pub fn comment(&self, fileid: u64) -> Option<&String> {
        self.comments.get(&fileid)
    }

    pub fn set_comment(&mut self, fileid: u64, row: Option<String>) -> Option<String> {
        match row {
            Some(r) => self.comments.insert(fileid, r),
            None => self.comments.remove(&fileid),
        }
    }

    pub fn class(&self, classid: i32) -> Option<&ClassMetadata> {
        self.classes.get(&classid)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes.values().find(|c| c.name == name)
    }

    pub fn class_ids(&self) -> Vec<i32> {
        self.classes.keys().copied().collect()
    }

    pub fn set_class(&mut self, classid: i32, row: Option<ClassMetadata>) -> Option<ClassMetadata> {
        match row {
            Some(r) => self.classes.insert(classid, r),
            None => self.classes.remove(&classid),
        }
    }

    pub fn user_name(&self, uid: u32) -> Option<&String> {
        self.users.get(&uid)
    }

    pub fn user_id(&self, name: &str) -> Option<u32> {
        self.users.iter().find(|(_, n)| n.as_str() == name).map(|(id, _)| *id)
    }

    pub fn set_user(&mut self, uid: u32, row: Option<String>) -> Option<String> {
        match row {
            Some(r) => self.users.insert(uid, r),
            None => self.users.remove(&uid),
        }
    }

    pub fn max_uid(&self) -> Option<u32> {
        self.users.keys().next_back().copied()
    }

    pub fn group_name(&self, gid: u32) -> Option<&String> {
        self.groups.get(&gid)
    }

    pub fn group_id(&self, name: &str) -> Option<u32> {
        self.groups.iter().find(|(_, n)| n.as_str() == name).map(|(id, _)| *id)
    }

    pub fn set_group(&mut self, gid: u32, row: Option<String>) -> Option<String> {
        match row {
            Some(r) => self.groups.insert(gid, r),
            None => self.groups.remove(&gid),
        }
    }

    pub fn max_gid(&self) -> Option<u32> {
        self.groups.keys().next_back().copied()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::utils::S_IFREG;

    fn file(fileid: u64, parent: u64, name: &str) -> FileMetadata {
        let mut f = NsTables::with_root(0).file(CNS_ROOT_FILEID).cloned().unwrap();
        f.fileid = fileid;
        f.parent_fileid = parent;
        f.name = name.to_string();
        f.filemode = S_IFREG | 0o644;
        f
    }

    #[test]
    fn name_index_follows_rows() {
        let mut t = NsTables::with_root(0);
        t.set_file(3, Some(file(3, CNS_ROOT_FILEID, "a")));
        assert_eq!(t.child(CNS_ROOT_FILEID, "a").unwrap().fileid, 3);

        let mut moved = file(3, CNS_ROOT_FILEID, "b");
        moved.guid = "g-1".to_string();
        let prev = t.set_file(3, Some(moved)).unwrap();
        assert_eq!(prev.name, "a");
        assert!(t.child(CNS_ROOT_FILEID, "a").is_none());
        assert_eq!(t.file_by_guid("g-1").unwrap().name, "b");

        // Undo restores the old name and drops the guid.
        t.set_file(3, Some(prev));
        assert!(t.child(CNS_ROOT_FILEID, "b").is_none());
        assert!(t.file_by_guid("g-1").is_none());
        assert!(t.child(CNS_ROOT_FILEID, "a").is_some());
    }

    #[test]
    fn children_are_scoped_and_sorted() {
        let mut t = NsTables::with_root(0);
        t.set_file(3, Some(file(3, CNS_ROOT_FILEID, "zz")));
        t.set_file(4, Some(file(4, CNS_ROOT_FILEID, "aa")));
        t.set_file(5, Some(file(5, 3, "inner")));
        let names: Vec<&str> = t.children(CNS_ROOT_FILEID).map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["aa", "zz"]);
        assert_eq!(t.children(3).count(), 1);
    }

    #[test]
    fn segments_by_file() {
        let mut t = NsTables::with_root(0);
        for (copyno, fsec) in [(2, 1), (1, 2), (1, 1)] {
            let seg = SegMetadata {
                s_fileid: 9,
                copyno,
                fsec,
                vid: "V1".to_string(),
                ..Default::default()
            };
            t.set_segment(seg.key(), Some(seg));
        }
        t.set_segment((10, 1, 1), Some(SegMetadata::default()));
        let keys: Vec<SegKey> = t.segments_of(9).map(|s| s.key()).collect();
        assert_eq!(keys, vec![(9, 1, 1), (9, 1, 2), (9, 2, 1)]);
        assert_eq!(t.segments_on("V1").len(), 3);
    }
}
