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

use crate::meta::transaction::UndoRecord;
use crate::meta::{LockTable, NsTables, RecordLease, RowKey, SegKey, Transaction};
use cns_common::conf::StoreConf;
use cns_common::error::serrno::SEINTERNAL;
use cns_common::state::{ClassMetadata, FileMetadata, FileReplica, SegMetadata};
use cns_common::{err_ns, ns_err, NsResult};
use log::{info, warn};
use orpc::common::LocalTime;
use orpc::sync;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory metadata store with row locks and undo based transactions.
///
/// Reads without a lease see the latest written rows, including rows
/// written by transactions still open on other connections. Every write
/// goes through a [`Transaction`]; updates and deletes additionally need the
/// [`RecordLease`] obtained by a locked read of the same row, so a row is
/// only ever changed from a value read under its lock.
pub struct MetaStore {
    tables: RwLock<NsTables>,
    locks: Arc<LockTable>,
    tx_ids: AtomicU64,
    conf: StoreConf,
}

impl MetaStore {
    pub const SNAPSHOT_FILE: &'static str = "cns.snapshot";

    pub fn new(conf: &StoreConf) -> NsResult<Self> {
        let tables = match Self::snapshot_path(conf) {
            Some(path) if conf.snapshot && path.exists() => {
                let tables = Self::load_snapshot(&path)?;
                info!(
                    "Loaded {} namespace entries from {}",
                    tables.file_count(),
                    path.display()
                );
                tables
            }
            _ => NsTables::with_root(LocalTime::now_secs()),
        };

        Ok(Self {
            tables: RwLock::new(tables),
            locks: Arc::new(LockTable::new(conf.lock_timeout)),
            tx_ids: AtomicU64::new(1),
            conf: conf.clone(),
        })
    }

    fn snapshot_path(conf: &StoreConf) -> Option<PathBuf> {
        if conf.meta_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(&conf.meta_dir).join(Self::SNAPSHOT_FILE))
        }
    }

    fn load_snapshot(path: &PathBuf) -> NsResult<NsTables> {
        let reader = BufReader::new(File::open(path)?);
        bincode::deserialize_from(reader)
            .map_err(|e| ns_err!(SEINTERNAL, "corrupted snapshot {}: {}", path.display(), e))
    }

    /// Write every committed and uncommitted row to the snapshot file.
    pub fn save_snapshot(&self) -> NsResult<()> {
        let path = match Self::snapshot_path(&self.conf) {
            Some(p) if self.conf.snapshot => p,
            _ => return Ok(()),
        };
        fs::create_dir_all(&self.conf.meta_dir)?;
        let tmp = path.with_extension("tmp");
        {
            let tables = sync::read(&self.tables);
            let writer = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(writer, &*tables)
                .map_err(|e| ns_err!(SEINTERNAL, "failed to write snapshot: {}", e))?;
        }
        fs::rename(&tmp, &path)?;
        info!("Namespace snapshot saved to {}", path.display());
        Ok(())
    }

    pub fn begin(&self) -> Transaction {
        Transaction::new(self.tx_ids.fetch_add(1, Ordering::SeqCst), self.locks.clone())
    }

    pub fn commit(&self, tx: &mut Transaction) {
        tx.take_undo();
        tx.release();
    }

    pub fn abort(&self, tx: &mut Transaction) {
        let undo = tx.take_undo();
        if !undo.is_empty() {
            let mut tables = sync::write(&self.tables);
            for u in undo.into_iter().rev() {
                u.apply(&mut tables);
            }
        }
        tx.release();
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    pub fn next_fileid(&self) -> u64 {
        sync::write(&self.tables).next_fileid()
    }

    pub fn read<R>(&self, f: impl FnOnce(&NsTables) -> R) -> R {
        f(&sync::read(&self.tables))
    }

    fn write<R>(&self, f: impl FnOnce(&mut NsTables) -> R) -> R {
        f(&mut sync::write(&self.tables))
    }

    // Files.

    pub fn file(&self, fileid: u64) -> Option<FileMetadata> {
        self.read(|t| t.file(fileid).cloned())
    }

    pub fn child(&self, parent: u64, name: &str) -> Option<FileMetadata> {
        self.read(|t| t.child(parent, name).cloned())
    }

    pub fn children(&self, parent: u64) -> Vec<FileMetadata> {
        self.read(|t| t.children(parent).cloned().collect())
    }

    pub fn file_by_guid(&self, guid: &str) -> Option<FileMetadata> {
        self.read(|t| t.file_by_guid(guid).cloned())
    }

    pub fn lock_file(&self, tx: &mut Transaction, fileid: u64) -> NsResult<(FileMetadata, RecordLease)> {
        let lease = tx.lock(RowKey::File(fileid))?;
        match self.file(fileid) {
            Some(f) => Ok((f, lease)),
            None => err_ns!(libc::ENOENT, "fileid {}", fileid),
        }
    }

    /// Locked lookup of `name` under `parent`, `None` when absent.
    pub fn lock_child(
        &self,
        tx: &mut Transaction,
        parent: u64,
        name: &str,
    ) -> NsResult<Option<(FileMetadata, RecordLease)>> {
        let fileid = match self.child(parent, name) {
            Some(f) => f.fileid,
            None => return Ok(None),
        };
        let lease = tx.lock(RowKey::File(fileid))?;
        // The entry may have been renamed while we waited.
        match self.file(fileid) {
            Some(f) if f.parent_fileid == parent && f.name == name => Ok(Some((f, lease))),
            _ => Ok(None),
        }
    }

    pub fn insert_file(&self, tx: &mut Transaction, row: FileMetadata) -> NsResult<()> {
        tx.lock(RowKey::File(row.fileid))?;
        let prev = self.write(|t| {
            if t.file(row.fileid).is_some() || t.name_taken(row.parent_fileid, &row.name) {
                return err_ns!(libc::EEXIST, "{}", row.name);
            }
            if !row.guid.is_empty() && t.guid_taken(&row.guid) {
                return err_ns!(libc::EEXIST, "guid {}", row.guid);
            }
            Ok(t.set_file(row.fileid, Some(row.clone())))
        })?;
        tx.record(UndoRecord::File(row.fileid, prev));
        Ok(())
    }

    pub fn update_file(&self, tx: &mut Transaction, lease: &RecordLease, row: &FileMetadata) -> NsResult<()> {
        tx.check(lease, &RowKey::File(row.fileid))?;
        let prev = self.write(|t| {
            if let Some(other) = t.child(row.parent_fileid, &row.name) {
                if other.fileid != row.fileid {
                    return err_ns!(libc::EEXIST, "{}", row.name);
                }
            }
            if !row.guid.is_empty() {
                if let Some(other) = t.file_by_guid(&row.guid) {
                    if other.fileid != row.fileid {
                        return err_ns!(libc::EEXIST, "guid {}", row.guid);
                    }
                }
            }
            Ok(t.set_file(row.fileid, Some(row.clone())))
        })?;
        tx.record(UndoRecord::File(row.fileid, prev));
        Ok(())
    }

    pub fn delete_file(&self, tx: &mut Transaction, lease: &RecordLease, fileid: u64) -> NsResult<()> {
        tx.check(lease, &RowKey::File(fileid))?;
        let prev = self.write(|t| t.set_file(fileid, None));
        tx.record(UndoRecord::File(fileid, prev));
        Ok(())
    }

    // Segments.

    pub fn segment(&self, key: &SegKey) -> Option<SegMetadata> {
        self.read(|t| t.segment(key).cloned())
    }

    pub fn segments_of(&self, fileid: u64) -> Vec<SegMetadata> {
        self.read(|t| t.segments_of(fileid).cloned().collect())
    }

    pub fn segments_on(&self, vid: &str) -> Vec<SegMetadata> {
        self.read(|t| t.segments_on(vid))
    }

    pub fn lock_segment(&self, tx: &mut Transaction, key: SegKey) -> NsResult<Option<(SegMetadata, RecordLease)>> {
        let lease = tx.lock(RowKey::Seg(key.0, key.1, key.2))?;
        Ok(self.segment(&key).map(|s| (s, lease)))
    }

    /// Locked segments of a file.
    pub fn lock_segments_of(
        &self,
        tx: &mut Transaction,
        fileid: u64,
    ) -> NsResult<Vec<(SegMetadata, RecordLease)>> {
        let mut locked = vec![];
        for seg in self.segments_of(fileid) {
            if let Some(v) = self.lock_segment(tx, seg.key())? {
                locked.push(v);
            }
        }
        Ok(locked)
    }

    pub fn insert_segment(&self, tx: &mut Transaction, row: SegMetadata) -> NsResult<()> {
        let key = row.key();
        tx.lock(RowKey::Seg(key.0, key.1, key.2))?;
        let prev = self.write(|t| {
            if t.segment(&key).is_some() {
                return err_ns!(libc::EEXIST, "segment {:?}", key);
            }
            Ok(t.set_segment(key, Some(row)))
        })?;
        tx.record(UndoRecord::Seg(key, prev));
        Ok(())
    }

    pub fn update_segment(&self, tx: &mut Transaction, lease: &RecordLease, row: SegMetadata) -> NsResult<()> {
        let key = row.key();
        tx.check(lease, &RowKey::Seg(key.0, key.1, key.2))?;
        let prev = self.write(|t| t.set_segment(key, Some(row)));
        tx.record(UndoRecord::Seg(key, prev));
        Ok(())
    }

    pub fn delete_segment(&self, tx: &mut Transaction, lease: &RecordLease, key: SegKey) -> NsResult<()> {
        tx.check(lease, &RowKey::Seg(key.0, key.1, key.2))?;
        let prev = self.write(|t| t.set_segment(key, None));
        tx.record(UndoRecord::Seg(key, prev));
        Ok(())
    }

    /// Remove every segment of a file.
    pub fn purge_segments(&self, tx: &mut Transaction, fileid: u64) -> NsResult<usize> {
        let locked = self.lock_segments_of(tx, fileid)?;
        for (seg, lease) in &locked {
            self.delete_segment(tx, lease, seg.key())?;
        }
        Ok(locked.len())
    }

    // Replicas.

    pub fn replica(&self, sfn: &str) -> Option<FileReplica> {
        self.read(|t| t.replica(sfn).cloned())
    }

    pub fn replicas_of(&self, fileid: u64) -> Vec<FileReplica> {
        self.read(|t| t.replicas_of(fileid))
    }

    pub fn lock_replica(&self, tx: &mut Transaction, sfn: &str) -> NsResult<Option<(FileReplica, RecordLease)>> {
        let lease = tx.lock(RowKey::Replica(sfn.to_string()))?;
        Ok(self.replica(sfn).map(|r| (r, lease)))
    }

    pub fn insert_replica(&self, tx: &mut Transaction, row: FileReplica) -> NsResult<()> {
        tx.lock(RowKey::Replica(row.sfn.clone()))?;
        let sfn = row.sfn.clone();
        let prev = self.write(|t| {
            if t.replica(&sfn).is_some() {
                return err_ns!(libc::EEXIST, "replica {}", sfn);
            }
            Ok(t.set_replica(&sfn, Some(row)))
        })?;
        tx.record(UndoRecord::Replica(sfn, prev));
        Ok(())
    }

    pub fn delete_replica(&self, tx: &mut Transaction, lease: &RecordLease, sfn: &str) -> NsResult<()> {
        tx.check(lease, &RowKey::Replica(sfn.to_string()))?;
        let prev = self.write(|t| t.set_replica(sfn, None));
        tx.record(UndoRecord::Replica(sfn.to_string(), prev));
        Ok(())
    }

    // Symbolic links. The link row shares the lock of its file row.

    pub fn symlink(&self, fileid: u64) -> Option<String> {
        self.read(|t| t.symlink(fileid).cloned())
    }

    pub fn links_to(&self, target: &str) -> Vec<u64> {
        self.read(|t| t.links_to(target))
    }

    pub fn insert_symlink(&self, tx: &mut Transaction, fileid: u64, target: &str) -> NsResult<()> {
        tx.lock(RowKey::File(fileid))?;
        let prev = self.write(|t| t.set_symlink(fileid, Some(target.to_string())));
        tx.record(UndoRecord::Symlink(fileid, prev));
        Ok(())
    }

    pub fn delete_symlink(&self, tx: &mut Transaction, lease: &RecordLease, fileid: u64) -> NsResult<()> {
        tx.check(lease, &RowKey::File(fileid))?;
        let prev = self.write(|t| t.set_symlink(fileid, None));
        if prev.is_some() {
            tx.record(UndoRecord::Symlink(fileid, prev));
        }
        Ok(())
    }

    // Comments.

    pub fn comment(&self, fileid: u64) -> Option<String> {
        self.read(|t| t.comment(fileid).cloned())
    }

    pub fn lock_comment(&self, tx: &mut Transaction, fileid: u64) -> NsResult<(Option<String>, RecordLease)> {
        let lease = tx.lock(RowKey::Comment(fileid))?;
        Ok((self.comment(fileid), lease))
    }

    pub fn put_comment(&self, tx: &mut Transaction, lease: &RecordLease, fileid: u64, text: &str) -> NsResult<()> {
        tx.check(lease, &RowKey::Comment(fileid))?;
        let prev = self.write(|t| t.set_comment(fileid, Some(text.to_string())));
        tx.record(UndoRecord::Comment(fileid, prev));
        Ok(())
    }

    pub fn delete_comment(&self, tx: &mut Transaction, lease: &RecordLease, fileid: u64) -> NsResult<()> {
        tx.check(lease, &RowKey::Comment(fileid))?;
        let prev = self.write(|t| t.set_comment(fileid, None));
        if prev.is_some() {
            tx.record(UndoRecord::Comment(fileid, prev));
        }
        Ok(())
    }

    /// Drop the comment of a file if it has one.
    pub fn purge_comment(&self, tx: &mut Transaction, fileid: u64) -> NsResult<()> {
        let (comment, lease) = self.lock_comment(tx, fileid)?;
        if comment.is_some() {
            self.delete_comment(tx, &lease, fileid)?;
        }
        Ok(())
    }

    // File classes.

    pub fn class(&self, classid: i32) -> Option<ClassMetadata> {
        self.read(|t| t.class(classid).cloned())
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassMetadata> {
        self.read(|t| t.class_by_name(name).cloned())
    }

    pub fn class_ids(&self) -> Vec<i32> {
        self.read(|t| t.class_ids())
    }

    pub fn lock_class(&self, tx: &mut Transaction, classid: i32) -> NsResult<Option<(ClassMetadata, RecordLease)>> {
        let lease = tx.lock(RowKey::Class(classid))?;
        Ok(self.class(classid).map(|c| (c, lease)))
    }

    pub fn insert_class(&self, tx: &mut Transaction, row: ClassMetadata) -> NsResult<()> {
        let classid = row.classid;
        tx.lock(RowKey::Class(classid))?;
        let prev = self.write(|t| {
            if t.class(classid).is_some() || t.class_by_name(&row.name).is_some() {
                return err_ns!(libc::EEXIST, "class {} {}", classid, row.name);
            }
            Ok(t.set_class(classid, Some(row)))
        })?;
        tx.record(UndoRecord::Class(classid, prev));
        Ok(())
    }

    pub fn update_class(&self, tx: &mut Transaction, lease: &RecordLease, row: ClassMetadata) -> NsResult<()> {
        let classid = row.classid;
        tx.check(lease, &RowKey::Class(classid))?;
        let prev = self.write(|t| {
            if let Some(other) = t.class_by_name(&row.name) {
                if other.classid != classid {
                    return err_ns!(libc::EEXIST, "class {}", row.name);
                }
            }
            Ok(t.set_class(classid, Some(row)))
        })?;
        tx.record(UndoRecord::Class(classid, prev));
        Ok(())
    }

    pub fn delete_class(&self, tx: &mut Transaction, lease: &RecordLease, classid: i32) -> NsResult<()> {
        tx.check(lease, &RowKey::Class(classid))?;
        let prev = self.write(|t| t.set_class(classid, None));
        tx.record(UndoRecord::Class(classid, prev));
        Ok(())
    }

    /// Add `delta` to the directory count of a class, never below zero.
    pub fn adjust_class_usage(&self, tx: &mut Transaction, classid: i32, delta: i32) -> NsResult<()> {
        if classid <= 0 {
            return Ok(());
        }
        if let Some((mut class, lease)) = self.lock_class(tx, classid)? {
            class.nbdirs_using_class = (class.nbdirs_using_class + delta).max(0);
            self.update_class(tx, &lease, class)?;
        } else {
            warn!("Directory refers to missing class {}", classid);
        }
        Ok(())
    }

    // Identity maps.

    pub fn user_name(&self, uid: u32) -> Option<String> {
        self.read(|t| t.user_name(uid).cloned())
    }

    pub fn user_id(&self, name: &str) -> Option<u32> {
        self.read(|t| t.user_id(name))
    }

    pub fn group_name(&self, gid: u32) -> Option<String> {
        self.read(|t| t.group_name(gid).cloned())
    }

    pub fn group_id(&self, name: &str) -> Option<u32> {
        self.read(|t| t.group_id(name))
    }

    pub fn insert_user(&self, tx: &mut Transaction, uid: u32, name: &str) -> NsResult<()> {
        tx.lock(RowKey::User(uid))?;
        tx.lock(RowKey::UserName(name.to_string()))?;
        let prev = self.write(|t| {
            if t.user_name(uid).is_some() || t.user_id(name).is_some() {
                return err_ns!(libc::EEXIST, "user {} {}", uid, name);
            }
            Ok(t.set_user(uid, Some(name.to_string())))
        })?;
        tx.record(UndoRecord::User(uid, prev));
        Ok(())
    }

    pub fn insert_group(&self, tx: &mut Transaction, gid: u32, name: &str) -> NsResult<()> {
        tx.lock(RowKey::Group(gid))?;
        tx.lock(RowKey::GroupName(name.to_string()))?;
        let prev = self.write(|t| {
            if t.group_name(gid).is_some() || t.group_id(name).is_some() {
                return err_ns!(libc::EEXIST, "group {} {}", gid, name);
            }
            Ok(t.set_group(gid, Some(name.to_string())))
        })?;
        tx.record(UndoRecord::Group(gid, prev));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::proto::CNS_ROOT_FILEID;
    use cns_common::utils::S_IFREG;
    use std::time::Duration;

    fn store() -> MetaStore {
        let conf = StoreConf {
            lock_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        MetaStore::new(&conf).unwrap()
    }

    fn new_file(store: &MetaStore, name: &str) -> FileMetadata {
        let mut f = store.file(CNS_ROOT_FILEID).unwrap();
        f.fileid = store.next_fileid();
        f.parent_fileid = CNS_ROOT_FILEID;
        f.name = name.to_string();
        f.filemode = S_IFREG | 0o644;
        f
    }

    #[test]
    fn abort_reverts_every_change() {
        let store = store();
        let mut tx = store.begin();
        let f = new_file(&store, "a");
        store.insert_file(&mut tx, f.clone()).unwrap();
        store.commit(&mut tx);

        let mut tx = store.begin();
        let (mut row, lease) = store.lock_file(&mut tx, f.fileid).unwrap();
        row.name = "b".to_string();
        store.update_file(&mut tx, &lease, &row).unwrap();
        store
            .insert_segment(
                &mut tx,
                SegMetadata {
                    s_fileid: f.fileid,
                    copyno: 1,
                    fsec: 1,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.child(CNS_ROOT_FILEID, "b").is_some());
        store.abort(&mut tx);

        assert!(store.child(CNS_ROOT_FILEID, "b").is_none());
        assert_eq!(store.child(CNS_ROOT_FILEID, "a").unwrap().fileid, f.fileid);
        assert!(store.segments_of(f.fileid).is_empty());
        assert!(store.lock_table().is_empty());
    }

    #[test]
    fn duplicate_name_is_eexist() {
        let store = store();
        let mut tx = store.begin();
        store.insert_file(&mut tx, new_file(&store, "x")).unwrap();
        let err = store.insert_file(&mut tx, new_file(&store, "x")).unwrap_err();
        assert_eq!(err.code(), libc::EEXIST);
    }

    #[test]
    fn update_needs_matching_lease() {
        let store = store();
        let mut tx = store.begin();
        let f = new_file(&store, "y");
        store.insert_file(&mut tx, f.clone()).unwrap();
        let (_, root_lease) = store.lock_file(&mut tx, CNS_ROOT_FILEID).unwrap();
        let err = store.update_file(&mut tx, &root_lease, &f).unwrap_err();
        assert_eq!(err.code(), SEINTERNAL);
    }

    #[test]
    fn locked_rows_block_other_transactions() {
        let store = store();
        let mut a = store.begin();
        let mut b = store.begin();
        store.lock_file(&mut a, CNS_ROOT_FILEID).unwrap();
        let err = store.lock_file(&mut b, CNS_ROOT_FILEID).unwrap_err();
        assert_eq!(err.code(), cns_common::error::serrno::SEWOULDBLOCK);
        store.commit(&mut a);
        assert!(store.lock_file(&mut b, CNS_ROOT_FILEID).is_ok());
    }

    #[test]
    fn class_usage_never_negative() {
        let store = store();
        let mut tx = store.begin();
        store
            .insert_class(
                &mut tx,
                ClassMetadata {
                    classid: 1,
                    name: "c1".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        store.adjust_class_usage(&mut tx, 1, 1).unwrap();
        store.adjust_class_usage(&mut tx, 1, -1).unwrap();
        store.adjust_class_usage(&mut tx, 1, -1).unwrap();
        assert_eq!(store.class(1).unwrap().nbdirs_using_class, 0);
    }

    #[test]
    fn unlocked_reads_see_open_transactions() {
        let store = store();
        let f = new_file(&store, "pending");
        let mut a = store.begin();
        store.insert_file(&mut a, f.clone()).unwrap();

        assert!(store.child(CNS_ROOT_FILEID, "pending").is_some());
        let mut b = store.begin();
        let err = store.lock_file(&mut b, f.fileid).unwrap_err();
        assert_eq!(err.code(), cns_common::error::serrno::SEWOULDBLOCK);

        store.abort(&mut a);
        assert!(store.child(CNS_ROOT_FILEID, "pending").is_none());
        assert_eq!(store.lock_file(&mut b, f.fileid).unwrap_err().code(), libc::ENOENT);
    }

    #[test]
    fn identity_inserts_wait_for_open_transactions() {
        let store = store();
        let mut a = store.begin();
        let mut b = store.begin();
        store.insert_user(&mut a, 300, "alice").unwrap();
        store.insert_group(&mut a, 300, "staff").unwrap();

        let busy = cns_common::error::serrno::SEWOULDBLOCK;
        assert_eq!(store.insert_user(&mut b, 300, "bob").unwrap_err().code(), busy);
        assert_eq!(store.insert_user(&mut b, 301, "alice").unwrap_err().code(), busy);
        assert_eq!(store.insert_group(&mut b, 300, "wheel").unwrap_err().code(), busy);

        store.abort(&mut a);
        store.insert_user(&mut b, 300, "bob").unwrap();
        store.insert_group(&mut b, 300, "wheel").unwrap();
        store.commit(&mut b);
        assert_eq!(store.user_name(300).as_deref(), Some("bob"));
        assert_eq!(store.group_id("wheel"), Some(300));
        assert!(store.user_id("alice").is_none());
        assert!(store.lock_table().is_empty());
    }
}
