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

use crate::meta::{LockSet, LockTable, NsTables, RecordLease, RowKey, SegKey};
use cns_common::error::serrno::SEINTERNAL;
use cns_common::state::{ClassMetadata, FileMetadata, FileReplica, SegMetadata};
use cns_common::{err_ns, NsResult};
use std::sync::Arc;

/// Previous image of a row changed inside a transaction.
#[derive(Debug)]
pub(crate) enum UndoRecord {
    File(u64, Option<FileMetadata>),
    Seg(SegKey, Option<SegMetadata>),
    Replica(String, Option<FileReplica>),
    Symlink(u64, Option<String>),
    Comment(u64, Option<String>),
    Class(i32, Option<ClassMetadata>),
    User(u32, Option<String>),
    Group(u32, Option<String>),
}

impl UndoRecord {
    pub(crate) fn apply(self, t: &mut NsTables) {
        match self {
            UndoRecord::File(id, row) => {
                t.set_file(id, row);
            }
            UndoRecord::Seg(key, row) => {
                t.set_segment(key, row);
            }
            UndoRecord::Replica(sfn, row) => {
                t.set_replica(&sfn, row);
            }
            UndoRecord::Symlink(id, row) => {
                t.set_symlink(id, row);
            }
            UndoRecord::Comment(id, row) => {
                t.set_comment(id, row);
            }
            UndoRecord::Class(id, row) => {
                t.set_class(id, row);
            }
            UndoRecord::User(id, row) => {
                t.set_user(id, row);
            }
            UndoRecord::Group(id, row) => {
                t.set_group(id, row);
            }
        }
    }
}

/// A unit of work on the store: the rows it locked and how to revert what
/// it changed. Commit forgets the undo log, abort replays it backwards;
/// both release the row locks.
pub struct Transaction {
    id: u64,
    locks: LockSet,
    undo: Vec<UndoRecord>,
}

impl Transaction {
    pub(crate) fn new(id: u64, table: Arc<LockTable>) -> Self {
        Self {
            id,
            locks: LockSet::new(table, id),
            undo: vec![],
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn lock(&mut self, key: RowKey) -> NsResult<RecordLease> {
        self.locks.lock(key)
    }

    /// The lease must belong to this transaction and cover `key`.
    pub fn check(&self, lease: &RecordLease, key: &RowKey) -> NsResult<()> {
        self.locks.check(lease)?;
        if lease.key() != key {
            return err_ns!(SEINTERNAL, "lease on {} used for {}", lease.key(), key);
        }
        Ok(())
    }

    pub fn holds(&self, key: &RowKey) -> bool {
        self.locks.holds(key)
    }

    pub fn is_dirty(&self) -> bool {
        !self.undo.is_empty()
    }

    pub(crate) fn record(&mut self, undo: UndoRecord) {
        self.undo.push(undo);
    }

    pub(crate) fn take_undo(&mut self) -> Vec<UndoRecord> {
        std::mem::take(&mut self.undo)
    }

    pub(crate) fn release(&mut self) {
        self.locks.release_all();
    }
}
