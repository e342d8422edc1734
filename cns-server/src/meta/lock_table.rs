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

use cns_common::error::serrno::{SEINTERNAL, SEWOULDBLOCK};
use cns_common::{err_ns, NsResult};
use log::debug;
use orpc::sync;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Identity of a lockable row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    File(u64),
    Seg(u64, u16, u16),
    Replica(String),
    Comment(u64),
    Class(i32),
    User(u32),
    UserName(String),
    Group(u32),
    GroupName(String),
}

impl Display for RowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RowKey::File(id) => write!(f, "file({})", id),
            RowKey::Seg(id, copyno, fsec) => write!(f, "seg({},{},{})", id, copyno, fsec),
            RowKey::Replica(sfn) => write!(f, "replica({})", sfn),
            RowKey::Comment(id) => write!(f, "comment({})", id),
            RowKey::Class(id) => write!(f, "class({})", id),
            RowKey::User(id) => write!(f, "user({})", id),
            RowKey::UserName(name) => write!(f, "user({})", name),
            RowKey::Group(id) => write!(f, "group({})", id),
            RowKey::GroupName(name) => write!(f, "group({})", name),
        }
    }
}

/// Row locks of the whole store. A row is owned by at most one
/// transaction; other transactions wait for it up to `timeout`.
pub struct LockTable {
    owners: Mutex<HashMap<RowKey, u64>>,
    released: Condvar,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            owners: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Take `key` for transaction `owner`. Taking a row twice is a no-op.
    pub fn acquire(&self, key: &RowKey, owner: u64) -> NsResult<()> {
        let deadline = Instant::now() + self.timeout;
        let mut owners = sync::lock(&self.owners);
        loop {
            match owners.get(key) {
                None => {
                    owners.insert(key.clone(), owner);
                    return Ok(());
                }
                Some(o) if *o == owner => return Ok(()),
                Some(o) => {
                    let now = Instant::now();
                    if now >= deadline {
                        debug!("tx {} gave up waiting for {} held by tx {}", owner, key, o);
                        return err_ns!(SEWOULDBLOCK, "{} is locked", key);
                    }
                    owners = match self.released.wait_timeout(owners, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(e) => e.into_inner().0,
                    };
                }
            }
        }
    }

    pub fn release<'a>(&self, keys: impl Iterator<Item = &'a RowKey>, owner: u64) {
        let mut owners = sync::lock(&self.owners);
        for key in keys {
            if owners.get(key) == Some(&owner) {
                owners.remove(key);
            }
        }
        drop(owners);
        self.released.notify_all();
    }

    pub fn holder(&self, key: &RowKey) -> Option<u64> {
        sync::lock(&self.owners).get(key).copied()
    }

    pub fn len(&self) -> usize {
        sync::lock(&self.owners).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Proof that the current transaction holds the lock of one row. Only
/// [`LockSet::lock`] creates leases, and updates check them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLease {
    key: RowKey,
    owner: u64,
}

impl RecordLease {
    pub fn key(&self) -> &RowKey {
        &self.key
    }
}

/// Locks held by one transaction, released when the set is cleared or dropped.
pub struct LockSet {
    table: Arc<LockTable>,
    owner: u64,
    keys: HashSet<RowKey>,
}

impl LockSet {
    pub fn new(table: Arc<LockTable>, owner: u64) -> Self {
        Self {
            table,
            owner,
            keys: HashSet::new(),
        }
    }

    pub fn lock(&mut self, key: RowKey) -> NsResult<RecordLease> {
        if !self.keys.contains(&key) {
            self.table.acquire(&key, self.owner)?;
            self.keys.insert(key.clone());
        }
        Ok(RecordLease {
            key,
            owner: self.owner,
        })
    }

    pub fn check(&self, lease: &RecordLease) -> NsResult<()> {
        if lease.owner != self.owner || !self.keys.contains(&lease.key) {
            return err_ns!(SEINTERNAL, "stale lease on {}", lease.key);
        }
        Ok(())
    }

    pub fn holds(&self, key: &RowKey) -> bool {
        self.keys.contains(key)
    }

    pub fn release_all(&mut self) {
        if !self.keys.is_empty() {
            self.table.release(self.keys.iter(), self.owner);
            self.keys.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn reentrant_and_released_on_drop() {
        let table = Arc::new(LockTable::new(Duration::from_millis(50)));
        {
            let mut set = LockSet::new(table.clone(), 1);
            let lease = set.lock(RowKey::File(7)).unwrap();
            set.lock(RowKey::File(7)).unwrap();
            set.check(&lease).unwrap();
            assert_eq!(table.holder(&RowKey::File(7)), Some(1));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn contention_times_out() {
        let table = Arc::new(LockTable::new(Duration::from_millis(30)));
        let mut a = LockSet::new(table.clone(), 1);
        let mut b = LockSet::new(table.clone(), 2);
        a.lock(RowKey::Class(3)).unwrap();

        let err = b.lock(RowKey::Class(3)).unwrap_err();
        assert_eq!(err.code(), SEWOULDBLOCK);
        assert!(!b.holds(&RowKey::Class(3)));
    }

    #[test]
    fn waiter_gets_row_after_release() {
        let table = Arc::new(LockTable::new(Duration::from_secs(5)));
        let mut a = LockSet::new(table.clone(), 1);
        a.lock(RowKey::File(2)).unwrap();

        let t = table.clone();
        let waiter = thread::spawn(move || {
            let mut b = LockSet::new(t, 2);
            b.lock(RowKey::File(2)).map(|_| ())
        });
        thread::sleep(Duration::from_millis(20));
        a.release_all();
        assert!(waiter.join().unwrap().is_ok());
    }

    #[test]
    fn foreign_lease_rejected() {
        let table = Arc::new(LockTable::new(Duration::from_millis(10)));
        let mut a = LockSet::new(table.clone(), 1);
        let b = LockSet::new(table, 2);
        let lease = a.lock(RowKey::Comment(4)).unwrap();
        assert_eq!(b.check(&lease).unwrap_err().code(), SEINTERNAL);
    }
}
