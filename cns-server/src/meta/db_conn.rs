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


use crate::meta::{MetaStore, Transaction};
use log::debug;
use std::sync::Arc;

/// Per-connection handle on the metadata store.
///
/// A mutating request opens a transaction with [`DbConn::start_tr`] and the
/// dispatcher ends it with [`DbConn::end_request`]: commit when the handler
/// succeeded, abort otherwise. Between `starttrans` and `endtrans` the
/// transaction belongs to the client and survives individual requests.
pub struct DbConn {
    store: Arc<MetaStore>,
    tx: Option<Transaction>,
    explicit: bool,
}

impl DbConn {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self {
            store,
            tx: None,
            explicit: false,
        }
    }

    pub fn store(&self) -> &Arc<MetaStore> {
        &self.store
    }

    pub fn start_tr(&mut self) -> &mut Transaction {
        self.tx.get_or_insert_with(|| self.store.begin())
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn begin_explicit(&mut self) {
        self.explicit = true;
        let id = self.start_tr().id();
        debug!("Explicit transaction {} started", id);
    }

    pub fn end_explicit(&mut self, commit: bool) {
        self.explicit = false;
        if commit {
            self.commit();
        } else {
            self.abort();
        }
    }

    pub fn end_request(&mut self, ok: bool) {
        if self.explicit {
            return;
        }
        if ok {
            self.commit();
        } else {
            self.abort();
        }
    }

    fn commit(&mut self) {
        if let Some(mut tx) = self.tx.take() {
            self.store.commit(&mut tx);
        }
    }

    fn abort(&mut self) {
        if let Some(mut tx) = self.tx.take() {
            if tx.is_dirty() {
                debug!("Aborting transaction {}", tx.id());
            }
            self.store.abort(&mut tx);
        }
    }
}

impl Drop for DbConn {
    fn drop(&mut self) {
        self.explicit = false;
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::conf::StoreConf;
    use cns_common::proto::CNS_ROOT_FILEID;

    fn conn() -> DbConn {
        DbConn::new(Arc::new(MetaStore::new(&StoreConf::default()).unwrap()))
    }

    fn touch_root(db: &mut DbConn, mtime: i64) {
        let store = db.store().clone();
        let tx = db.start_tr();
        let (mut root, lease) = store.lock_file(tx, CNS_ROOT_FILEID).unwrap();
        root.mtime = mtime;
        store.update_file(tx, &lease, &root).unwrap();
    }

    fn root_mtime(db: &DbConn) -> i64 {
        db.store().file(CNS_ROOT_FILEID).unwrap().mtime
    }

    #[test]
    fn failed_request_is_rolled_back() {
        let mut db = conn();
        touch_root(&mut db, 42);
        db.end_request(true);
        touch_root(&mut db, 43);
        db.end_request(false);
        assert_eq!(root_mtime(&db), 42);
        assert!(!db.in_transaction());
    }

    #[test]
    fn explicit_transaction_spans_requests() {
        let mut db = conn();
        db.begin_explicit();
        touch_root(&mut db, 7);
        db.end_request(true);
        assert!(db.in_transaction());
        touch_root(&mut db, 8);
        db.end_request(true);
        db.end_explicit(false);
        assert_ne!(root_mtime(&db), 8);
        assert!(db.store().lock_table().is_empty());
    }

    #[test]
    fn dropped_connection_aborts() {
        let mut db = conn();
        let store = db.store().clone();
        let before = root_mtime(&db);
        db.begin_explicit();
        touch_root(&mut db, before + 100);
        drop(db);
        assert_eq!(store.file(CNS_ROOT_FILEID).unwrap().mtime, before);
    }
}
