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


//! Namespace metadata: tables, row locks, transactions and listing cursors.

mod db_conn;
mod list_cursor;
mod lock_table;
mod meta_store;
mod ns_tables;
pub(crate) mod transaction;

pub use self::db_conn::DbConn;
pub use self::list_cursor::{DirItem, ListCursor, OpenList};
pub use self::lock_table::{LockSet, LockTable, RecordLease, RowKey};
pub use self::meta_store::MetaStore;
pub use self::ns_tables::{NsTables, SegKey};
pub use self::transaction::Transaction;
