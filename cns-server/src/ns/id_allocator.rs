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
use cns_common::proto::CNS_FIRST_MAPPED_ID;
use cns_common::NsResult;
use log::info;
use orpc::sync;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdKind {
    User,
    Group,
}

/// Hands out virtual uids and gids for names seen for the first time.
/// Allocation is serialized per kind; a lost race on the same name returns
/// the id the winner stored.
pub struct IdentityAllocator {
    next_uid: Mutex<u32>,
    next_gid: Mutex<u32>,
}

impl IdentityAllocator {
    pub fn new(store: &MetaStore) -> Self {
        let (max_uid, max_gid) = store.read(|t| (t.max_uid(), t.max_gid()));
        let next = |max: Option<u32>| max.map(|v| v + 1).unwrap_or(0).max(CNS_FIRST_MAPPED_ID);
        Self {
            next_uid: Mutex::new(next(max_uid)),
            next_gid: Mutex::new(next(max_gid)),
        }
    }

    pub fn user_id(&self, store: &MetaStore, tx: &mut Transaction, name: &str) -> NsResult<u32> {
        self.get_or_create(IdKind::User, store, tx, name)
    }

    pub fn group_id(&self, store: &MetaStore, tx: &mut Transaction, name: &str) -> NsResult<u32> {
        self.get_or_create(IdKind::Group, store, tx, name)
    }

    fn lookup(kind: IdKind, store: &MetaStore, name: &str) -> Option<u32> {
        match kind {
            IdKind::User => store.user_id(name),
            IdKind::Group => store.group_id(name),
        }
    }

    fn get_or_create(&self, kind: IdKind, store: &MetaStore, tx: &mut Transaction, name: &str) -> NsResult<u32> {
        if let Some(id) = Self::lookup(kind, store, name) {
            return Ok(id);
        }

        let counter = match kind {
            IdKind::User => &self.next_uid,
            IdKind::Group => &self.next_gid,
        };
        let mut next = sync::lock(counter);
        loop {
            if let Some(id) = Self::lookup(kind, store, name) {
                return Ok(id);
            }
            let id = *next;
            *next += 1;
            let res = match kind {
                IdKind::User => store.insert_user(tx, id, name),
                IdKind::Group => store.insert_group(tx, id, name),
            };
            match res {
                Ok(()) => {
                    info!("Mapped {:?} {} to id {}", kind, name, id);
                    return Ok(id);
                }
                // Id taken by an explicit mapping, or the name by another
                // connection: look again.
                Err(e) if e.is(libc::EEXIST) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cns_common::conf::StoreConf;

    #[test]
    fn ids_start_at_first_mapped_id() {
        let store = MetaStore::new(&StoreConf::default()).unwrap();
        let ids = IdentityAllocator::new(&store);
        let mut tx = store.begin();

        let a = ids.user_id(&store, &mut tx, "alice").unwrap();
        assert_eq!(a, CNS_FIRST_MAPPED_ID);
        assert_eq!(ids.user_id(&store, &mut tx, "alice").unwrap(), a);

        // An explicit mapping occupies the next id.
        store.insert_user(&mut tx, a + 1, "bob").unwrap();
        assert_eq!(ids.user_id(&store, &mut tx, "carol").unwrap(), a + 2);
        assert_eq!(ids.group_id(&store, &mut tx, "staff").unwrap(), CNS_FIRST_MAPPED_ID);
        store.commit(&mut tx);
    }
}
