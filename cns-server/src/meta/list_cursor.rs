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


use cns_common::proto::{NsOpcode, CNS_RDD_DIRXT};
use cns_common::state::{DirEntryXT, FileReplica};
use std::collections::VecDeque;

/// Server side enumeration over a snapshot of rows taken when the listing
/// starts. An entry that did not fit in a reply stays at the head and is
/// sent first by the next call.
#[derive(Debug)]
pub struct ListCursor<T> {
    items: VecDeque<T>,
}

impl<T> ListCursor<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn advance(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn is_exhausted(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop what is left. Safe to call any number of times.
    pub fn release(&mut self) {
        self.items.clear();
    }
}

/// One unit of a directory listing.
#[derive(Debug, Clone)]
pub enum DirItem {
    Entry(u64),
    // readdirxt lists segments, one item per segment.
    Seg(DirEntryXT),
}

/// A listing kept open on a connection between the first request and the
/// end of the list.
#[derive(Debug)]
pub enum OpenList {
    Dir {
        fileid: u64,
        level: u16,
        cursor: Option<ListCursor<DirItem>>,
    },
    Class(ListCursor<i32>),
    Tape(ListCursor<DirEntryXT>),
    Replica(ListCursor<FileReplica>),
    Links(ListCursor<String>),
}

impl OpenList {
    pub fn dir(fileid: u64) -> Self {
        OpenList::Dir {
            fileid,
            level: 0,
            cursor: None,
        }
    }

    /// Request type that continues this listing.
    pub fn continuation(&self) -> NsOpcode {
        match self {
            OpenList::Dir { .. } => NsOpcode::Readdir,
            OpenList::Class(_) => NsOpcode::ListClass,
            OpenList::Tape(_) => NsOpcode::ListTape,
            OpenList::Replica(_) => NsOpcode::ListReplica,
            OpenList::Links(_) => NsOpcode::ListLinks,
        }
    }

    pub fn is_segment_listing(&self) -> bool {
        matches!(self, OpenList::Dir { level, .. } if *level == CNS_RDD_DIRXT)
    }

    pub fn release(&mut self) {
        match self {
            OpenList::Dir { cursor, .. } => {
                if let Some(c) = cursor {
                    c.release();
                }
                *cursor = None;
            }
            OpenList::Class(c) => c.release(),
            OpenList::Tape(c) => c.release(),
            OpenList::Replica(c) => c.release(),
            OpenList::Links(c) => c.release(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_stays_until_advanced() {
        let mut c = ListCursor::new(vec![1, 2, 3]);
        assert_eq!(c.peek(), Some(&1));
        assert_eq!(c.peek(), Some(&1));
        assert_eq!(c.advance(), Some(1));
        assert_eq!(c.len(), 2);
        c.release();
        c.release();
        assert!(c.is_exhausted());
    }

    #[test]
    fn release_is_idempotent_on_unopened_dir() {
        let mut list = OpenList::dir(2);
        list.release();
        list.release();
        assert_eq!(list.continuation(), NsOpcode::Readdir);
        assert!(!list.is_segment_listing());
    }
}
