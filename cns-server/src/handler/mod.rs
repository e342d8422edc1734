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


//! Request handlers. Each file adds the operations of one area to
//! [`NsHandler`]; `ns_handler` holds the dispatch and transaction logic.

mod acl_handler;
mod attr_handler;
mod class_handler;
mod file_handler;
mod idmap_handler;
mod link_handler;
mod list_handler;
mod ns_handler;
mod replica_handler;
mod reply_sink;
mod seg_handler;

pub use self::ns_handler::{NsHandler, NsRequest};
pub use self::reply_sink::ReplySink;
