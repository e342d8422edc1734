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

mod acl_api;
mod class_api;
mod cns_dir;
mod cns_list;
mod cns_session;
mod file_api;
mod idmap_api;
mod link_api;
mod replica_api;
mod seg_api;
mod trans_api;

pub use self::cns_dir::CnsDir;
pub use self::cns_list::CnsList;
pub use self::cns_session::CnsSession;
pub use self::seg_api::SegLocation;
