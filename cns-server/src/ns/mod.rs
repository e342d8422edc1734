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


//! Request evaluation shared by every handler: who is asking, where a path
//! leads and whether the caller may touch what it finds.

mod acl_engine;
mod credentials;
mod id_allocator;
mod ns_context;
mod path_resolver;
mod perm_checker;
mod req_log;

pub use self::acl_engine::AclEngine;
pub use self::credentials::Credentials;
pub use self::id_allocator::IdentityAllocator;
pub use self::ns_context::NsContext;
pub use self::path_resolver::PathResolver;
pub use self::perm_checker::{PermChecker, Privileges};
pub use self::req_log::ReqLog;
