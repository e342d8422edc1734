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

//! Name server command line tools.

mod acl_text;
mod ns_cli;
mod touch_time;

pub use self::acl_text::{AclEdit, AclSpec};
pub use self::ns_cli::NsCli;
pub use self::touch_time::TouchTime;

/// Exit status when every argument was processed.
pub const OK: i32 = 0;
/// Exit status when at least one argument failed or the usage was wrong.
pub const USERR: i32 = 1;
/// Exit status when the tool could not run at all.
pub const SYERR: i32 = 2;
/// Exit status when the configuration could not be loaded.
pub const CONFERR: i32 = 4;
