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

mod acl;
mod class;
mod dir_entry;
mod file;
mod replica;
mod segment;

pub use self::acl::*;
pub use self::class::ClassMetadata;
pub use self::dir_entry::*;
pub use self::file::{FileMetadata, FileStat, FileStatG};
pub use self::replica::FileReplica;
pub use self::segment::{SegMetadata, SegmentChecksum};
