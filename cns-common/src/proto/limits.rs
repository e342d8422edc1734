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

// Field limits, in bytes, not counting the NUL terminator.
pub const CA_MAXPATHLEN: usize = 1023;
pub const CA_MAXNAMELEN: usize = 231;
pub const CA_MAXSYMLINKS: usize = 5;
pub const CA_MAXCOMMENTLEN: usize = 255;
pub const CA_MAXVIDLEN: usize = 6;
pub const CA_MAXCLASNAMELEN: usize = 15;
pub const CA_MAXPOOLNAMELEN: usize = 15;
pub const CA_MAXGUIDLEN: usize = 36;
pub const CA_MAXCKSUMNAMELEN: usize = 15;
pub const CA_MAXCKSUMLEN: usize = 32;
pub const CA_MAXSFNLEN: usize = 1103;
pub const CA_MAXHOSTNAMELEN: usize = 63;
pub const CA_MAXUSRNAMELEN: usize = 255;
pub const CA_MAXGRPNAMELEN: usize = 255;
pub const CA_MAXACLENTRIES: usize = 300;
// Pools per class, bounded so that one class always fits a listing block.
pub const CA_MAXTAPEPOOLS: usize = 250;
pub const CA_MAXFSNAMELEN: usize = 79;

// Buffer sizes.
pub const REQBUFSZ: usize = 20000;
pub const REPBUFSZ: usize = 4100;
pub const DIRBUFSZ: usize = 4096;
pub const LISTBUFSZ: usize = 4096;
pub const LOGBUFSZ: usize = 1024;

// Fixed part of the client side listing entries, the budget a readdir
// reply is cut against.
pub const DIRENT_NAME_SIZE: usize = 12;
pub const DIRENTX_SIZE: usize = 72;
pub const DIRENTXT_SIZE: usize = 80;
pub const DIRENTC_SIZE: usize = 16;
pub const DIRENTXC_SIZE: usize = 80;
pub const LIST_ENTRY_SIZE: usize = 72;

// Default timeouts, in seconds.
pub const CNS_TIMEOUT: u64 = 5;
pub const CNS_DIRTIMEOUT: u64 = 300;
pub const CNS_TRANSTIMEOUT: u64 = 60;

pub const CNS_PORT: u16 = 5010;
pub const CNS_SPORT: u16 = 5510;
pub const CNS_DEFAULT_HOST: &str = "castorns";

// Magic of the security context frame sent first on the secure port.
pub const CSEC_MAGIC: u32 = 0x0CA5EC01;

// Fileid of "/" and the first fileid handed to new entries.
pub const CNS_ROOT_FILEID: u64 = 2;
pub const CNS_FIRST_FILEID: u64 = 3;

// First id handed out by the user and group maps.
pub const CNS_FIRST_MAPPED_ID: u32 = 101;

// Listing flags.
pub const CNS_LIST_BEGIN: i32 = 0;
pub const CNS_LIST_CONTINUE: i32 = 1;
pub const CNS_LIST_END: i32 = 2;

// Directory read attribute levels.
pub const CNS_RDD_NAMES: u16 = 0;
pub const CNS_RDD_DIRX: u16 = 1;
pub const CNS_RDD_DIRXT: u16 = 2;
pub const CNS_RDD_COMMENT: u16 = 3;
pub const CNS_RDD_DIRXC: u16 = 4;
pub const CNS_RDD_DIRXR: u16 = 5;
