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

//! Status codes carried in `CNS_RC`/`CNS_IRC` replies.
//!
//! Values below `SEBASEOFF` are plain POSIX errno numbers. The three
//! extended ranges cover communication, name server and security failures.

use nix::errno::Errno;

pub const SEBASEOFF: i32 = 1000;
pub const SENOSHOST: i32 = SEBASEOFF + 1;
pub const SENOSSERV: i32 = SEBASEOFF + 2;
pub const SETIMEDOUT: i32 = SEBASEOFF + 4;
pub const SENAMETOOLONG: i32 = SEBASEOFF + 8;
pub const SEBADVERSION: i32 = SEBASEOFF + 10;
pub const SEUBUF2SMALL: i32 = SEBASEOFF + 11;
pub const SEENTRYNFND: i32 = SEBASEOFF + 14;
pub const SEINTERNAL: i32 = SEBASEOFF + 15;
pub const SECONNDROP: i32 = SEBASEOFF + 16;
pub const SECOMERR: i32 = SEBASEOFF + 18;
pub const SENOMAPFND: i32 = SEBASEOFF + 20;
pub const SEOPNOTSUP: i32 = SEBASEOFF + 22;
pub const SEWOULDBLOCK: i32 = SEBASEOFF + 23;
pub const SENOTADMIN: i32 = SEBASEOFF + 32;
pub const SEUSERUNKN: i32 = SEBASEOFF + 33;
pub const SEDUPKEY: i32 = SEBASEOFF + 34;
pub const SEENTRYEXISTS: i32 = SEBASEOFF + 35;
pub const SEGROUPUNKN: i32 = SEBASEOFF + 36;
pub const SECHECKSUM: i32 = SEBASEOFF + 37;
pub const SELOOP: i32 = SEBASEOFF + 40;

pub const ENSBASEOFF: i32 = 1400;
pub const ENSNACT: i32 = ENSBASEOFF + 1;
pub const ENSFILECHG: i32 = ENSBASEOFF + 2;
pub const ENSNOSEG: i32 = ENSBASEOFF + 3;
pub const ENSISLINK: i32 = ENSBASEOFF + 4;
pub const ENSCLASSNOSEGS: i32 = ENSBASEOFF + 5;
pub const ENSTOOMANYSEGS: i32 = ENSBASEOFF + 6;
pub const ENSOVERWHENREP: i32 = ENSBASEOFF + 7;
pub const ENHOSTNOTSET: i32 = ENSBASEOFF + 8;

pub const ESECBASEOFF: i32 = 2700;
pub const ESEC_SYSTEM: i32 = ESECBASEOFF + 1;
pub const ESEC_BAD_CREDENTIALS: i32 = ESECBASEOFF + 2;
pub const ESEC_NO_CONTEXT: i32 = ESECBASEOFF + 3;

/// Message for any status code.
pub fn sstrerror(code: i32) -> String {
    let msg = match code {
        SENOSHOST => "Host not known",
        SENOSSERV => "Service not known",
        SETIMEDOUT => "Has timed out",
        SENAMETOOLONG => "File name too long",
        SEBADVERSION => "Version ID mismatch",
        SEUBUF2SMALL => "User buffer too small",
        SEENTRYNFND => "Entry not found",
        SEINTERNAL => "Internal error",
        SECONNDROP => "Connection closed by remote end",
        SECOMERR => "Communication error",
        SENOMAPFND => "Can't open mapping database",
        SEOPNOTSUP => "Operation not supported",
        SEWOULDBLOCK => "Resource temporarily unavailable",
        SENOTADMIN => "requestor is not administrator",
        SEUSERUNKN => "User unknown",
        SEDUPKEY => "Duplicate key value",
        SEENTRYEXISTS => "The entry already exists",
        SEGROUPUNKN => "Group Unknown",
        SECHECKSUM => "Bad checksum",
        SELOOP => "Too many levels of symbolic links",
        ENSNACT => "Name server not active",
        ENSFILECHG => "File has been overwritten, request ignored",
        ENSNOSEG => "Segment had been deleted",
        ENSISLINK => "Is a link",
        ENSCLASSNOSEGS => "File class does not allow a copy on tape",
        ENSTOOMANYSEGS => "Too many copies on tape",
        ENSOVERWHENREP => "Cannot overwrite valid segment when replacing",
        ENHOSTNOTSET => "CNS HOST not set",
        ESEC_SYSTEM => "System error in the security package",
        ESEC_BAD_CREDENTIALS => "Bad credentials",
        ESEC_NO_CONTEXT => "No security context",
        c if c > 0 && c < SEBASEOFF => return Errno::from_raw(c).desc().to_string(),
        c => return format!("Unknown error {}", c),
    };
    msg.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(sstrerror(ENSNACT), "Name server not active");
        assert_eq!(sstrerror(SELOOP), "Too many levels of symbolic links");
        assert_eq!(sstrerror(libc::ENOENT), "No such file or directory");
        assert!(sstrerror(9999).contains("9999"));
    }
}
