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

use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt::{Display, Formatter};

/// Request opcodes. Numbers are fixed by the wire protocol.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive)]
pub enum NsOpcode {
    Access = 0,
    Chdir = 1,
    Chmod = 2,
    Chown = 3,
    Creat = 4,
    Mkdir = 5,
    Rename = 6,
    Rmdir = 7,
    Stat = 8,
    Unlink = 9,
    Opendir = 10,
    Readdir = 11,
    Closedir = 12,
    Open = 13,
    Close = 14,
    SetAtime = 15,
    SetFsize = 16,
    Shutdown = 17,
    GetSegAttrs = 18,
    SetSegAttrs = 19,
    ListTape = 20,
    EndList = 21,
    GetPath = 22,
    Delete = 23,
    Undelete = 24,
    ChClass = 25,
    DeleteClass = 26,
    EnterClass = 27,
    ModifyClass = 28,
    QueryClass = 29,
    ListClass = 30,
    DelComment = 31,
    GetComment = 32,
    SetComment = 33,
    Utime = 34,
    ReplaceSeg = 35,
    GetAcl = 37,
    SetAcl = 38,
    Lchown = 39,
    Lstat = 40,
    Readlink = 41,
    Symlink = 42,
    AddReplica = 43,
    DelReplica = 44,
    ListReplica = 45,
    StartTrans = 46,
    EndTrans = 47,
    AbortTrans = 48,
    ListLinks = 49,
    SetFsizeG = 50,
    StatG = 51,
    StatR = 52,
    StartSess = 59,
    EndSess = 60,
    GetGrpId = 62,
    GetGrpNam = 63,
    GetIdMap = 64,
    GetLinks = 65,
    GetUsrId = 67,
    GetUsrNam = 68,
    EntGrpMap = 73,
    EntUsrMap = 74,
    ReplaceTapeCopy = 75,
    UpdateSegChecksum = 76,
    CreatG = 77,
    #[num_enum(catch_all)]
    Unknown(i32),
}

impl NsOpcode {
    /// Requests that open a server side listing cursor.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NsOpcode::Opendir
                | NsOpcode::ListClass
                | NsOpcode::ListTape
                | NsOpcode::ListReplica
                | NsOpcode::ListLinks
        )
    }

    /// The request type that continues a listing opened by `self`.
    pub fn continuation(&self) -> Option<NsOpcode> {
        match self {
            NsOpcode::Opendir => Some(NsOpcode::Readdir),
            NsOpcode::ListClass | NsOpcode::ListTape | NsOpcode::ListReplica | NsOpcode::ListLinks => {
                Some(*self)
            }
            _ => None,
        }
    }

    /// Requests that never modify the namespace. A failing read only
    /// request does not end an explicit transaction.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            NsOpcode::Access
                | NsOpcode::GetAcl
                | NsOpcode::GetComment
                | NsOpcode::GetLinks
                | NsOpcode::GetPath
                | NsOpcode::Lstat
                | NsOpcode::Readlink
                | NsOpcode::Stat
                | NsOpcode::StatG
                | NsOpcode::StatR
                | NsOpcode::GetGrpId
                | NsOpcode::GetGrpNam
                | NsOpcode::GetUsrId
                | NsOpcode::GetUsrNam
                | NsOpcode::GetIdMap
                | NsOpcode::GetSegAttrs
                | NsOpcode::QueryClass
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            NsOpcode::Access => "access",
            NsOpcode::Chdir => "chdir",
            NsOpcode::Chmod => "chmod",
            NsOpcode::Chown => "chown",
            NsOpcode::Creat => "creat",
            NsOpcode::Mkdir => "mkdir",
            NsOpcode::Rename => "rename",
            NsOpcode::Rmdir => "rmdir",
            NsOpcode::Stat => "stat",
            NsOpcode::Unlink => "unlink",
            NsOpcode::Opendir => "opendir",
            NsOpcode::Readdir => "readdir",
            NsOpcode::Closedir => "closedir",
            NsOpcode::Open => "open",
            NsOpcode::Close => "close",
            NsOpcode::SetAtime => "setatime",
            NsOpcode::SetFsize => "setfsize",
            NsOpcode::Shutdown => "shutdown",
            NsOpcode::GetSegAttrs => "getsegattrs",
            NsOpcode::SetSegAttrs => "setsegattrs",
            NsOpcode::ListTape => "listtape",
            NsOpcode::EndList => "endlist",
            NsOpcode::GetPath => "getpath",
            NsOpcode::Delete => "delete",
            NsOpcode::Undelete => "undelete",
            NsOpcode::ChClass => "chclass",
            NsOpcode::DeleteClass => "deleteclass",
            NsOpcode::EnterClass => "enterclass",
            NsOpcode::ModifyClass => "modifyclass",
            NsOpcode::QueryClass => "queryclass",
            NsOpcode::ListClass => "listclass",
            NsOpcode::DelComment => "delcomment",
            NsOpcode::GetComment => "getcomment",
            NsOpcode::SetComment => "setcomment",
            NsOpcode::Utime => "utime",
            NsOpcode::ReplaceSeg => "replaceseg",
            NsOpcode::GetAcl => "getacl",
            NsOpcode::SetAcl => "setacl",
            NsOpcode::Lchown => "lchown",
            NsOpcode::Lstat => "lstat",
            NsOpcode::Readlink => "readlink",
            NsOpcode::Symlink => "symlink",
            NsOpcode::AddReplica => "addreplica",
            NsOpcode::DelReplica => "delreplica",
            NsOpcode::ListReplica => "listreplica",
            NsOpcode::StartTrans => "starttrans",
            NsOpcode::EndTrans => "endtrans",
            NsOpcode::AbortTrans => "aborttrans",
            NsOpcode::ListLinks => "listlinks",
            NsOpcode::SetFsizeG => "setfsizeg",
            NsOpcode::StatG => "statg",
            NsOpcode::StatR => "statr",
            NsOpcode::StartSess => "startsess",
            NsOpcode::EndSess => "endsess",
            NsOpcode::GetGrpId => "getgrpbynam",
            NsOpcode::GetGrpNam => "getgrpbygid",
            NsOpcode::GetIdMap => "getidmap",
            NsOpcode::GetLinks => "getlinks",
            NsOpcode::GetUsrId => "getusrbynam",
            NsOpcode::GetUsrNam => "getusrbyuid",
            NsOpcode::EntGrpMap => "entergrpmap",
            NsOpcode::EntUsrMap => "enterusrmap",
            NsOpcode::ReplaceTapeCopy => "replacetapecopy",
            NsOpcode::UpdateSegChecksum => "updateseg_checksum",
            NsOpcode::CreatG => "creatg",
            NsOpcode::Unknown(_) => "unknown",
        }
    }
}

impl Display for NsOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NsOpcode::Unknown(n) => write!(f, "unknown({})", n),
            op => write!(f, "{}", op.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_numbers() {
        assert_eq!(i32::from(NsOpcode::Chmod), 2);
        assert_eq!(i32::from(NsOpcode::Stat), 8);
        assert_eq!(i32::from(NsOpcode::GetSegAttrs), 18);
        assert_eq!(i32::from(NsOpcode::ReplaceSeg), 35);
        assert_eq!(i32::from(NsOpcode::ReplaceTapeCopy), 75);
        assert_eq!(NsOpcode::from(36), NsOpcode::Unknown(36));
        assert_eq!(NsOpcode::from(11), NsOpcode::Readdir);
    }
}
