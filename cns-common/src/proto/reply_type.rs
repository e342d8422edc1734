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

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum ReplyType {
    /// Diagnostic text for the client's error sink.
    MsgErr = 1,
    MsgData = 2,
    /// Final status; the server closes the connection.
    Rc = 3,
    /// Intermediate status; the connection stays open.
    Irc = 4,
    MsgLinks = 5,
    MsgReplic = 6,
    MsgReplicP = 7,
}

impl ReplyType {
    pub fn is_status(&self) -> bool {
        matches!(self, ReplyType::Rc | ReplyType::Irc)
    }
}
