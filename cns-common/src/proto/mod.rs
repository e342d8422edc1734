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

//! Name server wire protocol: magics, opcodes, reply types, limits and the
//! field helpers shared by the client builders and the server handlers.

mod csec;
mod limits;
mod opcode;
mod protocol_version;
mod reply_type;
mod wire;

pub use self::csec::CsecInit;
pub use self::limits::*;
pub use self::opcode::NsOpcode;
pub use self::protocol_version::{Capabilities, ProtocolVersion};
pub use self::reply_type::ReplyType;
pub use self::wire::{NsReader, NsWriter};
