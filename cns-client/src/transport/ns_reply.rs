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

use orpc::codec::Unmarshaller;

/// Everything a request produced before its status frame.
#[derive(Debug, Default)]
pub struct NsReply {
    pub status: i32,
    pub data: Vec<u8>,
    // Display paths from MSG_LINKS blocks.
    pub links: Vec<String>,
    // Raw MSG_REPLICP blocks, decoded by the caller that asked for them.
    pub replicas: Vec<Vec<u8>>,
    // MSG_ERR diagnostics.
    pub errors: Vec<String>,
}

impl NsReply {
    pub fn reader(&self) -> Unmarshaller<'_> {
        Unmarshaller::new(&self.data)
    }
}
