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

use bytes::Bytes;
use cns_common::proto::{NsOpcode, ProtocolVersion, REQBUFSZ};
use cns_common::NsResult;
use orpc::codec::Marshaller;
use orpc::message::{FrameBuilder, LengthMode};
use std::ops::{Deref, DerefMut};

/// A request frame under construction. The body starts with the caller's
/// uid and gid; the length is backpatched by [`RequestBuilder::finish`].
pub struct RequestBuilder {
    opcode: NsOpcode,
    frame: FrameBuilder,
}

impl RequestBuilder {
    pub fn new(version: ProtocolVersion, opcode: NsOpcode, uid: u32, gid: u32) -> NsResult<Self> {
        let mut frame = FrameBuilder::new(version.magic(), opcode.into(), LengthMode::Total, REQBUFSZ);
        frame.put_long(uid as i32)?;
        frame.put_long(gid as i32)?;
        Ok(Self { opcode, frame })
    }

    pub fn opcode(&self) -> NsOpcode {
        self.opcode
    }

    pub fn finish(self) -> NsResult<Bytes> {
        Ok(self.frame.finish()?)
    }
}

impl Deref for RequestBuilder {
    type Target = Marshaller;

    fn deref(&self) -> &Self::Target {
        &self.frame
    }
}

impl DerefMut for RequestBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::message::FrameHeader;

    #[test]
    fn length_counts_the_header() {
        let mut req = RequestBuilder::new(ProtocolVersion::LATEST, NsOpcode::Chmod, 501, 100).unwrap();
        req.put_hyper(0).unwrap();
        req.put_string("/a").unwrap();
        req.put_long(0o644).unwrap();
        let buf = req.finish().unwrap();

        let mut head = [0u8; FrameHeader::SIZE];
        head.copy_from_slice(&buf[..FrameHeader::SIZE]);
        let header = FrameHeader::decode(&head);
        assert_eq!(header.magic, ProtocolVersion::CNS_MAGIC4);
        assert_eq!(header.code, 2);
        assert_eq!(header.len as usize, buf.len());
        assert_eq!(buf.len(), 12 + 8 + 8 + 3 + 4);
    }
}
