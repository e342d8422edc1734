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


use cns_common::proto::{ProtocolVersion, ReplyType, REPBUFSZ};
use cns_common::NsResult;
use bytes::Bytes;
use log::warn;
use orpc::codec::Marshaller;
use orpc::message::{FrameBuilder, FrameHeader, LengthMode};

/// Reply frames produced while one request is processed. They are written
/// in order, before the status frame that ends the request.
pub struct ReplySink {
    magic: u32,
    frames: Vec<Bytes>,
}

impl ReplySink {
    /// Largest payload of an extended reply block (links, replicas).
    pub const MAX_BLOCK: usize = 65536;

    pub fn new() -> Self {
        Self {
            magic: ProtocolVersion::CNS_MAGIC,
            frames: vec![],
        }
    }

    /// Diagnostic text for the client's error sink.
    pub fn msg_err(&mut self, text: &str) {
        let mut frame = FrameBuilder::new(self.magic, ReplyType::MsgErr.into(), LengthMode::Payload, REPBUFSZ);
        let max = frame.remaining().saturating_sub(1);
        let text = match text.char_indices().nth(max) {
            Some((i, _)) => &text[..i],
            None => text,
        };
        let res = frame.put_string(text).and_then(|_| frame.finish());
        match res {
            Ok(buf) => self.frames.push(buf),
            Err(e) => warn!("Dropped error message {:?}: {}", text, e),
        }
    }

    /// A payload block of `rtype` filled by `f`, at most `limit` bytes.
    pub fn block<F>(&mut self, rtype: ReplyType, limit: usize, f: F) -> NsResult<()>
    where
        F: FnOnce(&mut Marshaller) -> NsResult<()>,
    {
        let mut frame = FrameBuilder::new(self.magic, rtype.into(), LengthMode::Payload, limit + FrameHeader::SIZE);
        f(&mut frame)?;
        self.frames.push(frame.finish()?);
        Ok(())
    }

    pub fn data<F>(&mut self, f: F) -> NsResult<()>
    where
        F: FnOnce(&mut Marshaller) -> NsResult<()>,
    {
        self.block(ReplyType::MsgData, REPBUFSZ, f)
    }

    pub fn take(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.frames)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `CNS_RC` or `CNS_IRC`. The status travels in the length field.
    pub fn status(rtype: ReplyType, code: i32) -> Bytes {
        let header = FrameHeader::new(ProtocolVersion::CNS_MAGIC, rtype.into(), code);
        Bytes::copy_from_slice(&header.encode())
    }
}

impl Default for ReplySink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::codec::Unmarshaller;

    fn header(buf: &[u8]) -> FrameHeader {
        let mut h = [0u8; FrameHeader::SIZE];
        h.copy_from_slice(&buf[..FrameHeader::SIZE]);
        FrameHeader::decode(&h)
    }

    #[test]
    fn frames_carry_payload_length() {
        let mut sink = ReplySink::new();
        sink.msg_err("No such class");
        sink.data(|m| Ok(m.put_hyper(42)?)).unwrap();
        let frames = sink.take();
        assert!(sink.is_empty());

        let err = header(&frames[0]);
        assert_eq!(err.code, i32::from(ReplyType::MsgErr));
        assert_eq!(err.len as usize, "No such class".len() + 1);

        let data = header(&frames[1]);
        assert_eq!(data.len, 8);
        let mut u = Unmarshaller::new(&frames[1][FrameHeader::SIZE..]);
        assert_eq!(u.get_hyper().unwrap(), 42);
    }

    #[test]
    fn oversized_block_fails() {
        let mut sink = ReplySink::new();
        let res = sink.block(ReplyType::MsgLinks, 4, |m| Ok(m.put_hyper(1)?));
        assert!(res.is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn status_in_length_field() {
        let h = header(&ReplySink::status(ReplyType::Rc, libc::ENOENT));
        assert_eq!(h.magic, ProtocolVersion::CNS_MAGIC);
        assert_eq!(h.code, 3);
        assert_eq!(h.len, libc::ENOENT);
    }
}
