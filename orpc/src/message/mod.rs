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

mod frame_builder;
mod frame_io;

pub use self::frame_builder::{FrameBuilder, LengthMode};
pub use self::frame_io::FrameIO;

use byteorder::{BigEndian, ByteOrder};
use std::fmt::{Display, Formatter};

/// Every frame starts with three LONGs: magic, a code (request opcode or
/// reply type) and a length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u32,
    pub code: i32,
    pub len: i32,
}

impl FrameHeader {
    pub const SIZE: usize = 12;

    pub fn new(magic: u32, code: i32, len: i32) -> Self {
        Self { magic, code, len }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        BigEndian::write_u32(&mut buf[0..4], self.magic);
        BigEndian::write_i32(&mut buf[4..8], self.code);
        BigEndian::write_i32(&mut buf[8..12], self.len);
        buf
    }

    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        Self {
            magic: BigEndian::read_u32(&buf[0..4]),
            code: BigEndian::read_i32(&buf[4..8]),
            len: BigEndian::read_i32(&buf[8..12]),
        }
    }
}

impl Display for FrameHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "magic={:#010x}, code={}, len={}",
            self.magic, self.code, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let h = FrameHeader::new(0x030E1304, 35, 120);
        let buf = h.encode();
        assert_eq!(&buf[0..4], &[0x03, 0x0E, 0x13, 0x04]);
        assert_eq!(FrameHeader::decode(&buf), h);
    }

    #[test]
    fn builder_backpatches_total_length() {
        let mut b = FrameBuilder::new(0x030E1301, 8, LengthMode::Total, 100);
        b.put_long(1).unwrap();
        b.put_string("/a").unwrap();
        let frame = b.finish().unwrap();
        assert_eq!(frame.len(), 12 + 4 + 3);

        let mut head = [0u8; 12];
        head.copy_from_slice(&frame[..12]);
        assert_eq!(FrameHeader::decode(&head).len, 19);
    }

    #[test]
    fn builder_backpatches_payload_length() {
        let mut b = FrameBuilder::new(0x030E1301, 3, LengthMode::Payload, 100);
        b.put_long(0).unwrap();
        let frame = b.finish().unwrap();

        let mut head = [0u8; 12];
        head.copy_from_slice(&frame[..12]);
        assert_eq!(FrameHeader::decode(&head).len, 4);
    }
}
