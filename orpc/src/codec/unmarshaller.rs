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

use crate::codec::{CodecError, CodecResult};
use byteorder::{BigEndian, ByteOrder};

/// Read cursor over a received frame body.
#[derive(Debug, Clone)]
pub struct Unmarshaller<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Unmarshaller<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, need: usize) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        if need > remaining {
            return Err(CodecError::Underflow { need, remaining });
        }
        let s = &self.buf[self.pos..self.pos + need];
        self.pos += need;
        Ok(s)
    }

    pub fn get_byte(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_word(&mut self) -> CodecResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn get_long(&mut self) -> CodecResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn get_hyper(&mut self) -> CodecResult<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn get_time(&mut self) -> CodecResult<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    /// Read a NUL terminated string of at most `max` bytes. An oversized
    /// string is consumed entirely before the error is returned.
    pub fn get_string(&mut self, max: usize) -> CodecResult<String> {
        let rest = &self.buf[self.pos..];
        let len = match rest.iter().position(|b| *b == 0) {
            Some(n) => n,
            None => return Err(CodecError::Unterminated),
        };
        self.pos += len + 1;
        if len > max {
            return Err(CodecError::StringTooLong { len, max });
        }
        String::from_utf8(rest[..len].to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn get_opaque<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}
