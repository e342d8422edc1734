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
use bytes::{BufMut, Bytes, BytesMut};

/// Append-only writer with a hard capacity limit.
#[derive(Debug, Clone)]
pub struct Marshaller {
    buf: BytesMut,
    limit: usize,
}

impl Marshaller {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(limit.min(4096)),
            limit,
        }
    }

    fn reserve(&self, need: usize) -> CodecResult<()> {
        let remaining = self.remaining();
        if need > remaining {
            Err(CodecError::Overflow { need, remaining })
        } else {
            Ok(())
        }
    }

    pub fn put_byte(&mut self, v: u8) -> CodecResult<()> {
        self.reserve(1)?;
        self.buf.put_u8(v);
        Ok(())
    }

    pub fn put_word(&mut self, v: u16) -> CodecResult<()> {
        self.reserve(2)?;
        self.buf.put_u16(v);
        Ok(())
    }

    pub fn put_long(&mut self, v: i32) -> CodecResult<()> {
        self.reserve(4)?;
        self.buf.put_i32(v);
        Ok(())
    }

    pub fn put_hyper(&mut self, v: u64) -> CodecResult<()> {
        self.reserve(8)?;
        self.buf.put_u64(v);
        Ok(())
    }

    pub fn put_time(&mut self, v: i64) -> CodecResult<()> {
        self.reserve(8)?;
        self.buf.put_i64(v);
        Ok(())
    }

    pub fn put_string(&mut self, v: &str) -> CodecResult<()> {
        self.reserve(v.len() + 1)?;
        self.buf.put_slice(v.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    pub fn put_opaque(&mut self, v: &[u8]) -> CodecResult<()> {
        self.reserve(v.len())?;
        self.buf.put_slice(v);
        Ok(())
    }

    /// Overwrite a LONG already written at `pos`, used to backpatch frame lengths.
    pub fn set_long_at(&mut self, pos: usize, v: i32) -> CodecResult<()> {
        let end = pos + 4;
        if end > self.buf.len() {
            return Err(CodecError::Overflow {
                need: end,
                remaining: self.buf.len(),
            });
        }
        self.buf[pos..end].copy_from_slice(&v.to_be_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len)
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}
