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

use crate::codec::{CodecResult, Marshaller};
use crate::message::FrameHeader;
use bytes::Bytes;
use std::ops::{Deref, DerefMut};

/// What the header's length field counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMode {
    /// Header plus body, used by requests.
    Total,
    /// Body only, used by replies.
    Payload,
}

/// Marshaller that reserves a frame header and backpatches the length on `finish`.
pub struct FrameBuilder {
    inner: Marshaller,
    mode: LengthMode,
}

impl FrameBuilder {
    pub fn new(magic: u32, code: i32, mode: LengthMode, limit: usize) -> Self {
        let mut inner = Marshaller::new(limit.max(FrameHeader::SIZE));
        // The header always fits: the limit is at least the header size.
        let _ = inner.put_opaque(&FrameHeader::new(magic, code, 0).encode());
        Self { inner, mode }
    }

    pub fn body_len(&self) -> usize {
        self.inner.len() - FrameHeader::SIZE
    }

    pub fn finish(mut self) -> CodecResult<Bytes> {
        let len = match self.mode {
            LengthMode::Total => self.inner.len(),
            LengthMode::Payload => self.body_len(),
        };
        self.inner.set_long_at(8, len as i32)?;
        Ok(self.inner.into_bytes())
    }
}

impl Deref for FrameBuilder {
    type Target = Marshaller;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for FrameBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
