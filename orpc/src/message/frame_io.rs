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

use crate::io::{IOError, IOResult};
use crate::message::FrameHeader;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub struct FrameIO;

impl FrameIO {
    async fn with_timeout<F, T>(timeout: Option<Duration>, fut: F) -> IOResult<T>
    where
        F: std::future::Future<Output = std::io::Result<T>>,
    {
        match timeout {
            Some(t) => Ok(tokio::time::timeout(t, fut).await??),
            None => Ok(fut.await?),
        }
    }

    /// Read a frame header. A clean close before the first byte is reported as `UnexpectedEof`.
    pub async fn read_header<R>(r: &mut R, timeout: Option<Duration>) -> IOResult<FrameHeader>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; FrameHeader::SIZE];
        Self::with_timeout(timeout, r.read_exact(&mut buf)).await?;
        Ok(FrameHeader::decode(&buf))
    }

    /// Read exactly `len` body bytes; `max` bounds what the peer may announce.
    pub async fn read_body<R>(
        r: &mut R,
        len: usize,
        max: usize,
        timeout: Option<Duration>,
    ) -> IOResult<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        if len > max {
            return Err(IOError::with_kind(
                ErrorKind::InvalidData,
                format!("frame body of {} bytes exceeds limit {}", len, max),
            ));
        }
        let mut buf = vec![0u8; len];
        if len > 0 {
            Self::with_timeout(timeout, r.read_exact(&mut buf)).await?;
        }
        Ok(buf)
    }

    pub async fn write_all<W>(w: &mut W, buf: &[u8], timeout: Option<Duration>) -> IOResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        Self::with_timeout(timeout, async {
            w.write_all(buf).await?;
            w.flush().await
        })
        .await
    }
}
