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

use crate::error::ErrorExt;
use crate::CommonError;
use std::fmt::{Display, Formatter};
use std::io;
use std::io::ErrorKind;

pub mod net;
pub mod retry;

pub type IOResult<T> = Result<T, IOError>;

/// An io error with an optional context prefix.
#[derive(Debug)]
pub struct IOError {
    source: io::Error,
    ctx: Option<String>,
}

impl IOError {
    pub fn create(source: io::Error) -> Self {
        Self { source, ctx: None }
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self::create(io::Error::new(kind, msg.into()))
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.source.raw_os_error()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind(), ErrorKind::TimedOut)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind(), ErrorKind::UnexpectedEof)
    }

    pub fn is_refused(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConnectionRefused)
    }

    pub fn into_inner(self) -> io::Error {
        self.source
    }
}

impl Display for IOError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.ctx {
            Some(ctx) => write!(f, "{}: {}", ctx, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

impl std::error::Error for IOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl ErrorExt for IOError {
    fn should_retry(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Interrupted
                | ErrorKind::WouldBlock
                | ErrorKind::TimedOut
                | ErrorKind::ConnectionRefused
        )
    }

    fn ctx(mut self, ctx: impl AsRef<str>) -> Self {
        let ctx = match self.ctx.take() {
            Some(old) => format!("{}: {}", ctx.as_ref(), old),
            None => ctx.as_ref().to_string(),
        };
        self.ctx = Some(ctx);
        self
    }
}

impl From<io::Error> for IOError {
    fn from(value: io::Error) -> Self {
        Self::create(value)
    }
}

impl From<CommonError> for IOError {
    fn from(value: CommonError) -> Self {
        match value {
            CommonError::IO(e) => e,
            CommonError::Timeout(d) => {
                Self::with_kind(ErrorKind::TimedOut, format!("timed out after {:?}", d))
            }
            e => Self::with_kind(ErrorKind::Other, e.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for IOError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::with_kind(ErrorKind::TimedOut, "deadline has elapsed")
    }
}
