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

use crate::codec::CodecError;
use crate::io::IOError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("{0}")]
    Msg(String),

    #[error(transparent)]
    IO(#[from] IOError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for CommonError {
    fn from(value: std::io::Error) -> Self {
        CommonError::IO(IOError::create(value))
    }
}

impl From<String> for CommonError {
    fn from(value: String) -> Self {
        CommonError::Msg(value)
    }
}

impl From<&str> for CommonError {
    fn from(value: &str) -> Self {
        CommonError::Msg(value.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(value: toml::de::Error) -> Self {
        CommonError::Config(value.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for CommonError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        CommonError::Timeout(Duration::ZERO)
    }
}

pub trait ErrorExt {
    /// Transient failures that a caller may retry after a delay.
    fn should_retry(&self) -> bool;

    /// Attach context to the error message.
    fn ctx(self, ctx: impl AsRef<str>) -> Self;
}

impl ErrorExt for CommonError {
    fn should_retry(&self) -> bool {
        match self {
            CommonError::IO(e) => e.should_retry(),
            CommonError::Timeout(_) => true,
            _ => false,
        }
    }

    fn ctx(self, ctx: impl AsRef<str>) -> Self {
        match self {
            CommonError::Msg(m) => CommonError::Msg(format!("{}: {}", ctx.as_ref(), m)),
            CommonError::IO(e) => CommonError::IO(e.ctx(ctx)),
            e => CommonError::Msg(format!("{}: {}", ctx.as_ref(), e)),
        }
    }
}
