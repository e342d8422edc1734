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

pub mod serrno;

pub use self::serrno::sstrerror;

use self::serrno::*;
use orpc::codec::CodecError;
use orpc::io::IOError;
use orpc::CommonError;
use std::io::ErrorKind;
use thiserror::Error;

/// Error of every name server operation. `code()` is the status sent on
/// the wire and returned to API callers.
#[derive(Debug, Error)]
pub enum NsError {
    #[error("{}", Self::render(.code, .msg))]
    Status { code: i32, msg: String },

    #[error(transparent)]
    IO(#[from] IOError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl NsError {
    pub fn new(code: i32) -> Self {
        NsError::Status {
            code,
            msg: String::new(),
        }
    }

    pub fn with_msg(code: i32, msg: impl Into<String>) -> Self {
        NsError::Status {
            code,
            msg: msg.into(),
        }
    }

    fn render(code: &i32, msg: &str) -> String {
        if msg.is_empty() {
            sstrerror(*code)
        } else {
            format!("{}: {}", msg, sstrerror(*code))
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            NsError::Status { code, .. } => *code,
            NsError::IO(e) => Self::io_code(e),
            NsError::Codec(CodecError::StringTooLong { .. }) => SENAMETOOLONG,
            NsError::Codec(_) => SEINTERNAL,
            NsError::Common(CommonError::IO(e)) => Self::io_code(e),
            NsError::Common(CommonError::Timeout(_)) => SETIMEDOUT,
            NsError::Common(_) => SEINTERNAL,
        }
    }

    fn io_code(e: &IOError) -> i32 {
        match e.kind() {
            ErrorKind::ConnectionRefused => ENSNACT,
            ErrorKind::TimedOut => SETIMEDOUT,
            ErrorKind::AddrNotAvailable => SENOSHOST,
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => SECONNDROP,
            _ => SECOMERR,
        }
    }

    /// Replace the status code, keeping the message.
    pub fn remap(self, from: i32, to: i32) -> Self {
        if self.code() == from {
            NsError::with_msg(to, self.detail())
        } else {
            self
        }
    }

    fn detail(&self) -> String {
        match self {
            NsError::Status { msg, .. } => msg.clone(),
            e => e.to_string(),
        }
    }

    pub fn is(&self, code: i32) -> bool {
        self.code() == code
    }
}

impl From<std::io::Error> for NsError {
    fn from(value: std::io::Error) -> Self {
        NsError::IO(IOError::create(value))
    }
}

/// Status error from a code with an optional formatted message.
#[macro_export]
macro_rules! ns_err {
    ($code:expr) => {
        $crate::error::NsError::new($code)
    };

    ($code:expr, $($arg:tt)+) => {
        $crate::error::NsError::with_msg($code, format!($($arg)+))
    };
}

/// `Err(ns_err!(...))`.
#[macro_export]
macro_rules! err_ns {
    ($($arg:tt)+) => {
        Err($crate::ns_err!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        assert_eq!(NsError::new(libc::EACCES).code(), libc::EACCES);

        let e: NsError = IOError::with_kind(ErrorKind::ConnectionRefused, "x").into();
        assert_eq!(e.code(), ENSNACT);

        let e: NsError = IOError::with_kind(ErrorKind::TimedOut, "x").into();
        assert_eq!(e.code(), SETIMEDOUT);

        let e: NsError = CodecError::StringTooLong { len: 2000, max: 1023 }.into();
        assert_eq!(e.code(), SENAMETOOLONG);
        assert_eq!(e.remap(SENAMETOOLONG, libc::ENAMETOOLONG).code(), libc::ENAMETOOLONG);
    }

    #[test]
    fn display() {
        let e = ns_err!(libc::ENOENT, "/a/b");
        assert_eq!(e.to_string(), "/a/b: No such file or directory");
        assert_eq!(ns_err!(SEINTERNAL).to_string(), "Internal error");
    }
}
