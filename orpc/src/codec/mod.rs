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

//! Big-endian wire primitives.
//!
//! Every integer is written in network byte order with a fixed width:
//! BYTE 1, WORD 2, LONG 4, HYPER 8, TIME 8. Strings are NUL terminated
//! and opaque blobs are copied raw. Both cursors are bounds checked, so a
//! malformed or short frame turns into a `CodecError` instead of reading
//! or writing past the buffer.

mod marshaller;
mod unmarshaller;

pub use self::marshaller::Marshaller;
pub use self::unmarshaller::Unmarshaller;

use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer underflow: need {need} bytes, {remaining} remaining")]
    Underflow { need: usize, remaining: usize },

    #[error("buffer overflow: writing {need} bytes, {remaining} remaining")]
    Overflow { need: usize, remaining: usize },

    #[error("string of {len} bytes exceeds limit {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("string is not NUL terminated")]
    Unterminated,

    #[error("string is not valid utf-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_at_boundaries() {
        let mut m = Marshaller::new(64);
        m.put_long(i32::MIN).unwrap();
        m.put_long(-1).unwrap();
        m.put_word(u16::MAX).unwrap();
        m.put_byte(b'm').unwrap();
        m.put_hyper(u64::MAX).unwrap();
        m.put_time(-5).unwrap();
        m.put_string("").unwrap();
        m.put_opaque(&[1, 2, 3, 4]).unwrap();

        let mut u = Unmarshaller::new(m.as_slice());
        assert_eq!(u.get_long().unwrap(), i32::MIN);
        assert_eq!(u.get_long().unwrap(), -1);
        assert_eq!(u.get_word().unwrap(), u16::MAX);
        assert_eq!(u.get_byte().unwrap(), b'm');
        assert_eq!(u.get_hyper().unwrap(), u64::MAX);
        assert_eq!(u.get_time().unwrap(), -5);
        assert_eq!(u.get_string(10).unwrap(), "");
        assert_eq!(u.get_opaque::<4>().unwrap(), [1, 2, 3, 4]);
        assert!(u.is_empty());
    }

    #[test]
    fn network_byte_order() {
        let mut m = Marshaller::new(16);
        m.put_long(0x030E1301).unwrap();
        m.put_word(0x0102).unwrap();
        assert_eq!(m.as_slice(), &[0x03, 0x0E, 0x13, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn string_limit() {
        let long = "x".repeat(1024);
        let mut m = Marshaller::new(2048);
        m.put_string(&long).unwrap();
        m.put_long(7).unwrap();

        let mut u = Unmarshaller::new(m.as_slice());
        assert_eq!(
            u.get_string(1023),
            Err(CodecError::StringTooLong {
                len: 1024,
                max: 1023
            })
        );

        let mut u = Unmarshaller::new(m.as_slice());
        assert_eq!(u.get_string(1024).unwrap().len(), 1024);
        assert_eq!(u.get_long().unwrap(), 7);
    }

    #[test]
    fn short_frame() {
        let mut u = Unmarshaller::new(&[0, 0, 1]);
        assert!(matches!(u.get_long(), Err(CodecError::Underflow { .. })));

        let mut u = Unmarshaller::new(b"abc");
        assert_eq!(u.get_string(10), Err(CodecError::Unterminated));
    }

    #[test]
    fn writer_capacity() {
        let mut m = Marshaller::new(6);
        m.put_long(1).unwrap();
        assert!(matches!(m.put_long(2), Err(CodecError::Overflow { .. })));
        assert_eq!(m.len(), 4);
        m.put_word(3).unwrap();
        assert_eq!(m.remaining(), 0);
    }

    #[test]
    fn backpatch_length() {
        let mut m = Marshaller::new(32);
        m.put_long(1).unwrap();
        m.put_long(0).unwrap();
        m.put_string("abc").unwrap();
        let len = m.len() as i32;
        m.set_long_at(4, len).unwrap();

        let mut u = Unmarshaller::new(m.as_slice());
        u.get_long().unwrap();
        assert_eq!(u.get_long().unwrap(), 12);
        assert!(m.set_long_at(30, 1).is_err());
    }
}
