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

use crate::error::NsError;
use crate::proto::{Capabilities, NsReader, CA_MAXCKSUMNAMELEN, CA_MAXVIDLEN};
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};
use serde::{Deserialize, Serialize};

/// Checksum attached to a tape segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentChecksum {
    pub name: String,
    pub value: u32,
}

impl SegmentChecksum {
    pub fn new(name: impl Into<String>, value: u32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// A value without an algorithm name is meaningless; every path that
    /// stores a segment rejects it the same way.
    pub fn check(&self) -> NsResult<()> {
        if self.name.is_empty() && self.value != 0 {
            Err(NsError::with_msg(
                libc::EINVAL,
                format!("checksum {:#x} without checksum name", self.value),
            ))
        } else {
            Ok(())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        m.put_string(&self.name)?;
        m.put_long(self.value as i32)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            name: u.get_str(CA_MAXCKSUMNAMELEN)?,
            value: u.get_long()? as u32,
        })
    }
}

/// One tape segment of a file copy, keyed by `(s_fileid, copyno, fsec)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegMetadata {
    pub s_fileid: u64,
    pub copyno: u16,
    pub fsec: u16,
    pub segsize: u64,
    pub compression: i32,
    pub s_status: u8,
    pub vid: String,
    pub side: u16,
    pub fseq: i32,
    pub blockid: [u8; 4],
    pub checksum: SegmentChecksum,
}

impl SegMetadata {
    pub fn key(&self) -> (u64, u16, u16) {
        (self.s_fileid, self.copyno, self.fsec)
    }

    /// Layout used by getsegattrs replies and setsegattrs requests.
    pub fn encode(&self, m: &mut Marshaller, caps: Capabilities) -> NsResult<()> {
        m.put_word(self.copyno)?;
        m.put_word(self.fsec)?;
        m.put_hyper(self.segsize)?;
        m.put_long(self.compression)?;
        m.put_byte(self.s_status)?;
        m.put_string(&self.vid)?;
        if caps.segment_side {
            m.put_word(self.side)?;
        }
        m.put_long(self.fseq)?;
        m.put_opaque(&self.blockid)?;
        if caps.segment_checksum {
            self.checksum.encode(m)?;
        }
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller, caps: Capabilities) -> NsResult<Self> {
        let mut seg = SegMetadata {
            copyno: u.get_word()?,
            fsec: u.get_word()?,
            segsize: u.get_hyper()?,
            compression: u.get_long()?,
            s_status: u.get_byte()?,
            vid: u.get_str(CA_MAXVIDLEN)?,
            ..Default::default()
        };
        if caps.segment_side {
            seg.side = u.get_word()?;
        }
        seg.fseq = u.get_long()?;
        seg.blockid = u.get_opaque::<4>()?;
        if caps.segment_checksum {
            seg.checksum = SegmentChecksum::decode(u)?;
        }
        Ok(seg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ProtocolVersion;

    fn seg() -> SegMetadata {
        SegMetadata {
            s_fileid: 9,
            copyno: 1,
            fsec: 1,
            segsize: 1 << 40,
            compression: 100,
            s_status: b'-',
            vid: "T12345".to_string(),
            side: 1,
            fseq: 77,
            blockid: [0, 0, 1, 2],
            checksum: SegmentChecksum::new("adler32", 0xdeadbeef),
        }
    }

    #[test]
    fn optional_fields_follow_protocol_version() {
        let s = seg();

        let mut m1 = Marshaller::new(200);
        s.encode(&mut m1, ProtocolVersion::V1.caps()).unwrap();
        let mut m4 = Marshaller::new(200);
        s.encode(&mut m4, ProtocolVersion::V4.caps()).unwrap();
        // side WORD, checksum name and LONG value
        assert_eq!(m4.len() - m1.len(), 2 + 8 + 4);

        let back = SegMetadata::decode(
            &mut Unmarshaller::new(m1.as_slice()),
            ProtocolVersion::V1.caps(),
        )
        .unwrap();
        assert_eq!(back.side, 0);
        assert!(back.checksum.is_empty());
        assert_eq!(back.fseq, 77);
    }

    #[test]
    fn checksum_policy() {
        assert!(SegmentChecksum::new("", 0).check().is_ok());
        assert!(SegmentChecksum::new("adler32", 0).check().is_ok());
        assert_eq!(
            SegmentChecksum::new("", 5).check().unwrap_err().code(),
            libc::EINVAL
        );
    }

    #[test]
    fn oversized_vid() {
        let mut s = seg();
        s.vid = "TOOLONGVID".to_string();
        let mut m = Marshaller::new(200);
        s.encode(&mut m, ProtocolVersion::V4.caps()).unwrap();
        let err = SegMetadata::decode(
            &mut Unmarshaller::new(m.as_slice()),
            ProtocolVersion::V4.caps(),
        )
        .unwrap_err();
        assert_eq!(err.code(), libc::EINVAL);
    }
}
