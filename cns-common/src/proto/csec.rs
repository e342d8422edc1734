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

use crate::error::serrno::{ESEC_BAD_CREDENTIALS, ESEC_NO_CONTEXT};
use crate::error::NsError;
use crate::proto::{NsReader, CSEC_MAGIC};
use crate::NsResult;
use bytes::Bytes;
use orpc::codec::Unmarshaller;
use orpc::message::{FrameBuilder, FrameHeader, LengthMode};

/// First frame on the secure port: the mechanism and the identity the
/// client claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsecInit {
    pub mech: String,
    pub uid: u32,
    pub gid: u32,
}

impl CsecInit {
    pub const CODE_INIT: i32 = 1;

    // Host based identity, accepted from trusted hosts only.
    pub const MECH_ID: &'static str = "ID";

    const MAX_MECH_LEN: usize = 19;
    const FRAME_LIMIT: usize = 64;

    pub fn id(uid: u32, gid: u32) -> Self {
        Self {
            mech: Self::MECH_ID.to_string(),
            uid,
            gid,
        }
    }

    pub fn encode(&self) -> NsResult<Bytes> {
        let mut frame = FrameBuilder::new(CSEC_MAGIC, Self::CODE_INIT, LengthMode::Total, Self::FRAME_LIMIT);
        frame.put_string(&self.mech)?;
        frame.put_long(self.uid as i32)?;
        frame.put_long(self.gid as i32)?;
        Ok(frame.finish()?)
    }

    /// Decode the body of a frame whose header carried `CSEC_MAGIC`.
    pub fn decode(header: &FrameHeader, body: &[u8]) -> NsResult<Self> {
        if header.magic != CSEC_MAGIC || header.code != Self::CODE_INIT {
            return Err(NsError::with_msg(ESEC_NO_CONTEXT, format!("unexpected frame {}", header)));
        }
        let mut u = Unmarshaller::new(body);
        let mech = u
            .get_str(Self::MAX_MECH_LEN)
            .map_err(|_| NsError::with_msg(ESEC_BAD_CREDENTIALS, "bad mechanism"))?;
        let uid = u.get_id()?;
        let gid = u.get_id()?;
        Ok(Self { mech, uid, gid })
    }

    /// Answer to the init frame, 0 when the context is established.
    pub fn reply(status: i32) -> Bytes {
        Bytes::copy_from_slice(&FrameHeader::new(CSEC_MAGIC, status, 0).encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_frame_layout() {
        let buf = CsecInit::id(500, 100).encode().unwrap();
        let mut head = [0u8; FrameHeader::SIZE];
        head.copy_from_slice(&buf[..FrameHeader::SIZE]);
        let header = FrameHeader::decode(&head);
        assert_eq!(header.magic, CSEC_MAGIC);
        assert_eq!(header.len as usize, buf.len());

        let init = CsecInit::decode(&header, &buf[FrameHeader::SIZE..]).unwrap();
        assert_eq!(init, CsecInit::id(500, 100));
    }

    #[test]
    fn plain_request_is_no_context() {
        let header = FrameHeader::new(0x030E1301, 3, 40);
        let err = CsecInit::decode(&header, &[]).unwrap_err();
        assert_eq!(err.code(), ESEC_NO_CONTEXT);
    }
}
