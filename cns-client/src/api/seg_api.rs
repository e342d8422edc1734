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

use crate::api::CnsSession;
use crate::transport::NsChannel;
use cns_common::proto::{NsOpcode, CA_MAXVIDLEN, REPBUFSZ};
use cns_common::state::{SegMetadata, SegmentChecksum};
use cns_common::{err_ns, NsResult};

/// Where a segment sits on tape, used to check the caller's view of it
/// before a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegLocation {
    pub copyno: u16,
    pub fsec: u16,
    pub vid: String,
    pub side: u16,
    pub fseq: i32,
}

impl SegLocation {
    pub fn of(seg: &SegMetadata) -> Self {
        Self {
            copyno: seg.copyno,
            fsec: seg.fsec,
            vid: seg.vid.clone(),
            side: seg.side,
            fseq: seg.fseq,
        }
    }
}

fn check_vid(vid: &str) -> NsResult<()> {
    if vid.is_empty() || vid.len() > CA_MAXVIDLEN {
        return err_ns!(libc::EINVAL, "vid {:?}", vid);
    }
    Ok(())
}

impl CnsSession {
    /// Tape segments of a file named by `fileid` or, when it is 0, `path`.
    pub async fn getsegattrs(&mut self, path: Option<&str>, fileid: u64) -> NsResult<Vec<SegMetadata>> {
        let (server, path) = self.target_opt(path)?;
        let mut req = self.request(NsOpcode::GetSegAttrs)?;
        req.put_hyper(self.cwd)?;
        req.put_hyper(fileid)?;
        req.put_string(&path)?;
        let reply = self.call(server, req, NsChannel::RECV_BUF_SIZE).await?;

        let caps = self.caps();
        let mut u = reply.reader();
        let nbseg = u.get_word()?;
        let mut segs = Vec::with_capacity(nbseg as usize);
        for _ in 0..nbseg {
            segs.push(SegMetadata::decode(&mut u, caps)?);
        }
        Ok(segs)
    }

    /// Record the segments of one copy. A copy number of 0 asks the server
    /// for the next free one.
    pub async fn setsegattrs(&mut self, path: Option<&str>, fileid: u64, segs: &[SegMetadata]) -> NsResult<()> {
        if segs.is_empty() {
            return err_ns!(libc::EINVAL, "no segment");
        }
        for seg in segs {
            seg.checksum.check()?;
        }
        let (server, path) = self.target_opt(path)?;
        let caps = self.caps();
        let mut req = self.request(NsOpcode::SetSegAttrs)?;
        req.put_hyper(self.cwd)?;
        req.put_hyper(fileid)?;
        req.put_string(&path)?;
        req.put_word(segs.len() as u16)?;
        for seg in segs {
            seg.encode(&mut req, caps)?;
        }
        self.call_path(server, req).await?;
        Ok(())
    }

    /// Replace segment `old` of `fileid` by `new`, which keeps the old
    /// size and status.
    pub async fn replaceseg(&mut self, fileid: u64, old: &SegLocation, new: &SegMetadata) -> NsResult<()> {
        check_vid(&new.vid)?;
        new.checksum.check()?;
        let caps = self.caps();
        if !caps.replace_checksum && !new.checksum.is_empty() {
            return err_ns!(libc::EINVAL, "protocol {:?} cannot carry a segment checksum", self.version());
        }

        let mut req = self.request(NsOpcode::ReplaceSeg)?;
        req.put_hyper(fileid)?;
        req.put_word(old.copyno)?;
        req.put_word(old.fsec)?;
        req.put_string(&old.vid)?;
        req.put_word(old.side)?;
        req.put_long(old.fseq)?;

        req.put_long(new.compression)?;
        req.put_string(&new.vid)?;
        req.put_word(new.side)?;
        req.put_long(new.fseq)?;
        req.put_opaque(&new.blockid)?;
        if caps.replace_checksum {
            new.checksum.encode(&mut req)?;
        }
        self.call(None, req, 0).await?;
        Ok(())
    }

    /// Move the copy of `fileid` on `oldvid` to `newvid`, described by `segs`.
    pub async fn replacetapecopy(&mut self, fileid: u64, newvid: &str, oldvid: &str, segs: &[SegMetadata]) -> NsResult<()> {
        check_vid(newvid)?;
        check_vid(oldvid)?;
        if segs.is_empty() {
            return err_ns!(libc::EINVAL, "no segment on {}", newvid);
        }
        let caps = self.caps();
        let mut req = self.request(NsOpcode::ReplaceTapeCopy)?;
        req.put_hyper(fileid)?;
        req.put_string(newvid)?;
        req.put_string(oldvid)?;
        req.put_long(segs.len() as i32)?;
        for seg in segs {
            seg.checksum.check()?;
            seg.encode(&mut req, caps)?;
        }
        self.call(None, req, REPBUFSZ).await?;
        Ok(())
    }

    /// Attach a checksum to a segment that has none yet.
    pub async fn updateseg_checksum(&mut self, fileid: u64, seg: &SegLocation, checksum: &SegmentChecksum) -> NsResult<()> {
        check_vid(&seg.vid)?;
        checksum.check()?;
        let mut req = self.request(NsOpcode::UpdateSegChecksum)?;
        req.put_hyper(fileid)?;
        req.put_word(seg.copyno)?;
        req.put_word(seg.fsec)?;
        req.put_string(&seg.vid)?;
        req.put_word(seg.side)?;
        req.put_long(seg.fseq)?;
        checksum.encode(&mut req)?;
        self.call(None, req, 0).await?;
        Ok(())
    }
}
