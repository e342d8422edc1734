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


use crate::handler::NsHandler;
use crate::meta::RecordLease;
use crate::ns::{Credentials, ReqLog};
use cns_common::error::serrno::SEENTRYNFND;
use cns_common::proto::{NsReader, CA_MAXVIDLEN};
use cns_common::state::{FileMetadata, SegMetadata, SegmentChecksum};
use cns_common::utils::STATUS_MIGRATED;
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;

fn describe(seg: &SegMetadata) -> String {
    format!(
        "{} {} {} {} {} {} {} {} {} {:02x}{:02x}{:02x}{:02x} \"{}\" {:x}",
        seg.s_fileid,
        seg.copyno,
        seg.fsec,
        seg.segsize,
        seg.compression,
        seg.s_status as char,
        seg.vid,
        seg.side,
        seg.fseq,
        seg.blockid[0],
        seg.blockid[1],
        seg.blockid[2],
        seg.blockid[3],
        seg.checksum.name,
        seg.checksum.value
    )
}

impl NsHandler {
    fn require_file(entry: &FileMetadata) -> NsResult<()> {
        if entry.is_dir() {
            err_ns!(libc::EISDIR, "{}", entry.name)
        } else {
            Ok(())
        }
    }

    pub(crate) fn getsegattrs(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let fileid = u.get_hyper()?;
        let path = u.get_path()?;
        ReqLog::log("getsegattrs", &format!("getsegattrs {} {}", fileid, path));

        let entry = self.ctx.resolver(cred).lookup_or_id(cwd, fileid, &path, false)?;
        Self::require_file(&entry)?;
        let segs = self.ctx.store().segments_of(entry.fileid);
        let caps = self.caps;
        self.sink.data(|m| {
            m.put_word(segs.len() as u16)?;
            for seg in &segs {
                seg.encode(m, caps)?;
            }
            Ok(())
        })
    }

    pub(crate) fn setsegattrs(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let cwd = u.get_hyper()?;
        let fileid = u.get_hyper()?;
        let path = u.get_path()?;
        let nbseg = u.get_word()?;
        ReqLog::log("setsegattrs", &format!("setsegattrs {} {}", fileid, path));

        let (mut entry, lease) = self.locate(cred, cwd, fileid, &path, false)?;
        Self::require_file(&entry)?;

        let store = self.ctx.store().clone();
        let mut auto_copyno = 0;
        let mut copyno = 0;
        for _ in 0..nbseg {
            let mut seg = SegMetadata::decode(u, self.caps)?;
            seg.s_fileid = entry.fileid;
            if seg.copyno == 0 {
                if auto_copyno == 0 {
                    auto_copyno = store
                        .segments_of(entry.fileid)
                        .iter()
                        .map(|s| s.copyno)
                        .max()
                        .unwrap_or(0)
                        + 1;
                }
                seg.copyno = auto_copyno;
            }
            seg.checksum.check()?;
            copyno = seg.copyno;
            ReqLog::log("setsegattrs", &format!("setsegattrs {}", describe(&seg)));

            let tx = self.db.start_tr();
            match store.lock_segment(tx, seg.key())? {
                Some((_, slock)) => store.update_segment(tx, &slock, seg)?,
                None => store.insert_segment(tx, seg)?,
            }
        }

        // A copy rewritten with fewer segments loses the trailing ones.
        let tx = self.db.start_tr();
        let mut fsec = nbseg as u32 + 1;
        while fsec <= u16::MAX as u32 {
            match store.lock_segment(tx, (entry.fileid, copyno, fsec as u16))? {
                Some((old, slock)) => store.delete_segment(tx, &slock, old.key())?,
                None => break,
            }
            fsec += 1;
        }

        if entry.status != STATUS_MIGRATED {
            entry.status = STATUS_MIGRATED;
            store.update_file(tx, &lease, &entry)?;
        }
        Ok(())
    }

    /// Lock segment `(fileid, copyno, fsec)`, which must sit at
    /// `vid`/`side`/`fseq`.
    fn lock_old_segment(
        &mut self,
        key: (u64, u16, u16),
        vid: &str,
        side: u16,
        fseq: i32,
    ) -> NsResult<(SegMetadata, RecordLease)> {
        let store = self.ctx.store().clone();
        let (old, slock) = match store.lock_segment(self.db.start_tr(), key)? {
            Some(v) => v,
            None => return err_ns!(libc::ENOENT, "segment {:?}", key),
        };
        if old.vid != vid || old.side != side || old.fseq != fseq {
            return err_ns!(SEENTRYNFND, "segment {:?} is not at {} {} {}", key, vid, side, fseq);
        }
        ReqLog::log("segment", &format!("old segment: {}", describe(&old)));
        Ok((old, slock))
    }

    pub(crate) fn replaceseg(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        let copyno = u.get_word()?;
        let fsec = u.get_word()?;
        ReqLog::log("replaceseg", &format!("replaceseg {} {} {}", fileid, copyno, fsec));

        self.ctx.perm().require_admin(cred)?;
        let store = self.ctx.store().clone();
        let (entry, _lease) = store.lock_file(self.db.start_tr(), fileid)?;
        Self::require_file(&entry)?;

        let vid = u.get_str(CA_MAXVIDLEN)?;
        let side = u.get_word()?;
        let fseq = u.get_long()?;
        let (old, slock) = self.lock_old_segment((fileid, copyno, fsec), &vid, side, fseq)?;

        let mut seg = SegMetadata {
            s_fileid: fileid,
            copyno,
            fsec,
            segsize: old.segsize,
            s_status: old.s_status,
            ..Default::default()
        };
        seg.compression = u.get_long()?;
        seg.vid = u.get_str(CA_MAXVIDLEN)?;
        seg.side = u.get_word()?;
        seg.fseq = u.get_long()?;
        seg.blockid = u.get_opaque::<4>()?;
        if self.caps.replace_checksum {
            seg.checksum = SegmentChecksum::decode(u)?;
        }
        seg.checksum.check()?;
        ReqLog::log("replaceseg", &format!("new segment: {}", describe(&seg)));

        store.update_segment(self.db.start_tr(), &slock, seg)
    }

    pub(crate) fn replacetapecopy(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        let newvid = u.get_str(CA_MAXVIDLEN)?;
        let oldvid = u.get_str(CA_MAXVIDLEN)?;
        let nbseg = u.get_long()?;
        ReqLog::log(
            "replacetapecopy",
            &format!("replacetapecopy {} {} {} {}", fileid, oldvid, newvid, nbseg),
        );

        self.ctx.perm().require_admin(cred)?;
        if nbseg <= 0 {
            return err_ns!(libc::EINVAL, "no segment for {}", newvid);
        }
        let store = self.ctx.store().clone();
        let (entry, _lease) = store.lock_file(self.db.start_tr(), fileid)?;
        Self::require_file(&entry)?;

        let old = store.lock_segments_of(self.db.start_tr(), fileid)?;
        let copyno = match old.iter().find(|(s, _)| s.vid == oldvid) {
            Some((s, _)) => s.copyno,
            None => return err_ns!(SEENTRYNFND, "file {} has no copy on {}", fileid, oldvid),
        };

        let mut segs = Vec::with_capacity(nbseg as usize);
        for _ in 0..nbseg {
            let mut seg = SegMetadata::decode(u, self.caps)?;
            if seg.vid != newvid {
                return err_ns!(libc::EINVAL, "segment on {} while replacing with {}", seg.vid, newvid);
            }
            seg.checksum.check()?;
            seg.s_fileid = fileid;
            seg.copyno = copyno;
            segs.push(seg);
        }

        let tx = self.db.start_tr();
        for (seg, slock) in old.iter().filter(|(s, _)| s.copyno == copyno) {
            ReqLog::log("replacetapecopy", &format!("old segment: {}", describe(seg)));
            store.delete_segment(tx, slock, seg.key())?;
        }
        for seg in segs {
            ReqLog::log("replacetapecopy", &format!("new segment: {}", describe(&seg)));
            store.insert_segment(tx, seg)?;
        }
        Ok(())
    }

    pub(crate) fn updateseg_checksum(&mut self, cred: &Credentials, u: &mut Unmarshaller) -> NsResult<()> {
        let fileid = u.get_hyper()?;
        let copyno = u.get_word()?;
        let fsec = u.get_word()?;
        ReqLog::log(
            "updateseg_checksum",
            &format!("updateseg_checksum {} {} {} by {}", fileid, copyno, fsec, cred.uid),
        );

        let store = self.ctx.store().clone();
        let (entry, _lease) = store.lock_file(self.db.start_tr(), fileid)?;
        Self::require_file(&entry)?;

        let vid = u.get_str(CA_MAXVIDLEN)?;
        let side = u.get_word()?;
        let fseq = u.get_long()?;
        let (old, slock) = self.lock_old_segment((fileid, copyno, fsec), &vid, side, fseq)?;
        if !old.checksum.is_empty() {
            return err_ns!(
                libc::EPERM,
                "segment already has checksum {} {:x}",
                old.checksum.name,
                old.checksum.value
            );
        }

        let checksum = SegmentChecksum::decode(u)?;
        checksum.check()?;
        let seg = SegMetadata { checksum, ..old };
        ReqLog::log("updateseg_checksum", &format!("new segment: {}", describe(&seg)));
        store.update_segment(self.db.start_tr(), &slock, seg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_description() {
        let seg = SegMetadata {
            s_fileid: 7,
            copyno: 1,
            fsec: 2,
            segsize: 100,
            s_status: b'-',
            vid: "T00001".to_string(),
            fseq: 3,
            blockid: [0, 0, 0, 0xff],
            checksum: SegmentChecksum::new("adler32", 0xab),
            ..Default::default()
        };
        assert_eq!(describe(&seg), "7 1 2 100 0 - T00001 0 3 000000ff \"adler32\" ab");
    }
}
