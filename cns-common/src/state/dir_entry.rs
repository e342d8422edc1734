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

use crate::proto::{
    Capabilities, NsReader, CA_MAXCOMMENTLEN, CA_MAXNAMELEN, CA_MAXPATHLEN, CA_MAXVIDLEN, CNS_RDD_COMMENT,
    CNS_RDD_DIRX, CNS_RDD_DIRXC, CNS_RDD_DIRXT, CNS_RDD_NAMES,
};
use crate::state::{FileReplica, FileStat, SegMetadata, SegmentChecksum};
use crate::NsResult;
use orpc::codec::{Marshaller, Unmarshaller};

/// One directory entry as returned by the readdir variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEntry {
    /// Name only.
    Name(String),
    /// Attributes and name.
    X(DirEntryX),
    /// One tape segment of an entry.
    Xt(DirEntryXT),
    /// Name and comment.
    C { name: String, comment: String },
    /// Attributes, name and comment.
    Xc { entry: DirEntryX, comment: String },
    /// Attributes, name and disk replicas.
    Xr {
        entry: DirEntryX,
        replicas: Vec<FileReplica>,
    },
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            DirEntry::Name(n) => n,
            DirEntry::X(x) => &x.name,
            DirEntry::Xt(xt) => &xt.name,
            DirEntry::C { name, .. } => name,
            DirEntry::Xc { entry, .. } => &entry.name,
            DirEntry::Xr { entry, .. } => &entry.name,
        }
    }

    /// Variable length counted against the listing buffer budget.
    pub fn var_len(&self) -> usize {
        match self {
            DirEntry::C { name, comment } => name.len() + comment.len(),
            DirEntry::Xc { entry, comment } => entry.name.len() + comment.len(),
            e => e.name().len(),
        }
    }

    /// Encode into a MSG_DATA listing block. Replicas of `Xr` entries travel
    /// separately on the extended channel.
    pub fn encode(&self, m: &mut Marshaller, caps: Capabilities) -> NsResult<()> {
        match self {
            DirEntry::Name(n) => Ok(m.put_string(n)?),
            DirEntry::X(x) => x.encode(m),
            DirEntry::Xt(xt) => xt.encode(m, caps),
            DirEntry::C { name, comment } => {
                m.put_string(name)?;
                m.put_string(comment)?;
                Ok(())
            }
            DirEntry::Xc { entry, comment } => {
                entry.encode(m)?;
                m.put_string(comment)?;
                Ok(())
            }
            DirEntry::Xr { entry, .. } => entry.encode(m),
        }
    }

    pub fn decode(u: &mut Unmarshaller, level: u16, caps: Capabilities) -> NsResult<Self> {
        let entry = match level {
            CNS_RDD_NAMES => DirEntry::Name(u.get_str(CA_MAXNAMELEN)?),
            CNS_RDD_DIRX => DirEntry::X(DirEntryX::decode(u)?),
            CNS_RDD_DIRXT => DirEntry::Xt(DirEntryXT::decode(u, caps)?),
            CNS_RDD_COMMENT => DirEntry::C {
                name: u.get_str(CA_MAXNAMELEN)?,
                comment: u.get_str(CA_MAXCOMMENTLEN)?,
            },
            CNS_RDD_DIRXC => DirEntry::Xc {
                entry: DirEntryX::decode(u)?,
                comment: u.get_str(CA_MAXCOMMENTLEN)?,
            },
            _ => DirEntry::Xr {
                entry: DirEntryX::decode(u)?,
                replicas: vec![],
            },
        };
        Ok(entry)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntryX {
    pub stat: FileStat,
    pub name: String,
}

impl DirEntryX {
    pub fn encode(&self, m: &mut Marshaller) -> NsResult<()> {
        self.stat.encode(m)?;
        m.put_string(&self.name)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller) -> NsResult<Self> {
        Ok(Self {
            stat: FileStat::decode(u)?,
            name: u.get_str(CA_MAXNAMELEN)?,
        })
    }
}

/// A tape segment as listed by readdirxt and listtape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirEntryXT {
    pub parent_fileid: u64,
    pub seg: SegMetadata,
    pub name: String,
}

impl DirEntryXT {
    pub fn encode(&self, m: &mut Marshaller, caps: Capabilities) -> NsResult<()> {
        let seg = &self.seg;
        m.put_hyper(self.parent_fileid)?;
        if caps.segment_fileid {
            m.put_hyper(seg.s_fileid)?;
        }
        m.put_word(seg.copyno)?;
        m.put_word(seg.fsec)?;
        m.put_hyper(seg.segsize)?;
        m.put_long(seg.compression)?;
        m.put_byte(seg.s_status)?;
        m.put_string(&seg.vid)?;
        if caps.segment_checksum {
            seg.checksum.encode(m)?;
        }
        if caps.segment_side {
            m.put_word(seg.side)?;
        }
        m.put_long(seg.fseq)?;
        m.put_opaque(&seg.blockid)?;
        m.put_string(&self.name)?;
        Ok(())
    }

    pub fn decode(u: &mut Unmarshaller, caps: Capabilities) -> NsResult<Self> {
        let parent_fileid = u.get_hyper()?;
        let mut seg = SegMetadata::default();
        if caps.segment_fileid {
            seg.s_fileid = u.get_hyper()?;
        }
        seg.copyno = u.get_word()?;
        seg.fsec = u.get_word()?;
        seg.segsize = u.get_hyper()?;
        seg.compression = u.get_long()?;
        seg.s_status = u.get_byte()?;
        seg.vid = u.get_str(CA_MAXVIDLEN)?;
        if caps.segment_checksum {
            seg.checksum = SegmentChecksum::decode(u)?;
        }
        if caps.segment_side {
            seg.side = u.get_word()?;
        }
        seg.fseq = u.get_long()?;
        seg.blockid = u.get_opaque::<4>()?;
        // Older servers sent a full path here, accept its length.
        let name = u.get_str(CA_MAXPATHLEN)?;
        Ok(Self {
            parent_fileid,
            seg,
            name,
        })
    }
}

/// One entry of getlinks/listlinks: the display path of a link or file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ProtocolVersion;

    #[test]
    fn dirxt_layout_per_version() {
        let e = DirEntryXT {
            parent_fileid: 2,
            seg: SegMetadata {
                s_fileid: 5,
                copyno: 1,
                fsec: 1,
                vid: "V00001".to_string(),
                side: 1,
                fseq: 3,
                checksum: SegmentChecksum::new("adler32", 1),
                ..Default::default()
            },
            name: "f".to_string(),
        };

        for v in [ProtocolVersion::V1, ProtocolVersion::V2, ProtocolVersion::V3, ProtocolVersion::V4] {
            let mut m = Marshaller::new(512);
            DirEntry::Xt(e.clone()).encode(&mut m, v.caps()).unwrap();
            let mut u = Unmarshaller::new(m.as_slice());
            let back = DirEntry::decode(&mut u, CNS_RDD_DIRXT, v.caps()).unwrap();
            assert!(u.is_empty());
            match back {
                DirEntry::Xt(xt) => {
                    assert_eq!(xt.seg.fseq, 3);
                    assert_eq!(xt.seg.s_fileid, if v >= ProtocolVersion::V3 { 5 } else { 0 });
                    assert_eq!(xt.seg.side, if v >= ProtocolVersion::V2 { 1 } else { 0 });
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
