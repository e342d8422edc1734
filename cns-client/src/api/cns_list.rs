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
use crate::transport::NsReply;
use cns_common::error::serrno::SEINTERNAL;
use cns_common::proto::*;
use cns_common::state::{ClassMetadata, DirEntryXT, FileReplica};
use cns_common::{err_ns, NsResult};
use orpc::codec::Unmarshaller;
use std::collections::VecDeque;

/// Client side state of a listing driven by `CNS_LIST_BEGIN`,
/// `CNS_LIST_CONTINUE` and `CNS_LIST_END`.
#[derive(Debug)]
pub struct CnsList<T> {
    items: VecDeque<T>,
    started: bool,
    eol: bool,
}

impl<T> Default for CnsList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CnsList<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            started: false,
            eol: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    fn reset(&mut self) {
        self.items.clear();
        self.started = false;
        self.eol = false;
    }

    fn needs_fetch(&self) -> bool {
        self.items.is_empty() && !self.eol
    }

    /// Beginning-of-list flag for the next request.
    fn bol(&self) -> u16 {
        !self.started as u16
    }

    fn fill(&mut self, items: Vec<T>, eol: bool) {
        self.started = true;
        self.eol = eol;
        self.items.extend(items);
    }
}

/// One listing block: `nb` entries followed by the end-of-list flag. A block
/// with no entry that does not end the listing would stall the caller.
pub(crate) fn decode_block<T>(
    reply: &NsReply,
    mut decode: impl FnMut(&mut Unmarshaller) -> NsResult<T>,
) -> NsResult<(Vec<T>, bool)> {
    let mut u = reply.reader();
    let nb = u.get_word()?;
    let mut items = Vec::with_capacity(nb as usize);
    for _ in 0..nb {
        items.push(decode(&mut u)?);
    }
    let eol = u.get_word()? != 0;
    if items.is_empty() && !eol {
        return err_ns!(SEINTERNAL, "empty listing block");
    }
    Ok((items, eol))
}

impl CnsSession {
    /// Apply `flags` to `list`. Returns false when the listing is over and
    /// nothing is to be returned.
    async fn list_flags<T>(&mut self, flags: i32, list: &mut CnsList<T>) -> NsResult<bool> {
        match flags {
            CNS_LIST_BEGIN => {
                list.reset();
                Ok(true)
            }
            CNS_LIST_CONTINUE => Ok(true),
            CNS_LIST_END => {
                if list.started && self.is_connected() {
                    let req = self.request(NsOpcode::EndList)?;
                    self.call(None, req, 0).await?;
                }
                list.reset();
                Ok(false)
            }
            _ => err_ns!(libc::EINVAL, "list flags {}", flags),
        }
    }

    /// Classes defined on `server`, one per call.
    pub async fn listclass(
        &mut self,
        server: Option<&str>,
        flags: i32,
        list: &mut CnsList<ClassMetadata>,
    ) -> NsResult<Option<ClassMetadata>> {
        if !self.list_flags(flags, list).await? {
            return Ok(None);
        }
        if list.needs_fetch() {
            let mut req = self.request(NsOpcode::ListClass)?;
            req.put_word(LIST_ENTRY_SIZE as u16)?;
            req.put_word(list.bol())?;
            let reply = self.call(server, req, self.conf().list_buf_size + 4).await?;
            let (items, eol) = decode_block(&reply, ClassMetadata::decode)?;
            list.fill(items, eol);
        }
        Ok(list.items.pop_front())
    }

    /// Segments recorded on tape `vid`, one per call.
    pub async fn listtape(
        &mut self,
        server: Option<&str>,
        vid: &str,
        flags: i32,
        list: &mut CnsList<DirEntryXT>,
    ) -> NsResult<Option<DirEntryXT>> {
        if vid.is_empty() || vid.len() > CA_MAXVIDLEN {
            return err_ns!(libc::EINVAL, "vid {:?}", vid);
        }
        if !self.list_flags(flags, list).await? {
            return Ok(None);
        }
        if list.needs_fetch() {
            let mut req = self.request(NsOpcode::ListTape)?;
            req.put_word(DIRENTXT_SIZE as u16)?;
            req.put_string(vid)?;
            req.put_word(list.bol())?;
            let reply = self.call(server, req, DIRBUFSZ + 4).await?;
            let caps = self.caps();
            let (items, eol) = decode_block(&reply, |u| DirEntryXT::decode(u, caps))?;
            list.fill(items, eol);
        }
        Ok(list.items.pop_front())
    }

    /// Disk replicas of the file named by `path` or `guid`, one per call.
    pub async fn listreplica(
        &mut self,
        path: Option<&str>,
        guid: &str,
        flags: i32,
        list: &mut CnsList<FileReplica>,
    ) -> NsResult<Option<FileReplica>> {
        if path.map_or(true, |p| p.is_empty()) && guid.is_empty() {
            return err_ns!(libc::EFAULT, "neither path nor guid");
        }
        if !self.list_flags(flags, list).await? {
            return Ok(None);
        }
        if list.needs_fetch() {
            let (server, path) = self.target_opt(path)?;
            let mut req = self.request(NsOpcode::ListReplica)?;
            req.put_word(LIST_ENTRY_SIZE as u16)?;
            req.put_hyper(self.cwd)?;
            req.put_string(&path)?;
            req.put_string(guid)?;
            req.put_word(list.bol())?;
            let reply = self.call(server, req, self.conf().list_buf_size + 4).await?;
            let (items, eol) = decode_block(&reply, FileReplica::decode)?;
            list.fill(items, eol);
        }
        Ok(list.items.pop_front())
    }

    /// `getlinks`, one path per call.
    pub async fn listlinks(
        &mut self,
        path: Option<&str>,
        guid: &str,
        flags: i32,
        list: &mut CnsList<String>,
    ) -> NsResult<Option<String>> {
        if path.map_or(true, |p| p.is_empty()) && guid.is_empty() {
            return err_ns!(libc::EFAULT, "neither path nor guid");
        }
        if !self.list_flags(flags, list).await? {
            return Ok(None);
        }
        if list.needs_fetch() {
            let (server, path) = self.target_opt(path)?;
            let mut req = self.request(NsOpcode::ListLinks)?;
            req.put_word(LIST_ENTRY_SIZE as u16)?;
            req.put_hyper(self.cwd)?;
            req.put_string(&path)?;
            req.put_string(guid)?;
            req.put_word(list.bol())?;
            let reply = self.call_path(server, req).await?;
            let (items, eol) = decode_block(&reply, |u| u.get_path())?;
            list.fill(items, eol);
        }
        Ok(list.items.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orpc::codec::Marshaller;

    #[test]
    fn block_carries_count_and_end_flag() {
        let mut m = Marshaller::new(256);
        m.put_word(2).unwrap();
        m.put_string("/a").unwrap();
        m.put_string("/b").unwrap();
        m.put_word(1).unwrap();
        let reply = NsReply {
            data: m.as_slice().to_vec(),
            ..Default::default()
        };
        let (items, eol) = decode_block(&reply, |u| u.get_path()).unwrap();
        assert_eq!(items, vec!["/a", "/b"]);
        assert!(eol);
    }

    #[test]
    fn empty_block_must_end_the_listing() {
        let mut m = Marshaller::new(16);
        m.put_word(0).unwrap();
        m.put_word(0).unwrap();
        let reply = NsReply {
            data: m.as_slice().to_vec(),
            ..Default::default()
        };
        let err = decode_block(&reply, |u| u.get_path()).unwrap_err();
        assert_eq!(err.code(), SEINTERNAL);

        let mut m = Marshaller::new(16);
        m.put_word(0).unwrap();
        m.put_word(1).unwrap();
        let reply = NsReply {
            data: m.as_slice().to_vec(),
            ..Default::default()
        };
        let (items, eol) = decode_block(&reply, |u| u.get_path()).unwrap();
        assert!(items.is_empty());
        assert!(eol);
    }

    #[test]
    fn list_state_follows_fetches() {
        let mut list: CnsList<u32> = CnsList::new();
        assert_eq!(list.bol(), 1);
        assert!(list.needs_fetch());

        list.fill(vec![1, 2], false);
        assert_eq!(list.bol(), 0);
        assert_eq!(list.items.pop_front(), Some(1));
        assert!(!list.needs_fetch());
        list.items.pop_front();
        assert!(list.needs_fetch());

        list.fill(vec![], true);
        assert!(!list.needs_fetch());
        list.reset();
        assert!(!list.is_started());
    }
}
