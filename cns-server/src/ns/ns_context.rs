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


use crate::meta::MetaStore;
use crate::ns::{Credentials, IdentityAllocator, PathResolver, PermChecker, Privileges};
use cns_common::conf::NsConf;
use cns_common::NsResult;
use log::info;
use orpc::io::net::NetUtils;
use orpc::server::ShutdownTrigger;
use orpc::sync;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// State shared by every connection of one name server.
pub struct NsContext {
    conf: NsConf,
    store: Arc<MetaStore>,
    perm: PermChecker,
    ids: IdentityAllocator,
    hostname: String,
    shutdown: AtomicBool,
    trigger: Mutex<Option<ShutdownTrigger>>,
}

impl NsContext {
    pub fn new(conf: NsConf) -> NsResult<Self> {
        let store = Arc::new(MetaStore::new(&conf.store)?);
        Ok(Self::with_store(conf, store))
    }

    pub fn with_store(conf: NsConf, store: Arc<MetaStore>) -> Self {
        let perm = PermChecker::new(Privileges::new(&conf.privilege));
        let ids = IdentityAllocator::new(&store);
        Self {
            conf,
            store,
            perm,
            ids,
            hostname: NetUtils::local_hostname(),
            shutdown: AtomicBool::new(false),
            trigger: Mutex::new(None),
        }
    }

    pub fn conf(&self) -> &NsConf {
        &self.conf
    }

    pub fn store(&self) -> &Arc<MetaStore> {
        &self.store
    }

    pub fn perm(&self) -> &PermChecker {
        &self.perm
    }

    pub fn ids(&self) -> &IdentityAllocator {
        &self.ids
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn resolver<'a>(&'a self, cred: &'a Credentials) -> PathResolver<'a> {
        PathResolver::new(&self.store, &self.perm, cred)
    }

    pub fn set_shutdown_trigger(&self, trigger: ShutdownTrigger) {
        *sync::lock(&self.trigger) = Some(trigger);
    }

    /// Refuse further requests and stop the listeners.
    pub fn begin_shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Name server shutting down");
        if let Some(trigger) = sync::lock(&self.trigger).as_ref() {
            trigger.trigger();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
