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

use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Atomic state cell shared between a component and its observers.
#[derive(Debug)]
pub struct StateCtl(AtomicI8);

impl StateCtl {
    pub fn new(v: i8) -> Self {
        Self(AtomicI8::new(v))
    }

    pub fn state<T: From<i8>>(&self) -> T {
        T::from(self.0.load(Ordering::SeqCst))
    }

    pub fn value(&self) -> i8 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_state<T: Into<i8>>(&self, v: T) {
        self.0.store(v.into(), Ordering::SeqCst)
    }
}

// A panicked holder leaves the data intact, so poisoned locks are recovered.

pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(|e| e.into_inner())
}

pub fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(|e| e.into_inner())
}
