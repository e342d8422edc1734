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

use chrono::{Local, TimeZone};

pub struct LocalTime;

impl LocalTime {
    /// Seconds since the epoch.
    pub fn now_secs() -> i64 {
        Local::now().timestamp()
    }

    pub fn mills() -> u64 {
        Local::now().timestamp_millis() as u64
    }

    pub fn format_secs(secs: i64) -> String {
        match Local.timestamp_opt(secs, 0).single() {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => secs.to_string(),
        }
    }
}
