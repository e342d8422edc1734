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

use log::error;
use std::path::PathBuf;

pub struct Utils;

impl Utils {
    pub const TEST_DATA_DIR: &'static str = "../testing";

    /// Terminate the process on any panic, after logging it.
    pub fn set_panic_exit_hook() {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!("panic occurred: {}", info);
            default_hook(info);
            std::process::exit(2);
        }));
    }

    pub fn test_sub_dir(name: impl AsRef<str>) -> String {
        let mut path = PathBuf::from(Self::TEST_DATA_DIR);
        path.push(name.as_ref());
        path.to_string_lossy().to_string()
    }

    pub fn cpu_nums() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn rand_id() -> u64 {
        rand::random::<u64>()
    }
}
