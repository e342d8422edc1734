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

use chrono::Local;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

static LOG_GUARD: OnceCell<Option<WorkerGuard>> = OnceCell::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConf {
    pub level: String,

    // Empty or "stdout" writes to the console.
    pub log_dir: String,

    pub file_name: String,

    pub display_thread: bool,

    pub display_position: bool,
}

impl Default for LogConf {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: "stdout".to_string(),
            file_name: "cns.log".to_string(),
            display_thread: false,
            display_position: false,
        }
    }
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Process wide log sink. `log` records are bridged into `tracing`.
pub struct Logger;

impl Logger {
    pub fn init(conf: LogConf) {
        LOG_GUARD.get_or_init(|| Self::install(&conf));
    }

    pub fn init_default() {
        Self::init(LogConf::default())
    }

    fn install(conf: &LogConf) -> Option<WorkerGuard> {
        let level = Level::from_str(&conf.level).unwrap_or(Level::INFO);
        let _ = tracing_log::LogTracer::init();

        let builder = fmt()
            .with_max_level(level)
            .with_timer(LocalTimer)
            .with_thread_names(conf.display_thread)
            .with_file(conf.display_position)
            .with_line_number(conf.display_position)
            .with_target(false);

        if conf.log_dir.is_empty() || conf.log_dir == "stdout" {
            let _ = tracing::subscriber::set_global_default(builder.finish());
            None
        } else {
            // Rolled daily, one file per day.
            let appender = tracing_appender::rolling::daily(&conf.log_dir, &conf.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let subscriber = builder.with_writer(writer).with_ansi(false).finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
            Some(guard)
        }
    }
}
