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

use crate::{err_box, CommonResult};
use std::time::Duration;

/// Human readable duration such as `500ms`, `5s`, `10m`, `6h` or `1d`.
/// A bare number is read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationUnit(Duration);

impl DurationUnit {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> CommonResult<Self> {
        let s = s.trim();
        if s.is_empty() {
            return err_box!("empty duration");
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let n: u64 = match num.parse() {
            Ok(n) => n,
            Err(_) => return err_box!("invalid duration: {}", s),
        };

        let d = match unit.trim().to_ascii_lowercase().as_str() {
            "ms" => Duration::from_millis(n),
            "" | "s" => Duration::from_secs(n),
            "m" | "min" => Duration::from_secs(n * 60),
            "h" => Duration::from_secs(n * 3600),
            "d" => Duration::from_secs(n * 86400),
            _ => return err_box!("invalid duration unit: {}", s),
        };
        Ok(Self(d))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        assert_eq!(
            DurationUnit::from_str("5s").unwrap().as_duration(),
            Duration::from_secs(5)
        );
        assert_eq!(
            DurationUnit::from_str("300").unwrap().as_duration(),
            Duration::from_secs(300)
        );
        assert_eq!(DurationUnit::from_str("250ms").unwrap().as_millis(), 250);
        assert_eq!(
            DurationUnit::from_str("1m").unwrap().as_duration(),
            Duration::from_secs(60)
        );
        assert!(DurationUnit::from_str("5x").is_err());
        assert!(DurationUnit::from_str("").is_err());
    }
}
