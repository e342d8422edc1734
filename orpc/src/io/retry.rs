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

use std::time::Duration;

/// Retry policy with a bounded number of attempts and a fixed pause between them.
#[derive(Debug, Clone)]
pub struct CountedRetry {
    max_attempts: u32,
    interval: Duration,
    attempts: u32,
}

impl CountedRetry {
    /// Returns true while another attempt is allowed. Every attempt but the
    /// first sleeps for the configured interval.
    pub async fn attempt(&mut self) -> bool {
        if self.attempts >= self.max_attempts {
            return false;
        }
        if self.attempts > 0 && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        self.attempts += 1;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct CountedRetryBuilder {
    max_retries: u32,
    interval: Duration,
}

impl CountedRetryBuilder {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    pub fn build(&self) -> CountedRetry {
        // One initial attempt plus the retries.
        CountedRetry {
            max_attempts: self.max_retries.saturating_add(1),
            interval: self.interval,
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_attempts() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let mut policy = CountedRetryBuilder::new(2, Duration::from_millis(1)).build();
        let count = rt.block_on(async {
            let mut n = 0;
            while policy.attempt().await {
                n += 1;
            }
            n
        });
        assert_eq!(count, 3);
        assert_eq!(policy.attempts(), 3);
    }
}
