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


use cns_common::proto::LOGBUFSZ;
use log::info;

/// Request trace lines. A summary too long for one log record is cut into
/// lines ending with `\`, continuation lines start with `+ `.
pub struct ReqLog;

impl ReqLog {
    const RESERVED: usize = 36;

    fn width(func: &str) -> usize {
        LOGBUFSZ.saturating_sub(func.len() + Self::RESERVED).max(8)
    }

    pub fn split(func: &str, text: &str) -> Vec<String> {
        let width = Self::width(func);
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= width {
            return vec![text.to_string()];
        }

        let mut lines = vec![];
        let mut pos = 0;
        let mut first = true;
        while pos < chars.len() {
            let take = if first { width } else { width - 2 };
            let end = (pos + take).min(chars.len());
            let mut line = String::with_capacity(width + 1);
            if !first {
                line.push_str("+ ");
            }
            line.extend(&chars[pos..end]);
            if end < chars.len() {
                line.push('\\');
            }
            lines.push(line);
            pos = end;
            first = false;
        }
        lines
    }

    /// `<func> request by <uid>,<gid> from <host>`.
    pub fn request(func: &str, uid: u32, gid: u32, host: &str) {
        info!("{}: {} request by {},{} from {}", func, func, uid, gid, host);
    }

    pub fn log(func: &str, text: &str) {
        for line in Self::split(func, text) {
            info!("{}: {}", func, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(ReqLog::split("stat", "stat 0 /a"), vec!["stat 0 /a"]);
    }

    #[test]
    fn long_text_is_continued() {
        let func = "creat";
        let width = LOGBUFSZ - func.len() - 36;
        let text: String = (0..width * 2 + 10).map(|i| (b'a' + (i % 26) as u8) as char).collect();
        let lines = ReqLog::split(func, &text);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with('\\'));
        assert_eq!(lines[0].len(), width + 1);
        assert!(lines[1].starts_with("+ "));
        assert!(lines[1].ends_with('\\'));
        assert!(lines[2].starts_with("+ ") && !lines[2].ends_with('\\'));

        // Nothing lost or repeated.
        let joined: String = lines
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let l = l.strip_suffix('\\').unwrap_or(l);
                let body = if i == 0 { l } else { &l[2..] };
                body.to_string()
            })
            .collect();
        assert_eq!(joined, text);
    }
}
