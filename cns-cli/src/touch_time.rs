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

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use cns_common::error::NsError;
use cns_common::NsResult;

/// Time argument of nstouch: `[[CC]YY]MMDDhhmm[.SS]` in local time.
pub struct TouchTime;

impl TouchTime {
    pub fn parse(s: &str) -> NsResult<i64> {
        let bad = || NsError::with_msg(libc::EINVAL, format!("invalid time {}", s));

        let (digits, secs) = match s.split_once('.') {
            Some((d, ss)) if ss.len() == 2 => (d, ss.parse::<u32>().map_err(|_| bad())?),
            Some(_) => return Err(bad()),
            None => (s, 0),
        };
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let num = |i: usize| -> NsResult<u32> { digits[i..i + 2].parse::<u32>().map_err(|_| bad()) };

        let (year, rest) = match digits.len() {
            8 => (Local::now().year(), 0),
            10 => {
                let yy = num(0)? as i32;
                (if yy >= 69 { 1900 + yy } else { 2000 + yy }, 2)
            }
            12 => ((num(0)? * 100 + num(2)?) as i32, 4),
            _ => return Err(bad()),
        };
        let date = NaiveDate::from_ymd_opt(year, num(rest)?, num(rest + 2)?).ok_or_else(bad)?;
        let time = date.and_hms_opt(num(rest + 4)?, num(rest + 6)?, secs).ok_or_else(bad)?;
        match Local.from_local_datetime(&time).earliest() {
            Some(t) => Ok(t.timestamp()),
            None => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_forms() {
        let full = TouchTime::parse("202401021530.45").unwrap();
        let short = TouchTime::parse("2401021530.45").unwrap();
        assert_eq!(full, short);
        assert_eq!(TouchTime::parse("202401021530").unwrap(), full - 45);

        let expected = Local.with_ymd_and_hms(2024, 1, 2, 15, 30, 45).unwrap().timestamp();
        assert_eq!(full, expected);
    }

    #[test]
    fn rejected_forms() {
        for s in ["", "0102", "202413021530", "2024010215x0", "202401021530.4", "202401023060"] {
            assert!(TouchTime::parse(s).is_err(), "{}", s);
        }
    }
}
