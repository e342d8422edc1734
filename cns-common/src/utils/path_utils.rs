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

use crate::error::NsError;
use crate::NsResult;

pub struct PathUtils;

impl PathUtils {
    pub fn is_absolute(path: &str) -> bool {
        path.starts_with('/')
    }

    /// True for "/" and any run of slashes.
    pub fn is_root(path: &str) -> bool {
        !path.is_empty() && path.bytes().all(|b| b == b'/')
    }

    pub fn components(path: &str) -> impl DoubleEndedIterator<Item = &str> {
        path.split('/').filter(|c| !c.is_empty())
    }

    /// Split a path into its directory part and basename. Trailing slashes
    /// are ignored, a path without slash has an empty directory part and
    /// "/" is its own basename.
    pub fn split_name(path: &str) -> NsResult<(&str, &str)> {
        if path.is_empty() {
            return Err(NsError::new(libc::ENOENT));
        }
        if Self::is_root(path) {
            return Ok(("/", "/"));
        }

        let trimmed = path.trim_end_matches('/');
        match trimmed.rfind('/') {
            None => Ok(("", trimmed)),
            Some(0) => Ok(("/", &trimmed[1..])),
            Some(i) => Ok((&trimmed[..i], &trimmed[i + 1..])),
        }
    }

    /// `server:/path` names an explicit server.
    pub fn split_server(path: &str) -> Option<(&str, &str)> {
        let colon = path.find(':')?;
        let slash = path.find('/')?;
        if colon > 0 && colon < slash {
            Some((&path[..colon], &path[colon + 1..]))
        } else {
            None
        }
    }

    pub fn join(dir: &str, name: &str) -> String {
        if dir.ends_with('/') {
            format!("{}{}", dir, name)
        } else {
            format!("{}/{}", dir, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name() {
        assert_eq!(PathUtils::split_name("/").unwrap(), ("/", "/"));
        assert_eq!(PathUtils::split_name("/a").unwrap(), ("/", "a"));
        assert_eq!(PathUtils::split_name("/a/b/").unwrap(), ("/a", "b"));
        assert_eq!(PathUtils::split_name("a").unwrap(), ("", "a"));
        assert_eq!(PathUtils::split_name("a/b").unwrap(), ("a", "b"));
        assert_eq!(PathUtils::split_name("").unwrap_err().code(), libc::ENOENT);
    }

    #[test]
    fn split_server() {
        assert_eq!(
            PathUtils::split_server("nshost:/castor/a"),
            Some(("nshost", "/castor/a"))
        );
        assert_eq!(PathUtils::split_server("/castor/a:b"), None);
        assert_eq!(PathUtils::split_server("a:b"), None);
    }

    #[test]
    fn components() {
        let c: Vec<&str> = PathUtils::components("//a/./b//").collect();
        assert_eq!(c, vec!["a", ".", "b"]);
        let back: Vec<&str> = PathUtils::components("x/y/z").rev().collect();
        assert_eq!(back, vec!["z", "y", "x"]);
        assert!(PathUtils::is_root("//"));
    }
}
