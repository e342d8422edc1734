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

// Mode bits as stored and sent on the wire, independent of the host libc.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_ISUID: u32 = 0o4000;
pub const S_ISGID: u32 = 0o2000;
pub const S_ISVTX: u32 = 0o1000;
pub const S_IREAD: u32 = 0o400;
pub const S_IWRITE: u32 = 0o200;
pub const S_IEXEC: u32 = 0o100;

// access() modes.
pub const F_OK: u32 = 0;
pub const X_OK: u32 = 1;
pub const W_OK: u32 = 2;
pub const R_OK: u32 = 4;

// open() flags in their wire representation.
pub const O_RDONLY: i32 = 0;
pub const O_WRONLY: i32 = 0o1;
pub const O_RDWR: i32 = 0o2;
pub const O_ACCMODE: i32 = 0o3;
pub const O_CREAT: i32 = 0o100;
pub const O_EXCL: i32 = 0o200;
pub const O_TRUNC: i32 = 0o1000;
pub const O_APPEND: i32 = 0o2000;

/// Entry status values.
pub const STATUS_ONLINE: u8 = b'-';
pub const STATUS_MIGRATED: u8 = b'm';
pub const STATUS_DELETED: u8 = b'D';

pub struct FileMode;

impl FileMode {
    pub fn is_dir(mode: u32) -> bool {
        mode & S_IFMT == S_IFDIR
    }

    pub fn is_reg(mode: u32) -> bool {
        mode & S_IFMT == S_IFREG
    }

    pub fn is_link(mode: u32) -> bool {
        mode & S_IFMT == S_IFLNK
    }

    pub fn perm(mode: u32) -> u32 {
        mode & !S_IFMT
    }

    /// ls style rendering, e.g. `drwxr-xr-x`.
    pub fn render(mode: u32) -> String {
        let kind = match mode & S_IFMT {
            S_IFDIR => 'd',
            S_IFLNK => 'l',
            _ => '-',
        };
        let mut s = String::with_capacity(10);
        s.push(kind);
        for shift in [6, 3, 0] {
            let bits = (mode >> shift) & 7;
            s.push(if bits & 4 != 0 { 'r' } else { '-' });
            s.push(if bits & 2 != 0 { 'w' } else { '-' });
            s.push(if bits & 1 != 0 { 'x' } else { '-' });
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render() {
        assert_eq!(FileMode::render(S_IFDIR | 0o755), "drwxr-xr-x");
        assert_eq!(FileMode::render(S_IFREG | 0o640), "-rw-r-----");
        assert!(FileMode::is_link(S_IFLNK | 0o777));
    }
}
