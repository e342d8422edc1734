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

/// Build a `CommonError` from a format string.
#[macro_export]
macro_rules! err_msg {
    ($($arg:tt)*) => {
        $crate::CommonError::Msg(format!($($arg)*))
    };
}

/// Return `Err(...)` converted into the caller's error type.
#[macro_export]
macro_rules! err_box {
    ($($arg:tt)*) => {
        Err($crate::err_msg!($($arg)*).into())
    };
}

/// Unwrap an option or return an error naming the missing value.
#[macro_export]
macro_rules! try_option {
    ($expr:expr) => {
        match $expr {
            Some(v) => v,
            None => return $crate::err_box!("{} is none", stringify!($expr)),
        }
    };

    ($expr:expr, $($arg:tt)*) => {
        match $expr {
            Some(v) => v,
            None => return $crate::err_box!($($arg)*),
        }
    };
}
