/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod auth;
pub mod merge;
pub mod sys;
pub use auth::{Claims, Principal};
pub use merge::{merge_guest_history, MergeCall, MergePayload, MergeResult, MergeSettings};
pub use sys::SysInfo;
