/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Merging a guest player's match history into a real user.

pub mod model;
pub mod prune;
pub mod rewrite;
pub mod route;
pub mod verify;
pub use model::*;
