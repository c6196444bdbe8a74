/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::model::{merge_guest_history, MergeCall, MergeResult};
use crate::db::DbConn;
use crate::model::auth::Principal;
use crate::store::PgStore;
use crate::sys::SysInfo;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::Value;

/// # Merge Guest History
/// Rewrites every match of a club from a guest player to a real user, verifies nothing
/// still references the guest, then removes the guest from the club roster.
///
/// An unreadable body reaches the merge as `null`, so the caller is authenticated first.
#[openapi(skip)]
#[post("/guests/merge", format = "json", data = "<payload>")]
pub(crate) async fn merge_guest(
    principal: Option<Principal>,
    payload: Option<Json<Value>>,
    conn: DbConn,
    config: &State<SysInfo>,
) -> Result<Json<MergeResult>, crate::Error> {
    let call = MergeCall {
        auth: principal,
        data: payload.map_or(Value::Null, Json::into_inner),
    };
    let settings = config.merge_settings().clone();
    conn.run(move |c| merge_guest_history(&mut PgStore::new(c), &call, &settings))
        .await
        .map(Json)
}
