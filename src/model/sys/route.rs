/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::catchers::Status;
use crate::sys::SysInfo;
use rocket::serde::json::Json;
use rocket::State;
use schemars::JsonSchema;

/// # System Information
/// Gives the running version and the batching configuration of the guest merge.
#[openapi(tag = "System")]
#[get("/sys/info")]
pub(crate) async fn sysinfo(config: &State<SysInfo>) -> Result<Json<PubSysInfo>, Status> {
    std::result::Result::Ok(Json(PubSysInfo::from_config(config)))
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq)]
pub struct PubSysInfo {
    pub(crate) version: String,
    pub(crate) name: String,
    pub(crate) merge_flush_threshold: usize,
    pub(crate) merge_page_size: usize,
}

impl PubSysInfo {
    pub(crate) fn from_config(config: &SysInfo) -> PubSysInfo {
        PubSysInfo {
            version: git_version::git_version!(
                fallback = option_env!("GIT_HASH").unwrap_or(env!("CARGO_PKG_VERSION"))
            )
            .to_string(),
            name: config.settings.name.clone(),
            merge_flush_threshold: config.merge.flush_threshold(),
            merge_page_size: config.merge.page_size(),
        }
    }
}
