/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::model::merge::MergeSettings;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Configuration state managed by Rocket.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SysInfo {
    pub(crate) version: String,
    #[serde(skip_serializing)]
    pub(crate) settings: SysSettings,
    pub(crate) merge: MergeSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SysSettings {
    pub(crate) name: String,
    pub(crate) base_url: String,
    pub(crate) cookie_key: String,
}

impl Default for SysInfo {
    fn default() -> SysInfo {
        SysInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: SysSettings::default(),
            merge: MergeSettings::default(),
        }
    }
}

impl SysInfo {
    pub fn merge_settings(&self) -> &MergeSettings {
        &self.merge
    }

    pub fn with_cookie_key(mut self, key: &str) -> SysInfo {
        self.settings.cookie_key = key.to_owned();
        self
    }
}

impl Default for SysSettings {
    fn default() -> SysSettings {
        SysSettings {
            name: String::from("Club Local"),
            base_url: String::from("http://localhost:8000"),
            cookie_key: rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(24)
                .map(char::from)
                .collect(),
        }
    }
}
