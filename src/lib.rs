/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate rocket_okapi;

mod catchers;
pub mod db;
mod error;
pub mod model;
mod schema;
pub mod store;
pub use crate::error::{Error, ErrorBody};
use crate::model::sys;

pub mod rocket_launcher {
    use crate::catchers;
    use crate::db::DbConn;
    use crate::model::merge;
    use crate::model::sys;
    use rocket::{Build, Rocket};
    use rocket_okapi::swagger_ui::{make_swagger_ui, SwaggerUIConfig};

    /// Registers the catchers every instance shares.
    pub(crate) fn register_catchers(rocket: Rocket<Build>) -> Rocket<Build> {
        rocket.register(
            "/",
            catchers![
                catchers::bad_request,
                catchers::not_authorized,
                catchers::not_found,
                catchers::unprocessable,
                catchers::internal_error
            ],
        )
    }

    /// Reads the `club` and `merge` sections of the figment into the managed `SysInfo`.
    pub(crate) fn sys_info(rocket: &Rocket<Build>) -> sys::SysInfo {
        let mut global_info_private = sys::SysInfo::default();
        global_info_private.settings = rocket
            .figment()
            .extract_inner("club")
            .expect("Cookie key not set; aborting!");
        global_info_private.merge = rocket
            .figment()
            .extract_inner("merge")
            .unwrap_or_default();
        global_info_private
    }

    pub fn launcher() -> Rocket<Build> {
        assemble(rocket::build())
    }

    /// Attaches the database pool, routes and managed config to `rocket`.
    pub(crate) fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
        // The paths on the /api endpoint. Defined up here for cleanliness
        let api_paths = openapi_get_routes![sys::route::sysinfo];

        // The paths on the /auth endpoint. Defined up here for cleanliness
        let auth_paths = routes![merge::route::merge_guest];

        let mut saturn_v = register_catchers(rocket)
            .attach(DbConn::fairing())
            .mount("/api", api_paths)
            .mount("/auth", auth_paths)
            .mount(
                "/docs/",
                make_swagger_ui(&SwaggerUIConfig {
                    url: "../api/openapi.json".to_owned(),
                    ..Default::default()
                }),
            );

        let global_info_private = sys_info(&saturn_v);
        saturn_v = saturn_v.manage(global_info_private);

        saturn_v
    }
}
