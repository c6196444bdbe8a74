/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

diesel::table! {
    clubs (id) {
        id -> Text,
        name -> Text,
        guest_players -> Jsonb,
    }
}

diesel::table! {
    matches (id) {
        id -> Text,
        club_id -> Text,
        team1 -> Array<Text>,
        team2 -> Array<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(clubs, matches);
