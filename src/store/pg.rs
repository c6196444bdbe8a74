/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    Club, DocumentStore, GuestPlayer, MatchDoc, MatchQuery, StoreError, StoreResult, TeamField,
    WriteBatch,
};
use crate::schema::{clubs, matches};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::update;
use serde_json::Value;

#[derive(Queryable, Debug)]
struct MatchRow {
    id: String,
    club_id: String,
    team1: Vec<String>,
    team2: Vec<String>,
}

impl From<MatchRow> for MatchDoc {
    fn from(row: MatchRow) -> MatchDoc {
        MatchDoc {
            id: row.id,
            club_id: row.club_id,
            team1: row.team1,
            team2: row.team2,
        }
    }
}

/// Document store over the `matches` and `clubs` tables.
///
/// Team lists live in `text[]` columns and the guest roster in a `jsonb` array.
pub struct PgStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgStore<'c> {
    pub fn new(conn: &'c mut PgConnection) -> PgStore<'c> {
        PgStore { conn }
    }
}

impl DocumentStore for PgStore<'_> {
    fn query_matches(&mut self, query: &MatchQuery) -> StoreResult<Vec<MatchDoc>> {
        let mut q = matches::table
            .filter(matches::club_id.eq(query.club_id.clone()))
            .into_boxed();
        if let Some((field, player_id)) = &query.contains {
            let needle = vec![player_id.clone()];
            q = match field {
                TeamField::Team1 => q.filter(matches::team1.contains(needle)),
                TeamField::Team2 => q.filter(matches::team2.contains(needle)),
            };
        }
        if let Some(after) = &query.start_after {
            q = q.filter(matches::id.gt(after.clone()));
        }
        if let Some(limit) = query.limit {
            q = q.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let rows = q.order(matches::id.asc()).load::<MatchRow>(&mut *self.conn)?;
        Ok(rows.into_iter().map(MatchDoc::from).collect())
    }

    fn commit(&mut self, batch: WriteBatch) -> StoreResult<()> {
        self.conn.transaction::<_, StoreError, _>(|c| {
            for op in batch.operations() {
                let touched = update(matches::table.find(op.key.as_str()))
                    .set((matches::team1.eq(&op.team1), matches::team2.eq(&op.team2)))
                    .execute(c)?;
                if touched == 0 {
                    return Err(StoreError::MissingDocument {
                        key: op.key.clone(),
                    });
                }
            }
            Ok(())
        })
    }

    fn get_club(&mut self, club_id: &str) -> StoreResult<Option<Club>> {
        let roster = clubs::table
            .find(club_id)
            .select(clubs::guest_players)
            .first::<Value>(&mut *self.conn)
            .optional()?;
        match roster {
            Some(Value::Null) => Ok(Some(Club {
                id: club_id.to_owned(),
                guest_players: Vec::new(),
            })),
            Some(value) => Ok(Some(Club {
                id: club_id.to_owned(),
                guest_players: serde_json::from_value::<Vec<GuestPlayer>>(value)?,
            })),
            None => Ok(None),
        }
    }

    fn update_guest_players(&mut self, club_id: &str, guests: &[GuestPlayer]) -> StoreResult<()> {
        let roster = serde_json::to_value(guests)?;
        let touched = update(clubs::table.find(club_id))
            .set(clubs::guest_players.eq(roster))
            .execute(&mut *self.conn)?;
        if touched == 0 {
            return Err(StoreError::MissingDocument {
                key: club_id.to_owned(),
            });
        }
        Ok(())
    }
}
