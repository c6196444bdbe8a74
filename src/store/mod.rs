/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The document store the merge runs against.
//!
//! A store exposes filtered match queries, atomic multi-document write batches, and
//! single-document reads and writes of a club's guest roster. `PgStore` backs the service;
//! `MemoryStore` backs tests.

pub mod memory;
pub mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use serde_json::{json, Value};
use thiserror::Error;

/// Hard ceiling on the number of operations in one atomic batch.
pub const MAX_BATCH_OPERATIONS: usize = 500;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Diesel {
        #[from]
        source: diesel::result::Error,
    },
    #[error("SerdeJson Error {source:?}")]
    SerdeJson {
        #[from]
        source: serde_json::Error,
    },
    #[error("write batch is full ({limit} operations)")]
    BatchFull { limit: usize },
    #[error("document {key} not found")]
    MissingDocument { key: String },
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One of the two roster fields on a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamField {
    Team1,
    Team2,
}

impl TeamField {
    pub const ALL: [TeamField; 2] = [TeamField::Team1, TeamField::Team2];

    pub fn name(self) -> &'static str {
        match self {
            TeamField::Team1 => "team1",
            TeamField::Team2 => "team2",
        }
    }
}

impl std::fmt::Display for TeamField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDoc {
    pub id: String,
    pub club_id: String,
    #[serde(default)]
    pub team1: Vec<String>,
    #[serde(default)]
    pub team2: Vec<String>,
}

impl MatchDoc {
    pub fn new(id: &str, club_id: &str, team1: &[&str], team2: &[&str]) -> MatchDoc {
        MatchDoc {
            id: id.to_owned(),
            club_id: club_id.to_owned(),
            team1: team1.iter().map(|x| x.to_string()).collect(),
            team2: team2.iter().map(|x| x.to_string()).collect(),
        }
    }

    pub fn team(&self, field: TeamField) -> &[String] {
        match field {
            TeamField::Team1 => &self.team1,
            TeamField::Team2 => &self.team2,
        }
    }
}

/// An entry of a club's `guestPlayers` list, kept as the raw JSON value.
///
/// Entries need not be objects and `id` need not be a string; such entries never match a
/// guest id and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestPlayer(pub Value);

impl GuestPlayer {
    pub fn new(id: &str, name: &str) -> GuestPlayer {
        GuestPlayer(json!({ "id": id, "name": name }))
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    pub fn is(&self, guest_id: &str) -> bool {
        matches!(self.id(), Some(Value::String(id)) if id == guest_id)
    }
}

impl From<Value> for GuestPlayer {
    fn from(value: Value) -> GuestPlayer {
        GuestPlayer(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Club {
    pub id: String,
    pub guest_players: Vec<GuestPlayer>,
}

/// Filters for a match query: club equality, optional array membership on a team field,
/// an optional keyset cursor and an optional result limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    pub club_id: String,
    pub contains: Option<(TeamField, String)>,
    pub start_after: Option<String>,
    pub limit: Option<usize>,
}

impl MatchQuery {
    pub fn club(club_id: &str) -> MatchQuery {
        MatchQuery {
            club_id: club_id.to_owned(),
            contains: None,
            start_after: None,
            limit: None,
        }
    }

    pub fn array_contains(mut self, field: TeamField, player_id: &str) -> MatchQuery {
        self.contains = Some((field, player_id.to_owned()));
        self
    }

    pub fn start_after(mut self, key: Option<String>) -> MatchQuery {
        self.start_after = key;
        self
    }

    pub fn limit(mut self, limit: usize) -> MatchQuery {
        self.limit = Some(limit);
        self
    }

    /// Whether `doc` satisfies every filter except the cursor and limit.
    pub fn matches(&self, doc: &MatchDoc) -> bool {
        if doc.club_id != self.club_id {
            return false;
        }
        match &self.contains {
            Some((field, id)) => doc.team(*field).iter().any(|x| x == id),
            None => true,
        }
    }
}

/// Replacement of both team lists of one match document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUpdate {
    pub key: String,
    pub team1: Vec<String>,
    pub team2: Vec<String>,
}

/// An atomic group of match updates, bounded by [`MAX_BATCH_OPERATIONS`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteBatch {
    updates: Vec<TeamUpdate>,
}

impl WriteBatch {
    pub fn update(&mut self, update: TeamUpdate) -> StoreResult<()> {
        if self.updates.len() >= MAX_BATCH_OPERATIONS {
            return Err(StoreError::BatchFull {
                limit: MAX_BATCH_OPERATIONS,
            });
        }
        self.updates.push(update);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn operations(&self) -> &[TeamUpdate] {
        &self.updates
    }
}

pub trait DocumentStore {
    /// Returns the match documents satisfying `query`, ordered by key when a cursor or
    /// limit is in play. `start_after` must compare keys in that same order.
    fn query_matches(&mut self, query: &MatchQuery) -> StoreResult<Vec<MatchDoc>>;

    fn batch(&self) -> WriteBatch {
        WriteBatch::default()
    }

    /// Applies every update in `batch` or none of them.
    fn commit(&mut self, batch: WriteBatch) -> StoreResult<()>;

    fn get_club(&mut self, club_id: &str) -> StoreResult<Option<Club>>;

    fn update_guest_players(&mut self, club_id: &str, guests: &[GuestPlayer]) -> StoreResult<()>;
}

/// Streams every match a query selects, one page at a time.
///
/// The cursor does not borrow the store, so callers may commit writes between pages.
#[derive(Debug)]
pub struct MatchPages {
    query: MatchQuery,
    page_size: usize,
    last_key: Option<String>,
    exhausted: bool,
}

impl MatchPages {
    pub fn new(query: MatchQuery, page_size: usize) -> MatchPages {
        MatchPages {
            query,
            page_size: page_size.max(1),
            last_key: None,
            exhausted: false,
        }
    }

    pub fn next_page<S: DocumentStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> StoreResult<Option<Vec<MatchDoc>>> {
        if self.exhausted {
            return Ok(None);
        }
        let query = self
            .query
            .clone()
            .start_after(self.last_key.clone())
            .limit(self.page_size);
        let page = store.query_matches(&query)?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        // Pages arrive in the store's key order; the cursor is the last key it returned.
        match page.last() {
            Some(doc) => self.last_key = Some(doc.id.clone()),
            None => return Ok(None),
        }
        Ok(Some(page))
    }
}


/// A store ordering keys case-insensitively, the way a locale collation would.
#[cfg(test)]
pub(crate) struct FoldedStore {
    pub(crate) docs: Vec<MatchDoc>,
}

#[cfg(test)]
impl FoldedStore {
    pub(crate) fn with(keys: &[&str]) -> FoldedStore {
        let mut docs: Vec<MatchDoc> = keys
            .iter()
            .map(|key| MatchDoc::new(key, "club-a", &["guest_1"], &[]))
            .collect();
        docs.sort_by_key(|doc| doc.id.to_lowercase());
        FoldedStore { docs }
    }
}

#[cfg(test)]
impl DocumentStore for FoldedStore {
    fn query_matches(&mut self, query: &MatchQuery) -> StoreResult<Vec<MatchDoc>> {
        Ok(self
            .docs
            .iter()
            .filter(|doc| match &query.start_after {
                Some(after) => doc.id.to_lowercase() > after.to_lowercase(),
                None => true,
            })
            .filter(|doc| query.matches(doc))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn commit(&mut self, batch: WriteBatch) -> StoreResult<()> {
        for op in batch.operations() {
            if let Some(doc) = self.docs.iter_mut().find(|doc| doc.id == op.key) {
                doc.team1 = op.team1.clone();
                doc.team2 = op.team2.clone();
            }
        }
        Ok(())
    }

    fn get_club(&mut self, _club_id: &str) -> StoreResult<Option<Club>> {
        Ok(None)
    }

    fn update_guest_players(&mut self, club_id: &str, _guests: &[GuestPlayer]) -> StoreResult<()> {
        Err(StoreError::MissingDocument {
            key: club_id.to_owned(),
        })
    }
}
