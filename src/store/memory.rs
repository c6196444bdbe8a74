/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::{
    Club, DocumentStore, GuestPlayer, MatchDoc, MatchQuery, StoreError, StoreResult, WriteBatch,
    MAX_BATCH_OPERATIONS,
};
use std::collections::{BTreeMap, HashSet};

/// Number of times each store operation was invoked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub queries: usize,
    pub commits: usize,
    pub club_reads: usize,
    pub club_writes: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.queries + self.commits + self.club_reads + self.club_writes
    }
}

/// Faults the store will inject on request.
#[derive(Debug, Default, Clone)]
pub struct Faults {
    /// Commits beyond this many successful ones fail.
    pub fail_commits_after: Option<usize>,
    pub fail_club_writes: bool,
    pub fail_queries: bool,
    /// Updates to these match keys are accepted but never applied.
    pub lost_writes: HashSet<String>,
}

/// Process-local document store keeping everything in ordered maps.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    matches: BTreeMap<String, MatchDoc>,
    clubs: BTreeMap<String, Club>,
    calls: CallCounts,
    committed_batches: Vec<usize>,
    pub faults: Faults,
}

impl MemoryStore {
    pub fn insert_match(&mut self, doc: MatchDoc) {
        self.matches.insert(doc.id.clone(), doc);
    }

    pub fn insert_club(&mut self, id: &str, guest_players: Vec<GuestPlayer>) {
        self.clubs.insert(
            id.to_owned(),
            Club {
                id: id.to_owned(),
                guest_players,
            },
        );
    }

    pub fn match_doc(&self, key: &str) -> Option<&MatchDoc> {
        self.matches.get(key)
    }

    pub fn club(&self, id: &str) -> Option<&Club> {
        self.clubs.get(id)
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    /// Sizes of the batches committed so far, in commit order.
    pub fn committed_batches(&self) -> &[usize] {
        &self.committed_batches
    }
}

impl DocumentStore for MemoryStore {
    fn query_matches(&mut self, query: &MatchQuery) -> StoreResult<Vec<MatchDoc>> {
        self.calls.queries += 1;
        if self.faults.fail_queries {
            return Err(StoreError::Unavailable {
                reason: "query rejected".to_owned(),
            });
        }
        let found = self
            .matches
            .values()
            .filter(|doc| match &query.start_after {
                Some(after) => doc.id.as_str() > after.as_str(),
                None => true,
            })
            .filter(|doc| query.matches(doc))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(found)
    }

    fn commit(&mut self, batch: WriteBatch) -> StoreResult<()> {
        self.calls.commits += 1;
        if let Some(allowed) = self.faults.fail_commits_after {
            if self.committed_batches.len() >= allowed {
                return Err(StoreError::Unavailable {
                    reason: "commit rejected".to_owned(),
                });
            }
        }
        if batch.len() > MAX_BATCH_OPERATIONS {
            return Err(StoreError::BatchFull {
                limit: MAX_BATCH_OPERATIONS,
            });
        }
        if let Some(missing) = batch
            .operations()
            .iter()
            .find(|op| !self.matches.contains_key(&op.key))
        {
            return Err(StoreError::MissingDocument {
                key: missing.key.clone(),
            });
        }
        for op in batch.operations() {
            if self.faults.lost_writes.contains(&op.key) {
                continue;
            }
            if let Some(doc) = self.matches.get_mut(&op.key) {
                doc.team1 = op.team1.clone();
                doc.team2 = op.team2.clone();
            }
        }
        self.committed_batches.push(batch.len());
        Ok(())
    }

    fn get_club(&mut self, club_id: &str) -> StoreResult<Option<Club>> {
        self.calls.club_reads += 1;
        Ok(self.clubs.get(club_id).cloned())
    }

    fn update_guest_players(&mut self, club_id: &str, guests: &[GuestPlayer]) -> StoreResult<()> {
        self.calls.club_writes += 1;
        if self.faults.fail_club_writes {
            return Err(StoreError::Unavailable {
                reason: "club write rejected".to_owned(),
            });
        }
        let club = self
            .clubs
            .get_mut(club_id)
            .ok_or_else(|| StoreError::MissingDocument {
                key: club_id.to_owned(),
            })?;
        club.guest_players = guests.to_vec();
        Ok(())
    }
}
