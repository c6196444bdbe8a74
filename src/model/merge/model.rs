/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::prune::{prune_guest, PruneOutcome};
use super::rewrite::rewrite_matches;
use super::verify::verify_merge;
use crate::error::{Error, Result};
use crate::model::auth::Principal;
use crate::store::{DocumentStore, StoreError, MAX_BATCH_OPERATIONS};
use serde_json::Value;

/// Body of a merge call as received; every field may be absent.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MergePayload {
    #[serde(default)]
    pub club_id: Option<String>,
    #[serde(default)]
    pub guest_id: Option<String>,
    #[serde(default)]
    pub real_user_id: Option<String>,
}

/// A merge call: the raw body plus whoever made it, if anyone.
///
/// The body stays untyped until the caller is authenticated.
#[derive(Debug, Clone)]
pub struct MergeCall {
    pub auth: Option<Principal>,
    pub data: Value,
}

/// A validated merge request. Every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub club_id: String,
    pub guest_id: String,
    pub real_user_id: String,
}

const MISSING_FIELDS: &str = "The function must be called with clubId, guestId, and realUserId.";

impl MergeRequest {
    /// Parses and checks the body of a call.
    pub fn from_data(data: &Value) -> Result<MergeRequest> {
        let payload: MergePayload = match serde_json::from_value(data.clone()) {
            Ok(payload) => payload,
            Err(_) => return Error::invalid_argument(MISSING_FIELDS),
        };
        MergeRequest::validate(&payload)
    }

    pub fn validate(payload: &MergePayload) -> Result<MergeRequest> {
        fn required(value: &Option<String>) -> Option<String> {
            value.as_deref().filter(|v| !v.is_empty()).map(str::to_owned)
        }
        let (Some(club_id), Some(guest_id), Some(real_user_id)) = (
            required(&payload.club_id),
            required(&payload.guest_id),
            required(&payload.real_user_id),
        ) else {
            return Error::invalid_argument(MISSING_FIELDS);
        };
        if guest_id == real_user_id {
            return Error::invalid_argument("guestId and realUserId must differ.");
        }
        Ok(MergeRequest {
            club_id,
            guest_id,
            real_user_id,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    pub updated_matches: usize,
}

/// Tuning for the match rewrite, read from the `merge` config section.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MergeSettings {
    /// Updates accumulated before a batch is committed. Kept below the store's ceiling.
    pub flush_threshold: usize,
    /// Match documents fetched per page while scanning a club.
    pub page_size: usize,
}

impl Default for MergeSettings {
    fn default() -> MergeSettings {
        MergeSettings {
            flush_threshold: 400,
            page_size: 500,
        }
    }
}

impl MergeSettings {
    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold.clamp(1, MAX_BATCH_OPERATIONS)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    Validated,
    Rewriting,
    Verifying,
    Pruning,
    Done,
}

impl std::fmt::Display for MergePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MergePhase::Validated => "validated",
            MergePhase::Rewriting => "rewriting",
            MergePhase::Verifying => "verifying",
            MergePhase::Pruning => "pruning",
            MergePhase::Done => "done",
        };
        f.write_str(name)
    }
}

fn internal(phase: MergePhase, request: &MergeRequest, err: StoreError) -> Error {
    log::error!(
        "Error merging guest history ({phase}) for guest {} in club {}: {err}",
        request.guest_id,
        request.club_id
    );
    Error::Internal {}
}

/// Merges a guest player's match history into a real user and removes the guest from the
/// club roster.
///
/// Runs rewrite, verification and pruning once, in that order, stopping at the first
/// failure. Nothing is retried here.
pub fn merge_guest_history<S: DocumentStore + ?Sized>(
    store: &mut S,
    call: &MergeCall,
    settings: &MergeSettings,
) -> Result<MergeResult> {
    if call.auth.is_none() {
        return Error::unauthenticated();
    }
    let request = MergeRequest::from_data(&call.data)?;
    let mut phase = MergePhase::Validated;
    log::info!(
        "Starting merge: Guest {} -> User {} in Club {}",
        request.guest_id,
        request.real_user_id,
        request.club_id
    );

    phase = advance(phase, MergePhase::Rewriting);
    let rewrite =
        rewrite_matches(store, &request, settings).map_err(|e| internal(phase, &request, e))?;
    log::info!(
        "Successfully merged {} matches in {} batches.",
        rewrite.updated_matches,
        rewrite.batches_committed
    );

    phase = advance(phase, MergePhase::Verifying);
    let verification = verify_merge(store, &request.club_id, &request.guest_id)
        .map_err(|e| internal(phase, &request, e))?;
    if !verification.is_clean() {
        for residual in &verification.residual {
            log::error!(
                "Verification failed: guest {} still in {} of match {}",
                request.guest_id,
                residual.field,
                residual.match_id
            );
        }
        return Err(Error::MigrationIncomplete {
            guest_id: request.guest_id,
        });
    }
    log::info!("Verification successful: guest history migrated.");

    phase = advance(phase, MergePhase::Pruning);
    match prune_guest(store, &request.club_id, &request.guest_id) {
        Ok(PruneOutcome::Removed { remaining }) => log::info!(
            "PERMANENT DELETION: removed guest {} from club {} ({remaining} guests remain)",
            request.guest_id,
            request.club_id
        ),
        Ok(PruneOutcome::GuestAbsent) => log::warn!(
            "Guest {} was not found in the roster of club {}. Deletion skipped.",
            request.guest_id,
            request.club_id
        ),
        Ok(PruneOutcome::ClubMissing) => log::error!(
            "Club {} not found during guest deletion.",
            request.club_id
        ),
        Err(e) => {
            log::error!(
                "CRITICAL: history of guest {} migrated but roster deletion failed: {e}",
                request.guest_id
            );
            return Err(Error::PartialSuccessDeletionFailed {
                updated_matches: rewrite.updated_matches,
            });
        }
    }

    advance(phase, MergePhase::Done);
    Ok(MergeResult {
        success: true,
        updated_matches: rewrite.updated_matches,
    })
}

fn advance(from: MergePhase, to: MergePhase) -> MergePhase {
    log::debug!("merge phase {from} -> {to}");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GuestPlayer, MatchDoc, MemoryStore};
    use serde_json::json;

    fn call(club: Option<&str>, guest: Option<&str>, user: Option<&str>) -> MergeCall {
        MergeCall {
            auth: Some(Principal {
                user_id: "admin".to_owned(),
            }),
            data: json!({"clubId": club, "guestId": guest, "realUserId": user}),
        }
    }

    fn valid_call() -> MergeCall {
        call(Some("club-a"), Some("guest_1"), Some("user_9"))
    }

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::default();
        store.insert_club(
            "club-a",
            vec![
                GuestPlayer::new("guest_0", "Ann"),
                GuestPlayer::new("guest_1", "Bo"),
                GuestPlayer::new("guest_2", "Cy"),
            ],
        );
        store.insert_match(MatchDoc::new("m1", "club-a", &["u1", "guest_1"], &["u2", "u3"]));
        store.insert_match(MatchDoc::new("m2", "club-a", &["u1", "u2"], &["guest_1", "u3"]));
        store.insert_match(MatchDoc::new("m3", "club-a", &["u1", "u2"], &["u3", "u4"]));
        store.insert_match(MatchDoc::new("m4", "club-b", &["guest_1"], &["u3"]));
        store
    }

    #[test]
    fn test_full_merge() {
        let mut store = seeded_store();
        let result = merge_guest_history(&mut store, &valid_call(), &MergeSettings::default());
        assert_eq!(
            result,
            Ok(MergeResult {
                success: true,
                updated_matches: 2
            })
        );
        assert_eq!(store.match_doc("m1").unwrap().team1, vec!["u1", "user_9"]);
        assert_eq!(store.match_doc("m2").unwrap().team2, vec!["user_9", "u3"]);
        assert_eq!(store.match_doc("m4").unwrap().team1, vec!["guest_1"]);
        let roster = &store.club("club-a").unwrap().guest_players;
        assert_eq!(
            roster,
            &vec![
                GuestPlayer::new("guest_0", "Ann"),
                GuestPlayer::new("guest_2", "Cy")
            ]
        );
    }

    #[test]
    fn test_rerun_is_noop() {
        let mut store = seeded_store();
        let settings = MergeSettings::default();
        merge_guest_history(&mut store, &valid_call(), &settings).unwrap();
        let again = merge_guest_history(&mut store, &valid_call(), &settings).unwrap();
        assert_eq!(again.updated_matches, 0);
        assert!(again.success);
    }

    #[test]
    fn test_missing_real_user_touches_nothing() {
        let mut store = seeded_store();
        let result = merge_guest_history(
            &mut store,
            &call(Some("club-a"), Some("guest_1"), None),
            &MergeSettings::default(),
        );
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_empty_fields_are_invalid() {
        let mut store = seeded_store();
        for bad in [
            call(Some(""), Some("guest_1"), Some("user_9")),
            call(Some("club-a"), Some(""), Some("user_9")),
            call(None, None, None),
            call(Some("club-a"), Some("guest_1"), Some("guest_1")),
        ] {
            let result = merge_guest_history(&mut store, &bad, &MergeSettings::default());
            assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        }
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_malformed_data_is_invalid() {
        let mut store = seeded_store();
        for data in [json!({"clubId": 7}), json!(["club-a"]), json!("club-a"), Value::Null] {
            let mut bad = valid_call();
            bad.data = data;
            let result = merge_guest_history(&mut store, &bad, &MergeSettings::default());
            assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        }
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_unauthenticated_touches_nothing() {
        let mut store = seeded_store();
        let mut anonymous = valid_call();
        anonymous.auth = None;
        anonymous.data = json!({"clubId": 7});
        let result = merge_guest_history(&mut store, &anonymous, &MergeSettings::default());
        assert_eq!(result, Err(Error::Unauthenticated {}));
        assert_eq!(store.calls().total(), 0);
    }

    #[test]
    fn test_lost_write_blocks_deletion() {
        let mut store = seeded_store();
        store.faults.lost_writes.insert("m2".to_owned());
        let result = merge_guest_history(&mut store, &valid_call(), &MergeSettings::default());
        assert_eq!(
            result,
            Err(Error::MigrationIncomplete {
                guest_id: "guest_1".to_owned()
            })
        );
        assert_eq!(store.calls().club_reads, 0);
        assert_eq!(store.calls().club_writes, 0);
        assert_eq!(store.club("club-a").unwrap().guest_players.len(), 3);
    }

    #[test]
    fn test_commit_failure_is_internal() {
        let mut store = seeded_store();
        store.faults.fail_commits_after = Some(0);
        let result = merge_guest_history(&mut store, &valid_call(), &MergeSettings::default());
        assert_eq!(result, Err(Error::Internal {}));
        assert_eq!(store.club("club-a").unwrap().guest_players.len(), 3);
    }

    #[test]
    fn test_roster_failure_is_fatal() {
        let mut store = seeded_store();
        store.faults.fail_club_writes = true;
        let result = merge_guest_history(&mut store, &valid_call(), &MergeSettings::default());
        assert_eq!(
            result,
            Err(Error::PartialSuccessDeletionFailed { updated_matches: 2 })
        );
        // matches stay merged
        assert_eq!(store.match_doc("m1").unwrap().team1, vec!["u1", "user_9"]);
    }

    #[test]
    fn test_guest_not_on_roster_still_succeeds() {
        let mut store = seeded_store();
        store.insert_club("club-a", vec![GuestPlayer::new("guest_0", "Ann")]);
        let result =
            merge_guest_history(&mut store, &valid_call(), &MergeSettings::default()).unwrap();
        assert_eq!(result.updated_matches, 2);
        assert_eq!(store.calls().club_writes, 0);
        assert_eq!(store.club("club-a").unwrap().guest_players.len(), 1);
    }

    #[test]
    fn test_missing_club_still_succeeds() {
        let mut store = MemoryStore::default();
        store.insert_match(MatchDoc::new("m1", "club-a", &["guest_1"], &[]));
        let result =
            merge_guest_history(&mut store, &valid_call(), &MergeSettings::default()).unwrap();
        assert_eq!(result.updated_matches, 1);
    }

    #[test]
    fn test_settings_are_clamped() {
        let settings = MergeSettings {
            flush_threshold: 10_000,
            page_size: 0,
        };
        assert_eq!(settings.flush_threshold(), MAX_BATCH_OPERATIONS);
        assert_eq!(settings.page_size(), 1);
        let zero = MergeSettings {
            flush_threshold: 0,
            page_size: 10,
        };
        assert_eq!(zero.flush_threshold(), 1);
    }
}
