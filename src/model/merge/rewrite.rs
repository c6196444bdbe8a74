/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use super::model::{MergeRequest, MergeSettings};
use crate::store::{DocumentStore, MatchDoc, MatchPages, MatchQuery, StoreResult, TeamUpdate};

/// Returns `list` with every exact occurrence of `from_id` replaced by `to_id`.
///
/// Order, length and all other entries (duplicates included) are preserved.
pub fn compute_replacement(list: &[String], from_id: &str, to_id: &str) -> Vec<String> {
    list.iter()
        .map(|x| {
            if x == from_id {
                to_id.to_owned()
            } else {
                x.clone()
            }
        })
        .collect()
}

/// Plans the update for one match, or `None` when neither team references the guest.
///
/// Both team lists are rewritten together so the single update carries the final value of
/// each field.
pub fn plan_update(doc: &MatchDoc, guest_id: &str, real_user_id: &str) -> Option<TeamUpdate> {
    let in_team1 = doc.team1.iter().any(|x| x == guest_id);
    let in_team2 = doc.team2.iter().any(|x| x == guest_id);
    if !in_team1 && !in_team2 {
        return None;
    }
    Some(TeamUpdate {
        key: doc.id.clone(),
        team1: compute_replacement(&doc.team1, guest_id, real_user_id),
        team2: compute_replacement(&doc.team2, guest_id, real_user_id),
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub updated_matches: usize,
    pub batches_committed: usize,
}

/// Scans every match of the club and rewrites the ones referencing the guest.
///
/// Updates are committed in batches of `settings.flush_threshold`; batches are not atomic
/// with respect to each other, so a failed commit leaves earlier batches applied.
pub fn rewrite_matches<S: DocumentStore + ?Sized>(
    store: &mut S,
    request: &MergeRequest,
    settings: &MergeSettings,
) -> StoreResult<RewriteSummary> {
    let flush_threshold = settings.flush_threshold();
    let mut pages = MatchPages::new(MatchQuery::club(&request.club_id), settings.page_size());
    let mut batch = store.batch();
    let mut summary = RewriteSummary::default();

    while let Some(page) = pages.next_page(store)? {
        for doc in page {
            // The store filter already scopes by club; skip anything that slipped through.
            if doc.club_id != request.club_id {
                continue;
            }
            let Some(update) = plan_update(&doc, &request.guest_id, &request.real_user_id) else {
                continue;
            };
            batch.update(update)?;
            summary.updated_matches += 1;
            if batch.len() >= flush_threshold {
                log::debug!(
                    "Committing batch of {} match updates ({} so far)",
                    batch.len(),
                    summary.updated_matches
                );
                let full = std::mem::replace(&mut batch, store.batch());
                store.commit(full)?;
                summary.batches_committed += 1;
            }
        }
    }

    if !batch.is_empty() {
        store.commit(batch)?;
        summary.batches_committed += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FoldedStore, MemoryStore, MAX_BATCH_OPERATIONS};

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|x| x.to_string()).collect()
    }

    fn request() -> MergeRequest {
        MergeRequest {
            club_id: "club-a".to_owned(),
            guest_id: "guest_1".to_owned(),
            real_user_id: "user_9".to_owned(),
        }
    }

    #[test]
    fn test_compute_replacement_keeps_order_and_duplicates() {
        let list = ids(&["u1", "guest_1", "u2", "u1", "guest_1"]);
        assert_eq!(
            compute_replacement(&list, "guest_1", "user_9"),
            ids(&["u1", "user_9", "u2", "u1", "user_9"])
        );
        // input untouched
        assert_eq!(list[1], "guest_1");
    }

    #[test]
    fn test_compute_replacement_exact_match_only() {
        let list = ids(&["guest_10", "guest_1x", "GUEST_1"]);
        assert_eq!(compute_replacement(&list, "guest_1", "user_9"), list);
        assert!(compute_replacement(&[], "guest_1", "user_9").is_empty());
    }

    #[test]
    fn test_plan_update_touches_both_fields() {
        let doc = MatchDoc::new("m1", "club-a", &["u1"], &["guest_1", "u2"]);
        let update = plan_update(&doc, "guest_1", "user_9").unwrap();
        assert_eq!(update.key, "m1");
        assert_eq!(update.team1, ids(&["u1"]));
        assert_eq!(update.team2, ids(&["user_9", "u2"]));

        let untouched = MatchDoc::new("m2", "club-a", &["u1"], &["u2"]);
        assert_eq!(plan_update(&untouched, "guest_1", "user_9"), None);
    }

    #[test]
    fn test_rewrite_leaves_other_clubs_alone() {
        let mut store = MemoryStore::default();
        store.insert_match(MatchDoc::new("m1", "club-a", &["guest_1"], &["u2"]));
        store.insert_match(MatchDoc::new("m2", "club-b", &["guest_1"], &["u2"]));
        store.insert_match(MatchDoc::new("m3", "club-a", &["u1"], &["u2"]));

        let summary = rewrite_matches(&mut store, &request(), &MergeSettings::default()).unwrap();
        assert_eq!(summary.updated_matches, 1);
        assert_eq!(store.match_doc("m1").unwrap().team1, ids(&["user_9"]));
        assert_eq!(store.match_doc("m2").unwrap().team1, ids(&["guest_1"]));
        assert_eq!(store.match_doc("m3").unwrap().team1, ids(&["u1"]));
    }

    #[test]
    fn test_rewrite_thousand_matches_in_bounded_batches() {
        let mut store = MemoryStore::default();
        for i in 0..1000 {
            let key = format!("m{i:04}");
            if i % 2 == 0 {
                store.insert_match(MatchDoc::new(&key, "club-a", &["guest_1", "u1"], &["u2"]));
            } else {
                store.insert_match(MatchDoc::new(&key, "club-a", &["u1"], &["u2", "guest_1"]));
            }
        }

        let summary = rewrite_matches(&mut store, &request(), &MergeSettings::default()).unwrap();
        assert_eq!(summary.updated_matches, 1000);
        assert_eq!(store.committed_batches(), &[400, 400, 200]);
        assert!(store
            .committed_batches()
            .iter()
            .all(|size| *size <= MAX_BATCH_OPERATIONS));
        assert_eq!(
            store.match_doc("m0001").unwrap().team2,
            ids(&["u2", "user_9"])
        );
    }

    #[test]
    fn test_rewrite_twice_is_noop() {
        let mut store = MemoryStore::default();
        store.insert_match(MatchDoc::new("m1", "club-a", &["guest_1"], &["guest_1"]));
        let settings = MergeSettings::default();

        assert_eq!(
            rewrite_matches(&mut store, &request(), &settings)
                .unwrap()
                .updated_matches,
            1
        );
        let again = rewrite_matches(&mut store, &request(), &settings).unwrap();
        assert_eq!(again.updated_matches, 0);
        assert_eq!(again.batches_committed, 0);
        assert_eq!(store.committed_batches().len(), 1);
    }

    #[test]
    fn test_failed_commit_keeps_earlier_batches() {
        let mut store = MemoryStore::default();
        for i in 0..10 {
            store.insert_match(MatchDoc::new(&format!("m{i}"), "club-a", &["guest_1"], &[]));
        }
        store.faults.fail_commits_after = Some(1);
        let settings = MergeSettings {
            flush_threshold: 4,
            page_size: 3,
        };

        assert!(rewrite_matches(&mut store, &request(), &settings).is_err());
        assert_eq!(store.committed_batches(), &[4]);
        assert_eq!(store.match_doc("m0").unwrap().team1, ids(&["user_9"]));
        assert_eq!(store.match_doc("m9").unwrap().team1, ids(&["guest_1"]));
    }

    #[test]
    fn test_counts_each_match_once_under_collated_keys() {
        let mut store = FoldedStore::with(&["a", "B", "c"]);
        let settings = MergeSettings {
            flush_threshold: 400,
            page_size: 2,
        };
        let summary = rewrite_matches(&mut store, &request(), &settings).unwrap();
        assert_eq!(summary.updated_matches, 3);
        assert_eq!(summary.batches_committed, 1);
        assert!(store.docs.iter().all(|doc| doc.team1 == ids(&["user_9"])));
    }
}
