/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::store::{DocumentStore, MatchQuery, StoreResult, TeamField};

/// A match still referencing the guest after the rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residual {
    pub field: TeamField,
    pub match_id: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Verification {
    pub residual: Vec<Residual>,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.residual.is_empty()
    }
}

/// Checks, one team field at a time, whether any match of the club still lists the guest.
///
/// Each check stops at the first hit.
pub fn verify_merge<S: DocumentStore + ?Sized>(
    store: &mut S,
    club_id: &str,
    guest_id: &str,
) -> StoreResult<Verification> {
    let mut verification = Verification::default();
    for field in TeamField::ALL {
        let query = MatchQuery::club(club_id)
            .array_contains(field, guest_id)
            .limit(1);
        if let Some(doc) = store.query_matches(&query)?.into_iter().next() {
            verification.residual.push(Residual {
                field,
                match_id: doc.id,
            });
        }
    }
    Ok(verification)
}
