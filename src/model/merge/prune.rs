/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */
use crate::store::{DocumentStore, GuestPlayer, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    /// The guest's entries were removed; `remaining` guests are left on the roster.
    Removed { remaining: usize },
    GuestAbsent,
    ClubMissing,
}

/// Drops every roster entry whose `id` is `guest_id`, keeping the rest in order.
pub fn without_guest(guests: &[GuestPlayer], guest_id: &str) -> Vec<GuestPlayer> {
    guests.iter().filter(|g| !g.is(guest_id)).cloned().collect()
}

/// Removes the guest from the club's `guestPlayers` list.
///
/// A missing club or a guest not on the roster is a no-op, not an error.
pub fn prune_guest<S: DocumentStore + ?Sized>(
    store: &mut S,
    club_id: &str,
    guest_id: &str,
) -> StoreResult<PruneOutcome> {
    let Some(club) = store.get_club(club_id)? else {
        return Ok(PruneOutcome::ClubMissing);
    };
    let remaining = without_guest(&club.guest_players, guest_id);
    if remaining.len() == club.guest_players.len() {
        return Ok(PruneOutcome::GuestAbsent);
    }
    store.update_guest_players(club_id, &remaining)?;
    Ok(PruneOutcome::Removed {
        remaining: remaining.len(),
    })
}
