//! # Conflict Resolution
//!
//! Decides which side of a diverged playback state record survives.
//!
//! ## Overview
//!
//! A conflict arises when a push is rejected because the server holds a write
//! the client has not seen (the pushed `base_version` is stale and the server
//! judged its own state newer). Resolution is last-write-wins on wall-clock
//! timestamps:
//!
//! - The remote snapshot carries no timestamp: the local record wins. A server
//!   that cannot date its state cannot claim recency.
//! - The local mutation is at least as new as the remote write: the local
//!   record wins. Ties go to the device the user is holding.
//! - Otherwise the remote state wins and is merged over the local record.
//!
//! Winning locally does not clear the dirty flag; the record is pushed again
//! on the next pass with the server's current version as its base.

use bridge_traits::server::RemotePlaybackState;
use core_store::UserPlaybackState;

/// Which side of a conflicting record survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictWinner {
    /// The local record stays as-is and will be pushed again.
    Local,
    /// The remote state overwrites the local record.
    Remote,
}

/// Resolve a conflict between a dirty local record and the server's state.
pub fn resolve(local: &UserPlaybackState, remote: &RemotePlaybackState) -> ConflictWinner {
    match remote.last_modified {
        None => ConflictWinner::Local,
        Some(remote_ts) if local.last_modified >= remote_ts => ConflictWinner::Local,
        Some(_) => ConflictWinner::Remote,
    }
}

/// Build the record that replaces `local` when the remote side wins.
///
/// Synchronized fields and the version come from the server; the result is
/// clean because local and remote now agree.
pub fn merged_from_remote(
    local: &UserPlaybackState,
    remote: &RemotePlaybackState,
) -> UserPlaybackState {
    UserPlaybackState {
        user_id: local.user_id,
        item_id: local.item_id.clone(),
        played: remote.played,
        favorite: remote.favorite,
        playback_position_ticks: remote.position_ticks,
        last_modified: remote.last_modified.unwrap_or(local.last_modified),
        version: remote.version,
        dirty: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use core_store::{ItemId, UserId};

    fn local_at(ts: chrono::DateTime<Utc>) -> UserPlaybackState {
        let mut state = UserPlaybackState::new(UserId::new(), ItemId::new("item-1"));
        state.played = true;
        state.last_modified = ts;
        state.dirty = true;
        state
    }

    fn remote_at(ts: Option<chrono::DateTime<Utc>>) -> RemotePlaybackState {
        RemotePlaybackState {
            played: false,
            favorite: true,
            position_ticks: 9_000,
            last_modified: ts,
            version: 5,
        }
    }

    #[test]
    fn test_local_wins_when_newer() {
        let now = Utc::now();
        let local = local_at(now);
        let remote = remote_at(Some(now - Duration::seconds(30)));

        assert_eq!(resolve(&local, &remote), ConflictWinner::Local);
    }

    #[test]
    fn test_remote_wins_when_newer() {
        let now = Utc::now();
        let local = local_at(now - Duration::seconds(30));
        let remote = remote_at(Some(now));

        assert_eq!(resolve(&local, &remote), ConflictWinner::Remote);
    }

    #[test]
    fn test_tie_goes_to_local() {
        let now = Utc::now();
        let local = local_at(now);
        let remote = remote_at(Some(now));

        assert_eq!(resolve(&local, &remote), ConflictWinner::Local);
    }

    #[test]
    fn test_missing_remote_timestamp_goes_to_local() {
        let local = local_at(Utc::now());
        let remote = remote_at(None);

        assert_eq!(resolve(&local, &remote), ConflictWinner::Local);
    }

    #[test]
    fn test_merged_record_takes_remote_fields_and_version() {
        let now = Utc::now();
        let local = local_at(now - Duration::seconds(30));
        let remote = remote_at(Some(now));

        let merged = merged_from_remote(&local, &remote);

        assert_eq!(merged.user_id, local.user_id);
        assert_eq!(merged.item_id, local.item_id);
        assert!(!merged.played);
        assert!(merged.favorite);
        assert_eq!(merged.playback_position_ticks, 9_000);
        assert_eq!(merged.last_modified, now);
        assert_eq!(merged.version, 5);
        assert!(!merged.dirty);
    }

    #[test]
    fn test_merged_record_keeps_local_timestamp_when_remote_has_none() {
        let now = Utc::now();
        let local = local_at(now);
        let remote = remote_at(None);

        let merged = merged_from_remote(&local, &remote);
        assert_eq!(merged.last_modified, now);
    }
}
