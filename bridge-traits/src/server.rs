//! Remote Playback-State Authority Boundary
//!
//! Defines the contract between the sync engine and a media server that owns
//! the authoritative copy of per-user, per-item playback state. Concrete
//! connectors (e.g. the Jellyfin-compatible HTTP connector) implement
//! [`PlaybackStateApi`]; the sync reconciler consumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-user credentials for a remote call.
///
/// Identifiers are opaque strings at this boundary; typed identifiers live in
/// the store layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSession {
    /// Server-assigned user identifier
    pub user_id: String,
    /// Access token authenticating this user against the server
    pub access_token: String,
}

impl ApiSession {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

/// Server-held playback state snapshot for one (user, item) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaybackState {
    pub played: bool,
    pub favorite: bool,
    /// Resume offset in ticks (100ns units), non-negative
    pub position_ticks: i64,
    /// Server-reported wall-clock instant of its snapshot, when available
    pub last_modified: Option<DateTime<Utc>>,
    /// Server-issued logical version, incremented on each accepted write
    pub version: i64,
}

/// Payload pushed to the server for one (user, item) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePush {
    pub played: bool,
    pub favorite: bool,
    pub position_ticks: i64,
    /// Wall-clock instant of the latest local mutation
    pub last_modified: DateTime<Utc>,
    /// Last server version this client observed for the record (0 = never)
    pub base_version: i64,
}

/// Result of a push accepted by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The server adopted the pushed state and issued this version for it.
    Acknowledged { version: i64 },
    /// The server kept its own newer state and reports it for merging.
    Conflict(RemotePlaybackState),
}

/// Remote playback-state authority.
///
/// Pushes are idempotent: repeating a push with an identical payload leaves
/// the server state (fields and version) unchanged. The server increments the
/// record version only when an accepted write changes the stored fields.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::server::{ApiSession, PlaybackStateApi, PushOutcome};
///
/// async fn push_one(api: &dyn PlaybackStateApi, session: &ApiSession) -> Result<()> {
///     match api.push_state(session, "item-1", &push).await? {
///         PushOutcome::Acknowledged { version } => println!("ack v{}", version),
///         PushOutcome::Conflict(remote) => println!("server kept v{}", remote.version),
///     }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait PlaybackStateApi: Send + Sync {
    /// Push local playback state for an item.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::BridgeError::Network`] when the server is
    /// unreachable (no connectivity); other failures map to
    /// [`crate::error::BridgeError::OperationFailed`]. A conflict is not an
    /// error; it is reported through [`PushOutcome::Conflict`].
    async fn push_state(
        &self,
        session: &ApiSession,
        item_id: &str,
        push: &StatePush,
    ) -> Result<PushOutcome>;

    /// Fetch the server snapshot for an item.
    async fn fetch_state(&self, session: &ApiSession, item_id: &str)
        -> Result<RemotePlaybackState>;
}
