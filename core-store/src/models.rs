//! Domain models for servers, users, and playback state records
//!
//! This module contains rich domain models with validation and database mapping.
//! Identifiers are UUIDs in the domain layer and stored as TEXT; timestamps are
//! `DateTime<Utc>` in the domain layer and stored as unix epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a media server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(pub Uuid);

impl ServerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ServerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Unique identifier for a user account on a media server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier for a media item, issued by the remote server
///
/// Item ids are opaque server-side strings; unlike server and user ids they
/// are not required to be UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A configured remote media server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Unique identifier
    pub id: ServerId,
    /// Display name
    pub name: String,
    /// Base URL of the server, e.g. `https://media.example.org`
    pub address: String,
    /// When the server was added
    pub created_at: DateTime<Utc>,
}

impl Server {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: ServerId::new(),
            name: name.into(),
            address: address.into(),
            created_at: Utc::now(),
        }
    }

    /// Validate server data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        if self.address.trim().is_empty() {
            return Err("Server address cannot be empty".to_string());
        }
        Ok(())
    }
}

/// A signed-in user account on a media server
///
/// User ids are issued by the remote server during sign-in, so unlike
/// [`Server`] there is no constructor that mints a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-issued user identifier
    pub id: UserId,
    /// The server this account belongs to
    pub server_id: ServerId,
    /// Display name
    pub name: String,
    /// Access token for API calls; `None` once signed out
    pub access_token: Option<String>,
    /// Avatar image tag, if the server reports one
    pub primary_image_tag: Option<String>,
}

impl User {
    pub fn new(id: UserId, server_id: ServerId, name: impl Into<String>) -> Self {
        Self {
            id,
            server_id,
            name: name.into(),
            access_token: None,
            primary_image_tag: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Whether the user currently holds a usable session
    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Per-user, per-item playback state record
///
/// This is the unit of synchronization. `dirty` marks records with local
/// changes not yet acknowledged by the remote server; `version` is the
/// server-issued logical version last observed for this record (0 when the
/// record has never been pushed or fetched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlaybackState {
    pub user_id: UserId,
    pub item_id: ItemId,
    /// Whether the item has been watched/listened to completion
    pub played: bool,
    /// Whether the item is marked as a favorite
    pub favorite: bool,
    /// Resume position in ticks (1 tick = 100 nanoseconds)
    pub playback_position_ticks: i64,
    /// Wall-clock time of the most recent local mutation
    pub last_modified: DateTime<Utc>,
    /// Server-issued logical version last observed for this record
    pub version: i64,
    /// Whether local changes are awaiting push
    pub dirty: bool,
}

impl UserPlaybackState {
    /// Create a fresh, clean record with default field values
    pub fn new(user_id: UserId, item_id: ItemId) -> Self {
        Self {
            user_id,
            item_id,
            played: false,
            favorite: false,
            playback_position_ticks: 0,
            last_modified: Utc::now(),
            version: 0,
            dirty: false,
        }
    }

    /// Validate playback state data
    pub fn validate(&self) -> Result<(), String> {
        if self.playback_position_ticks < 0 {
            return Err("Playback position cannot be negative".to_string());
        }
        Ok(())
    }

    /// Whether the synchronized fields of `self` and `other` carry the same values
    ///
    /// Compares only the fields that travel to the server; bookkeeping fields
    /// (`last_modified`, `version`, `dirty`) are ignored.
    pub fn same_fields(&self, other: &UserPlaybackState) -> bool {
        self.played == other.played
            && self.favorite == other.favorite
            && self.playback_position_ticks == other.playback_position_ticks
    }
}

/// A partial update to a playback state record
///
/// Fields left as `None` retain their stored value. Applied atomically by
/// the repository in a single statement, so two concurrent mutations of
/// different fields cannot lose each other's writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackMutation {
    pub played: Option<bool>,
    pub favorite: Option<bool>,
    pub position_ticks: Option<i64>,
}

impl PlaybackMutation {
    pub fn played(value: bool) -> Self {
        Self {
            played: Some(value),
            ..Default::default()
        }
    }

    pub fn favorite(value: bool) -> Self {
        Self {
            favorite: Some(value),
            ..Default::default()
        }
    }

    pub fn position_ticks(value: i64) -> Self {
        Self {
            position_ticks: Some(value),
            ..Default::default()
        }
    }

    /// Whether the mutation changes nothing
    pub fn is_empty(&self) -> bool {
        self.played.is_none() && self.favorite.is_none() && self.position_ticks.is_none()
    }

    /// Validate mutation data
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ticks) = self.position_ticks {
            if ticks < 0 {
                return Err("Playback position cannot be negative".to_string());
            }
        }
        Ok(())
    }
}
