//! # Jellyfin Provider
//!
//! Implements `PlaybackStateApi` against a Jellyfin server.
//!
//! ## Overview
//!
//! This module provides:
//! - Versioned playback-state reads and pushes per (user, item) pair
//! - Conflict reporting via `409` responses carrying the server's state
//! - Token authentication through the `X-Emby-Token` header
//! - Unauthenticated server probing for the add-server flow

pub mod connector;
pub mod error;
pub mod types;

pub use connector::JellyfinConnector;
pub use error::{JellyfinError, Result};
pub use types::PublicSystemInfo;
