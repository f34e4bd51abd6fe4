//! # State Store Module
//!
//! Owns the client-side database of servers, users, and per-item playback
//! state, and provides repository patterns for data access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repository patterns for servers, users, and playback state records
//! - Dirty tracking for offline-first synchronization
//! - Explicit cascading deletes across the server/user/state hierarchy

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{Result, StoreError};
pub use models::{ItemId, PlaybackMutation, Server, ServerId, User, UserId, UserPlaybackState};
pub use repositories::{
    PlaybackStateRepository, ServerRepository, SqlitePlaybackStateRepository,
    SqliteServerRepository, SqliteUserRepository, UserRepository,
};
