//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//! Each entity has a corresponding repository with CRUD operations plus the
//! sync-specific writes the reconciler depends on.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Cascading deletes run as explicit transactions, children first, rather
//!   than relying on `ON DELETE CASCADE` in the schema
//!
//! ## Available Repositories
//!
//! - `ServerRepository` - Configured remote media servers
//! - `UserRepository` - Signed-in user accounts and their tokens
//! - `PlaybackStateRepository` - Per-user playback state with dirty tracking

pub mod playback_state;
pub mod server;
pub mod user;

pub use playback_state::{PlaybackStateRepository, SqlitePlaybackStateRepository};
pub use server::{ServerRepository, SqliteServerRepository};
pub use user::{SqliteUserRepository, UserRepository};
