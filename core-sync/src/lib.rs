//! # Playback State Sync Module
//!
//! ## Overview
//!
//! Keeps per-user playback state (played flags, favorites, resume positions)
//! consistent between the local store and remote media servers. Local changes
//! apply immediately and never wait on the network; a background pass pushes
//! them out when connectivity allows and settles conflicts by wall-clock,
//! ties going to the local record.
//!
//! ## Components
//!
//! - **Mutation Recorder** ([`recorder`]): applies local changes, stamps and
//!   dirties the record, requests a sync pass
//! - **Sync Scheduler** ([`scheduler`]): coalesces sync requests into one
//!   logical background task on the platform executor
//! - **Sync Reconciler** ([`reconciler`]): pushes dirty records per user and
//!   resolves version conflicts against the server
//! - **Conflict Resolution** ([`conflict`]): last-write-wins comparison used
//!   by both push conflicts and item refreshes
//! - **Sync Service** ([`service`]): facade wiring the pieces over the
//!   platform bridges
//!
//! ## Usage
//!
//! ```ignore
//! let service = SyncService::new(states, users, executor, clock, config, bus);
//! service.register_server_api(server_id, api).await;
//! service.start().await?;
//!
//! service.recorder().set_played(&user_id, &item_id, true).await?;
//! ```

pub mod conflict;
pub mod error;
pub mod recorder;
pub mod reconciler;
pub mod scheduler;
pub mod service;

pub use conflict::{merged_from_remote, resolve, ConflictWinner};
pub use error::{Result, SyncError};
pub use recorder::MutationRecorder;
pub use reconciler::{SyncReconciler, SyncSummary};
pub use scheduler::{
    SchedulerConfig, SchedulerHandle, SyncScheduler, SyncTrigger, SYNC_TASK_NAME,
};
pub use service::SyncService;
