//! # Core Runtime Module
//!
//! Shared runtime infrastructure for the Media Client Core:
//!
//! - **Configuration** (`config`): builder-based configuration with fail-fast
//!   validation of injected platform bridges and feature flags
//! - **Logging** (`logging`): structured logging built on `tracing`, with
//!   pluggable output formats, an optional platform logger sink, and PII
//!   redaction
//! - **Event Bus** (`events`): broadcast channel for core events (account,
//!   sync, playback state) consumed by UI layers and tests
//!
//! This crate sits between the platform bridges (`bridge-traits`) and the
//! domain crates (`core-store`, `core-sync`), providing the glue they share.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
