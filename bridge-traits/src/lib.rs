//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking & Remote State
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`PlaybackStateApi`](server::PlaybackStateApi) - Remote playback-state authority
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity and metered network detection
//! - [`BackgroundExecutor`](background::BackgroundExecutor) - Constraint-aware work scheduling
//!   with de-duplicating enqueue keys
//! - [`LifecycleObserver`](background::LifecycleObserver) - App foreground/background transitions
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Classify unreachable endpoints as `BridgeError::Network` so the sync
//!   engine can distinguish "no connectivity" from "server said no"
//! - Provide actionable error messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.

pub mod background;
pub mod error;
pub mod http;
pub mod network;
pub mod server;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{
    BackgroundExecutor, LifecycleObserver, LifecycleState, ReplacePolicy, TaskConstraints,
    TaskHandler, TaskStatus,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use server::{ApiSession, PlaybackStateApi, PushOutcome, RemotePlaybackState, StatePush};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
