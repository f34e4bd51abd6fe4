//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `NetworkMonitor` using a connectivity probe
//! - `BackgroundExecutor` using the Tokio thread pool
//! - `LifecycleObserver` as no-op (desktop always foreground)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioBackgroundExecutor};
//! use bridge_traits::{BackgroundExecutor, HttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let executor = TokioBackgroundExecutor::new();
//!
//!     // Use in core configuration
//! }
//! ```

mod background;
mod http;
mod network;

pub use background::{DesktopLifecycleObserver, TokioBackgroundExecutor};
pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
