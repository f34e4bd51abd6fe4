//! # Core Configuration Module
//!
//! Provides configuration management for the Media Client Core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core library.
//! It enforces fail-fast validation to ensure all required bridges are provided
//! before initialization.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Required for server communication
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `Clock` - Time source (default: system clock)
//! - `NetworkMonitor` - Connectivity detection (optional)
//! - `BackgroundExecutor` - Sync pass scheduling (optional)
//! - `LifecycleObserver` - App lifecycle (optional)
//!
//! When the `desktop-shims` feature is enabled, a desktop-ready default for
//! `HttpClient` is injected automatically if not provided.
//!
//! ## Usage
//!
//! ### Basic Configuration with Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/client.db")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SyncOptions};
//! use std::sync::Arc;
//!
//! // Note: Requires implementing HttpClient, BackgroundExecutor, NetworkMonitor
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/client.db")
//!     .http_client(Arc::new(MyHttpClient))
//!     .background_executor(Arc::new(MyExecutor))
//!     .network_monitor(Arc::new(MyMonitor))
//!     .enable_background_sync(true)
//!     .sync_options(SyncOptions::new().with_periodic_interval_secs(900))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates all required dependencies and provides actionable error
//! messages when capabilities are missing or feature flags are inconsistent with
//! the injected bridges.

use crate::error::{Error, Result};
use bridge_traits::{
    BackgroundExecutor, Clock, HttpClient, LifecycleObserver, NetworkMonitor, SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Core configuration for the Media Client Core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// HTTP client for talking to media servers (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Time source used for mutation timestamps (default: system clock)
    pub clock: Arc<dyn Clock>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Background task executor (optional)
    pub background_executor: Option<Arc<dyn BackgroundExecutor>>,

    /// App lifecycle observer (optional)
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Feature flags
    pub features: FeatureFlags,

    /// Sync engine tuning knobs
    pub sync: SyncOptions,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("http_client", &"HttpClient { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "background_executor",
                &self
                    .background_executor
                    .as_ref()
                    .map(|_| "BackgroundExecutor { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .field("features", &self.features)
            .field("sync", &self.sync)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Features can be enabled during configuration to unlock additional capabilities,
/// but may require corresponding bridge implementations to function correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Enable background sync passes (requires BackgroundExecutor)
    pub enable_background_sync: bool,

    /// Enable network-aware scheduling (requires NetworkMonitor)
    pub enable_network_awareness: bool,

    /// Request a sync pass when the app returns to the foreground
    /// (requires LifecycleObserver)
    pub enable_foreground_sync: bool,
}

/// Tuning knobs for the sync engine.
///
/// These settings control how local mutations are funneled into sync passes:
/// the capacity of the bounded request channel, an optional periodic pass,
/// and whether passes are restricted to WiFi connections.
///
/// # Example
///
/// ```no_run
/// use core_runtime::config::SyncOptions;
///
/// let options = SyncOptions::new()
///     .with_channel_capacity(128)
///     .with_periodic_interval_secs(900) // every 15 minutes
///     .with_wifi_only(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Capacity of the bounded mutation-to-scheduler channel.
    ///
    /// Requests beyond this capacity are dropped; they coalesce with the
    /// requests already queued, so no sync work is lost.
    pub channel_capacity: usize,

    /// Optional periodic sync interval in seconds.
    ///
    /// When set, a sync pass is requested at this interval even without
    /// local mutations, picking up records left dirty by earlier failures.
    pub periodic_interval_secs: Option<u64>,

    /// Restrict sync passes to WiFi connections.
    pub wifi_only: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            periodic_interval_secs: None,
            wifi_only: false,
        }
    }
}

impl SyncOptions {
    /// Creates sync options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the periodic sync interval in seconds
    pub fn with_periodic_interval_secs(mut self, secs: u64) -> Self {
        self.periodic_interval_secs = Some(secs);
        self
    }

    /// Restricts sync passes to WiFi connections
    pub fn with_wifi_only(mut self, wifi_only: bool) -> Self {
        self.wifi_only = wifi_only;
        self
    }

    /// Validates the options
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "Sync channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.channel_capacity > 4096 {
            return Err(Error::Config(
                "Sync channel capacity exceeds maximum of 4096".to_string(),
            ));
        }

        if let Some(secs) = self.periodic_interval_secs {
            if secs < 60 {
                return Err(Error::Config(
                    "Periodic sync interval must be at least 60 seconds".to_string(),
                ));
            }

            if secs > 604_800 {
                return Err(Error::Config(
                    "Periodic sync interval exceeds maximum of 7 days (604,800 seconds)"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Checks if periodic sync is configured
    pub fn has_periodic_sync(&self) -> bool {
        self.periodic_interval_secs.is_some()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder();
    /// ```
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Sync options are within bounds
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        self.sync.validate()?;

        // Validate feature flags against available bridges
        if self.features.enable_background_sync && self.background_executor.is_none() {
            return Err(Error::Config(
                "Background sync enabled but no BackgroundExecutor provided. \
                 Disable the feature or inject a BackgroundExecutor implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_foreground_sync && self.lifecycle_observer.is_none() {
            return Err(Error::Config(
                "Foreground sync enabled but no LifecycleObserver provided. \
                 Disable the feature or inject a LifecycleObserver implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for server communication. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject a platform-native HTTP client (URLSession/OkHttp)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides helpful error
/// messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    clock: Option<Arc<dyn Clock>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    background_executor: Option<Arc<dyn BackgroundExecutor>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    features: FeatureFlags,
    sync: Option<SyncOptions>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_path("/path/to/client.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation (required).
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client implementation
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the time source.
    ///
    /// Defaults to the system clock. Inject a fake clock in tests to make
    /// timestamp-dependent behavior deterministic.
    ///
    /// # Arguments
    ///
    /// * `clock` - Clock implementation
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the network monitor implementation (optional).
    ///
    /// The network monitor is used to detect connectivity changes and gate
    /// sync passes on network constraints.
    ///
    /// # Arguments
    ///
    /// * `monitor` - Network monitor implementation
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the background executor implementation (optional).
    ///
    /// The background executor is used to schedule sync passes under a
    /// fixed logical name with replace semantics.
    ///
    /// # Arguments
    ///
    /// * `executor` - Background executor implementation
    pub fn background_executor(mut self, executor: Arc<dyn BackgroundExecutor>) -> Self {
        self.background_executor = Some(executor);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    ///
    /// The lifecycle observer is used to detect app foreground/background
    /// transitions and request sync passes accordingly.
    ///
    /// # Arguments
    ///
    /// * `observer` - Lifecycle observer implementation
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Enables or disables background sync.
    ///
    /// Requires a `BackgroundExecutor` to be provided.
    ///
    /// Default: false
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to enable background sync
    pub fn enable_background_sync(mut self, enabled: bool) -> Self {
        self.features.enable_background_sync = enabled;
        self
    }

    /// Enables or disables network awareness.
    ///
    /// Requires a `NetworkMonitor` to be provided.
    ///
    /// Default: false
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to enable network awareness
    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    /// Enables or disables sync-on-foreground.
    ///
    /// Requires a `LifecycleObserver` to be provided.
    ///
    /// Default: false
    ///
    /// # Arguments
    ///
    /// * `enabled` - Whether to request a sync pass on foreground transitions
    pub fn enable_foreground_sync(mut self, enabled: bool) -> Self {
        self.features.enable_foreground_sync = enabled;
        self
    }

    /// Sets all feature flags at once.
    ///
    /// # Arguments
    ///
    /// * `features` - Feature flags to set
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Sets the sync engine tuning knobs.
    ///
    /// # Arguments
    ///
    /// * `options` - Sync options
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::{CoreConfig, SyncOptions};
    ///
    /// let options = SyncOptions::new()
    ///     .with_periodic_interval_secs(900)
    ///     .with_wifi_only(true);
    ///
    /// let builder = CoreConfig::builder()
    ///     .sync_options(options);
    /// ```
    pub fn sync_options(mut self, options: SyncOptions) -> Self {
        self.sync = Some(options);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// This validates all required dependencies are provided and returns
    /// an error with an actionable message if anything is missing.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - A required bridge is missing (HttpClient)
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use core_runtime::config::CoreConfig;
    /// let config = CoreConfig::builder()
    ///     .database_path("/path/to/client.db")
    ///     .build()?;
    /// # Ok::<(), core_runtime::Error>(())
    /// ```
    pub fn build(self) -> Result<CoreConfig> {
        // Validate required fields
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        // Create config with defaults
        let config = CoreConfig {
            database_path,
            http_client,
            clock,
            network_monitor: self.network_monitor,
            background_executor: self.background_executor,
            lifecycle_observer: self.lifecycle_observer,
            features: self.features,
            sync: self.sync.unwrap_or_default(),
        };

        // Validate the configuration
        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::background::{ReplacePolicy, TaskConstraints, TaskHandler, TaskStatus};
    use bridge_traits::background::{LifecycleChangeStream, LifecycleState};
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::network::{NetworkChangeStream, NetworkInfo, NetworkStatus};
    use bridge_traits::BridgeError;
    use std::sync::Arc;

    // Mock implementations for testing
    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    struct MockExecutor;

    #[async_trait]
    impl BackgroundExecutor for MockExecutor {
        async fn register_task_handler(
            &self,
            _name: &str,
            _handler: TaskHandler,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn enqueue(
            &self,
            _name: &str,
            _constraints: TaskConstraints,
            _replace: ReplacePolicy,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn cancel(&self, _name: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn task_status(
            &self,
            _name: &str,
        ) -> std::result::Result<Option<TaskStatus>, BridgeError> {
            Ok(None)
        }
    }

    struct MockMonitor;

    #[async_trait]
    impl NetworkMonitor for MockMonitor {
        async fn get_network_info(&self) -> std::result::Result<NetworkInfo, BridgeError> {
            Ok(NetworkInfo {
                status: NetworkStatus::Connected,
                network_type: None,
                is_metered: false,
                is_expensive: false,
            })
        }

        async fn subscribe_changes(
            &self,
        ) -> std::result::Result<Box<dyn NetworkChangeStream>, BridgeError> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    struct MockLifecycle;

    #[async_trait]
    impl LifecycleObserver for MockLifecycle {
        async fn get_state(&self) -> std::result::Result<LifecycleState, BridgeError> {
            Ok(LifecycleState::Foreground)
        }

        async fn subscribe_changes(
            &self,
        ) -> std::result::Result<Box<dyn LifecycleChangeStream>, BridgeError> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder()
            .database_path("/data/client.db")
            .build()
            .expect("desktop defaults should succeed");

        assert_eq!(config.database_path, PathBuf::from("/data/client.db"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder().database_path("/data/client.db").build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("HttpClient"));
        assert!(err_msg.contains("server communication"));
    }

    #[test]
    fn test_builder_requires_database_path() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Database path is required"));
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .build();

        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.database_path, PathBuf::from("/data/client.db"));
        assert_eq!(config.sync.channel_capacity, 64); // Default
        assert!(config.sync.periodic_interval_secs.is_none());
    }

    #[test]
    fn test_default_clock_is_system_clock() {
        let config = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .build()
            .unwrap();

        assert!(config.clock.unix_timestamp() > 0);
    }

    #[test]
    fn test_builder_with_custom_sync_options() {
        let config = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .sync_options(
                SyncOptions::new()
                    .with_channel_capacity(128)
                    .with_periodic_interval_secs(900)
                    .with_wifi_only(true),
            )
            .build()
            .unwrap();

        assert_eq!(config.sync.channel_capacity, 128);
        assert_eq!(config.sync.periodic_interval_secs, Some(900));
        assert!(config.sync.wifi_only);
        assert!(config.sync.has_periodic_sync());
    }

    #[test]
    fn test_validate_rejects_zero_channel_capacity() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .sync_options(SyncOptions::new().with_channel_capacity(0))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be greater than 0"));
    }

    #[test]
    fn test_validate_rejects_excessive_channel_capacity() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .sync_options(SyncOptions::new().with_channel_capacity(10_000))
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_short_periodic_interval() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .sync_options(SyncOptions::new().with_periodic_interval_secs(10))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least 60 seconds"));
    }

    #[test]
    fn test_validate_rejects_excessive_periodic_interval() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .sync_options(SyncOptions::new().with_periodic_interval_secs(1_000_000))
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_feature_flags_default() {
        let flags = FeatureFlags::default();
        assert!(!flags.enable_background_sync);
        assert!(!flags.enable_network_awareness);
        assert!(!flags.enable_foreground_sync);
    }

    #[test]
    fn test_validate_background_sync_requires_executor() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .enable_background_sync(true)
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Background sync enabled"));
        assert!(err_msg.contains("BackgroundExecutor"));
    }

    #[test]
    fn test_validate_network_awareness_requires_monitor() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .enable_network_awareness(true)
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Network awareness enabled"));
        assert!(err_msg.contains("NetworkMonitor"));
    }

    #[test]
    fn test_validate_foreground_sync_requires_observer() {
        let result = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .enable_foreground_sync(true)
            .build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("Foreground sync enabled"));
        assert!(err_msg.contains("LifecycleObserver"));
    }

    #[test]
    fn test_builder_with_feature_flags() {
        let config = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .background_executor(Arc::new(MockExecutor))
            .network_monitor(Arc::new(MockMonitor))
            .lifecycle_observer(Arc::new(MockLifecycle))
            .enable_background_sync(true)
            .enable_network_awareness(true)
            .enable_foreground_sync(true)
            .build()
            .unwrap();

        assert!(config.features.enable_background_sync);
        assert!(config.features.enable_network_awareness);
        assert!(config.features.enable_foreground_sync);
    }

    #[test]
    fn test_builder_accepts_pathbuf() {
        let config = CoreConfig::builder()
            .database_path(PathBuf::from("/data/client.db"))
            .http_client(Arc::new(MockHttpClient))
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/data/client.db"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = CoreConfig::builder()
            .database_path("/data/client.db")
            .http_client(Arc::new(MockHttpClient))
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.database_path, config.database_path);
        assert_eq!(cloned.sync, config.sync);
    }
}
