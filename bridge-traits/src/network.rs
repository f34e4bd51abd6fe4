//! Connectivity reporting.
//!
//! The sync scheduler consults this before running a pass so that queued
//! work waits out offline periods instead of burning failed requests.

use crate::error::Result;

/// Physical link category, as far as the host can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    /// VPNs, bridges, and anything the platform cannot classify.
    Other,
}

/// Connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
    /// The host cannot currently tell (e.g. captive portal, waking from sleep).
    Indeterminate,
}

/// Snapshot of the current network situation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    /// `None` when disconnected or unclassifiable.
    pub network_type: Option<NetworkType>,
    /// Data-capped connection; hosts may want to defer bulk work.
    pub is_metered: bool,
    /// Flagged expensive by the OS (personal hotspot, roaming).
    pub is_expensive: bool,
}

impl NetworkInfo {
    /// Usable for server traffic right now.
    pub fn is_online(&self) -> bool {
        self.status == NetworkStatus::Connected
    }

    /// Online over WiFi specifically. Used by the wifi-only sync constraint.
    pub fn is_on_wifi(&self) -> bool {
        self.is_online() && self.network_type == Some(NetworkType::WiFi)
    }
}

/// Host-provided connectivity monitor.
///
/// Sync passes are gated on this: a pass is deferred while offline and,
/// when the wifi-only option is set, while on a non-WiFi link. The change
/// stream lets the engine wake queued work as soon as connectivity
/// returns rather than waiting for the next periodic tick.
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity snapshot.
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// Connected to any network. Errors count as offline.
    async fn is_connected(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_online())
            .unwrap_or(false)
    }

    /// Connected over WiFi. Errors count as not-on-WiFi.
    async fn is_wifi(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_on_wifi())
            .unwrap_or(false)
    }

    /// On a metered connection. Errors count as unmetered.
    async fn is_metered(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_metered)
            .unwrap_or(false)
    }

    /// Subscribe to connectivity changes.
    ///
    /// Implementations emit a snapshot whenever the observed state
    /// differs from the last one they reported.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of connectivity snapshots.
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Next change, or `None` once the stream is closed.
    async fn next(&mut self) -> Option<NetworkInfo>;
}
