//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;

const CONNECTIVITY_PROBE_ADDR: &str = "8.8.8.8:53";
const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CHANGE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Desktop network monitor.
///
/// Desktop platforms rarely expose a native reachability API, so this
/// implementation probes a well-known endpoint to decide connectivity.
/// Desktop links are reported as Ethernet and never metered.
pub struct DesktopNetworkMonitor {
    cached_info: Arc<Mutex<Option<NetworkInfo>>>,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor.
    pub fn new() -> Self {
        Self {
            cached_info: Arc::new(Mutex::new(None)),
        }
    }

    async fn check_connectivity() -> NetworkStatus {
        match timeout(
            CONNECTIVITY_PROBE_TIMEOUT,
            TcpStream::connect(CONNECTIVITY_PROBE_ADDR),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(err)) => {
                debug!("Connectivity probe failed: {}", err);
                NetworkStatus::Disconnected
            }
            Err(_) => {
                debug!("Connectivity probe timed out");
                NetworkStatus::Disconnected
            }
        }
    }

    async fn current_info() -> NetworkInfo {
        let status = Self::check_connectivity().await;
        let network_type = match status {
            NetworkStatus::Connected => Some(NetworkType::Ethernet),
            _ => None,
        };
        NetworkInfo {
            status,
            network_type,
            is_metered: false,
            is_expensive: false,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let info = Self::current_info().await;
        let mut cached = self.cached_info.lock().await;
        *cached = Some(info.clone());
        Ok(info)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(PollingNetworkChangeStream {
            last: self.cached_info.lock().await.clone(),
        }))
    }
}

/// Polls connectivity and yields only when the observed state changes.
struct PollingNetworkChangeStream {
    last: Option<NetworkInfo>,
}

#[async_trait]
impl NetworkChangeStream for PollingNetworkChangeStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            tokio::time::sleep(CHANGE_POLL_INTERVAL).await;
            let info = DesktopNetworkMonitor::current_info().await;
            if self.last.as_ref() != Some(&info) {
                self.last = Some(info.clone());
                return Some(info);
            }
        }
    }
}
