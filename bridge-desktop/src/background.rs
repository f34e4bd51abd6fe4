//! Background Task Execution Implementation

use async_trait::async_trait;
use bridge_traits::{
    background::{
        BackgroundExecutor, LifecycleChangeStream, LifecycleObserver, LifecycleState,
        ReplacePolicy, TaskConstraints, TaskHandler, TaskStatus,
    },
    error::{BridgeError, Result},
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
    time::{Clock, SystemClock},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

const DEFAULT_CONSTRAINT_POLL: Duration = Duration::from_secs(5);

/// Tokio-based background executor for desktop.
///
/// Units of work are keyed by logical name; at most one unit per name exists
/// at a time. A unit whose constraints are unmet polls until they hold, then
/// runs its registered handler exactly once.
pub struct TokioBackgroundExecutor {
    units: Arc<RwLock<HashMap<String, UnitInfo>>>,
    handlers: Arc<RwLock<HashMap<String, TaskHandler>>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Arc<dyn Clock>,
    constraint_poll: Duration,
}

struct UnitInfo {
    status: TaskStatus,
    handle: Option<JoinHandle<()>>,
    cancel: Option<oneshot::Sender<()>>,
    last_run: Option<i64>,
}

impl TokioBackgroundExecutor {
    /// Create a new background executor with no network monitoring.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_network_monitor_and_clock(None, clock)
    }

    /// Create a background executor with an optional network monitor.
    pub fn with_network_monitor(monitor: Option<Arc<dyn NetworkMonitor>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_network_monitor_and_clock(monitor, clock)
    }

    /// Create a background executor with an optional network monitor and custom clock.
    pub fn with_network_monitor_and_clock(
        monitor: Option<Arc<dyn NetworkMonitor>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            units: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            network_monitor: monitor,
            clock,
            constraint_poll: DEFAULT_CONSTRAINT_POLL,
        }
    }

    /// Override how often an enqueued unit re-checks unmet constraints.
    pub fn with_constraint_poll(mut self, interval: Duration) -> Self {
        self.constraint_poll = interval;
        self
    }

    async fn handler_for(&self, name: &str) -> Option<TaskHandler> {
        let handlers = self.handlers.read().await;
        handlers.get(name).cloned()
    }

    async fn constraints_satisfied(
        monitor: Option<Arc<dyn NetworkMonitor>>,
        constraints: &TaskConstraints,
    ) -> bool {
        if !(constraints.requires_network || constraints.requires_wifi) {
            return true;
        }

        if let Some(monitor) = monitor {
            match monitor.get_network_info().await {
                Ok(NetworkInfo {
                    status: NetworkStatus::Connected,
                    network_type,
                    ..
                }) => {
                    if constraints.requires_wifi {
                        matches!(network_type, Some(NetworkType::WiFi))
                    } else {
                        true
                    }
                }
                Ok(_) => false,
                Err(err) => {
                    warn!("Network monitor error: {}", err);
                    false
                }
            }
        } else {
            warn!(
                "Network constraints requested but no monitor provided; assuming constraint satisfied"
            );
            true
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_unit(
        units: Arc<RwLock<HashMap<String, UnitInfo>>>,
        name: String,
        handler: TaskHandler,
        constraints: TaskConstraints,
        mut cancel_rx: oneshot::Receiver<()>,
        monitor: Option<Arc<dyn NetworkMonitor>>,
        clock: Arc<dyn Clock>,
        poll: Duration,
    ) {
        // Wait until constraints hold; the executor owns the
        // retry-on-constraint-unmet loop, not the unit's handler.
        loop {
            if Self::constraints_satisfied(monitor.clone(), &constraints).await {
                break;
            }

            debug!(unit = %name, "Constraints not satisfied; waiting");
            let retry_sleep = sleep(poll);
            tokio::pin!(retry_sleep);
            tokio::select! {
                _ = &mut cancel_rx => {
                    let mut units = units.write().await;
                    if let Some(info) = units.get_mut(&name) {
                        info.status = TaskStatus::Cancelled;
                    }
                    return;
                }
                _ = retry_sleep.as_mut() => {}
            }
        }

        {
            let mut units = units.write().await;
            if let Some(info) = units.get_mut(&name) {
                info.status = TaskStatus::Running;
            }
        }

        let result = handler().await;

        let mut units = units.write().await;
        if let Some(info) = units.get_mut(&name) {
            info.last_run = Some(clock.unix_timestamp_millis());
            info.status = match result {
                Ok(()) => TaskStatus::Completed,
                Err(err) => {
                    warn!(unit = %name, error = %err, "Background unit failed");
                    TaskStatus::Failed
                }
            };
        }
    }
}

impl Default for TokioBackgroundExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundExecutor for TokioBackgroundExecutor {
    async fn register_task_handler(&self, name: &str, handler: TaskHandler) -> Result<()> {
        let mut handlers = self.handlers.write().await;
        handlers.insert(name.to_string(), handler);
        Ok(())
    }

    async fn enqueue(
        &self,
        name: &str,
        constraints: TaskConstraints,
        replace: ReplacePolicy,
    ) -> Result<()> {
        let handler = self.handler_for(name).await.ok_or_else(|| {
            BridgeError::NotAvailable(format!("No handler registered for unit: {}", name))
        })?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let last_run;

        {
            let mut units = self.units.write().await;
            if let Some(existing) = units.get_mut(name) {
                let outstanding = matches!(
                    existing.status,
                    TaskStatus::Scheduled | TaskStatus::Running
                );
                if outstanding {
                    match replace {
                        ReplacePolicy::Keep => {
                            debug!(unit = name, "Unit already outstanding; keeping it");
                            return Ok(());
                        }
                        ReplacePolicy::Replace => {
                            debug!(unit = name, "Replacing outstanding unit");
                            if let Some(cancel) = existing.cancel.take() {
                                let _ = cancel.send(());
                            }
                            if let Some(handle) = existing.handle.take() {
                                handle.abort();
                            }
                        }
                    }
                }
                last_run = existing.last_run;
            } else {
                last_run = None;
            }

            units.insert(
                name.to_string(),
                UnitInfo {
                    status: TaskStatus::Scheduled,
                    handle: None,
                    cancel: Some(cancel_tx),
                    last_run,
                },
            );
        }

        debug!(unit = name, "Enqueued background unit");

        let units = Arc::clone(&self.units);
        let monitor = self.network_monitor.clone();
        let clock = Arc::clone(&self.clock);
        let poll = self.constraint_poll;
        let unit_name = name.to_string();

        let handle = tokio::spawn(async move {
            TokioBackgroundExecutor::run_unit(
                units, unit_name, handler, constraints, cancel_rx, monitor, clock, poll,
            )
            .await;
        });

        let mut units = self.units.write().await;
        if let Some(info) = units.get_mut(name) {
            info.handle = Some(handle);
        }

        Ok(())
    }

    async fn cancel(&self, name: &str) -> Result<()> {
        let mut units = self.units.write().await;
        if let Some(mut info) = units.remove(name) {
            debug!(unit = name, "Cancelling background unit");
            if let Some(cancel) = info.cancel.take() {
                let _ = cancel.send(());
            }
            if let Some(handle) = info.handle.take() {
                handle.abort();
            }
        } else {
            debug!(unit = name, "No outstanding unit to cancel");
        }
        Ok(())
    }

    async fn task_status(&self, name: &str) -> Result<Option<TaskStatus>> {
        let units = self.units.read().await;
        Ok(units.get(name).map(|info| info.status))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Desktop lifecycle observer (no-op implementation).
pub struct DesktopLifecycleObserver;

impl DesktopLifecycleObserver {
    /// Create a new lifecycle observer.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopLifecycleObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleObserver for DesktopLifecycleObserver {
    async fn get_state(&self) -> Result<LifecycleState> {
        Ok(LifecycleState::Foreground)
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>> {
        Ok(Box::new(DesktopLifecycleChangeStream))
    }
}

/// Desktop lifecycle change stream (never emits).
struct DesktopLifecycleChangeStream;

#[async_trait]
impl LifecycleChangeStream for DesktopLifecycleChangeStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        std::future::pending::<()>().await;
        None
    }
}
