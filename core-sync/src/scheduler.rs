//! # Sync Scheduler
//!
//! ## Overview
//!
//! Funnels every "something changed, sync soon" signal into a single logical
//! background task. Callers hold a cheap [`SchedulerHandle`] and fire
//! [`SchedulerHandle::request_sync`] as often as they like; a worker drains
//! the request channel and enqueues at most one pass on the platform
//! [`BackgroundExecutor`] per wakeup. The executor owns network constraints
//! and dedup under [`SYNC_TASK_NAME`], so a burst of N rapid mutations
//! collapses into one sync pass instead of N.
//!
//! ## Usage
//!
//! ```ignore
//! let scheduler = SyncScheduler::new(executor, SchedulerConfig::default(), bus);
//! scheduler.start().await;
//!
//! let handle = scheduler.handle();
//! handle.request_sync(SyncTrigger::Mutation);
//! ```

use bridge_traits::{BackgroundExecutor, ReplacePolicy, TaskConstraints};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Logical name for the sync pass on the background executor.
///
/// Every enqueue uses this fixed name with [`ReplacePolicy::Replace`], so the
/// executor holds at most one pending pass at a time.
pub const SYNC_TASK_NAME: &str = "playback-state-sync";

/// What prompted a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// A local playback-state mutation was recorded.
    Mutation,
    /// The app returned to the foreground.
    Foreground,
    /// The periodic safety-net interval elapsed.
    Periodic,
    /// Explicit request from the embedding application.
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mutation => "mutation",
            Self::Foreground => "foreground",
            Self::Periodic => "periodic",
            Self::Manual => "manual",
        };
        write!(f, "{}", label)
    }
}

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Capacity of the bounded request channel between callers and the
    /// scheduler worker. Overflow is dropped, not blocked on: a full queue
    /// already guarantees a pass is coming.
    pub channel_capacity: usize,
    /// Require any network connectivity before a pass runs.
    pub requires_network: bool,
    /// Restrict passes to unmetered (wifi) connections.
    pub requires_wifi: bool,
    /// Optional safety-net interval that requests a pass even when no
    /// mutation or lifecycle signal arrives.
    pub periodic_interval: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            requires_network: true,
            requires_wifi: false,
            periodic_interval: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_wifi_only(mut self, wifi_only: bool) -> Self {
        self.requires_wifi = wifi_only;
        self
    }

    pub fn with_periodic_interval(mut self, interval: Duration) -> Self {
        self.periodic_interval = Some(interval);
        self
    }

    /// Constraints handed to the background executor for every pass.
    pub fn constraints(&self) -> TaskConstraints {
        TaskConstraints {
            requires_network: self.requires_network,
            requires_wifi: self.requires_wifi,
            ..TaskConstraints::default()
        }
    }
}

/// Cheap, cloneable entry point for requesting a sync pass.
///
/// Held by the mutation recorder and the embedding application. Requests are
/// fire-and-forget: they never block and never fail, they only nudge the
/// scheduler worker.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SyncTrigger>,
}

impl SchedulerHandle {
    pub(crate) fn new(tx: mpsc::Sender<SyncTrigger>) -> Self {
        Self { tx }
    }

    /// Request a sync pass. Safe to call from any context, including inside
    /// the sync pass itself.
    pub fn request_sync(&self, trigger: SyncTrigger) {
        match self.tx.try_send(trigger) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(trigger)) => {
                // Queue already full means a pass is guaranteed; this
                // request coalesces with the ones ahead of it.
                debug!(trigger = %trigger, "Sync queue full; request coalesced");
            }
            Err(mpsc::error::TrySendError::Closed(trigger)) => {
                warn!(trigger = %trigger, "Sync scheduler is shut down; request dropped");
            }
        }
    }
}

/// Owns the request channel and the worker that forwards coalesced requests
/// to the background executor.
pub struct SyncScheduler {
    config: SchedulerConfig,
    executor: Arc<dyn BackgroundExecutor>,
    event_bus: EventBus,
    handle: SchedulerHandle,
    receiver: Mutex<Option<mpsc::Receiver<SyncTrigger>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl SyncScheduler {
    pub fn new(
        executor: Arc<dyn BackgroundExecutor>,
        config: SchedulerConfig,
        event_bus: EventBus,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
        Self {
            config,
            executor,
            event_bus,
            handle: SchedulerHandle::new(tx),
            receiver: Mutex::new(Some(rx)),
            worker: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a handle for requesting sync passes.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Spawn the scheduler worker. Calling this more than once is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.receiver.lock().await.take() else {
            debug!("Sync scheduler already started");
            return;
        };

        let worker = tokio::spawn(Self::run(
            rx,
            Arc::clone(&self.executor),
            self.config.clone(),
            self.event_bus.clone(),
            self.shutdown.clone(),
        ));
        *self.worker.lock().await = Some(worker);
        info!(
            capacity = self.config.channel_capacity,
            periodic = ?self.config.periodic_interval,
            "Sync scheduler started"
        );
    }

    /// Cancel any pending or running sync pass on the executor.
    ///
    /// Used on sign-out so a queued pass does not run against revoked
    /// credentials. Requests already sitting in the channel still reach the
    /// worker, but the pass they enqueue finds no signed-in users.
    pub async fn cancel_pending(&self, reason: &str) -> Result<()> {
        self.executor.cancel(SYNC_TASK_NAME).await?;
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Cancelled {
                reason: reason.to_string(),
            }))
            .ok();
        info!(reason, "Cancelled pending sync work");
        Ok(())
    }

    /// Stop the worker. In-flight executor work is left to the executor's
    /// own cancellation semantics.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(worker) = self.worker.lock().await.take() {
            let _ = worker.await;
        }
    }

    async fn run(
        mut rx: mpsc::Receiver<SyncTrigger>,
        executor: Arc<dyn BackgroundExecutor>,
        config: SchedulerConfig,
        event_bus: EventBus,
        shutdown: CancellationToken,
    ) {
        let mut periodic = config.periodic_interval.map(|every| {
            let mut interval = time::interval_at(time::Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            let trigger = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = rx.recv() => match received {
                    Some(trigger) => trigger,
                    None => break,
                },
                _ = Self::next_tick(&mut periodic) => SyncTrigger::Periodic,
            };

            // Everything queued behind this request rides the same pass.
            let mut coalesced = 0usize;
            while rx.try_recv().is_ok() {
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!(trigger = %trigger, coalesced, "Coalesced queued sync requests");
            }

            event_bus
                .emit(CoreEvent::Sync(SyncEvent::Requested {
                    trigger: trigger.to_string(),
                }))
                .ok();

            if let Err(err) = executor
                .enqueue(SYNC_TASK_NAME, config.constraints(), ReplacePolicy::Replace)
                .await
            {
                warn!(trigger = %trigger, error = %err, "Failed to enqueue sync pass");
            }
        }

        debug!("Sync scheduler worker stopped");
    }

    async fn next_tick(periodic: &mut Option<Interval>) {
        match periodic {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
