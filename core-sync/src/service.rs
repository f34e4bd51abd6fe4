//! # Sync Service
//!
//! Wires the recorder, scheduler, and reconciler together over the platform
//! bridges. The embedding application constructs one [`SyncService`] per
//! store, registers a [`PlaybackStateApi`] per server, and calls
//! [`SyncService::start`] once the background executor is ready.
//!
//! The service owns the registration of the sync pass handler on the
//! executor: the scheduler only enqueues the logical task name, and the
//! executor invokes the handler registered here when constraints allow.

use crate::recorder::MutationRecorder;
use crate::reconciler::{SyncReconciler, SyncSummary};
use crate::scheduler::{SchedulerConfig, SyncScheduler, SyncTrigger, SYNC_TASK_NAME};
use crate::Result;
use bridge_traits::{
    BackgroundExecutor, BridgeError, Clock, LifecycleObserver, LifecycleState, PlaybackStateApi,
    TaskHandler,
};
use core_runtime::events::{AccountEvent, CoreEvent, EventBus};
use core_store::{PlaybackStateRepository, ServerId, UserId, UserRepository};
use futures_util::FutureExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

pub struct SyncService {
    recorder: Arc<MutationRecorder>,
    reconciler: Arc<SyncReconciler>,
    scheduler: SyncScheduler,
    users: Arc<dyn UserRepository>,
    executor: Arc<dyn BackgroundExecutor>,
    event_bus: EventBus,
    lifecycle_worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl SyncService {
    pub fn new(
        states: Arc<dyn PlaybackStateRepository>,
        users: Arc<dyn UserRepository>,
        executor: Arc<dyn BackgroundExecutor>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
        event_bus: EventBus,
    ) -> Self {
        let scheduler = SyncScheduler::new(Arc::clone(&executor), config, event_bus.clone());
        let reconciler = Arc::new(SyncReconciler::new(
            Arc::clone(&states),
            Arc::clone(&users),
            event_bus.clone(),
        ));
        let recorder = Arc::new(MutationRecorder::new(
            states,
            clock,
            scheduler.handle(),
            event_bus.clone(),
        ));

        Self {
            recorder,
            reconciler,
            scheduler,
            users,
            executor,
            event_bus,
            lifecycle_worker: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Register the sync pass on the executor and start the scheduler.
    pub async fn start(&self) -> Result<()> {
        let reconciler = Arc::clone(&self.reconciler);
        let handler: TaskHandler = Arc::new(move || {
            let reconciler = Arc::clone(&reconciler);
            async move {
                reconciler
                    .sync_all()
                    .await
                    .map_err(|err| BridgeError::OperationFailed(err.to_string()))?;
                Ok(())
            }
            .boxed()
        });

        self.executor
            .register_task_handler(SYNC_TASK_NAME, handler)
            .await?;
        self.scheduler.start().await;
        info!("Sync service started");
        Ok(())
    }

    /// The write path for local playback mutations.
    pub fn recorder(&self) -> Arc<MutationRecorder> {
        Arc::clone(&self.recorder)
    }

    /// Direct access to the reconciler, e.g. for item refreshes.
    pub fn reconciler(&self) -> Arc<SyncReconciler> {
        Arc::clone(&self.reconciler)
    }

    /// Subscribe point for sync and playback events.
    pub fn events(&self) -> EventBus {
        self.event_bus.clone()
    }

    pub async fn register_server_api(&self, server_id: ServerId, api: Arc<dyn PlaybackStateApi>) {
        self.reconciler.register_server_api(server_id, api).await;
    }

    pub async fn unregister_server_api(&self, server_id: &ServerId) {
        self.reconciler.unregister_server_api(server_id).await;
    }

    /// Ask for a background sync pass. Fire-and-forget.
    pub fn request_sync(&self) {
        self.scheduler.handle().request_sync(SyncTrigger::Manual);
    }

    /// Run a sync pass inline, bypassing the executor. Used by tests and by
    /// callers that need the summary.
    pub async fn sync_now(&self) -> Result<SyncSummary> {
        self.reconciler.sync_all().await
    }

    /// Sign a user out: cancel pending sync work, then drop the token.
    ///
    /// Dirty records are kept. They resume syncing when the user signs back
    /// in with fresh credentials.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn sign_out(&self, user_id: &UserId) -> Result<()> {
        self.scheduler.cancel_pending("sign-out").await?;
        self.users.clear_access_token(user_id).await?;
        self.event_bus
            .emit(CoreEvent::Account(AccountEvent::SignedOut {
                user_id: user_id.to_string(),
            }))
            .ok();
        info!("User signed out");
        Ok(())
    }

    /// Remove a user and everything hanging off them, playback records
    /// included. Returns false when the user did not exist.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove_user(&self, user_id: &UserId) -> Result<bool> {
        self.scheduler.cancel_pending("user-removed").await?;
        let removed = self.users.delete(user_id).await?;
        if removed {
            self.event_bus
                .emit(CoreEvent::Account(AccountEvent::UserRemoved {
                    user_id: user_id.to_string(),
                }))
                .ok();
            info!("User removed");
        }
        Ok(removed)
    }

    /// Watch lifecycle transitions and request a sync pass on foregrounding.
    pub async fn attach_lifecycle(&self, observer: Arc<dyn LifecycleObserver>) -> Result<()> {
        let mut stream = observer.subscribe_changes().await?;
        let handle = self.scheduler.handle();
        let shutdown = self.shutdown.clone();

        let worker = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    state = stream.next() => match state {
                        Some(LifecycleState::Foreground) => {
                            debug!("App foregrounded; requesting sync");
                            handle.request_sync(SyncTrigger::Foreground);
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
            debug!("Lifecycle worker stopped");
        });

        *self.lifecycle_worker.lock().await = Some(worker);
        Ok(())
    }

    /// Stop workers. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(worker) = self.lifecycle_worker.lock().await.take() {
            let _ = worker.await;
        }
        self.scheduler.shutdown().await;
        debug!("Sync service stopped");
    }
}
