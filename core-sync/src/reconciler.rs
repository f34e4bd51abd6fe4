//! # Sync Reconciler
//!
//! ## Overview
//!
//! Runs the sync pass: for every signed-in user, pushes each dirty record to
//! that user's media server and settles whatever comes back.
//!
//! A push carries the local fields plus the `base_version` the record was
//! last synced at. The server acknowledges when the base still matches its
//! current version; otherwise it answers with its own state and the
//! reconciler resolves the conflict by wall-clock, ties going to the local
//! record. Each record gets exactly one attempt per pass. A network-level
//! failure aborts the rest of the user's batch, since every remaining push
//! would hit the same dead server; records reconciled before the failure
//! keep their new state.
//!
//! ## Usage
//!
//! ```ignore
//! let reconciler = SyncReconciler::new(states, users, event_bus);
//! reconciler.register_server_api(server_id, api).await;
//! let summary = reconciler.sync_all().await?;
//! ```

use crate::conflict::{self, ConflictWinner};
use crate::error::{Result, SyncError};
use bridge_traits::{ApiSession, PlaybackStateApi, PushOutcome, StatePush};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SyncEvent};
use core_store::{
    ItemId, PlaybackStateRepository, ServerId, StoreError, UserId, UserPlaybackState,
    UserRepository,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Per-pass counters, reported through [`SyncEvent::Completed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Records the server accepted as pushed.
    pub pushed: u64,
    /// Records overwritten by a newer server state.
    pub merged: u64,
    /// Conflicts where the local record won and stayed queued.
    pub retained: u64,
    /// Records mutated mid-flight, left dirty for the next pass.
    pub requeued: u64,
    /// Records that failed with a non-transient error.
    pub failed: u64,
}

impl SyncSummary {
    pub fn absorb(&mut self, other: SyncSummary) {
        self.pushed += other.pushed;
        self.merged += other.merged;
        self.retained += other.retained;
        self.requeued += other.requeued;
        self.failed += other.failed;
    }

    pub fn records_processed(&self) -> u64 {
        self.pushed + self.merged + self.retained + self.requeued + self.failed
    }
}

/// How a single dirty record settled within a pass.
enum RecordOutcome {
    Pushed,
    MergedRemote,
    RetainedLocal,
    Requeued,
}

/// Pushes dirty playback records to their servers and resolves conflicts.
pub struct SyncReconciler {
    states: Arc<dyn PlaybackStateRepository>,
    users: Arc<dyn UserRepository>,
    apis: RwLock<HashMap<ServerId, Arc<dyn PlaybackStateApi>>>,
    event_bus: EventBus,
}

impl SyncReconciler {
    pub fn new(
        states: Arc<dyn PlaybackStateRepository>,
        users: Arc<dyn UserRepository>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            states,
            users,
            apis: RwLock::new(HashMap::new()),
            event_bus,
        }
    }

    /// Register the playback-state API for a server.
    ///
    /// Users of a server with no registered API are skipped with an error
    /// event rather than failing the whole pass.
    pub async fn register_server_api(&self, server_id: ServerId, api: Arc<dyn PlaybackStateApi>) {
        info!(server_id = %server_id, "Registered playback state API");
        self.apis.write().await.insert(server_id, api);
    }

    /// Remove a server's API, typically when the server itself is removed.
    pub async fn unregister_server_api(&self, server_id: &ServerId) {
        if self.apis.write().await.remove(server_id).is_some() {
            debug!(server_id = %server_id, "Unregistered playback state API");
        }
    }

    async fn api_for(&self, server_id: &ServerId) -> Option<Arc<dyn PlaybackStateApi>> {
        self.apis.read().await.get(server_id).cloned()
    }

    /// Run a sync pass for every signed-in user.
    ///
    /// One user's failure never blocks another's: errors are reported via
    /// [`SyncEvent::Failed`] and the pass moves on. Returns the combined
    /// summary of the users that did complete.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let users = self.users.find_all().await?;
        let mut total = SyncSummary::default();

        for user in users {
            if !user.is_signed_in() {
                continue;
            }
            match self.sync_user(&user.id).await {
                Ok(summary) => total.absorb(summary),
                Err(err) => {
                    let recoverable = err.is_transient();
                    warn!(user_id = %user.id, error = %err, recoverable, "Sync pass failed for user");
                    self.event_bus
                        .emit(CoreEvent::Sync(SyncEvent::Failed {
                            user_id: user.id.to_string(),
                            message: err.to_string(),
                            recoverable,
                        }))
                        .ok();
                }
            }
        }

        Ok(total)
    }

    /// Run a sync pass for one user's dirty records.
    ///
    /// Signed-out users are skipped quietly; their dirty records stay queued
    /// for whenever credentials return. Returns [`SyncError::RemoteUnreachable`]
    /// when the server drops off mid-batch, leaving the unattempted remainder
    /// dirty.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn sync_user(&self, user_id: &UserId) -> Result<SyncSummary> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(SyncError::UserNotFound(*user_id))?;

        let Some(token) = user.access_token.as_deref() else {
            debug!("User is signed out; leaving dirty records queued");
            return Ok(SyncSummary::default());
        };

        let api = self
            .api_for(&user.server_id)
            .await
            .ok_or(SyncError::ServerNotRegistered(user.server_id))?;
        let session = ApiSession::new(user.id.to_string(), token);

        let dirty = self.states.list_dirty(user_id).await?;
        if dirty.is_empty() {
            debug!("No dirty records to sync");
            return Ok(SyncSummary::default());
        }

        info!(records = dirty.len(), "Starting sync pass");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                user_id: user_id.to_string(),
            }))
            .ok();

        let started = Instant::now();
        let mut summary = SyncSummary::default();

        for snapshot in &dirty {
            match self.push_record(api.as_ref(), &session, snapshot).await {
                Ok(RecordOutcome::Pushed) => summary.pushed += 1,
                Ok(RecordOutcome::MergedRemote) => summary.merged += 1,
                Ok(RecordOutcome::RetainedLocal) => summary.retained += 1,
                Ok(RecordOutcome::Requeued) => summary.requeued += 1,
                Err(SyncError::Bridge(err)) if err.is_network() => {
                    warn!(item_id = %snapshot.item_id, error = %err, "Server unreachable; aborting pass");
                    return Err(SyncError::RemoteUnreachable(err.to_string()));
                }
                Err(err) => {
                    warn!(item_id = %snapshot.item_id, error = %err, "Failed to reconcile record");
                    summary.failed += 1;
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            pushed = summary.pushed,
            merged = summary.merged,
            retained = summary.retained,
            requeued = summary.requeued,
            failed = summary.failed,
            duration_ms,
            "Sync pass finished"
        );
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Completed {
                user_id: user_id.to_string(),
                pushed: summary.pushed,
                merged: summary.merged,
                retained: summary.retained,
                requeued: summary.requeued,
                failed: summary.failed,
                duration_ms,
            }))
            .ok();

        Ok(summary)
    }

    /// Push one dirty snapshot and settle the response.
    ///
    /// All store writes are conditional on the snapshot still matching the
    /// stored row, so a mutation landing while the push is in flight is
    /// never clobbered; the record simply stays dirty for the next pass.
    async fn push_record(
        &self,
        api: &dyn PlaybackStateApi,
        session: &ApiSession,
        snapshot: &UserPlaybackState,
    ) -> Result<RecordOutcome> {
        let push = StatePush {
            played: snapshot.played,
            favorite: snapshot.favorite,
            position_ticks: snapshot.playback_position_ticks,
            last_modified: snapshot.last_modified,
            base_version: snapshot.version,
        };

        match api.push_state(session, snapshot.item_id.as_str(), &push).await? {
            PushOutcome::Acknowledged { version } => {
                if self.states.mark_clean(snapshot, version).await? {
                    debug!(item_id = %snapshot.item_id, version, "Pushed local state");
                    Ok(RecordOutcome::Pushed)
                } else {
                    // Mutated while the push was in flight.
                    debug!(item_id = %snapshot.item_id, "Record changed mid-push; requeued");
                    Ok(RecordOutcome::Requeued)
                }
            }
            PushOutcome::Conflict(remote) => match conflict::resolve(snapshot, &remote) {
                ConflictWinner::Local => {
                    // Keep our fields but adopt the server's version, so the
                    // next pass pushes against a current base. The record
                    // stays dirty until that push is accepted.
                    self.states.adopt_version(snapshot, remote.version).await?;
                    debug!(item_id = %snapshot.item_id, "Conflict resolved for local state");
                    Ok(RecordOutcome::RetainedLocal)
                }
                ConflictWinner::Remote => {
                    let merged = conflict::merged_from_remote(snapshot, &remote);
                    if self.states.apply_merge(snapshot, &merged).await? {
                        self.event_bus
                            .emit(CoreEvent::Playback(PlaybackEvent::StateMerged {
                                user_id: snapshot.user_id.to_string(),
                                item_id: snapshot.item_id.to_string(),
                            }))
                            .ok();
                        debug!(item_id = %snapshot.item_id, "Conflict resolved for remote state");
                        Ok(RecordOutcome::MergedRemote)
                    } else {
                        debug!(item_id = %snapshot.item_id, "Record changed mid-merge; requeued");
                        Ok(RecordOutcome::Requeued)
                    }
                }
            },
        }
    }

    /// Pull the server's state for one item and fold it into the store.
    ///
    /// Used when the UI opens an item detail view and wants fresh progress.
    /// A dirty local record is reconciled with the fetched state under the
    /// same rules as a push conflict; a clean one is overwritten.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn refresh_item(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
    ) -> Result<UserPlaybackState> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(SyncError::UserNotFound(*user_id))?;
        let Some(token) = user.access_token.as_deref() else {
            return Err(SyncError::NotSignedIn(*user_id));
        };
        let api = self
            .api_for(&user.server_id)
            .await
            .ok_or(SyncError::ServerNotRegistered(user.server_id))?;
        let session = ApiSession::new(user.id.to_string(), token);

        let remote = api.fetch_state(&session, item_id.as_str()).await?;

        match self.states.get(user_id, item_id).await? {
            Some(local) if local.dirty => match conflict::resolve(&local, &remote) {
                ConflictWinner::Local => {
                    debug!("Local changes newer than server snapshot; keeping them");
                    self.states.adopt_version(&local, remote.version).await?;
                }
                ConflictWinner::Remote => {
                    let merged = conflict::merged_from_remote(&local, &remote);
                    if self.states.apply_merge(&local, &merged).await? {
                        self.event_bus
                            .emit(CoreEvent::Playback(PlaybackEvent::StateMerged {
                                user_id: user_id.to_string(),
                                item_id: item_id.to_string(),
                            }))
                            .ok();
                    }
                }
            },
            Some(local) => {
                let refreshed = conflict::merged_from_remote(&local, &remote);
                if self.states.apply_merge(&local, &refreshed).await? {
                    self.event_bus
                        .emit(CoreEvent::Playback(PlaybackEvent::StateRefreshed {
                            user_id: user_id.to_string(),
                            item_id: item_id.to_string(),
                        }))
                        .ok();
                }
            }
            None => {
                let state = UserPlaybackState {
                    user_id: *user_id,
                    item_id: item_id.clone(),
                    played: remote.played,
                    favorite: remote.favorite,
                    playback_position_ticks: remote.position_ticks,
                    last_modified: remote.last_modified.unwrap_or_else(chrono::Utc::now),
                    version: remote.version,
                    dirty: false,
                };
                self.states.upsert(&state).await?;
                self.event_bus
                    .emit(CoreEvent::Playback(PlaybackEvent::StateRefreshed {
                        user_id: user_id.to_string(),
                        item_id: item_id.to_string(),
                    }))
                    .ok();
            }
        }

        self.states.get(user_id, item_id).await?.ok_or_else(|| {
            SyncError::Store(StoreError::NotFound {
                entity_type: "UserPlaybackState".to_string(),
                id: format!("{}/{}", user_id, item_id),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{BridgeError, RemotePlaybackState};
    use chrono::{Duration as ChronoDuration, Utc};
    use core_store::db::{create_test_pool, insert_test_user};
    use core_store::{PlaybackMutation, SqlitePlaybackStateRepository, SqliteUserRepository};
    use sqlx::{Pool, Sqlite};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct ScriptedApi {
        outcomes: StdMutex<VecDeque<BridgeResult<PushOutcome>>>,
        pushes: StdMutex<Vec<(String, StatePush)>>,
        fetch: StdMutex<Option<RemotePlaybackState>>,
    }

    impl ScriptedApi {
        fn new() -> Self {
            Self {
                outcomes: StdMutex::new(VecDeque::new()),
                pushes: StdMutex::new(Vec::new()),
                fetch: StdMutex::new(None),
            }
        }

        fn script(&self, outcome: BridgeResult<PushOutcome>) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        fn script_fetch(&self, remote: RemotePlaybackState) {
            *self.fetch.lock().unwrap() = Some(remote);
        }

        fn pushes(&self) -> Vec<(String, StatePush)> {
            self.pushes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaybackStateApi for ScriptedApi {
        async fn push_state(
            &self,
            _session: &ApiSession,
            item_id: &str,
            push: &StatePush,
        ) -> BridgeResult<PushOutcome> {
            self.pushes
                .lock()
                .unwrap()
                .push((item_id.to_string(), push.clone()));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PushOutcome::Acknowledged { version: 1 }))
        }

        async fn fetch_state(
            &self,
            _session: &ApiSession,
            _item_id: &str,
        ) -> BridgeResult<RemotePlaybackState> {
            match self.fetch.lock().unwrap().clone() {
                Some(remote) => Ok(remote),
                None => Err(BridgeError::OperationFailed("no fetch scripted".to_string())),
            }
        }
    }

    struct Fixture {
        reconciler: SyncReconciler,
        states: Arc<SqlitePlaybackStateRepository>,
        users: Arc<SqliteUserRepository>,
        pool: Pool<Sqlite>,
        user_id: UserId,
        api: Arc<ScriptedApi>,
        event_bus: EventBus,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        let (server_id, user_id) = insert_test_user(&pool).await;
        let states = Arc::new(SqlitePlaybackStateRepository::new(pool.clone()));
        let users = Arc::new(SqliteUserRepository::new(pool.clone()));
        let event_bus = EventBus::new(64);
        let reconciler = SyncReconciler::new(
            states.clone() as Arc<dyn PlaybackStateRepository>,
            users.clone() as Arc<dyn UserRepository>,
            event_bus.clone(),
        );
        let api = Arc::new(ScriptedApi::new());
        reconciler
            .register_server_api(server_id, api.clone() as Arc<dyn PlaybackStateApi>)
            .await;
        Fixture {
            reconciler,
            states,
            users,
            pool,
            user_id,
            api,
            event_bus,
        }
    }

    async fn mutate(
        fx: &Fixture,
        item: &str,
        mutation: PlaybackMutation,
    ) -> UserPlaybackState {
        fx.states
            .record_mutation(&fx.user_id, &ItemId::new(item), &mutation, Utc::now())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_acknowledged_push_cleans_record() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        fx.api.script(Ok(PushOutcome::Acknowledged { version: 7 }));

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.pushed, 1);
        assert_eq!(summary.records_processed(), 1);
        let state = fx
            .states
            .get(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!state.dirty);
        assert_eq!(state.version, 7);
        assert!(state.played);
    }

    #[tokio::test]
    async fn test_push_carries_base_version_and_fields() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::position_ticks(36_000_000_000)).await;

        fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        let pushes = fx.api.pushes();
        assert_eq!(pushes.len(), 1);
        let (item, push) = &pushes[0];
        assert_eq!(item, "movie-1");
        assert_eq!(push.position_ticks, 36_000_000_000);
        assert_eq!(push.base_version, 0);
    }

    #[tokio::test]
    async fn test_conflict_with_newer_remote_merges() {
        let fx = setup().await;
        let local = mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        let remote = RemotePlaybackState {
            played: false,
            favorite: true,
            position_ticks: 9_000,
            last_modified: Some(local.last_modified + ChronoDuration::seconds(60)),
            version: 4,
        };
        fx.api.script(Ok(PushOutcome::Conflict(remote)));

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.merged, 1);
        let state = fx
            .states
            .get(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(!state.dirty);
        assert!(!state.played);
        assert!(state.favorite);
        assert_eq!(state.playback_position_ticks, 9_000);
        assert_eq!(state.version, 4);
    }

    #[tokio::test]
    async fn test_conflict_with_older_remote_retains_local() {
        let fx = setup().await;
        let local = mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        let remote = RemotePlaybackState {
            played: false,
            favorite: false,
            position_ticks: 0,
            last_modified: Some(local.last_modified - ChronoDuration::seconds(60)),
            version: 4,
        };
        fx.api.script(Ok(PushOutcome::Conflict(remote)));

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.retained, 1);
        let state = fx
            .states
            .get(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap()
            .unwrap();
        // Still ours, still queued, but based on the server's version so the
        // next push lands.
        assert!(state.dirty);
        assert!(state.played);
        assert_eq!(state.version, 4);
    }

    #[tokio::test]
    async fn test_conflict_timestamp_tie_goes_to_local() {
        let fx = setup().await;
        let local = mutate(&fx, "movie-1", PlaybackMutation::favorite(true)).await;
        let remote = RemotePlaybackState {
            played: false,
            favorite: false,
            position_ticks: 0,
            last_modified: Some(local.last_modified),
            version: 2,
        };
        fx.api.script(Ok(PushOutcome::Conflict(remote)));

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.retained, 1);
        let state = fx
            .states
            .get(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(state.favorite);
        assert!(state.dirty);
    }

    #[tokio::test]
    async fn test_network_error_aborts_remaining_batch() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        mutate(&fx, "movie-2", PlaybackMutation::played(true)).await;
        mutate(&fx, "movie-3", PlaybackMutation::played(true)).await;
        fx.api
            .script(Err(BridgeError::Network("connection refused".to_string())));

        let result = fx.reconciler.sync_user(&fx.user_id).await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        // Only the first record was attempted.
        assert_eq!(fx.api.pushes().len(), 1);
        assert_eq!(fx.states.count_dirty(&fx.user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_record_failure_does_not_stop_batch() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        mutate(&fx, "movie-2", PlaybackMutation::played(true)).await;
        fx.api.script(Err(BridgeError::OperationFailed(
            "item not on server".to_string(),
        )));
        fx.api.script(Ok(PushOutcome::Acknowledged { version: 1 }));

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pushed, 1);
        assert_eq!(fx.api.pushes().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_snapshot_is_requeued_not_clobbered() {
        let fx = setup().await;
        let snapshot = mutate(&fx, "movie-1", PlaybackMutation::position_ticks(1_000)).await;
        // A second mutation lands after the pass captured its snapshot.
        mutate(&fx, "movie-1", PlaybackMutation::position_ticks(2_000)).await;

        let user = fx.users.find_by_id(&fx.user_id).await.unwrap().unwrap();
        let session = ApiSession::new(user.id.to_string(), user.access_token.unwrap());
        let outcome = fx
            .reconciler
            .push_record(fx.api.as_ref(), &session, &snapshot)
            .await
            .unwrap();

        assert!(matches!(outcome, RecordOutcome::Requeued));
        let state = fx
            .states
            .get(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(state.dirty);
        assert_eq!(state.playback_position_ticks, 2_000);
    }

    #[tokio::test]
    async fn test_signed_out_user_is_skipped() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        fx.users.clear_access_token(&fx.user_id).await.unwrap();

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary.records_processed(), 0);
        assert!(fx.api.pushes().is_empty());
        assert_eq!(fx.states.count_dirty(&fx.user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_server_is_an_error() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        let user = fx.users.find_by_id(&fx.user_id).await.unwrap().unwrap();
        fx.reconciler.unregister_server_api(&user.server_id).await;

        let result = fx.reconciler.sync_user(&fx.user_id).await;

        assert!(matches!(result, Err(SyncError::ServerNotRegistered(_))));
    }

    #[tokio::test]
    async fn test_sync_all_isolates_user_failures() {
        let fx = setup().await;
        let (other_server, other_user) = insert_test_user(&fx.pool).await;
        let broken_api = Arc::new(ScriptedApi::new());
        broken_api.script(Err(BridgeError::Network("host down".to_string())));
        fx.reconciler
            .register_server_api(other_server, broken_api.clone() as Arc<dyn PlaybackStateApi>)
            .await;

        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        fx.states
            .record_mutation(
                &other_user,
                &ItemId::new("movie-9"),
                &PlaybackMutation::played(true),
                Utc::now(),
            )
            .await
            .unwrap();

        let mut events = fx.event_bus.subscribe();
        let total = fx.reconciler.sync_all().await.unwrap();

        assert_eq!(total.pushed, 1);
        assert_eq!(fx.states.count_dirty(&other_user).await.unwrap(), 1);
        let mut saw_failed = false;
        while let Ok(event) = events.try_recv() {
            if let CoreEvent::Sync(SyncEvent::Failed {
                user_id,
                recoverable,
                ..
            }) = event
            {
                assert_eq!(user_id, other_user.to_string());
                assert!(recoverable);
                saw_failed = true;
            }
        }
        assert!(saw_failed);
    }

    #[tokio::test]
    async fn test_sync_user_emits_started_and_completed() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::played(true)).await;
        let mut events = fx.event_bus.subscribe();

        fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        match events.try_recv() {
            Ok(CoreEvent::Sync(SyncEvent::Started { user_id })) => {
                assert_eq!(user_id, fx.user_id.to_string());
            }
            other => panic!("Expected Started event, got {:?}", other),
        }
        match events.try_recv() {
            Ok(CoreEvent::Sync(SyncEvent::Completed { pushed, failed, .. })) => {
                assert_eq!(pushed, 1);
                assert_eq!(failed, 0);
            }
            other => panic!("Expected Completed event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sync_user_with_nothing_dirty_is_quiet() {
        let fx = setup().await;
        let mut events = fx.event_bus.subscribe();

        let summary = fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        assert_eq!(summary, SyncSummary::default());
        assert!(events.try_recv().is_err());
        assert!(fx.api.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_creates_local_record_from_remote() {
        let fx = setup().await;
        fx.api.script_fetch(RemotePlaybackState {
            played: true,
            favorite: false,
            position_ticks: 7_200,
            last_modified: Some(Utc::now()),
            version: 4,
        });

        let state = fx
            .reconciler
            .refresh_item(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap();

        assert!(state.played);
        assert_eq!(state.playback_position_ticks, 7_200);
        assert_eq!(state.version, 4);
        assert!(!state.dirty);
    }

    #[tokio::test]
    async fn test_refresh_overwrites_clean_record() {
        let fx = setup().await;
        mutate(&fx, "movie-1", PlaybackMutation::position_ticks(1_000)).await;
        fx.api.script(Ok(PushOutcome::Acknowledged { version: 1 }));
        fx.reconciler.sync_user(&fx.user_id).await.unwrap();

        fx.api.script_fetch(RemotePlaybackState {
            played: true,
            favorite: true,
            position_ticks: 99_000,
            last_modified: Some(Utc::now() + ChronoDuration::seconds(30)),
            version: 8,
        });
        let state = fx
            .reconciler
            .refresh_item(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap();

        assert_eq!(state.playback_position_ticks, 99_000);
        assert_eq!(state.version, 8);
        assert!(!state.dirty);
    }

    #[tokio::test]
    async fn test_refresh_keeps_newer_dirty_local() {
        let fx = setup().await;
        let local = mutate(&fx, "movie-1", PlaybackMutation::favorite(true)).await;
        fx.api.script_fetch(RemotePlaybackState {
            played: false,
            favorite: false,
            position_ticks: 0,
            last_modified: Some(local.last_modified - ChronoDuration::seconds(120)),
            version: 6,
        });

        let state = fx
            .reconciler
            .refresh_item(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap();

        assert!(state.favorite);
        assert!(state.dirty);
        assert_eq!(state.version, 6);
    }

    #[tokio::test]
    async fn test_refresh_merges_newer_remote_over_dirty_local() {
        let fx = setup().await;
        let local = mutate(&fx, "movie-1", PlaybackMutation::favorite(true)).await;
        fx.api.script_fetch(RemotePlaybackState {
            played: true,
            favorite: false,
            position_ticks: 42,
            last_modified: Some(local.last_modified + ChronoDuration::seconds(120)),
            version: 6,
        });

        let state = fx
            .reconciler
            .refresh_item(&fx.user_id, &ItemId::new("movie-1"))
            .await
            .unwrap();

        assert!(!state.favorite);
        assert!(state.played);
        assert_eq!(state.playback_position_ticks, 42);
        assert!(!state.dirty);
    }

    #[tokio::test]
    async fn test_refresh_for_signed_out_user_fails() {
        let fx = setup().await;
        fx.users.clear_access_token(&fx.user_id).await.unwrap();

        let result = fx
            .reconciler
            .refresh_item(&fx.user_id, &ItemId::new("movie-1"))
            .await;

        assert!(matches!(result, Err(SyncError::NotSignedIn(_))));
    }
}
