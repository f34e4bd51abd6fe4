//! # Mutation Recorder
//!
//! Applies local playback-state changes. Each mutation is written to the
//! store first (stamped with the local clock and marked dirty), then a sync
//! pass is requested through the scheduler handle. The write path never
//! touches the network, so toggling a favorite works identically online and
//! offline.

use crate::error::Result;
use crate::scheduler::{SchedulerHandle, SyncTrigger};
use bridge_traits::Clock;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_store::{ItemId, PlaybackMutation, PlaybackStateRepository, UserId, UserPlaybackState};
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct MutationRecorder {
    states: Arc<dyn PlaybackStateRepository>,
    clock: Arc<dyn Clock>,
    scheduler: SchedulerHandle,
    event_bus: EventBus,
}

impl MutationRecorder {
    pub fn new(
        states: Arc<dyn PlaybackStateRepository>,
        clock: Arc<dyn Clock>,
        scheduler: SchedulerHandle,
        event_bus: EventBus,
    ) -> Self {
        Self {
            states,
            clock,
            scheduler,
            event_bus,
        }
    }

    /// Apply a mutation to the local record and queue it for sync.
    ///
    /// The record is created on first touch. Fields left `None` in the
    /// mutation keep their stored values. Returns the record as stored.
    #[instrument(skip(self, mutation), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn apply(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        mutation: PlaybackMutation,
    ) -> Result<UserPlaybackState> {
        let state = self
            .states
            .record_mutation(user_id, item_id, &mutation, self.clock.now())
            .await?;

        if let Some(played) = mutation.played {
            self.event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::PlayedChanged {
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    played,
                }))
                .ok();
        }
        if let Some(favorite) = mutation.favorite {
            self.event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::FavoriteChanged {
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    favorite,
                }))
                .ok();
        }
        if let Some(position_ticks) = mutation.position_ticks {
            self.event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                    user_id: user_id.to_string(),
                    item_id: item_id.to_string(),
                    position_ticks,
                }))
                .ok();
        }

        self.scheduler.request_sync(SyncTrigger::Mutation);
        debug!("Recorded local playback mutation");

        Ok(state)
    }

    /// Mark an item played or unplayed.
    pub async fn set_played(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        played: bool,
    ) -> Result<UserPlaybackState> {
        self.apply(user_id, item_id, PlaybackMutation::played(played))
            .await
    }

    /// Favorite or unfavorite an item.
    pub async fn set_favorite(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        favorite: bool,
    ) -> Result<UserPlaybackState> {
        self.apply(user_id, item_id, PlaybackMutation::favorite(favorite))
            .await
    }

    /// Record a resume position in ticks.
    pub async fn set_position(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        position_ticks: i64,
    ) -> Result<UserPlaybackState> {
        self.apply(
            user_id,
            item_id,
            PlaybackMutation::position_ticks(position_ticks),
        )
        .await
    }

    /// Read the current local record, if any.
    pub async fn get_state(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
    ) -> Result<Option<UserPlaybackState>> {
        Ok(self.states.get(user_id, item_id).await?)
    }
}
