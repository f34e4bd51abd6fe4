//! Playback state repository trait and implementation
//!
//! The playback state table is the synchronization ledger: every local
//! mutation lands here with `dirty = 1`, and the reconciler clears the flag
//! once the remote server has acknowledged the change. All sync-side writes
//! take the snapshot that was pushed and only apply when the stored record
//! still matches it, so a mutation racing a sync pass is never wiped out.

use crate::error::{Result, StoreError};
use crate::models::{ItemId, PlaybackMutation, UserId, UserPlaybackState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::debug;

/// Playback state repository interface for data access operations
#[async_trait]
pub trait PlaybackStateRepository: Send + Sync {
    /// Find the record for a user/item pair
    ///
    /// # Returns
    /// - `Ok(Some(state))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn get(&self, user_id: &UserId, item_id: &ItemId) -> Result<Option<UserPlaybackState>>;

    /// Write a full record, inserting or replacing as needed
    ///
    /// Every field of `state` is stored as given, including `version` and
    /// `dirty`. Used when adopting remote state wholesale (initial pull,
    /// explicit refresh); local mutations go through [`record_mutation`]
    /// instead so concurrent field updates cannot lose each other.
    ///
    /// [`record_mutation`]: PlaybackStateRepository::record_mutation
    async fn upsert(&self, state: &UserPlaybackState) -> Result<()>;

    /// Apply a local mutation, marking the record dirty
    ///
    /// Inserts the record with default field values if it does not exist yet.
    /// Fields absent from the mutation keep their stored value. The write is
    /// a single statement, so it is atomic with respect to concurrent
    /// mutations and to a sync pass reading or cleaning the record.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidInput`] if the mutation is empty or
    /// carries a negative position.
    async fn record_mutation(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        mutation: &PlaybackMutation,
        at: DateTime<Utc>,
    ) -> Result<UserPlaybackState>;

    /// List all dirty records for a user, oldest mutation first
    async fn list_dirty(&self, user_id: &UserId) -> Result<Vec<UserPlaybackState>>;

    /// Clear the dirty flag after a successful push
    ///
    /// `snapshot` is the record as it was read before the push. The flag is
    /// cleared and `new_version` stored only if the record still matches the
    /// snapshot; a mutation applied in the meantime leaves the record dirty
    /// for the next pass.
    ///
    /// # Returns
    /// - `Ok(true)` if the record was cleaned
    /// - `Ok(false)` if the record changed since the snapshot (or is gone)
    async fn mark_clean(&self, snapshot: &UserPlaybackState, new_version: i64) -> Result<bool>;

    /// Overwrite a record with a merge outcome and clear the dirty flag
    ///
    /// Like [`mark_clean`], the write only applies while the record still
    /// matches `snapshot`; otherwise the newer local mutation survives and
    /// the record stays dirty.
    ///
    /// [`mark_clean`]: PlaybackStateRepository::mark_clean
    ///
    /// # Returns
    /// - `Ok(true)` if the merge was applied
    /// - `Ok(false)` if the record changed since the snapshot (or is gone)
    async fn apply_merge(
        &self,
        snapshot: &UserPlaybackState,
        merged: &UserPlaybackState,
    ) -> Result<bool>;

    /// Store a server-issued version without touching fields or dirty flag
    ///
    /// Used when the local record won a conflict: the record must stay dirty
    /// so the next pass pushes it, but the push needs the server's current
    /// version as its base. Guarded on `snapshot` like the other sync writes.
    ///
    /// # Returns
    /// - `Ok(true)` if the version was stored
    /// - `Ok(false)` if the record changed since the snapshot (or is gone)
    async fn adopt_version(&self, snapshot: &UserPlaybackState, new_version: i64) -> Result<bool>;

    /// Delete the record for a user/item pair
    ///
    /// # Returns
    /// - `Ok(true)` if a record was deleted
    /// - `Ok(false)` if no record existed
    async fn delete(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool>;

    /// Delete all records belonging to a user
    ///
    /// # Returns
    /// The number of records removed
    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64>;

    /// Count dirty records for a user
    async fn count_dirty(&self, user_id: &UserId) -> Result<i64>;
}

/// SQLite implementation of PlaybackStateRepository
pub struct SqlitePlaybackStateRepository {
    pool: SqlitePool,
}

impl SqlitePlaybackStateRepository {
    /// Create a new SqlitePlaybackStateRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PlaybackStateRow {
    user_id: String,
    item_id: String,
    played: bool,
    favorite: bool,
    playback_position_ticks: i64,
    last_modified: i64,
    version: i64,
    dirty: bool,
}

impl TryFrom<PlaybackStateRow> for UserPlaybackState {
    type Error = StoreError;

    fn try_from(row: PlaybackStateRow) -> Result<UserPlaybackState> {
        let user_id = UserId::from_string(&row.user_id).map_err(|e| {
            StoreError::CorruptRecord(format!("Invalid user id {}: {}", row.user_id, e))
        })?;
        let last_modified = DateTime::from_timestamp_millis(row.last_modified).ok_or_else(|| {
            StoreError::CorruptRecord(format!(
                "Invalid last_modified {} for item {}",
                row.last_modified, row.item_id
            ))
        })?;

        Ok(UserPlaybackState {
            user_id,
            item_id: ItemId::new(row.item_id),
            played: row.played,
            favorite: row.favorite,
            playback_position_ticks: row.playback_position_ticks,
            last_modified,
            version: row.version,
            dirty: row.dirty,
        })
    }
}

#[async_trait]
impl PlaybackStateRepository for SqlitePlaybackStateRepository {
    async fn get(&self, user_id: &UserId, item_id: &ItemId) -> Result<Option<UserPlaybackState>> {
        let row = query_as::<_, PlaybackStateRow>(
            "SELECT * FROM user_playback_states WHERE user_id = ? AND item_id = ?",
        )
        .bind(user_id.to_string())
        .bind(item_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserPlaybackState::try_from).transpose()
    }

    async fn upsert(&self, state: &UserPlaybackState) -> Result<()> {
        state.validate().map_err(|e| StoreError::InvalidInput {
            field: "UserPlaybackState".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT INTO user_playback_states (
                user_id, item_id, played, favorite, playback_position_ticks,
                last_modified, version, dirty
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, item_id) DO UPDATE SET
                played = excluded.played,
                favorite = excluded.favorite,
                playback_position_ticks = excluded.playback_position_ticks,
                last_modified = excluded.last_modified,
                version = excluded.version,
                dirty = excluded.dirty
            "#,
        )
        .bind(state.user_id.to_string())
        .bind(state.item_id.as_str())
        .bind(state.played)
        .bind(state.favorite)
        .bind(state.playback_position_ticks)
        .bind(state.last_modified.timestamp_millis())
        .bind(state.version)
        .bind(state.dirty)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_mutation(
        &self,
        user_id: &UserId,
        item_id: &ItemId,
        mutation: &PlaybackMutation,
        at: DateTime<Utc>,
    ) -> Result<UserPlaybackState> {
        if mutation.is_empty() {
            return Err(StoreError::InvalidInput {
                field: "PlaybackMutation".to_string(),
                message: "Mutation does not change any field".to_string(),
            });
        }
        mutation.validate().map_err(|e| StoreError::InvalidInput {
            field: "PlaybackMutation".to_string(),
            message: e,
        })?;

        let at_millis = at.timestamp_millis();

        query(
            r#"
            INSERT INTO user_playback_states (
                user_id, item_id, played, favorite, playback_position_ticks,
                last_modified, version, dirty
            )
            VALUES (?, ?, COALESCE(?, 0), COALESCE(?, 0), COALESCE(?, 0), ?, 0, 1)
            ON CONFLICT(user_id, item_id) DO UPDATE SET
                played = COALESCE(?, played),
                favorite = COALESCE(?, favorite),
                playback_position_ticks = COALESCE(?, playback_position_ticks),
                last_modified = ?,
                dirty = 1
            "#,
        )
        .bind(user_id.to_string())
        .bind(item_id.as_str())
        .bind(mutation.played)
        .bind(mutation.favorite)
        .bind(mutation.position_ticks)
        .bind(at_millis)
        .bind(mutation.played)
        .bind(mutation.favorite)
        .bind(mutation.position_ticks)
        .bind(at_millis)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user_id, item_id = %item_id, "Recorded playback mutation");

        self.get(user_id, item_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "UserPlaybackState".to_string(),
                id: format!("{}/{}", user_id, item_id),
            })
    }

    async fn list_dirty(&self, user_id: &UserId) -> Result<Vec<UserPlaybackState>> {
        let rows = query_as::<_, PlaybackStateRow>(
            r#"
            SELECT * FROM user_playback_states
            WHERE user_id = ? AND dirty = 1
            ORDER BY last_modified ASC, item_id ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserPlaybackState::try_from).collect()
    }

    async fn mark_clean(&self, snapshot: &UserPlaybackState, new_version: i64) -> Result<bool> {
        let result = query(
            r#"
            UPDATE user_playback_states
            SET dirty = 0, version = ?
            WHERE user_id = ? AND item_id = ?
              AND played = ? AND favorite = ? AND playback_position_ticks = ?
              AND last_modified = ?
            "#,
        )
        .bind(new_version)
        .bind(snapshot.user_id.to_string())
        .bind(snapshot.item_id.as_str())
        .bind(snapshot.played)
        .bind(snapshot.favorite)
        .bind(snapshot.playback_position_ticks)
        .bind(snapshot.last_modified.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_merge(
        &self,
        snapshot: &UserPlaybackState,
        merged: &UserPlaybackState,
    ) -> Result<bool> {
        merged.validate().map_err(|e| StoreError::InvalidInput {
            field: "UserPlaybackState".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            UPDATE user_playback_states
            SET played = ?, favorite = ?, playback_position_ticks = ?,
                last_modified = ?, version = ?, dirty = 0
            WHERE user_id = ? AND item_id = ?
              AND played = ? AND favorite = ? AND playback_position_ticks = ?
              AND last_modified = ?
            "#,
        )
        .bind(merged.played)
        .bind(merged.favorite)
        .bind(merged.playback_position_ticks)
        .bind(merged.last_modified.timestamp_millis())
        .bind(merged.version)
        .bind(snapshot.user_id.to_string())
        .bind(snapshot.item_id.as_str())
        .bind(snapshot.played)
        .bind(snapshot.favorite)
        .bind(snapshot.playback_position_ticks)
        .bind(snapshot.last_modified.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn adopt_version(&self, snapshot: &UserPlaybackState, new_version: i64) -> Result<bool> {
        let result = query(
            r#"
            UPDATE user_playback_states
            SET version = ?
            WHERE user_id = ? AND item_id = ?
              AND played = ? AND favorite = ? AND playback_position_ticks = ?
              AND last_modified = ?
            "#,
        )
        .bind(new_version)
        .bind(snapshot.user_id.to_string())
        .bind(snapshot.item_id.as_str())
        .bind(snapshot.played)
        .bind(snapshot.favorite)
        .bind(snapshot.playback_position_ticks)
        .bind(snapshot.last_modified.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: &UserId, item_id: &ItemId) -> Result<bool> {
        let result = query("DELETE FROM user_playback_states WHERE user_id = ? AND item_id = ?")
            .bind(user_id.to_string())
            .bind(item_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: &UserId) -> Result<u64> {
        let result = query("DELETE FROM user_playback_states WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        debug!(
            user_id = %user_id,
            removed = result.rows_affected(),
            "Deleted playback states for user"
        );

        Ok(result.rows_affected())
    }

    async fn count_dirty(&self, user_id: &UserId) -> Result<i64> {
        let count: i64 = query_as(
            "SELECT COUNT(*) as count FROM user_playback_states WHERE user_id = ? AND dirty = 1",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
