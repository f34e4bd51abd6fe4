//! User repository trait and implementation

use crate::error::{Result, StoreError};
use crate::models::{ServerId, User, UserId};
use async_trait::async_trait;
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::debug;

/// User repository interface for data access operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// List all users on a given server
    async fn find_by_server(&self, server_id: &ServerId) -> Result<Vec<User>>;

    /// List all known users across servers
    async fn find_all(&self) -> Result<Vec<User>>;

    /// Insert a new user
    ///
    /// # Errors
    /// Returns error if:
    /// - User with same ID already exists
    /// - The referenced server does not exist
    async fn insert(&self, user: &User) -> Result<()>;

    /// Update an existing user
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the user does not exist
    async fn update(&self, user: &User) -> Result<()>;

    /// Drop the user's access token, ending their session
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the user does not exist
    async fn clear_access_token(&self, id: &UserId) -> Result<()>;

    /// Delete a user and their playback state records
    ///
    /// Runs as a single transaction, children first.
    ///
    /// # Returns
    /// - `Ok(true)` if the user was deleted
    /// - `Ok(false)` if the user was not found
    async fn delete(&self, id: &UserId) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    /// Create a new SqliteUserRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    server_id: String,
    name: String,
    access_token: Option<String>,
    primary_image_tag: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<User> {
        let id = UserId::from_string(&row.id)
            .map_err(|e| StoreError::CorruptRecord(format!("Invalid user id {}: {}", row.id, e)))?;
        let server_id = ServerId::from_string(&row.server_id).map_err(|e| {
            StoreError::CorruptRecord(format!("Invalid server id {}: {}", row.server_id, e))
        })?;

        Ok(User {
            id,
            server_id,
            name: row.name,
            access_token: row.access_token,
            primary_image_tag: row.primary_image_tag,
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_server(&self, server_id: &ServerId) -> Result<Vec<User>> {
        let rows = query_as::<_, UserRow>("SELECT * FROM users WHERE server_id = ? ORDER BY name")
            .bind(server_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let rows = query_as::<_, UserRow>("SELECT * FROM users ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn insert(&self, user: &User) -> Result<()> {
        query(
            r#"
            INSERT INTO users (id, server_id, name, access_token, primary_image_tag)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.server_id.to_string())
        .bind(&user.name)
        .bind(&user.access_token)
        .bind(&user.primary_image_tag)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<()> {
        let result = query(
            r#"
            UPDATE users
            SET name = ?, access_token = ?, primary_image_tag = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.name)
        .bind(&user.access_token)
        .bind(&user.primary_image_tag)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "User".to_string(),
                id: user.id.to_string(),
            });
        }

        Ok(())
    }

    async fn clear_access_token(&self, id: &UserId) -> Result<()> {
        let result = query("UPDATE users SET access_token = NULL WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "User".to_string(),
                id: id.to_string(),
            });
        }

        debug!(user_id = %id, "Cleared access token");
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let user_id = id.to_string();

        let states = query("DELETE FROM user_playback_states WHERE user_id = ?")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        let result = query("DELETE FROM users WHERE id = ?")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            user_id = %id,
            states = states.rows_affected(),
            "Deleted user and playback states"
        );

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
