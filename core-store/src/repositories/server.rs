//! Server repository trait and implementation

use crate::error::{Result, StoreError};
use crate::models::{Server, ServerId};
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{query, query_as, FromRow, SqlitePool};
use tracing::debug;

/// Server repository interface for data access operations
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Find a server by its ID
    ///
    /// # Returns
    /// - `Ok(Some(server))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &ServerId) -> Result<Option<Server>>;

    /// List all configured servers, oldest first
    async fn find_all(&self) -> Result<Vec<Server>>;

    /// Insert a new server
    ///
    /// # Errors
    /// Returns error if:
    /// - Server with same ID already exists
    /// - Server validation fails
    /// - Database error occurs
    async fn insert(&self, server: &Server) -> Result<()>;

    /// Update an existing server
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the server does not exist
    async fn update(&self, server: &Server) -> Result<()>;

    /// Delete a server and everything hanging off it
    ///
    /// Removes the server's users and their playback state records in a
    /// single transaction, children first. Either the whole subtree is gone
    /// afterwards or nothing changed.
    ///
    /// # Returns
    /// - `Ok(true)` if the server was deleted
    /// - `Ok(false)` if the server was not found
    async fn delete(&self, id: &ServerId) -> Result<bool>;

    /// Count total servers
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of ServerRepository
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    /// Create a new SqliteServerRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ServerRow {
    id: String,
    name: String,
    address: String,
    created_at: i64,
}

impl TryFrom<ServerRow> for Server {
    type Error = StoreError;

    fn try_from(row: ServerRow) -> Result<Server> {
        let id = ServerId::from_string(&row.id).map_err(|e| {
            StoreError::CorruptRecord(format!("Invalid server id {}: {}", row.id, e))
        })?;
        let created_at = DateTime::from_timestamp_millis(row.created_at).ok_or_else(|| {
            StoreError::CorruptRecord(format!(
                "Invalid created_at {} for server {}",
                row.created_at, row.id
            ))
        })?;

        Ok(Server {
            id,
            name: row.name,
            address: row.address,
            created_at,
        })
    }
}

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn find_by_id(&self, id: &ServerId) -> Result<Option<Server>> {
        let row = query_as::<_, ServerRow>("SELECT * FROM servers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Server::try_from).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Server>> {
        let rows = query_as::<_, ServerRow>("SELECT * FROM servers ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Server::try_from).collect()
    }

    async fn insert(&self, server: &Server) -> Result<()> {
        server.validate().map_err(|e| StoreError::InvalidInput {
            field: "Server".to_string(),
            message: e,
        })?;

        query("INSERT INTO servers (id, name, address, created_at) VALUES (?, ?, ?, ?)")
            .bind(server.id.to_string())
            .bind(&server.name)
            .bind(&server.address)
            .bind(server.created_at.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update(&self, server: &Server) -> Result<()> {
        server.validate().map_err(|e| StoreError::InvalidInput {
            field: "Server".to_string(),
            message: e,
        })?;

        let result = query("UPDATE servers SET name = ?, address = ? WHERE id = ?")
            .bind(&server.name)
            .bind(&server.address)
            .bind(server.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity_type: "Server".to_string(),
                id: server.id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &ServerId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let server_id = id.to_string();

        // Grandchildren first: playback states of every user on this server.
        let states = query(
            r#"
            DELETE FROM user_playback_states
            WHERE user_id IN (SELECT id FROM users WHERE server_id = ?)
            "#,
        )
        .bind(&server_id)
        .execute(&mut *tx)
        .await?;

        let users = query("DELETE FROM users WHERE server_id = ?")
            .bind(&server_id)
            .execute(&mut *tx)
            .await?;

        let result = query("DELETE FROM servers WHERE id = ?")
            .bind(&server_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            server_id = %id,
            users = users.rows_affected(),
            states = states.rows_affected(),
            "Deleted server subtree"
        );

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM servers")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{ItemId, User, UserId, UserPlaybackState};
    use crate::repositories::playback_state::{
        PlaybackStateRepository, SqlitePlaybackStateRepository,
    };
    use crate::repositories::user::{SqliteUserRepository, UserRepository};

    async fn setup_test_pool() -> SqlitePool {
        create_test_pool().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find_server() {
        let pool = setup_test_pool().await;
        let repo = SqliteServerRepository::new(pool);

        let server = Server::new("Living Room", "https://media.example.org");
        repo.insert(&server).await.unwrap();

        let found = repo.find_by_id(&server.id).await.unwrap();
        assert!(found.is_some());
        let found = found.unwrap();
        assert_eq!(found.name, "Living Room");
        assert_eq!(found.address, "https://media.example.org");
    }

    #[tokio::test]
    async fn test_update_server() {
        let pool = setup_test_pool().await;
        let repo = SqliteServerRepository::new(pool);

        let mut server = Server::new("Old Name", "https://media.example.org");
        repo.insert(&server).await.unwrap();

        server.name = "New Name".to_string();
        repo.update(&server).await.unwrap();

        let found = repo.find_by_id(&server.id).await.unwrap().unwrap();
        assert_eq!(found.name, "New Name");
    }

    #[tokio::test]
    async fn test_update_missing_server_fails() {
        let pool = setup_test_pool().await;
        let repo = SqliteServerRepository::new(pool);

        let server = Server::new("Ghost", "https://nowhere.example.org");
        let result = repo.update(&server).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_server_cascades() {
        let pool = setup_test_pool().await;
        let servers = SqliteServerRepository::new(pool.clone());
        let users = SqliteUserRepository::new(pool.clone());
        let states = SqlitePlaybackStateRepository::new(pool.clone());

        let server = Server::new("Doomed", "https://media.example.org");
        servers.insert(&server).await.unwrap();

        let user = User::new(UserId::new(), server.id, "alice").with_access_token("t");
        users.insert(&user).await.unwrap();

        let mut state = UserPlaybackState::new(user.id, ItemId::new("item-1"));
        state.dirty = true;
        states.upsert(&state).await.unwrap();

        let deleted = servers.delete(&server.id).await.unwrap();
        assert!(deleted);

        // No orphans anywhere in the subtree.
        assert!(servers.find_by_id(&server.id).await.unwrap().is_none());
        assert!(users.find_by_id(&user.id).await.unwrap().is_none());
        assert!(states
            .get(&user.id, &ItemId::new("item-1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_server() {
        let pool = setup_test_pool().await;
        let repo = SqliteServerRepository::new(pool);

        let deleted = repo.delete(&ServerId::new()).await.unwrap();
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_count_servers() {
        let pool = setup_test_pool().await;
        let repo = SqliteServerRepository::new(pool);

        assert_eq!(repo.count().await.unwrap(), 0);

        for i in 1..=3 {
            let server = Server::new(format!("Server {}", i), "https://media.example.org");
            repo.insert(&server).await.unwrap();
        }

        assert_eq!(repo.count().await.unwrap(), 3);
    }
}
