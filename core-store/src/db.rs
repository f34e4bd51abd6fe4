//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling with optimal configuration for the
//! local state store.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Statement Caching**: Automatic prepared statement caching
//! - **Foreign Keys**: Enforced for referential integrity
//! - **Automatic Migrations**: Runs on initialization
//! - **Health Checks**: Connection validation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_store::db::{DatabaseConfig, create_pool};
//!
//! let config = DatabaseConfig::new("client.db");
//! let pool = create_pool(config).await?;
//! ```
//!
//! ## Testing
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::{Result, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Maximum lifetime of a connection
    pub max_lifetime: Option<Duration>,

    /// Maximum idle time for a connection before being closed
    pub idle_timeout: Option<Duration>,

    /// Enable statement caching (number of statements to cache)
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
            idle_timeout: Some(Duration::from_secs(600)),  // 10 minutes
            statement_cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// An in-memory SQLite database is private to the connection that opened
    /// it, so the pool is capped at a single connection and never recycles it.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
            statement_cache_capacity: 100,
        }
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the maximum connection lifetime
    pub fn max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the statement cache capacity
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Configures SQLite connection options (WAL mode, foreign keys, etc.)
/// 2. Creates a connection pool with the specified configuration
/// 3. Runs database migrations
/// 4. Performs a health check
///
/// # Errors
///
/// Returns an error if:
/// - The database file cannot be accessed
/// - Connection pool creation fails
/// - Migrations fail
/// - Health check fails
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let mut connect_options =
        SqliteConnectOptions::from_str(&config.database_url).map_err(StoreError::Database)?;

    connect_options = connect_options
        // Enable WAL mode for better concurrency
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous mode for good balance of safety and speed
        .synchronous(SqliteSynchronous::Normal)
        // Enforce referential integrity between servers, users, and states
        .foreign_keys(true)
        // Create database if it doesn't exist
        .create_if_missing(true)
        // Optimize cache size (64MB)
        .pragma("cache_size", "-64000")
        // Statement cache capacity
        .statement_cache_capacity(config.statement_cache_capacity);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            StoreError::Database(e)
        })?;

    info!(
        connections = pool.size(),
        "Database connection pool created successfully"
    );

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with in-memory database
///
/// This is a convenience function that creates an in-memory database
/// with migrations already applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let config = DatabaseConfig::in_memory();
    create_pool(config).await
}

/// Insert a test server and user into the database (for testing only)
///
/// Playback state rows reference a user, which references a server. This
/// helper satisfies both foreign keys and returns the ids it minted.
pub async fn insert_test_user(pool: &Pool<Sqlite>) -> (crate::ServerId, crate::UserId) {
    let server_id = crate::ServerId::new();
    let user_id = crate::UserId::new();

    sqlx::query("INSERT INTO servers (id, name, address, created_at) VALUES (?, ?, ?, ?)")
        .bind(server_id.to_string())
        .bind("Test Server")
        .bind("https://media.test")
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(pool)
        .await
        .expect("Failed to insert test server");

    sqlx::query("INSERT INTO users (id, server_id, name, access_token) VALUES (?, ?, ?, ?)")
        .bind(user_id.to_string())
        .bind(server_id.to_string())
        .bind("test-user")
        .bind("test-token")
        .execute(pool)
        .await
        .expect("Failed to insert test user");

    (server_id, user_id)
}

/// Run database migrations
///
/// Applies all pending migrations from the `migrations/` directory.
/// Migrations are embedded in the binary at compile time using `sqlx::migrate!()`.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            StoreError::Migration(e.to_string())
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// Perform a health check on the connection pool
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        StoreError::Database(e)
    })?;

    debug!("Database health check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(config).await;
        assert!(pool.is_ok(), "Should create in-memory pool successfully");
    }

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await;
        assert!(pool.is_ok(), "Should create test pool successfully");
    }

    #[tokio::test]
    async fn test_database_config_builder() {
        let config = DatabaseConfig::in_memory()
            .min_connections(2)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(60))
            .statement_cache_capacity(200);

        assert_eq!(config.min_connections, 2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
        assert_eq!(config.statement_cache_capacity, 200);
    }

    #[tokio::test]
    async fn test_concurrent_queries() {
        let pool = create_test_pool().await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    sqlx::query("SELECT 1").fetch_one(&pool).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "Foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = create_test_pool().await.unwrap();

        for table in ["servers", "users", "user_playback_states"] {
            let result: (i32,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .unwrap();

            assert_eq!(result.0, 1, "Table {} should exist", table);
        }
    }

    #[tokio::test]
    async fn test_insert_test_user_satisfies_foreign_keys() {
        let pool = create_test_pool().await.unwrap();
        let (_, user_id) = insert_test_user(&pool).await;

        let result = sqlx::query(
            "INSERT INTO user_playback_states (user_id, item_id, last_modified) VALUES (?, ?, ?)",
        )
        .bind(user_id.to_string())
        .bind("item-1")
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&pool)
        .await;

        assert!(result.is_ok());
    }
}
