//! SQLite pool for the add-request outbox and the active playlist cache.
//!
//! Pools are opened in WAL mode so host screens reading the cached playlist
//! do not block a sync run writing to it. Embedded migrations run on every
//! open.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::error::{PlaylistError, Result};

const MEMORY: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    /// Private in-memory database, gone when the pool closes.
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub location: DatabaseLocation,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Lock wait before SQLite reports `SQLITE_BUSY`.
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// File-backed database at `path`. The literal path `:memory:` selects
    /// [`DatabaseConfig::in_memory`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == MEMORY {
            return Self::in_memory();
        }
        Self {
            location: DatabaseLocation::File(path.to_path_buf()),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Each SQLite connection to `:memory:` gets its own database, so the
    /// pool is held to a single connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::Memory,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        if self.location != DatabaseLocation::Memory {
            self.max_connections = max.max(1);
        }
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            DatabaseLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            DatabaseLocation::Memory => SqliteConnectOptions::new().in_memory(true),
        };
        options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the pool and bring the schema up to date.
#[instrument(skip_all, fields(location = ?config.location))]
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);
    if config.location == DatabaseLocation::Memory {
        pool_options = pool_options
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(config.connect_options())
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| PlaylistError::Migration(e.to_string()))?;
    debug!("migrations applied");

    info!(max_connections = config.max_connections, "outbox database open");
    Ok(pool)
}

/// Fresh in-memory pool with the schema applied.
pub async fn create_test_pool() -> Result<SqlitePool> {
    create_pool(DatabaseConfig::in_memory()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_present_after_open() {
        let pool = create_test_pool().await.unwrap();

        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert!(names.iter().any(|n| n == "add_requests"));
        assert!(names.iter().any(|n| n == "active_playlist_entries"));
    }

    #[tokio::test]
    async fn test_unknown_sync_status_rejected() {
        let pool = create_test_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO add_requests (event_id, library_track_id, sync_status, created_at) \
             VALUES (1, 1, 'bogus', 0)",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_database_persists_between_pools() {
        let path = std::env::temp_dir().join(format!("udj-db-test-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let pool = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        sqlx::query(
            "INSERT INTO add_requests (event_id, library_track_id, sync_status, created_at) \
             VALUES (7, 5001, 'needs_sync', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let reopened = create_pool(DatabaseConfig::new(&path)).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM add_requests")
            .fetch_one(&reopened)
            .await
            .unwrap();
        reopened.close().await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(count, 1);
    }

    #[test]
    fn test_config_builders() {
        let config = DatabaseConfig::new("/data/udj.db")
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5));
        assert_eq!(
            config.location,
            DatabaseLocation::File(PathBuf::from("/data/udj.db"))
        );
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));

        let memory = DatabaseConfig::new(":memory:").max_connections(8);
        assert_eq!(memory.location, DatabaseLocation::Memory);
        assert_eq!(memory.max_connections, 1);
    }
}
