//! Pending request store: the add-request outbox plus the active playlist cache.

use crate::error::{PlaylistError, Result};
use crate::models::{
    AddRequest, EventId, LibraryTrackId, PendingBatch, PlaylistEntry, RequestId, SyncStatus,
};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use tracing::{debug, instrument};

// ============================================================================
// Store Trait
// ============================================================================

/// Durable local state the synchronizer reads and writes.
#[async_trait]
pub trait PendingRequestStore: Send + Sync {
    /// All requests for `event_id` whose status is `needs_sync`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn query_pending(&self, event_id: EventId) -> Result<PendingBatch>;

    /// Bump the attempt counter and timestamp of each request.
    ///
    /// Written before the batch is sent so a crash mid-submission leaves
    /// evidence that the server may already hold these requests.
    async fn record_submission_attempt(&self, request_ids: &[RequestId]) -> Result<()>;

    /// Mark requests as synced in a single transaction.
    async fn mark_synced(&self, request_ids: &[RequestId]) -> Result<()>;

    /// Replace the cached playlist for `event_id` atomically.
    ///
    /// Readers observe either the previous list or the new one, never a mix.
    async fn replace_active_playlist(
        &self,
        event_id: EventId,
        entries: &[PlaylistEntry],
    ) -> Result<()>;

    /// Queue a new add request with status `needs_sync`.
    async fn enqueue_add_request(
        &self,
        event_id: EventId,
        library_track_id: LibraryTrackId,
    ) -> Result<RequestId>;

    async fn find_request(&self, request_id: RequestId) -> Result<Option<AddRequest>>;

    /// Number of requests for `event_id` still awaiting sync.
    async fn count_pending(&self, event_id: EventId) -> Result<u64>;

    /// Cached playlist for `event_id` in server order.
    async fn load_active_playlist(&self, event_id: EventId) -> Result<Vec<PlaylistEntry>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

pub struct SqlitePendingRequestStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqlitePendingRequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[derive(Debug, FromRow)]
struct AddRequestRow {
    request_id: i64,
    event_id: i64,
    library_track_id: i64,
    sync_status: String,
    submission_attempts: i64,
    last_attempt_at: Option<i64>,
    created_at: i64,
}

impl TryFrom<AddRequestRow> for AddRequest {
    type Error = PlaylistError;

    fn try_from(row: AddRequestRow) -> Result<Self> {
        let submission_attempts = u32::try_from(row.submission_attempts).map_err(|_| {
            PlaylistError::InvalidData(format!(
                "submission_attempts out of range: {}",
                row.submission_attempts
            ))
        })?;

        Ok(AddRequest {
            request_id: RequestId(row.request_id),
            event_id: EventId(row.event_id),
            library_track_id: LibraryTrackId(row.library_track_id),
            sync_status: row.sync_status.parse::<SyncStatus>()?,
            submission_attempts,
            last_attempt_at: row.last_attempt_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PlaylistEntryRow {
    library_track_id: i64,
    title: String,
    artist: String,
    album: String,
    duration_secs: i64,
    upvotes: i64,
    downvotes: i64,
    time_added: String,
    adder_id: i64,
    adder_username: String,
}

impl TryFrom<PlaylistEntryRow> for PlaylistEntry {
    type Error = PlaylistError;

    fn try_from(row: PlaylistEntryRow) -> Result<Self> {
        let votes = |value: i64, column: &str| {
            u32::try_from(value).map_err(|_| {
                PlaylistError::InvalidData(format!("{} out of range: {}", column, value))
            })
        };

        Ok(PlaylistEntry {
            library_track_id: LibraryTrackId(row.library_track_id),
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration_secs: row.duration_secs,
            upvotes: votes(row.upvotes, "upvotes")?,
            downvotes: votes(row.downvotes, "downvotes")?,
            time_added: row.time_added,
            adder_id: row.adder_id,
            adder_username: row.adder_username,
        })
    }
}

#[async_trait]
impl PendingRequestStore for SqlitePendingRequestStore {
    #[instrument(skip(self), fields(event_id = %event_id))]
    async fn query_pending(&self, event_id: EventId) -> Result<PendingBatch> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT request_id, library_track_id
            FROM add_requests
            WHERE event_id = ? AND sync_status = ?
            ORDER BY request_id
            "#,
        )
        .bind(event_id.value())
        .bind(SyncStatus::NeedsSync.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(pending = rows.len(), "Loaded pending add requests");

        Ok(rows
            .into_iter()
            .map(|(request_id, track_id)| (RequestId(request_id), LibraryTrackId(track_id)))
            .collect())
    }

    #[instrument(skip(self, request_ids), fields(batch_size = request_ids.len()))]
    async fn record_submission_attempt(&self, request_ids: &[RequestId]) -> Result<()> {
        if request_ids.is_empty() {
            return Ok(());
        }

        let now = self.clock.unix_timestamp();
        let mut tx = self.pool.begin().await?;

        for request_id in request_ids {
            sqlx::query(
                r#"
                UPDATE add_requests
                SET submission_attempts = submission_attempts + 1,
                    last_attempt_at = ?
                WHERE request_id = ?
                "#,
            )
            .bind(now)
            .bind(request_id.value())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, request_ids), fields(batch_size = request_ids.len()))]
    async fn mark_synced(&self, request_ids: &[RequestId]) -> Result<()> {
        if request_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for request_id in request_ids {
            sqlx::query("UPDATE add_requests SET sync_status = ? WHERE request_id = ?")
                .bind(SyncStatus::Synced.as_str())
                .bind(request_id.value())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!("Marked add requests as synced");
        Ok(())
    }

    #[instrument(skip(self, entries), fields(event_id = %event_id, entries = entries.len()))]
    async fn replace_active_playlist(
        &self,
        event_id: EventId,
        entries: &[PlaylistEntry],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM active_playlist_entries WHERE event_id = ?")
            .bind(event_id.value())
            .execute(&mut *tx)
            .await?;

        for (priority, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO active_playlist_entries (
                    event_id, priority, library_track_id, title, artist, album,
                    duration_secs, upvotes, downvotes, time_added, adder_id, adder_username
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event_id.value())
            .bind(priority as i64)
            .bind(entry.library_track_id.value())
            .bind(&entry.title)
            .bind(&entry.artist)
            .bind(&entry.album)
            .bind(entry.duration_secs)
            .bind(i64::from(entry.upvotes))
            .bind(i64::from(entry.downvotes))
            .bind(&entry.time_added)
            .bind(entry.adder_id)
            .bind(&entry.adder_username)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(event_id = %event_id, library_track_id = %library_track_id))]
    async fn enqueue_add_request(
        &self,
        event_id: EventId,
        library_track_id: LibraryTrackId,
    ) -> Result<RequestId> {
        let result = sqlx::query(
            r#"
            INSERT INTO add_requests (event_id, library_track_id, sync_status, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(event_id.value())
        .bind(library_track_id.value())
        .bind(SyncStatus::NeedsSync.as_str())
        .bind(self.clock.unix_timestamp())
        .execute(&self.pool)
        .await?;

        let request_id = RequestId(result.last_insert_rowid());
        debug!(request_id = %request_id, "Queued add request");
        Ok(request_id)
    }

    async fn find_request(&self, request_id: RequestId) -> Result<Option<AddRequest>> {
        let row = sqlx::query_as::<_, AddRequestRow>(
            r#"
            SELECT request_id, event_id, library_track_id, sync_status,
                   submission_attempts, last_attempt_at, created_at
            FROM add_requests
            WHERE request_id = ?
            "#,
        )
        .bind(request_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AddRequest::try_from).transpose()
    }

    async fn count_pending(&self, event_id: EventId) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM add_requests WHERE event_id = ? AND sync_status = ?",
        )
        .bind(event_id.value())
        .bind(SyncStatus::NeedsSync.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn load_active_playlist(&self, event_id: EventId) -> Result<Vec<PlaylistEntry>> {
        let rows = sqlx::query_as::<_, PlaylistEntryRow>(
            r#"
            SELECT library_track_id, title, artist, album, duration_secs,
                   upvotes, downvotes, time_added, adder_id, adder_username
            FROM active_playlist_entries
            WHERE event_id = ?
            ORDER BY priority
            "#,
        )
        .bind(event_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PlaylistEntry::try_from).collect()
    }
}
