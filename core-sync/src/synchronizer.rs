//! # Playlist Outbox Synchronizer
//!
//! Pushes locally queued add requests to the UDJ server and refreshes the
//! cached active playlist of an event.
//!
//! ## Sync add requests
//! 1. Acquire a token from the `CredentialProvider` (cancellable)
//! 2. Load the pending batch for the event
//! 3. Stop with `NothingToSync` if it is empty
//! 4. Record a submission attempt, then submit the whole batch in one call
//! 5. Mark exactly the submitted ids synced
//! 6. Refresh the active playlist
//!
//! ## Refresh active playlist
//! 1. Acquire a token
//! 2. Fetch the event's active playlist
//! 3. Replace the cache in one transaction
//!
//! Every step aborts the operation on failure. Nothing is retried and earlier
//! steps are not rolled back; re-running `sync_add_requests` is the recovery
//! path. Operations on the same account and event are serialized.
//!
//! ```rust,ignore
//! let synchronizer = PlaylistOutboxSynchronizer::new(credentials, store, server, event_bus);
//! let outcome = synchronizer
//!     .dispatch(SyncCommand::sync_add_requests("alice", EventId(7)), &CancellationToken::new())
//!     .await?;
//! ```

use crate::command::{SyncCommand, SyncOperation, SyncTarget};
use crate::error::{Result, SyncError};
use crate::outcome::SyncOutcome;
use core_auth::{AuthError, CredentialProvider};
use core_playlist::{PendingRequestStore, PlaylistError, PlaylistServerClient, RequestId};
use core_runtime::events::{CoreEvent, EventBus, PlaylistEvent, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub struct PlaylistOutboxSynchronizer {
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn PendingRequestStore>,
    server: Arc<dyn PlaylistServerClient>,
    event_bus: EventBus,
    /// Single-flight locks per account and event. An entry lives only while a
    /// run holds or waits on it.
    target_locks: Arc<Mutex<HashMap<SyncTarget, Arc<Mutex<()>>>>>,
}

impl PlaylistOutboxSynchronizer {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn PendingRequestStore>,
        server: Arc<dyn PlaylistServerClient>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            credentials,
            store,
            server,
            event_bus,
            target_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run the operation named by `command`.
    ///
    /// Unknown operations are ignored. A command without a valid event id
    /// fails with `InvalidArgument` before any collaborator is touched.
    #[instrument(
        skip(self, command, cancel),
        fields(
            run_id = %Uuid::new_v4(),
            operation = %command.operation,
            account_id = %command.account_id,
        )
    )]
    pub async fn dispatch(
        &self,
        command: SyncCommand,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        if let SyncOperation::Unknown(name) = &command.operation {
            debug!(operation = %name, "Ignoring unknown sync operation");
            return Ok(SyncOutcome::Ignored);
        }

        let target = match command.target() {
            Ok(target) => target,
            Err(e) => {
                let event_id = command.event_id.map(|id| id.value());
                self.report_failure(&command.operation, event_id, &e);
                return Err(e);
            }
        };

        match command.operation {
            SyncOperation::SyncAddRequests => self.sync_add_requests(&target, cancel).await,
            SyncOperation::RefreshPlaylist => self.refresh_active_playlist(&target, cancel).await,
            SyncOperation::Unknown(_) => Ok(SyncOutcome::Ignored),
        }
    }

    /// Replace the cached active playlist of `target.event_id` with the
    /// server's current list.
    ///
    /// # Errors
    ///
    /// The first failing step's error. The cache is left untouched unless the
    /// replace itself succeeded.
    #[instrument(
        skip(self, target, cancel),
        fields(account_id = %target.account_id, event_id = %target.event_id)
    )]
    pub async fn refresh_active_playlist(
        &self,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let operation = SyncOperation::RefreshPlaylist;
        self.run(&operation, target, async {
            let entries = self
                .with_target_lock(target, self.refresh_locked(target, cancel))
                .await?;
            Ok(SyncOutcome::Refreshed { entries })
        })
        .await
    }

    /// Submit every pending add request of `target.event_id` in one batch,
    /// mark the batch synced and refresh the active playlist.
    ///
    /// # Errors
    ///
    /// The first failing step's error. If the refresh fails after a successful
    /// submission, the batch stays synced and the refresh error is returned.
    #[instrument(
        skip(self, target, cancel),
        fields(account_id = %target.account_id, event_id = %target.event_id)
    )]
    pub async fn sync_add_requests(
        &self,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let operation = SyncOperation::SyncAddRequests;
        self.run(
            &operation,
            target,
            self.with_target_lock(target, self.sync_locked(target, cancel)),
        )
        .await
    }

    async fn run<F>(
        &self,
        operation: &SyncOperation,
        target: &SyncTarget,
        work: F,
    ) -> Result<SyncOutcome>
    where
        F: std::future::Future<Output = Result<SyncOutcome>>,
    {
        if let Err(e) = target.validate() {
            self.report_failure(operation, Some(target.event_id.value()), &e);
            return Err(e);
        }

        self.event_bus.publish(CoreEvent::Sync(SyncEvent::Started {
            operation: operation.to_string(),
            account_id: target.account_id.to_string(),
            event_id: target.event_id.value(),
        }));

        match work.await {
            Ok(outcome) => {
                info!(?outcome, "{} completed", operation);
                self.event_bus.publish(CoreEvent::Sync(SyncEvent::Completed {
                    operation: operation.to_string(),
                    event_id: target.event_id.value(),
                }));
                Ok(outcome)
            }
            Err(e) => {
                self.report_failure(operation, Some(target.event_id.value()), &e);
                Err(e)
            }
        }
    }

    async fn sync_locked(
        &self,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let token = self.acquire_token(target, cancel).await?;

        let batch = self.store.query_pending(target.event_id).await?;
        if batch.is_empty() {
            debug!("No pending add requests");
            return Ok(SyncOutcome::NothingToSync);
        }

        let request_ids: Vec<RequestId> = batch.keys().copied().collect();
        self.store.record_submission_attempt(&request_ids).await?;

        debug!(batch_size = request_ids.len(), "Submitting add requests");
        if let Err(e) = self
            .server
            .submit_add_requests(&batch, target.event_id, &token)
            .await
        {
            return Err(self.server_failure(target, e).await);
        }

        self.store.mark_synced(&request_ids).await?;
        info!(submitted = request_ids.len(), "Add requests synced");

        self.event_bus.publish(CoreEvent::Playlist(PlaylistEvent::AddRequestsSynced {
            event_id: target.event_id.value(),
            request_ids: request_ids.iter().map(|id| id.value()).collect(),
        }));

        let entries = self.refresh_locked(target, cancel).await?;

        Ok(SyncOutcome::Synced {
            submitted: request_ids.len(),
            entries,
        })
    }

    /// Refresh steps; the caller holds the target lock.
    async fn refresh_locked(
        &self,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let token = self.acquire_token(target, cancel).await?;

        let entries = match self
            .server
            .fetch_active_playlist(target.event_id, &token)
            .await
        {
            Ok(entries) => entries,
            Err(e) => return Err(self.server_failure(target, e).await),
        };

        self.store
            .replace_active_playlist(target.event_id, &entries)
            .await?;

        self.event_bus.publish(CoreEvent::Playlist(PlaylistEvent::ActivePlaylistRefreshed {
            event_id: target.event_id.value(),
            entry_count: entries.len(),
        }));

        Ok(entries.len())
    }

    /// Token acquisition may wait on the user; `cancel` ends the wait.
    async fn acquire_token(
        &self,
        target: &SyncTarget,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Token acquisition cancelled");
                Err(AuthError::Cancelled.into())
            }
            result = self.credentials.get_token(&target.account_id, cancel) => {
                Ok(result?)
            }
        }
    }

    /// Converts a server error, dropping the cached token on `401`.
    async fn server_failure(&self, target: &SyncTarget, error: PlaylistError) -> SyncError {
        if matches!(error, PlaylistError::AuthRejected(_)) {
            warn!("Server rejected token, invalidating");
            if let Err(e) = self.credentials.invalidate(&target.account_id).await {
                warn!(error = %e, "Failed to invalidate token");
            }
        }
        error.into()
    }

    async fn with_target_lock<T, F>(&self, target: &SyncTarget, work: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        let lock = {
            let mut locks = self.target_locks.lock().await;
            locks
                .entry(target.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let output = {
            let _guard = lock.lock().await;
            work.await
        };

        // Clones are only taken under the map lock, so a count of one here
        // means nobody else is holding or queued on this target.
        let mut locks = self.target_locks.lock().await;
        drop(lock);
        if locks.get(target).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(target);
        }
        output
    }

    fn report_failure(&self, operation: &SyncOperation, event_id: Option<i64>, e: &SyncError) {
        error!(kind = %e.kind(), error = %e, "{} failed", operation);
        self.event_bus.publish(CoreEvent::Sync(SyncEvent::Failed {
            operation: operation.to_string(),
            event_id,
            kind: e.kind().to_string(),
            message: e.to_string(),
        }));
    }
}
