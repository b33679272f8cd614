//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a [`CoreConfig`] (HTTP,
//! secure storage) into the UDJ sync core: the SQLite outbox, the ticket
//! manager, the UDJ connector and the outbox synchronizer. Desktop apps
//! typically enable the `desktop-shims` feature so the config falls back to
//! the reqwest and keyring bridges from `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

pub use core_auth::{AccountId, Credentials, InteractiveAuthenticator};
pub use core_playlist::{EventId, LibraryTrackId, PlaylistEntry, RequestId};
pub use core_runtime::{CoreConfig, CoreConfigBuilder, CoreEvent, EventStream};
pub use core_sync::{SyncCommand, SyncErrorKind, SyncOperation, SyncOutcome, SyncTarget};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use core_auth::{CredentialProvider, TicketManager, TicketManagerConfig};
use core_playlist::db::{create_pool, DatabaseConfig};
use core_playlist::{PendingRequestStore, PlaylistServerClient, SqlitePendingRequestStore};
use core_runtime::EventBus;
use core_sync::{PlaylistOutboxSynchronizer, SyncError};
use provider_udj::UdjConnector;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    event_bus: EventBus,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn PendingRequestStore>,
    synchronizer: Arc<PlaylistOutboxSynchronizer>,
}

impl CoreService {
    /// Build the production stack from `config`.
    ///
    /// `authenticator` is asked for a username and password whenever an
    /// account has no stored ticket.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, no `HttpClient` is available, or the
    /// database cannot be opened and migrated.
    ///
    /// ```ignore
    /// let config = CoreConfig::builder().database_path("/data/udj.db").build()?;
    /// let core = CoreService::bootstrap(config, Arc::new(LoginDialog)).await?;
    /// let command = SyncCommand::sync_add_requests("alice", EventId(7));
    /// core.dispatch(command, &CancellationToken::new()).await?;
    /// ```
    #[instrument(skip_all, fields(database = %config.database_path.display()))]
    pub async fn bootstrap(
        config: CoreConfig,
        authenticator: Arc<dyn InteractiveAuthenticator>,
    ) -> Result<Self> {
        config.validate()?;
        let http_client = config.require_http_client()?;
        let event_bus = EventBus::new(config.event_buffer_size);

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;

        let tickets = TicketManager::new(
            Arc::clone(&config.secure_store),
            Arc::clone(&http_client),
            authenticator,
            event_bus.clone(),
            TicketManagerConfig {
                base_url: config.server_base_url.clone(),
                api_version: config.api_version.clone(),
                request_timeout: config.request_timeout,
                auth_timeout: config.auth_timeout,
            },
        );

        let connector = UdjConnector::new(
            http_client,
            config.server_base_url.clone(),
            config.api_version.clone(),
        )
        .with_request_timeout(config.request_timeout);

        info!(server = %config.server_base_url, "UDJ sync core ready");

        Ok(Self::from_components(
            Arc::new(tickets),
            Arc::new(SqlitePendingRequestStore::new(pool)),
            Arc::new(connector),
            event_bus,
        ))
    }

    /// Assemble a service from already constructed collaborators.
    pub fn from_components(
        credentials: Arc<dyn CredentialProvider>,
        store: Arc<dyn PendingRequestStore>,
        server: Arc<dyn PlaylistServerClient>,
        event_bus: EventBus,
    ) -> Self {
        let synchronizer = Arc::new(PlaylistOutboxSynchronizer::new(
            Arc::clone(&credentials),
            Arc::clone(&store),
            server,
            event_bus.clone(),
        ));

        Self {
            event_bus,
            credentials,
            store,
            synchronizer,
        }
    }

    /// Run one sync command to completion.
    pub async fn dispatch(
        &self,
        command: SyncCommand,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome> {
        Ok(self.synchronizer.dispatch(command, cancel).await?)
    }

    /// Queue a track for the next `SYNC_ADD_REQUESTS` of `event_id`.
    pub async fn enqueue_add_request(
        &self,
        event_id: EventId,
        library_track_id: LibraryTrackId,
    ) -> Result<RequestId> {
        if !event_id.is_valid() {
            return Err(SyncError::InvalidArgument(format!(
                "event id must be non-negative, got {}",
                event_id
            ))
            .into());
        }
        Ok(self
            .store
            .enqueue_add_request(event_id, library_track_id)
            .await?)
    }

    /// Cached active playlist of `event_id`, as of the last refresh.
    pub async fn active_playlist(&self, event_id: EventId) -> Result<Vec<PlaylistEntry>> {
        Ok(self.store.load_active_playlist(event_id).await?)
    }

    pub async fn pending_count(&self, event_id: EventId) -> Result<u64> {
        Ok(self.store.count_pending(event_id).await?)
    }

    /// Forget the stored ticket so the next sync prompts again.
    pub async fn sign_out(&self, account_id: &AccountId) -> Result<()> {
        Ok(self.credentials.invalidate(account_id).await?)
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn synchronizer(&self) -> Arc<PlaylistOutboxSynchronizer> {
        Arc::clone(&self.synchronizer)
    }
}
