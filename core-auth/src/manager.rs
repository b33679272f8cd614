//! # Ticket Manager
//!
//! Obtains and caches UDJ session tickets.
//!
//! ## Overview
//!
//! `TicketManager` is the production [`CredentialProvider`]. A cached ticket is
//! returned immediately. Without one, the manager asks the host for credentials
//! through an [`InteractiveAuthenticator`], posts them to `{base}auth`, stores the
//! returned ticket in the [`TicketStore`] and emits auth events on the bus.
//!
//! The prompt is an explicit suspension point. It is raced against the
//! caller's `CancellationToken` and bounded by `auth_timeout`. Prompts are
//! serialized per account, so concurrent callers share a single sign-in.
//!
//! ## Usage
//!
//! ```ignore
//! let manager = TicketManager::new(
//!     secure_store,
//!     http_client,
//!     authenticator,
//!     event_bus.clone(),
//!     TicketManagerConfig::default(),
//! );
//!
//! let token = manager.get_token(&AccountId::new("dj"), &CancellationToken::new()).await?;
//! ```

use crate::credential::{CredentialProvider, InteractiveAuthenticator};
use crate::error::{AuthError, Result};
use crate::ticket_store::TicketStore;
use crate::types::{AccountId, AuthResponse, Credentials, Ticket};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::SecureStore;
use bytes::Bytes;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub const API_VERSION_HEADER: &str = "X-Udj-Api-Version";

/// Settings for reaching the UDJ auth endpoint.
#[derive(Debug, Clone)]
pub struct TicketManagerConfig {
    /// Server base URL ending with `/`
    pub base_url: String,
    pub api_version: String,
    pub request_timeout: Duration,
    /// Upper bound on prompt plus login
    pub auth_timeout: Duration,
}

impl Default for TicketManagerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://udjplayer.com:4897/udj/".to_string(),
            api_version: "0.6".to_string(),
            request_timeout: Duration::from_secs(30),
            auth_timeout: Duration::from_secs(120),
        }
    }
}

pub struct TicketManager {
    ticket_store: TicketStore,
    http_client: Arc<dyn HttpClient>,
    authenticator: Arc<dyn InteractiveAuthenticator>,
    event_bus: EventBus,
    config: TicketManagerConfig,
    /// Per-account locks so only one prompt is shown at a time. An entry is
    /// removed once no caller holds or waits on it.
    sign_in_locks: Arc<Mutex<HashMap<AccountId, Arc<Mutex<()>>>>>,
}

impl TicketManager {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        http_client: Arc<dyn HttpClient>,
        authenticator: Arc<dyn InteractiveAuthenticator>,
        event_bus: EventBus,
        config: TicketManagerConfig,
    ) -> Self {
        Self {
            ticket_store: TicketStore::new(secure_store),
            http_client,
            authenticator,
            event_bus,
            config,
            sign_in_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns a valid ticket for `account_id`, signing in interactively if
    /// none is cached.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Cancelled`] if `cancel` fires or the user dismisses the prompt
    /// - [`AuthError::OperationTimeout`] if sign-in exceeds `auth_timeout`
    /// - [`AuthError::InvalidCredentials`] if the server rejects the credentials
    #[instrument(skip(self, cancel), fields(account_id = %account_id))]
    pub async fn get_ticket(
        &self,
        account_id: &AccountId,
        cancel: &CancellationToken,
    ) -> Result<Ticket> {
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        let lock = {
            let mut locks = self.sign_in_locks.lock().await;
            locks
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = self.get_ticket_serialized(account_id, &lock, cancel).await;

        // Clones are only taken under the map lock, so a count of one here
        // means no other caller is holding or queued on this account.
        let mut locks = self.sign_in_locks.lock().await;
        drop(lock);
        if locks.get(account_id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(account_id);
        }
        result
    }

    async fn get_ticket_serialized(
        &self,
        account_id: &AccountId,
        lock: &Mutex<()>,
        cancel: &CancellationToken,
    ) -> Result<Ticket> {
        let _guard = tokio::select! {
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            guard = lock.lock() => guard,
        };

        match self.ticket_store.retrieve_ticket(account_id).await {
            Ok(Some(ticket)) => {
                debug!("Using cached ticket");
                return Ok(ticket);
            }
            Ok(None) => {}
            Err(AuthError::TicketCorrupted { .. }) => {
                warn!("Discarded corrupted ticket, signing in again");
            }
            Err(e) => return Err(e),
        }

        info!("No ticket cached, requesting credentials");
        self.event_bus.publish(CoreEvent::Auth(AuthEvent::CredentialsRequired {
            account_id: account_id.to_string(),
        }));

        let result = match timeout(
            self.config.auth_timeout,
            self.prompt_and_sign_in(account_id, cancel),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!("Interactive sign-in timed out");
                Err(AuthError::OperationTimeout {
                    operation: "interactive sign-in".to_string(),
                })
            }
        };

        if let Err(e) = &result {
            warn!(error = %e, "Ticket acquisition failed");
            self.event_bus.publish(CoreEvent::Auth(AuthEvent::AuthError {
                account_id: Some(account_id.to_string()),
                message: e.to_string(),
                recoverable: e.is_recoverable(),
            }));
        }

        result
    }

    async fn prompt_and_sign_in(
        &self,
        account_id: &AccountId,
        cancel: &CancellationToken,
    ) -> Result<Ticket> {
        let credentials = tokio::select! {
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            credentials = self.authenticator.request_credentials(account_id) => credentials?,
        };

        let Some(credentials) = credentials else {
            info!("User dismissed the credential prompt");
            return Err(AuthError::Cancelled);
        };

        let ticket = tokio::select! {
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            ticket = self.sign_in(&credentials) => ticket?,
        };

        self.ticket_store.store_ticket(account_id, &ticket).await?;

        self.event_bus.publish(CoreEvent::Auth(AuthEvent::SignedIn {
            account_id: account_id.to_string(),
            user_id: ticket.user_id,
        }));

        info!(user_id = ticket.user_id, "Signed in");
        Ok(ticket)
    }

    /// Posts credentials to `{base}auth` and returns the issued ticket.
    ///
    /// Does not touch the ticket cache.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Ticket> {
        let params = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let encoded_body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Other(format!("Failed to encode auth request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, format!("{}auth", self.config.base_url))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header(API_VERSION_HEADER, self.config.api_version.clone())
            .body(Bytes::from(encoded_body))
            .timeout(self.config.request_timeout);

        // Login is not idempotent from the user's point of view; never resend.
        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if response.status == 401 {
            warn!("Server rejected credentials");
            return Err(AuthError::InvalidCredentials);
        }

        if !response.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!(status = response.status, "Auth endpoint returned an error");
            return Err(AuthError::UnexpectedResponse {
                status: response.status,
                message,
            });
        }

        let reply: AuthResponse = response.json().map_err(|e| AuthError::UnexpectedResponse {
            status: response.status,
            message: format!("Failed to parse auth response: {}", e),
        })?;

        Ok(Ticket::new(reply.ticket_hash, reply.user_id))
    }

    /// Discards the cached ticket so the next call signs in again.
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn sign_out(&self, account_id: &AccountId) -> Result<()> {
        self.ticket_store.delete_ticket(account_id).await?;

        self.event_bus.publish(CoreEvent::Auth(AuthEvent::TicketInvalidated {
            account_id: account_id.to_string(),
        }));

        info!("Ticket invalidated");
        Ok(())
    }

    pub async fn has_ticket(&self, account_id: &AccountId) -> Result<bool> {
        self.ticket_store.has_ticket(account_id).await
    }
}

#[async_trait]
impl CredentialProvider for TicketManager {
    async fn get_token(
        &self,
        account_id: &AccountId,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.get_ticket(account_id, cancel)
            .await
            .map(|ticket| ticket.ticket_hash)
    }

    async fn invalidate(&self, account_id: &AccountId) -> Result<()> {
        self.sign_out(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket_store::tests::MockSecureStore;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpResponse;
    use core_runtime::events::EventStream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replies with a fixed status/body and records every request.
    struct MockHttpClient {
        status: u16,
        body: &'static str,
        requests: std::sync::Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn replying(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                requests: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            if self.status == 0 {
                return Err(BridgeError::ConnectionFailed("refused".to_string()));
            }
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    enum Prompt {
        Submit,
        Dismiss,
        Hang,
    }

    struct ScriptedAuthenticator {
        prompt: Prompt,
        calls: AtomicUsize,
    }

    impl ScriptedAuthenticator {
        fn new(prompt: Prompt) -> Arc<Self> {
            Arc::new(Self {
                prompt,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InteractiveAuthenticator for ScriptedAuthenticator {
        async fn request_credentials(
            &self,
            _account_id: &AccountId,
        ) -> Result<Option<Credentials>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.prompt {
                Prompt::Submit => Ok(Some(Credentials::new("dj", "s3cret"))),
                Prompt::Dismiss => Ok(None),
                Prompt::Hang => std::future::pending().await,
            }
        }
    }

    const TICKET_REPLY: &str = r#"{"ticket_hash": "f00dfeed", "user_id": 7}"#;

    fn manager(
        http: Arc<MockHttpClient>,
        authenticator: Arc<ScriptedAuthenticator>,
        secure: MockSecureStore,
    ) -> (TicketManager, EventBus) {
        let bus = EventBus::new(32);
        let config = TicketManagerConfig {
            base_url: "http://udj.test/udj/".to_string(),
            auth_timeout: Duration::from_millis(200),
            ..TicketManagerConfig::default()
        };
        let manager =
            TicketManager::new(Arc::new(secure), http, authenticator, bus.clone(), config);
        (manager, bus)
    }

    #[tokio::test]
    async fn test_sign_in_posts_form_and_caches_ticket() {
        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let authenticator = ScriptedAuthenticator::new(Prompt::Submit);
        let (manager, bus) =
            manager(http.clone(), authenticator.clone(), MockSecureStore::default());
        let mut events = bus.subscribe();
        let account = AccountId::new("dj");

        let token = manager
            .get_token(&account, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(token, "f00dfeed");

        let request = http.requests.lock().unwrap()[0].clone();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "http://udj.test/udj/auth");
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            request.headers.get(API_VERSION_HEADER).map(String::as_str),
            Some("0.6")
        );
        assert_eq!(
            request.body,
            Some(Bytes::from_static(b"username=dj&password=s3cret"))
        );

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::CredentialsRequired { .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::SignedIn { user_id: 7, .. })
        ));
        assert!(manager.has_ticket(&account).await.unwrap());
    }

    #[tokio::test]
    async fn test_cached_ticket_skips_prompt() {
        let secure = MockSecureStore::default();
        TicketStore::new(Arc::new(secure.clone()))
            .store_ticket(&AccountId::new("dj"), &Ticket::new("cached", 1))
            .await
            .unwrap();

        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let authenticator = ScriptedAuthenticator::new(Prompt::Submit);
        let (manager, _bus) = manager(http.clone(), authenticator.clone(), secure);

        let token = manager
            .get_token(&AccountId::new("dj"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(token, "cached");
        assert_eq!(authenticator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_prompt() {
        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let (manager, _bus) = manager(
            http.clone(),
            ScriptedAuthenticator::new(Prompt::Hang),
            MockSecureStore::default(),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = manager
            .get_token(&AccountId::new("dj"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(http.request_count(), 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_token_fails_fast() {
        let authenticator = ScriptedAuthenticator::new(Prompt::Submit);
        let (manager, _bus) = manager(
            MockHttpClient::replying(200, TICKET_REPLY),
            authenticator.clone(),
            MockSecureStore::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = manager
            .get_token(&AccountId::new("dj"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(authenticator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_is_cancellation() {
        let (manager, bus) = manager(
            MockHttpClient::replying(200, TICKET_REPLY),
            ScriptedAuthenticator::new(Prompt::Dismiss),
            MockSecureStore::default(),
        );
        let mut errors = EventStream::new(bus.subscribe())
            .filter(|e| matches!(e, CoreEvent::Auth(AuthEvent::AuthError { .. })));

        let err = manager
            .get_token(&AccountId::new("dj"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert!(errors.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_prompt_timeout() {
        let (manager, _bus) = manager(
            MockHttpClient::replying(200, TICKET_REPLY),
            ScriptedAuthenticator::new(Prompt::Hang),
            MockSecureStore::default(),
        );

        let err = manager
            .get_token(&AccountId::new("dj"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::OperationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_unauthorized_is_invalid_credentials() {
        let account = AccountId::new("dj");
        let (manager, _bus) = manager(
            MockHttpClient::replying(401, ""),
            ScriptedAuthenticator::new(Prompt::Submit),
            MockSecureStore::default(),
        );

        let err = manager
            .get_token(&account, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!err.is_recoverable());
        assert!(!manager.has_ticket(&account).await.unwrap());
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let (manager, _bus) = manager(
            MockHttpClient::replying(0, ""),
            ScriptedAuthenticator::new(Prompt::Submit),
            MockSecureStore::default(),
        );

        let err = manager
            .sign_in(&Credentials::new("dj", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_unexpected_response() {
        let (manager, _bus) = manager(
            MockHttpClient::replying(200, "<html>maintenance</html>"),
            ScriptedAuthenticator::new(Prompt::Submit),
            MockSecureStore::default(),
        );

        let err = manager
            .sign_in(&Credentials::new("dj", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UnexpectedResponse { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache_and_emits() {
        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let authenticator = ScriptedAuthenticator::new(Prompt::Submit);
        let (manager, bus) =
            manager(http.clone(), authenticator.clone(), MockSecureStore::default());
        let account = AccountId::new("dj");
        let cancel = CancellationToken::new();

        manager.get_token(&account, &cancel).await.unwrap();
        let mut events = bus.subscribe();
        manager.invalidate(&account).await.unwrap();

        assert!(!manager.has_ticket(&account).await.unwrap());
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TicketInvalidated { .. })
        ));

        manager.get_token(&account, &cancel).await.unwrap();
        assert_eq!(authenticator.calls.load(Ordering::SeqCst), 2);
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_prompt() {
        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let authenticator = ScriptedAuthenticator::new(Prompt::Submit);
        let (manager, _bus) =
            manager(http.clone(), authenticator.clone(), MockSecureStore::default());
        let manager = Arc::new(manager);
        let account = AccountId::new("dj");

        let (cancel_first, cancel_second) = (CancellationToken::new(), CancellationToken::new());
        let (first, second) = tokio::join!(
            manager.get_token(&account, &cancel_first),
            manager.get_token(&account, &cancel_second),
        );

        assert_eq!(first.unwrap(), "f00dfeed");
        assert_eq!(second.unwrap(), "f00dfeed");
        assert_eq!(authenticator.calls.load(Ordering::SeqCst), 1);
        assert!(manager.sign_in_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_lock_released_when_prompt_dismissed() {
        let http = MockHttpClient::replying(200, TICKET_REPLY);
        let authenticator = ScriptedAuthenticator::new(Prompt::Dismiss);
        let (manager, _bus) =
            manager(http.clone(), authenticator.clone(), MockSecureStore::default());

        for account in ["dj", "guest"] {
            let err = manager
                .get_token(&AccountId::new(account), &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Cancelled));
        }

        assert!(manager.sign_in_locks.lock().await.is_empty());
        assert_eq!(http.request_count(), 0);
    }
}
