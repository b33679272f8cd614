//! End-to-end tests for the service façade: config -> bootstrap -> sign-in ->
//! submit -> refresh, against a scripted UDJ server.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::SecureStore;
use bytes::Bytes;
use core_service::{
    AccountId, CancellationToken, CoreConfig, CoreError, CoreEvent, CoreService, Credentials,
    EventId, InteractiveAuthenticator, LibraryTrackId, SyncCommand, SyncErrorKind, SyncOutcome,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct MemorySecureStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.secrets
            .lock()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.secrets.lock().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.secrets.lock().await.remove(key);
        Ok(())
    }
}

/// Scripted UDJ server reachable through the `HttpClient` bridge.
#[derive(Default)]
struct FakeUdjServer {
    requests: Mutex<Vec<HttpRequest>>,
    reject_tickets: bool,
}

impl FakeUdjServer {
    async fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().await.clone()
    }

    fn reply(status: u16, body: &str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }
}

#[async_trait]
impl HttpClient for FakeUdjServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().await.push(request.clone());

        let path = request
            .url
            .strip_prefix("http://udj.test/udj/")
            .ok_or_else(|| BridgeError::ConnectionFailed(request.url.clone()))?;

        match (request.method, path) {
            (HttpMethod::Post, "auth") => {
                Self::reply(200, r#"{"ticket_hash": "t-123", "user_id": 3}"#)
            }
            _ if self.reject_tickets => Self::reply(401, "bad ticket"),
            (HttpMethod::Put, "events/7/active_playlist/songs") => Self::reply(201, ""),
            (HttpMethod::Get, "events/7/active_playlist") => Self::reply(
                200,
                r#"{"active_playlist": [
                    {"song": {"id": 5001, "title": "A", "artist": "X", "album": "Y", "duration": 200},
                     "upvoters": [], "downvoters": [], "time_added": "2012-06-01T20:00:00",
                     "adder": {"id": 3, "username": "alice"}},
                    {"song": {"id": 5002, "title": "B", "artist": "X", "album": "Y", "duration": 180},
                     "upvoters": [{"id": 4, "username": "bob"}], "downvoters": [],
                     "time_added": "2012-06-01T20:01:00", "adder": {"id": 3, "username": "alice"}}
                ]}"#,
            ),
            _ => Self::reply(404, "not found"),
        }
    }
}

struct CountingAuthenticator {
    prompts: AtomicUsize,
}

#[async_trait]
impl InteractiveAuthenticator for CountingAuthenticator {
    async fn request_credentials(
        &self,
        _account_id: &AccountId,
    ) -> core_auth::Result<Option<Credentials>> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Credentials::new("alice", "hunter2")))
    }
}

async fn bootstrap(
    server: Arc<FakeUdjServer>,
) -> (CoreService, Arc<CountingAuthenticator>, Arc<MemorySecureStore>) {
    let secure_store = Arc::new(MemorySecureStore::default());
    let config = CoreConfig::builder()
        .database_path(":memory:")
        .server_base_url("http://udj.test/udj")
        .http_client(server)
        .secure_store(secure_store.clone())
        .build()
        .unwrap();
    let authenticator = Arc::new(CountingAuthenticator {
        prompts: AtomicUsize::new(0),
    });

    let core = CoreService::bootstrap(config, authenticator.clone())
        .await
        .unwrap();
    (core, authenticator, secure_store)
}

#[tokio::test]
async fn test_sync_add_requests_through_full_stack() {
    let server = Arc::new(FakeUdjServer::default());
    let (core, authenticator, _) = bootstrap(server.clone()).await;
    let mut events = core.subscribe_events();

    let first = core
        .enqueue_add_request(EventId(7), LibraryTrackId(5001))
        .await
        .unwrap();
    let second = core
        .enqueue_add_request(EventId(7), LibraryTrackId(5002))
        .await
        .unwrap();
    assert_eq!(core.pending_count(EventId(7)).await.unwrap(), 2);

    let outcome = core
        .dispatch(
            SyncCommand::sync_add_requests("alice", EventId(7)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            submitted: 2,
            entries: 2
        }
    );
    assert_eq!(core.pending_count(EventId(7)).await.unwrap(), 0);
    assert_eq!(authenticator.prompts.load(Ordering::SeqCst), 1);

    let playlist = core.active_playlist(EventId(7)).await.unwrap();
    assert_eq!(playlist.len(), 2);
    assert_eq!(playlist[0].title, "A");
    assert_eq!(playlist[1].upvotes, 1);

    let requests = server.requests().await;
    let put = requests
        .iter()
        .find(|r| r.method == HttpMethod::Put)
        .unwrap();
    assert_eq!(
        put.headers.get("X-Udj-Ticket-Hash").map(String::as_str),
        Some("t-123")
    );
    let body: serde_json::Value = serde_json::from_slice(put.body.as_ref().unwrap()).unwrap();
    assert_eq!(
        body,
        serde_json::json!([
            {"lib_id": 5001, "client_request_id": first.value()},
            {"lib_id": 5002, "client_request_id": second.value()}
        ])
    );

    let mut saw_sign_in = false;
    while let Some(Ok(event)) = events.try_recv() {
        if let CoreEvent::Auth(core_runtime::events::AuthEvent::SignedIn { user_id, .. }) = event {
            assert_eq!(user_id, 3);
            saw_sign_in = true;
        }
    }
    assert!(saw_sign_in);
}

#[tokio::test]
async fn test_ticket_is_reused_across_operations() {
    let server = Arc::new(FakeUdjServer::default());
    let (core, authenticator, _) = bootstrap(server.clone()).await;
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        core.dispatch(SyncCommand::refresh_playlist("alice", EventId(7)), &cancel)
            .await
            .unwrap();
    }

    assert_eq!(authenticator.prompts.load(Ordering::SeqCst), 1);
    let logins = server
        .requests()
        .await
        .iter()
        .filter(|r| r.method == HttpMethod::Post)
        .count();
    assert_eq!(logins, 1);
}

#[tokio::test]
async fn test_rejected_ticket_is_cleared_for_next_run() {
    let server = Arc::new(FakeUdjServer {
        reject_tickets: true,
        ..Default::default()
    });
    let (core, _, secure_store) = bootstrap(server).await;

    let err = core
        .dispatch(
            SyncCommand::refresh_playlist("alice", EventId(7)),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, CoreError::Sync(e) if e.kind() == SyncErrorKind::AuthFailure));
    assert!(secure_store.secrets.lock().await.is_empty());
}

#[tokio::test]
async fn test_enqueue_rejects_negative_event() {
    let (core, _, _) = bootstrap(Arc::new(FakeUdjServer::default())).await;

    let err = core
        .enqueue_add_request(EventId(-1), LibraryTrackId(5001))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Sync(e) if e.kind() == SyncErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_bootstrap_requires_http_client() {
    let mut config = CoreConfig::builder()
        .database_path(":memory:")
        .secure_store(Arc::new(MemorySecureStore::default()))
        .build()
        .unwrap();
    config.http_client = None;

    let result = CoreService::bootstrap(
        config,
        Arc::new(CountingAuthenticator {
            prompts: AtomicUsize::new(0),
        }),
    )
    .await;

    assert!(matches!(
        result,
        Err(CoreError::Runtime(core_runtime::Error::CapabilityMissing { .. }))
    ));
}
