//! HTTP bridge.
//!
//! The UDJ protocol is plain JSON over HTTPS with the ticket carried in a
//! header, so the core only needs a small request/response model. Hosts
//! supply the transport (reqwest on desktop, OkHttp behind JNI on Android).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{BridgeError, Result};

/// Methods used by the UDJ endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether replaying the request cannot duplicate a server-side effect.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request deadline; falls back to the client's default when unset.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Serialize `payload` as the body and tag it `application/json`.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload)
            .map_err(|e| BridgeError::OperationFailed(format!("cannot encode JSON body: {e}")))?;
        Ok(self
            .header("Content-Type", "application/json")
            .body(Bytes::from(encoded)))
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A response that reached the client, whatever its status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("cannot decode JSON body: {e}")))
    }

    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|e| BridgeError::OperationFailed(format!("body is not UTF-8: {e}")))
    }

    /// Header value by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(key, value)| key.eq_ignore_ascii_case(name).then_some(value.as_str()))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level retry settings.
///
/// Only transport failures and gateway errors are retried. A received 4xx
/// is an answer, not a glitch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `1` disables retrying.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), doubling each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << doublings)
            .min(self.max_backoff)
    }

    /// Statuses that mean the request never reached the UDJ application.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 502..=504)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Host-provided HTTP transport.
///
/// `execute` returns `Ok` for every response received, including 401 and
/// 5xx; mapping statuses to meaning is the caller's job. `Err` is reserved
/// for failures where no response arrived (DNS, TLS, refused connection,
/// timeout), reported as [`BridgeError::ConnectionFailed`] or
/// [`BridgeError::Timeout`].
///
/// ```ignore
/// let response = client
///     .execute(
///         HttpRequest::new(HttpMethod::Get, "https://udj.example/udj/events/7/active_playlist")
///             .header("X-Udj-Ticket-Hash", ticket),
///     )
///     .await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Like `execute`, honouring `policy`. The default makes one attempt.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_is_tagged() {
        let url = "https://udj.test/udj/events/7/active_playlist/songs";
        let request = HttpRequest::new(HttpMethod::Put, url)
            .header("X-Udj-Api-Version", "0.6")
            .json(&serde_json::json!([{"lib_id": 5001, "client_request_id": 101}]))
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body[0]["lib_id"], 5001);
        assert_eq!(body[0]["client_request_id"], 101);
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            request.headers.get("X-Udj-Api-Version").map(String::as_str),
            Some("0.6")
        );
        assert_eq!(request.timeout, None);
    }

    #[test]
    fn test_response_helpers() {
        let mut headers = HashMap::new();
        headers.insert("www-authenticate".to_string(), "ticket-hash".to_string());
        let response = HttpResponse {
            status: 401,
            headers,
            body: Bytes::from_static(b"{\"detail\": \"expired\"}"),
        };

        assert!(!response.is_success());
        assert_eq!(response.header("WWW-Authenticate"), Some("ticket-hash"));
        assert_eq!(response.header("Retry-After"), None);
        let detail: serde_json::Value = response.json().unwrap();
        assert_eq!(detail["detail"], "expired");
    }

    #[test]
    fn test_non_utf8_body_is_an_error() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(&[0xff, 0xfe]),
        };
        assert!(matches!(response.text(), Err(BridgeError::OperationFailed(_))));
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_millis(250),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(250));
        assert_eq!(policy.delay_for(40), Duration::from_millis(250));
        assert_eq!(RetryPolicy::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_only_gateway_statuses_retry() {
        assert!(RetryPolicy::is_retryable_status(503));
        assert!(!RetryPolicy::is_retryable_status(401));
        assert!(!RetryPolicy::is_retryable_status(500));
        assert!(!HttpMethod::Post.is_idempotent());
        assert!(HttpMethod::Put.is_idempotent());
    }
}
