//! `HttpClient` over reqwest with rustls.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::{Client, Method};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("udj-sync-core/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Desktop transport for the UDJ API.
///
/// `execute` applies [`RetryPolicy::default`]. Connection failures are
/// retried for every method; timeouts and gateway statuses only for
/// idempotent ones, since a timed out POST may already have been applied.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(USER_AGENT)
            .build()
            .map(Self::with_client)
            .map_err(|e| BridgeError::NotAvailable(format!("reqwest client: {e}")))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        BridgeError::ConnectionFailed(err.to_string())
    } else {
        BridgeError::OperationFailed(err.to_string())
    }
}

fn should_retry(method: HttpMethod, outcome: &Result<HttpResponse>) -> bool {
    match outcome {
        Ok(response) => {
            method.is_idempotent() && RetryPolicy::is_retryable_status(response.status)
        }
        Err(BridgeError::ConnectionFailed(_)) => true,
        Err(BridgeError::Timeout(_)) => method.is_idempotent(),
        Err(_) => false,
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            debug!(method = %request.method, url = %request.url, attempt, "sending request");
            let outcome = self.send_once(&request).await;
            if attempt >= attempts || !should_retry(request.method, &outcome) {
                return outcome;
            }

            let delay = policy.delay_for(attempt);
            match &outcome {
                Ok(response) => warn!(status = response.status, attempt, ?delay, "retrying"),
                Err(err) => warn!(error = %err, attempt, ?delay, "retrying"),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
