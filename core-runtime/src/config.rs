//! `CoreConfig`: where the outbox lives, which UDJ server to talk to and
//! which host bridges to talk through.
//!
//! `build()` fills in defaults and validates up front, so a bad URL or a
//! zero timeout is reported at startup rather than on the first sync. With
//! the `desktop-shims` feature, missing bridges fall back to the reqwest and
//! keyring implementations from `bridge-desktop`.
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .database_path("/data/udj.db")
//!     .server_base_url("https://udjplayer.com:4897/udj")
//!     .request_timeout(Duration::from_secs(15))
//!     .secure_store(Arc::new(AndroidKeystore::new(env)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SecureStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Production UDJ endpoint.
pub const DEFAULT_SERVER_BASE_URL: &str = "https://udjplayer.com:4897/udj/";

/// Value sent in the `X-Udj-Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "0.6";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on waiting for the user to enter credentials.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = crate::events::DEFAULT_EVENT_BUFFER_SIZE;

#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Base URL of the UDJ server, always ending with `/`
    pub server_base_url: String,

    pub api_version: String,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Upper bound on interactive credential entry
    pub auth_timeout: Duration,

    /// Buffer size of the event bus channel
    pub event_buffer_size: usize,

    /// HTTP client (always populated after `build()` with desktop shims)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Secure ticket storage
    pub secure_store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("server_base_url", &self.server_base_url)
            .field("api_version", &self.api_version)
            .field("request_timeout", &self.request_timeout)
            .field("auth_timeout", &self.auth_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("secure_store", &"SecureStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks invariants that `build()` establishes. Useful again after a
    /// caller has mutated the public fields.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if !(self.server_base_url.starts_with("https://")
            || self.server_base_url.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "Server base URL must start with http:// or https://, got '{}'",
                self.server_base_url
            )));
        }

        if !self.server_base_url.ends_with('/') {
            return Err(Error::Config(
                "Server base URL must end with '/'; build() normalizes this automatically"
                    .to_string(),
            ));
        }

        if self.api_version.trim().is_empty() {
            return Err(Error::Config("API version cannot be empty".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.auth_timeout.is_zero() {
            return Err(Error::Config(
                "Auth timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the HTTP client or an actionable error when none was injected.
    pub fn require_http_client(&self) -> Result<Arc<dyn HttpClient>> {
        self.http_client.clone().ok_or_else(http_client_missing_error)
    }
}

fn missing(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "no {capability} was injected and no desktop default is compiled in; {hint}"
        ),
    }
}

fn http_client_missing_error() -> Error {
    missing(
        "HttpClient",
        "pass one to CoreConfigBuilder::http_client or enable the 'desktop-shims' feature",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(missing(
        "SecureStore",
        "tickets must be persisted in the platform keystore; pass one to CoreConfigBuilder::secure_store",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    Ok(None)
}

fn normalize_base_url(url: String) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    server_base_url: Option<String>,
    api_version: Option<String>,
    request_timeout: Option<Duration>,
    auth_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
}

impl CoreConfigBuilder {
    /// SQLite file for the outbox and playlist cache; `":memory:"` for a
    /// throwaway database.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the UDJ server base URL. A missing trailing `/` is added.
    ///
    /// Default: [`DEFAULT_SERVER_BASE_URL`]
    pub fn server_base_url(mut self, url: impl Into<String>) -> Self {
        self.server_base_url = Some(url.into());
        self
    }

    /// Default: [`DEFAULT_API_VERSION`]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 120 seconds
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// Tickets returned by the UDJ server are persisted here. Required unless
    /// the `desktop-shims` feature supplies the keyring store.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// # Errors
    ///
    /// [`Error::Config`] for a missing database path or an invalid value,
    /// [`Error::CapabilityMissing`] when no `SecureStore` can be provided.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "Database path is required. Use .database_path() to set it.".to_string(),
            )
        })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            database_path,
            server_base_url: normalize_base_url(
                self.server_base_url
                    .unwrap_or_else(|| DEFAULT_SERVER_BASE_URL.to_string()),
            ),
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            request_timeout,
            auth_timeout: self.auth_timeout.unwrap_or(DEFAULT_AUTH_TIMEOUT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
        };

        config.validate()?;
        Ok(config)
    }
}
