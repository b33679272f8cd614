//! Capabilities the UDJ sync core needs from its host.
//!
//! The core is embedded in an Android app and in desktop tools, so anything
//! platform specific sits behind a trait here:
//!
//! - [`HttpClient`](http::HttpClient): HTTPS transport to the UDJ server
//! - [`SecureStore`](storage::SecureStore): ticket persistence
//! - [`Clock`](time::Clock): timestamps for outbox rows
//! - [`LoggerSink`](sink::LoggerSink): forwarding of core log lines
//!
//! `bridge-desktop` implements the first two for desktop targets. Every
//! trait is `Send + Sync` because the core shares bridges across tasks
//! behind `Arc`.
//!
//! Failures are reported as [`BridgeError`]. Transport problems
//! (`Timeout`, `ConnectionFailed`) stay distinguishable so the sync layer can
//! classify them as network failures rather than protocol errors.

pub mod error;
pub mod http;
pub mod sink;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::SecureStore;
pub use time::{Clock, SystemClock};
