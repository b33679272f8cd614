//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::sink::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> BridgeResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}

#[test]
fn test_ticket_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("ticket_hash", "5f2c9a"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("X-Udj-Ticket-Hash", "5f2c9a"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("auth_token", "abc"), "[REDACTED]");
}

#[test]
fn test_email_values_are_masked() {
    let redacted = redact_if_sensitive("username", "dj@example.com");

    assert!(redacted.starts_with('d'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_playlist_fields_pass_through() {
    assert_eq!(redact_if_sensitive("event_id", "42"), "42");
    assert_eq!(redact_if_sensitive("title", "Blue Monday"), "Blue Monday");
    assert_eq!(redact_if_sensitive("batch_size", "2"), "2");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

// Only one global subscriber can exist per test binary, so this is the
// single test that calls `init_logging`.
#[test]
fn test_init_logging_once_forwards_to_sink() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_filter("logging_integration=info")
        .with_logger_sink(sink.clone());

    init_logging(config.clone()).expect("first init succeeds");
    assert!(init_logging(config).is_err(), "second init must fail");

    tracing::info!(event_id = 7, ticket = "secret-hash", "refresh finished");

    let entries = sink.entries.lock().unwrap();
    let entry = entries
        .iter()
        .find(|e| e.message.contains("refresh finished"))
        .expect("sink received the event");
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.fields.get("ticket").map(String::as_str), Some("[REDACTED]"));
    assert_eq!(entry.fields.get("event_id").map(String::as_str), Some("7"));
}
