//! Clock and host-logging abstractions.
//!
//! Wall-clock time feeds the `last_modified` stamps that conflict
//! resolution compares, so it is injected rather than read ambiently.
//! The logger sink lets hosts mirror core logs into their own pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Injectable time source.
///
/// Every local mutation is stamped with `Clock::now()`, and those stamps
/// later decide last-writer-wins conflicts against the server. Tests
/// substitute a fixed clock to make tie and ordering cases reproducible.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current Unix timestamp in whole seconds.
    fn unix_timestamp(&self) -> i64 {
        self.now().timestamp()
    }

    /// Current Unix timestamp in milliseconds.
    ///
    /// This is the resolution stored in the state table and compared
    /// during conflict resolution.
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Log severity, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case name, as printed by [`ConsoleLogger`].
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One structured log event handed to a [`LoggerSink`].
///
/// Carries the message plus whatever key/value fields the originating
/// `tracing` event recorded, already rendered to strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module path or explicit `target:` of the originating event.
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
    /// Name of the innermost active span, when one exists.
    pub span_id: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span_id: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }
}

/// Host logging sink.
///
/// Hosts that already own a logging pipeline (OSLog, Logcat, a file
/// appender) implement this to receive the core's log events. Entries
/// below `min_level()` are dropped before the sink ever sees them.
///
/// Access tokens never appear in core log output, but sinks should still
/// apply the host's own privacy policy before persisting entries.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Deliver one entry to the host logging system.
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush buffered entries, if the sink buffers.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Threshold below which entries are filtered out at the source.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Stdout sink for development and tests.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        let mut line = format!(
            "[{}] {:5} {}: {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str(),
            entry.target,
            entry.message
        );

        for (key, value) in &entry.fields {
            line.push_str(&format!(" {}={}", key, value));
        }

        println!("{}", line);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_agrees_with_itself() {
        let clock = SystemClock;
        let now = clock.now();
        let secs = clock.unix_timestamp();

        assert!(secs > 0);
        assert!((now.timestamp() - secs).abs() <= 1);
    }

    #[test]
    fn millis_are_finer_than_seconds() {
        let clock = SystemClock;
        let millis = clock.unix_timestamp_millis();
        let secs = clock.unix_timestamp();

        assert!(millis / 1000 - secs <= 1);
    }

    #[test]
    fn log_levels_order_by_verbosity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn log_entry_builder_accumulates_fields() {
        let entry = LogEntry::new(LogLevel::Warn, "core_sync", "push requeued")
            .with_field("item_id", "f2ca1bb6")
            .with_field("attempt", "2")
            .with_span_id("sync_pass");

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.target, "core_sync");
        assert_eq!(entry.fields.len(), 2);
        assert_eq!(entry.span_id.as_deref(), Some("sync_pass"));
    }

    #[tokio::test]
    async fn console_logger_drops_below_threshold() {
        let logger = ConsoleLogger {
            min_level: LogLevel::Warn,
        };

        // Both paths must succeed; the Debug entry is filtered silently.
        logger
            .log(LogEntry::new(LogLevel::Debug, "test", "dropped"))
            .await
            .unwrap();
        logger
            .log(LogEntry::new(LogLevel::Error, "test", "printed"))
            .await
            .unwrap();
    }
}
