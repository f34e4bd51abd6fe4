//! Logging demonstration.
//!
//! Shows the logging facilities used across the core crates: output formats,
//! structured fields, spans, PII redaction helpers, and `#[instrument]`.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example logging_demo           # pretty format
//! cargo run --example logging_demo json      # JSON format
//! cargo run --example logging_demo compact   # compact format
//! ```

use bridge_traits::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig};
use tracing::{debug, error, info, info_span, instrument, trace, warn};

fn main() {
    let format = match std::env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    let config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_pii_redaction(true);

    if let Err(err) = init_logging(config) {
        eprintln!("Failed to initialize logging: {}", err);
        return;
    }

    info!(format = ?format, "Logging initialized");

    demo_log_levels();
    demo_structured_fields();
    demo_spans();
    demo_pii_redaction();
    demo_instrumentation();

    info!("Demo complete");
}

fn demo_log_levels() {
    info!("--- Log levels ---");
    trace!("Trace: channel capacity check");
    debug!("Debug: coalesced 3 queued sync requests");
    info!("Info: sync pass completed");
    warn!("Warn: server returned 429, backing off");
    error!("Error: server unreachable after retries");
}

fn demo_structured_fields() {
    info!("--- Structured fields ---");
    info!(
        user_id = "b1946ac92492d2347c6235b4d2611184",
        item_id = "f2ca1bb6c7e907d06dafe4687e579fce",
        played = true,
        position_ticks = 36_000_000_000i64,
        "Playback state recorded"
    );
    info!(pushed = 4, merged = 1, retained = 0, "Sync pass summary");
}

fn demo_spans() {
    info!("--- Spans ---");

    let span = info_span!("sync_pass", server = "jellyfin", trigger = "mutation");
    let _guard = span.enter();

    info!("Sync pass started");

    {
        let list_span = info_span!("list_dirty", user_id = "b1946ac9");
        let _list_guard = list_span.enter();
        debug!(count = 4, "Found dirty records");
    }

    {
        let push_span = info_span!("push_states", user_id = "b1946ac9");
        let _push_guard = push_span.enter();
        debug!(item_id = "f2ca1bb6", "Pushed record");
        debug!(item_id = "a3dcb4d2", "Pushed record");
    }

    info!(pushed = 2, "Sync pass completed");
}

fn demo_pii_redaction() {
    info!("--- PII redaction helpers ---");

    let token = redact_if_sensitive("access_token", "mF_9.B5f-4.1JqM");
    info!(access_token = %token, "Token redacted before logging");

    let email = redact_if_sensitive("email", "alice@example.com");
    info!(email = %email, "Email partially redacted");

    let item = redact_if_sensitive("item_id", "f2ca1bb6c7e907d0");
    info!(item_id = %item, "Non-sensitive fields pass through");

    let db = strip_path("/home/alice/.local/share/media-client/client.db");
    info!(database = %db, "Paths reduced to file names");
}

#[instrument]
fn process_items(count: usize) {
    info!("--- Instrumentation ---");
    for idx in 0..count {
        process_item(&format!("item-{:04}", idx));
    }
}

#[instrument(fields(item_id = %item_id))]
fn process_item(item_id: &str) {
    debug!("Processing item");
}

fn demo_instrumentation() {
    process_items(3);
}
