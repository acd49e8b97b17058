// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Record fetching (pages, failures, SQLite retries)
//! - Publishing (messages, broker calls, retries)
//! - Cycles (duration, errors, watermark)
//! - Engine lifecycle state
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `relay_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use change_relay::metrics;
//! use std::time::Duration;
//!
//! // After a fetch fan-out
//! metrics::record_fetch(250, 2, 0, Duration::from_millis(40));
//!
//! // After publishing a cycle's chunks
//! metrics::record_publish("products", 250, 248, 2, Duration::from_millis(900));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Record one paged fetch of changed records.
pub fn record_fetch(records: usize, pages: usize, failed_pages: usize, duration: Duration) {
    counter!("relay_records_fetched_total").increment(records as u64);
    counter!("relay_pages_fetched_total").increment(pages.saturating_sub(failed_pages) as u64);
    histogram!("relay_fetch_duration_seconds").record(duration.as_secs_f64());
    histogram!("relay_fetch_records").record(records as f64);
}

/// Record a page that failed and was skipped.
pub fn record_page_failure() {
    counter!("relay_page_failures_total").increment(1);
}

/// Record a SQLite busy/locked retry.
pub fn record_store_retry(operation: &str) {
    counter!("relay_store_retries_total", "operation" => operation.to_string()).increment(1);
}

// =============================================================================
// Publish Metrics
// =============================================================================

/// Record a broker call outcome (`success`, `partial`, `transport_error`,
/// `empty_id`).
pub fn record_broker_call(topic: &str, kind: &str, outcome: &str) {
    counter!(
        "relay_broker_calls_total",
        "topic" => topic.to_string(),
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a retry of still-pending messages.
pub fn record_publish_retry(topic: &str, pending: usize) {
    counter!("relay_publish_retries_total", "topic" => topic.to_string()).increment(1);
    counter!("relay_messages_retried_total", "topic" => topic.to_string()).increment(pending as u64);
}

/// Record the merged outcome of publishing a cycle's chunks.
pub fn record_publish(
    topic: &str,
    attempted: usize,
    confirmed: usize,
    failed: usize,
    duration: Duration,
) {
    let topic = topic.to_string();

    counter!("relay_messages_attempted_total", "topic" => topic.clone())
        .increment(attempted as u64);
    counter!("relay_messages_confirmed_total", "topic" => topic.clone())
        .increment(confirmed as u64);

    if failed > 0 {
        counter!("relay_messages_failed_total", "topic" => topic.clone()).increment(failed as u64);
    }

    histogram!("relay_publish_duration_seconds", "topic" => topic).record(duration.as_secs_f64());
}

/// Record a single-message publish.
pub fn record_single_publish(topic: &str, success: bool, attempts: usize) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "relay_single_publish_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("relay_single_publish_attempts").record(attempts as f64);
}

// =============================================================================
// Cycle Metrics
// =============================================================================

/// Record a completed cycle.
pub fn record_cycle(attempted: usize, confirmed: usize, errors: usize, duration: Duration) {
    counter!("relay_cycles_total").increment(1);
    histogram!("relay_cycle_duration_seconds").record(duration.as_secs_f64());
    histogram!("relay_cycle_messages").record(attempted as f64);
    gauge!("relay_last_cycle_confirmed").set(confirmed as f64);
    gauge!("relay_last_cycle_errors").set(errors as f64);
}

/// Record a cycle-level error by kind (see `RelayError::kind`).
pub fn record_cycle_error(kind: &str) {
    counter!("relay_cycle_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Watermark gauge, as Unix seconds.
pub fn set_watermark(unix_seconds: i64) {
    gauge!("relay_watermark_seconds").set(unix_seconds as f64);
}

/// Gauge for engine state.
pub fn set_engine_state(state: &str) {
    let value = match state {
        "Created" => 0.0,
        "Running" => 1.0,
        "ShuttingDown" => 2.0,
        "Stopped" => 3.0,
        "Failed" => 4.0,
        _ => -1.0,
    };
    gauge!("relay_engine_state").set(value);
}
