// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! One relay cycle: fetch changed records, advance the watermark, publish.
//!
//! # Algorithm
//!
//! 1. Read the watermark `W`
//! 2. Fetch every changed record since `W` (concurrent pages)
//! 3. Set `W` to now, whatever the fetch returned (even an error)
//! 4. Nothing fetched → empty report, no publish
//! 5. Serialize every record in fetch order; one failure aborts the publish
//! 6. Chunk and publish concurrently, merge outcomes
//! 7. Report
//!
//! Advancing the watermark before publishing means a failed publish is not
//! retried by the next cycle. Delivery is at-least-once only within a cycle.

use super::types::CycleReport;
use crate::batch::BatchPublisher;
use crate::broker::Broker;
use crate::clock::Clock;
use crate::error::{PublishError, Result};
use crate::metrics;
use crate::record::{to_messages, OutboundMessage, Watermark};
use crate::single::publish_one;
use crate::store::{fetch_all_since, RecordStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Owns the watermark and runs cycles against a store and a broker.
pub struct CycleOrchestrator<S: RecordStore, B: Broker, C: Clock> {
    store: Arc<S>,
    publisher: BatchPublisher<B>,
    broker: Arc<B>,
    clock: Arc<C>,
    topic: String,
    page_size: usize,
    watermark: Watermark,
}

impl<S: RecordStore, B: Broker, C: Clock> CycleOrchestrator<S, B, C> {
    /// Create an orchestrator starting from [`Watermark::beginning`].
    pub fn new(
        store: Arc<S>,
        publisher: BatchPublisher<B>,
        broker: Arc<B>,
        clock: Arc<C>,
        topic: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            publisher,
            broker,
            clock,
            topic: topic.into(),
            page_size,
            watermark: Watermark::beginning(),
        }
    }

    /// Start from a specific watermark instead of the beginning.
    pub fn with_watermark(mut self, watermark: Watermark) -> Self {
        self.watermark = watermark;
        self
    }

    /// Current watermark.
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Topic events are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run one cycle.
    ///
    /// `Err` means the cycle published nothing: the count query failed or a
    /// record could not be serialized. The watermark has advanced either way.
    #[instrument(skip(self), fields(topic = %self.topic, since = %self.watermark))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let start = Instant::now();
        let since = self.watermark;

        info!("Starting relay cycle");

        let fetched = fetch_all_since(&self.store, Some(since), self.page_size).await;
        self.advance_watermark();

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to fetch changed records");
                metrics::record_cycle_error(e.kind());
                return Err(e);
            }
        };

        if records.is_empty() {
            info!("No records changed since last cycle");
            let report = CycleReport::empty(since, self.watermark, start.elapsed());
            metrics::record_cycle(0, 0, 0, report.duration);
            return Ok(report);
        }

        let messages = match to_messages(&records) {
            Ok(messages) => messages,
            Err(e) => {
                error!(error = %e, records = records.len(), "Failed to serialize changed record, skipping publish");
                metrics::record_cycle_error(e.kind());
                return Err(e);
            }
        };

        {
            let keys: Vec<&str> = messages.iter().map(|m| m.partition_key.as_str()).collect();
            info!(changed = messages.len(), keys = ?keys, "Publishing change events");
        }

        let outcome = self.publisher.publish_chunks(&self.topic, messages).await;

        let report = CycleReport {
            since,
            watermark: self.watermark,
            fetched: records.len(),
            attempted: outcome.attempted,
            confirmed: outcome.confirmed,
            failures: outcome.failures,
            duration: start.elapsed(),
        };

        metrics::record_cycle(report.attempted, report.confirmed, report.errors(), report.duration);

        if report.is_clean() {
            info!(
                attempted = report.attempted,
                confirmed = report.confirmed,
                duration_ms = report.duration.as_millis() as u64,
                "Relay cycle complete"
            );
        } else {
            warn!(
                attempted = report.attempted,
                confirmed = report.confirmed,
                errors = report.errors(),
                duration_ms = report.duration.as_millis() as u64,
                "Relay cycle complete with publish errors"
            );
        }

        Ok(report)
    }

    /// Publish one message outside the cycle, with the publisher's retry policy.
    pub async fn send_one(&self, message: &OutboundMessage) -> std::result::Result<String, PublishError> {
        publish_one(
            self.broker.as_ref(),
            &self.topic,
            message,
            self.publisher.retry_policy(),
        )
        .await
    }

    fn advance_watermark(&mut self) {
        self.watermark = Watermark::at(self.clock.now());
        metrics::set_watermark(self.watermark.instant().timestamp());
    }
}
