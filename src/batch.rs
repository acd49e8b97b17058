// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Batch publisher for outbound messages.
//!
//! Publishes one chunk per broker call, tracks which messages the broker
//! confirmed, and retries only the ones still pending.
//!
//! # Design
//!
//! ```text
//! messages ──▶ chunk(10) ──┬──▶ task: publish_batch(chunk 0) ──┐
//!                          ├──▶ task: publish_batch(chunk 1) ──┼──▶ merge ──▶ PublishOutcome
//!                          └──▶ task: publish_batch(chunk N) ──┘
//!
//! publish_batch:
//!   PendingSet { msg-0: pending, msg-1: pending, .. }
//!   attempt 1..=max_attempts while anything is pending:
//!     send pending ──▶ transport error  → keep all, remember error
//!                  ──▶ all succeeded    → clear
//!                  ──▶ mixed            → drop confirmed, record reasons
//! ```
//!
//! Each chunk owns its PendingSet; nothing in a chunk's retry loop is
//! shared with other tasks.

use crate::broker::{BatchEntry, BatchResponse, Broker};
use crate::chunk::{chunk, MAX_BATCH_ENTRIES};
use crate::error::PublishError;
use crate::metrics;
use crate::record::OutboundMessage;
use crate::resilience::RetryPolicy;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

/// Request-local id of the message at `index` within its chunk.
pub fn message_id(index: usize) -> String {
    format!("msg-{}", index)
}

// =============================================================================
// PendingSet
// =============================================================================

#[derive(Debug)]
struct PendingEntry {
    id: String,
    message: OutboundMessage,
    pending: bool,
    last_error: Option<String>,
}

/// Retry bookkeeping for one chunk.
///
/// Maps each request-local id to whether it is still pending and the last
/// reason the broker gave for rejecting it.
#[derive(Debug)]
pub struct PendingSet {
    entries: Vec<PendingEntry>,
    index: HashMap<String, usize>,
    pending: usize,
}

impl PendingSet {
    /// Mark every message of the chunk pending.
    pub fn new(messages: Vec<OutboundMessage>) -> Self {
        let mut index = HashMap::with_capacity(messages.len());
        let entries: Vec<PendingEntry> = messages
            .into_iter()
            .enumerate()
            .map(|(i, message)| {
                let id = message_id(i);
                index.insert(id.clone(), i);
                PendingEntry {
                    id,
                    message,
                    pending: true,
                    last_error: None,
                }
            })
            .collect();

        Self {
            pending: entries.len(),
            entries,
            index,
        }
    }

    /// Number of messages in the chunk.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chunk had no messages at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of messages not yet confirmed.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Whether any message still needs publishing.
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// Request entries for the messages still pending, in chunk order.
    pub fn pending_entries(&self) -> Vec<BatchEntry> {
        self.entries
            .iter()
            .filter(|e| e.pending)
            .map(|e| BatchEntry {
                id: e.id.clone(),
                payload: e.message.payload.clone(),
                group_key: e.message.partition_key.clone(),
            })
            .collect()
    }

    /// Mark a message as published. Returns `false` for unknown or
    /// already-confirmed ids.
    pub fn confirm(&mut self, id: &str) -> bool {
        match self.index.get(id).map(|&i| &mut self.entries[i]) {
            Some(entry) if entry.pending => {
                entry.pending = false;
                entry.last_error = None;
                self.pending -= 1;
                true
            }
            _ => false,
        }
    }

    /// Record a broker rejection. The message stays pending. Returns `false`
    /// for unknown or already-confirmed ids.
    pub fn reject(&mut self, id: &str, reason: impl Into<String>) -> bool {
        match self.index.get(id).map(|&i| &mut self.entries[i]) {
            Some(entry) if entry.pending => {
                entry.last_error = Some(reason.into());
                true
            }
            _ => false,
        }
    }

    /// Apply a mixed broker response.
    ///
    /// Returns `(confirmed, rejected)` counts for this response.
    pub fn apply(&mut self, response: &BatchResponse) -> (usize, usize) {
        let mut confirmed = 0;
        for ok in &response.succeeded {
            if self.confirm(&ok.id) {
                confirmed += 1;
            } else {
                debug!(id = %ok.id, "Broker confirmed an id that was not pending");
            }
        }

        let mut rejected = 0;
        for failed in &response.failed {
            if self.reject(&failed.id, failed.reason.clone()) {
                rejected += 1;
            } else {
                debug!(id = %failed.id, "Broker rejected an id that was not pending");
            }
        }

        (confirmed, rejected)
    }

    /// Confirm everything still pending (broker reported zero failures).
    pub fn confirm_all(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| e.pending) {
            entry.pending = false;
            entry.last_error = None;
        }
        self.pending = 0;
    }

    /// Final per-message errors, one slot per original message.
    ///
    /// A still-pending message reports its last broker reason if it has one,
    /// otherwise the chunk's last transport error.
    pub fn into_errors(
        self,
        attempts: usize,
        last_transport_error: Option<&str>,
    ) -> Vec<Option<PublishError>> {
        self.entries
            .into_iter()
            .map(|entry| {
                if !entry.pending {
                    return None;
                }
                Some(match (entry.last_error, last_transport_error) {
                    (Some(reason), _) => PublishError::Rejected {
                        message_id: entry.id,
                        attempts,
                        reason,
                    },
                    (None, Some(reason)) => PublishError::Transport {
                        message_id: entry.id,
                        attempts,
                        reason: reason.to_string(),
                    },
                    (None, None) => PublishError::Rejected {
                        message_id: entry.id,
                        attempts,
                        reason: "not acknowledged by broker".to_string(),
                    },
                })
            })
            .collect()
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of publishing one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
    /// Messages in the chunk.
    pub attempted: usize,
    /// Messages the broker confirmed.
    pub confirmed: usize,
    /// Broker calls issued (first try included).
    pub broker_calls: usize,
    /// One slot per message, `None` where the message was published.
    pub errors: Vec<Option<PublishError>>,
}

impl ChunkOutcome {
    /// Whether every message was confirmed.
    pub fn is_success(&self) -> bool {
        self.confirmed == self.attempted
    }

    /// The non-empty error slots.
    pub fn failures(&self) -> impl Iterator<Item = &PublishError> {
        self.errors.iter().flatten()
    }
}

/// A message that could not be published, with the chunk it belonged to.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageFailure {
    pub chunk: usize,
    pub error: PublishError,
}

/// Merged result of publishing every chunk of a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOutcome {
    pub attempted: usize,
    pub confirmed: usize,
    pub chunks: usize,
    pub broker_calls: usize,
    /// Failures in chunk order.
    pub failures: Vec<MessageFailure>,
}

impl PublishOutcome {
    /// Whether every message was confirmed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.confirmed == self.attempted
    }

    /// Fold one chunk's outcome in.
    pub fn merge(&mut self, chunk_index: usize, outcome: ChunkOutcome) {
        self.attempted += outcome.attempted;
        self.confirmed += outcome.confirmed;
        self.broker_calls += outcome.broker_calls;
        self.chunks += 1;
        self.failures.extend(outcome.errors.into_iter().flatten().map(|error| MessageFailure {
            chunk: chunk_index,
            error,
        }));
    }

    /// Failures keyed by `chunk-<n>/msg-<i>`.
    pub fn errors_by_message_id(&self) -> BTreeMap<String, PublishError> {
        self.failures
            .iter()
            .map(|f| {
                let id = f.error.message_id().unwrap_or("unknown");
                (format!("chunk-{}/{}", f.chunk, id), f.error.clone())
            })
            .collect()
    }
}

// =============================================================================
// BatchPublisher
// =============================================================================

/// Publishes messages in broker-sized chunks with per-message retry.
pub struct BatchPublisher<B: Broker> {
    broker: Arc<B>,
    retry: RetryPolicy,
    chunk_size: usize,
}

impl<B: Broker> Clone for BatchPublisher<B> {
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            retry: self.retry.clone(),
            chunk_size: self.chunk_size,
        }
    }
}

impl<B: Broker> BatchPublisher<B> {
    /// Create a publisher with the default chunk size.
    pub fn new(broker: Arc<B>, retry: RetryPolicy) -> Self {
        Self::with_chunk_size(broker, retry, MAX_BATCH_ENTRIES)
    }

    /// Create a publisher with an explicit chunk size (clamped to the
    /// broker's batch cap).
    pub fn with_chunk_size(broker: Arc<B>, retry: RetryPolicy, chunk_size: usize) -> Self {
        Self {
            broker,
            retry,
            chunk_size: chunk_size.clamp(1, MAX_BATCH_ENTRIES),
        }
    }

    /// Chunk size in use.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Retry policy in use.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Publish one chunk, retrying only the messages still pending.
    ///
    /// The chunk must hold at most [`MAX_BATCH_ENTRIES`] messages.
    #[instrument(skip(self, messages), fields(topic = %topic, size = messages.len()))]
    pub async fn publish_batch(&self, topic: &str, messages: Vec<OutboundMessage>) -> ChunkOutcome {
        debug_assert!(messages.len() <= MAX_BATCH_ENTRIES, "chunk exceeds broker batch cap");

        let attempted = messages.len();
        let mut pending = PendingSet::new(messages);
        let mut last_transport_error: Option<String> = None;
        let mut broker_calls = 0;
        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            if !pending.has_pending() {
                break;
            }
            if attempt > 1 {
                metrics::record_publish_retry(topic, pending.pending_count());
                self.retry.wait(attempt - 1).await;
            }

            let entries = pending.pending_entries();
            let sent = entries.len();
            broker_calls += 1;

            match self.broker.publish_batch(topic, entries).await {
                Err(e) => {
                    warn!(
                        topic = %topic,
                        attempt,
                        max_attempts,
                        pending = sent,
                        error = %e,
                        "Batch publish request failed"
                    );
                    metrics::record_broker_call(topic, "batch", "transport_error");
                    last_transport_error = Some(e.to_string());
                }
                Ok(response) if response.is_complete() => {
                    debug!(topic = %topic, attempt, published = sent, "Batch published");
                    metrics::record_broker_call(topic, "batch", "success");
                    pending.confirm_all();
                }
                Ok(response) => {
                    let (confirmed, rejected) = pending.apply(&response);
                    warn!(
                        topic = %topic,
                        attempt,
                        max_attempts,
                        sent,
                        confirmed,
                        rejected,
                        still_pending = pending.pending_count(),
                        "Batch partially published"
                    );
                    metrics::record_broker_call(topic, "batch", "partial");
                }
            }
        }

        let errors = pending.into_errors(broker_calls, last_transport_error.as_deref());
        let failed = errors.iter().filter(|e| e.is_some()).count();

        ChunkOutcome {
            attempted,
            confirmed: attempted - failed,
            broker_calls,
            errors,
        }
    }

    /// Chunk `messages` and publish every chunk concurrently.
    ///
    /// Waits for every chunk task before merging. Failures stay isolated to
    /// their message and chunk.
    #[instrument(skip(self, messages), fields(topic = %topic, messages = messages.len()))]
    pub async fn publish_chunks(&self, topic: &str, messages: Vec<OutboundMessage>) -> PublishOutcome {
        if messages.is_empty() {
            return PublishOutcome::default();
        }

        let start = Instant::now();
        let total = messages.len();
        let chunks = chunk(messages, self.chunk_size);
        let chunk_count = chunks.len();
        let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();

        debug!(topic = %topic, messages = total, chunks = chunk_count, "Publishing chunks");

        let mut join_set: JoinSet<(usize, ChunkOutcome)> = JoinSet::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let publisher = self.clone();
            let topic = topic.to_string();
            join_set.spawn(async move {
                let outcome = publisher.publish_batch(&topic, chunk).await;
                (index, outcome)
            });
        }

        let mut results: Vec<Option<ChunkOutcome>> = vec![None; chunk_count];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if !outcome.is_success() {
                        warn!(
                            chunk = index,
                            confirmed = outcome.confirmed,
                            attempted = outcome.attempted,
                            "Chunk published with errors"
                        );
                    }
                    results[index] = Some(outcome);
                }
                Err(e) => {
                    warn!(error = %e, "Chunk publish task failed (JoinError)");
                }
            }
        }

        let mut outcome = PublishOutcome::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Some(chunk_outcome) => outcome.merge(index, chunk_outcome),
                None => {
                    // Task aborted: nothing from this chunk is confirmed
                    outcome.attempted += sizes[index];
                    outcome.chunks += 1;
                }
            }
        }

        let duration = start.elapsed();
        metrics::record_publish(
            topic,
            outcome.attempted,
            outcome.confirmed,
            outcome.failures.len(),
            duration,
        );

        info!(
            topic = %topic,
            attempted = outcome.attempted,
            confirmed = outcome.confirmed,
            failed = outcome.failures.len(),
            chunks = outcome.chunks,
            broker_calls = outcome.broker_calls,
            duration_ms = duration.as_millis() as u64,
            "Batch publish complete"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerError, BrokerFuture, Failed, Succeeded};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Broker that fails the listed ids for their first N batch calls.
    struct FlakyBroker {
        calls: AtomicUsize,
        /// id -> number of calls (including this one) that reject it
        fail_until: HashMap<String, usize>,
        /// Calls that fail at the transport level (1-indexed)
        transport_failures: HashSet<usize>,
        sent: Mutex<Vec<Vec<String>>>,
    }

    impl FlakyBroker {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_until: HashMap::new(),
                transport_failures: HashSet::new(),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, id: &str, calls: usize) -> Self {
            self.fail_until.insert(id.to_string(), calls);
            self
        }

        fn transport_failure_on(mut self, call: usize) -> Self {
            self.transport_failures.insert(call);
            self
        }

        fn sent(&self) -> Vec<Vec<String>> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Broker for FlakyBroker {
        fn publish_one(&self, _topic: &str, _payload: &str, _group_key: &str) -> BrokerFuture<'_, String> {
            Box::pin(async { Ok("single".to_string()) })
        }

        fn publish_batch(&self, _topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.sent
                .lock()
                .unwrap()
                .push(entries.iter().map(|e| e.id.clone()).collect());

            if self.transport_failures.contains(&call) {
                return Box::pin(async move { Err(BrokerError(format!("connection reset on call {}", call))) });
            }

            let mut response = BatchResponse::default();
            for entry in entries {
                match self.fail_until.get(&entry.id) {
                    Some(&until) if call <= until => response.failed.push(Failed {
                        id: entry.id,
                        reason: format!("throttled on call {}", call),
                    }),
                    _ => response.succeeded.push(Succeeded {
                        message_id: format!("{}-{}", entry.id, call),
                        id: entry.id,
                    }),
                }
            }
            Box::pin(async move { Ok(response) })
        }
    }

    fn messages(n: usize) -> Vec<OutboundMessage> {
        (0..n)
            .map(|i| OutboundMessage::new(format!("{{\"n\":{}}}", i), format!("key-{}", i)))
            .collect()
    }

    fn publisher(broker: Arc<FlakyBroker>) -> BatchPublisher<FlakyBroker> {
        BatchPublisher::new(broker, RetryPolicy::with_attempts(5))
    }

    #[test]
    fn test_pending_set_lifecycle() {
        let mut set = PendingSet::new(messages(3));
        assert_eq!(set.len(), 3);
        assert_eq!(set.pending_count(), 3);
        let ids: Vec<String> = set.pending_entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["msg-0", "msg-1", "msg-2"]);

        assert!(set.confirm("msg-0"));
        assert!(!set.confirm("msg-0")); // already confirmed
        assert!(!set.confirm("msg-9")); // unknown
        assert!(set.reject("msg-1", "bad"));
        assert!(!set.reject("msg-0", "late rejection ignored"));

        assert_eq!(set.pending_count(), 2);
        let entries = set.pending_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "msg-1");
        assert_eq!(entries[0].group_key, "key-1");

        let errors = set.into_errors(2, Some("timeout"));
        assert!(errors[0].is_none());
        assert_eq!(
            errors[1],
            Some(PublishError::Rejected {
                message_id: "msg-1".to_string(),
                attempts: 2,
                reason: "bad".to_string(),
            })
        );
        assert_eq!(
            errors[2],
            Some(PublishError::Transport {
                message_id: "msg-2".to_string(),
                attempts: 2,
                reason: "timeout".to_string(),
            })
        );
    }

    #[test]
    fn test_pending_set_confirm_all() {
        let mut set = PendingSet::new(messages(4));
        set.reject("msg-2", "x");
        set.confirm_all();
        assert!(!set.has_pending());
        assert!(set.into_errors(1, None).iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_all_succeed_uses_one_call() {
        let broker = Arc::new(FlakyBroker::new());
        let outcome = publisher(Arc::clone(&broker)).publish_batch("topic", messages(10)).await;

        assert_eq!(outcome.confirmed, 10);
        assert_eq!(outcome.errors.len(), 10);
        assert!(outcome.errors.iter().all(Option::is_none));
        assert_eq!(outcome.broker_calls, 1);
        assert_eq!(broker.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_converges() {
        // msg-1 (the second message) fails attempts 1..=3, succeeds on 4
        let broker = Arc::new(FlakyBroker::new().failing("msg-1", 3));
        let outcome = publisher(Arc::clone(&broker)).publish_batch("topic", messages(3)).await;

        assert_eq!(outcome.confirmed, 3);
        assert!(outcome.is_success());
        assert_eq!(outcome.broker_calls, 4);

        let sent = broker.sent();
        assert_eq!(sent[0], vec!["msg-0", "msg-1", "msg-2"]);
        for retry in &sent[1..] {
            assert_eq!(retry, &vec!["msg-1".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_exhaustion_stops_at_max_attempts() {
        let broker = Arc::new(FlakyBroker::new().failing("msg-0", usize::MAX));
        let outcome = publisher(Arc::clone(&broker)).publish_batch("topic", messages(2)).await;

        assert_eq!(outcome.confirmed, 1);
        assert_eq!(outcome.broker_calls, 5);
        assert_eq!(broker.sent().len(), 5);
        match &outcome.errors[0] {
            Some(PublishError::Rejected { message_id, attempts, reason }) => {
                assert_eq!(message_id, "msg-0");
                assert_eq!(*attempts, 5);
                assert_eq!(reason, "throttled on call 5");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(outcome.errors[1].is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_everything_pending() {
        let broker = Arc::new(FlakyBroker::new().transport_failure_on(1).transport_failure_on(2));
        let outcome = publisher(Arc::clone(&broker)).publish_batch("topic", messages(3)).await;

        assert_eq!(outcome.confirmed, 3);
        assert_eq!(outcome.broker_calls, 3);
        // Every attempt resent the whole chunk
        assert!(broker.sent().iter().all(|ids| ids.len() == 3));
    }

    #[tokio::test]
    async fn test_transport_exhaustion_reports_one_error_per_message() {
        let mut flaky = FlakyBroker::new();
        for call in 1..=5 {
            flaky = flaky.transport_failure_on(call);
        }
        let broker = Arc::new(flaky);
        let outcome = publisher(Arc::clone(&broker)).publish_batch("topic", messages(2)).await;

        assert_eq!(outcome.confirmed, 0);
        assert_eq!(outcome.errors.len(), 2);
        for (i, slot) in outcome.errors.iter().enumerate() {
            match slot {
                Some(PublishError::Transport { message_id: id, reason, .. }) => {
                    assert_eq!(id, &message_id(i));
                    assert_eq!(reason, "connection reset on call 5");
                }
                other => panic!("expected transport error, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_broker_reason_wins_over_transport_error() {
        // Rejected on call 1, transport failures afterwards
        let mut flaky = FlakyBroker::new().failing("msg-0", 1);
        for call in 2..=5 {
            flaky = flaky.transport_failure_on(call);
        }
        let outcome = publisher(Arc::new(flaky)).publish_batch("topic", messages(1)).await;

        assert!(matches!(
            &outcome.errors[0],
            Some(PublishError::Rejected { reason, .. }) if reason == "throttled on call 1"
        ));
    }

    #[tokio::test]
    async fn test_publish_chunks_merges_chunks() {
        let broker = Arc::new(FlakyBroker::new());
        let outcome = publisher(Arc::clone(&broker)).publish_chunks("topic", messages(25)).await;

        assert_eq!(outcome.attempted, 25);
        assert_eq!(outcome.confirmed, 25);
        assert_eq!(outcome.chunks, 3);
        assert!(outcome.is_success());

        let mut sizes: Vec<usize> = broker.sent().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![5, 10, 10]);
    }

    #[tokio::test]
    async fn test_publish_chunks_isolates_failures() {
        // msg-3 fails forever in every chunk; siblings still publish
        let broker = Arc::new(FlakyBroker::new().failing("msg-3", usize::MAX));
        let outcome = publisher(Arc::clone(&broker)).publish_chunks("topic", messages(20)).await;

        assert_eq!(outcome.attempted, 20);
        assert_eq!(outcome.confirmed, 18);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].chunk, 0);
        assert_eq!(outcome.failures[1].chunk, 1);

        let keyed = outcome.errors_by_message_id();
        assert!(keyed.contains_key("chunk-0/msg-3"));
        assert!(keyed.contains_key("chunk-1/msg-3"));
    }

    #[tokio::test]
    async fn test_publish_chunks_empty() {
        let broker = Arc::new(FlakyBroker::new());
        let outcome = publisher(Arc::clone(&broker)).publish_chunks("topic", Vec::new()).await;
        assert_eq!(outcome, PublishOutcome::default());
        assert!(broker.sent().is_empty());
    }

    #[test]
    fn test_chunk_size_is_clamped() {
        let broker = Arc::new(FlakyBroker::new());
        let p = BatchPublisher::with_chunk_size(Arc::clone(&broker), RetryPolicy::default(), 50);
        assert_eq!(p.chunk_size(), MAX_BATCH_ENTRIES);
        let p = BatchPublisher::with_chunk_size(broker, RetryPolicy::default(), 0);
        assert_eq!(p.chunk_size(), 1);
    }

    #[test]
    fn test_message_id_format() {
        assert_eq!(message_id(0), "msg-0");
        assert_eq!(message_id(9), "msg-9");
    }
}
