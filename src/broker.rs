// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Message broker integration traits.
//!
//! Defines the interface the publishers need from a pub/sub broker. The
//! real transport (authentication, HTTP, SDK clients) lives behind this
//! trait so the publishers and the orchestrator can be tested with fakes.
//!
//! # Example
//!
//! ```rust,no_run
//! use change_relay::broker::{Broker, BatchEntry, BatchResponse, BrokerFuture};
//!
//! struct MyBroker;
//!
//! impl Broker for MyBroker {
//!     fn publish_one(&self, _topic: &str, _payload: &str, _group_key: &str) -> BrokerFuture<'_, String> {
//!         Box::pin(async move { Ok("message-id".to_string()) })
//!     }
//!
//!     fn publish_batch(&self, _topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse> {
//!         Box::pin(async move { Ok(BatchResponse::all_succeeded(&entries)) })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

/// Result type for broker operations.
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BrokerFuture<'a, T> = Pin<Box<dyn Future<Output = BrokerResult<T>> + Send + 'a>>;

/// Transport-level broker failure (the request as a whole failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerError(pub String);

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BrokerError {}

/// One entry of a batch-publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Request-local id used to correlate the response (`msg-<index>`).
    pub id: String,
    pub payload: String,
    pub group_key: String,
}

/// A message the broker accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succeeded {
    pub id: String,
    pub message_id: String,
}

/// A message the broker rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub id: String,
    pub reason: String,
}

/// Per-message result of a batch-publish request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub succeeded: Vec<Succeeded>,
    pub failed: Vec<Failed>,
}

impl BatchResponse {
    /// A response accepting every entry, with generated message ids.
    pub fn all_succeeded(entries: &[BatchEntry]) -> Self {
        Self {
            succeeded: entries
                .iter()
                .map(|e| Succeeded {
                    id: e.id.clone(),
                    message_id: format!("{}-accepted", e.id),
                })
                .collect(),
            failed: Vec::new(),
        }
    }

    /// Whether the broker reported no failures.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What the relay needs from a pub/sub broker.
///
/// Implementations must accept at most
/// [`MAX_BATCH_ENTRIES`](crate::chunk::MAX_BATCH_ENTRIES) entries per
/// `publish_batch` call.
pub trait Broker: Send + Sync + 'static {
    /// Publish one message; returns the broker-assigned message id.
    fn publish_one(&self, topic: &str, payload: &str, group_key: &str) -> BrokerFuture<'_, String>;

    /// Publish a batch; reports which entries succeeded and which failed.
    ///
    /// `Err` means the whole request failed and no entry was published.
    fn publish_batch(&self, topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse>;
}

/// A broker that publishes nowhere.
///
/// Logs every message and assigns sequential ids. Used when no real broker
/// is configured (dry runs).
#[derive(Debug, Default)]
pub struct NoOpBroker {
    next_id: AtomicU64,
}

impl NoOpBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&self) -> String {
        format!("noop-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Broker for NoOpBroker {
    fn publish_one(&self, topic: &str, payload: &str, group_key: &str) -> BrokerFuture<'_, String> {
        let id = self.assign_id();
        tracing::debug!(
            topic = %topic,
            group_key = %group_key,
            len = payload.len(),
            message_id = %id,
            "NoOp: would publish message"
        );
        Box::pin(async move { Ok(id) })
    }

    fn publish_batch(&self, topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse> {
        tracing::debug!(topic = %topic, entries = entries.len(), "NoOp: would publish batch");
        let succeeded = entries
            .iter()
            .map(|e| Succeeded {
                id: e.id.clone(),
                message_id: self.assign_id(),
            })
            .collect();
        Box::pin(async move {
            Ok(BatchResponse {
                succeeded,
                failed: Vec::new(),
            })
        })
    }
}
