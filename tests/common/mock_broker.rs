//! Scripted broker for testing.
//!
//! Records every batch and single publish. Failures are scripted per group
//! key (the record's partition key), since request-local ids repeat across
//! chunks.

use change_relay::broker::{BatchEntry, BatchResponse, Broker, BrokerError, BrokerFuture, Failed, Succeeded};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A recorded publish_batch() call.
#[derive(Debug, Clone)]
pub struct BatchCall {
    pub topic: String,
    pub ids: Vec<String>,
    pub group_keys: Vec<String>,
}

/// A recorded publish_one() call.
#[derive(Debug, Clone)]
pub struct SingleCall {
    pub topic: String,
    pub group_key: String,
    pub payload: String,
}

/// Mock broker that records all calls.
///
/// # Example
/// ```rust,ignore
/// let broker = ScriptedBroker::new();
///
/// // SKU-3 is rejected twice, then accepted
/// broker.reject_times("SKU-3", 2).await;
///
/// // Use in tests...
///
/// assert_eq!(broker.batch_calls().await.len(), 3);
/// ```
#[derive(Default)]
pub struct ScriptedBroker {
    batches: RwLock<Vec<BatchCall>>,
    singles: RwLock<Vec<SingleCall>>,
    /// Group key -> remaining rejections
    reject_counts: RwLock<HashMap<String, usize>>,
    /// Group keys rejected on every attempt
    reject_always: RwLock<HashSet<String>>,
    /// Whole batch requests to fail before succeeding
    transport_failures: AtomicUsize,
    next_id: AtomicU64,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject entries with `group_key` the next `times` times they are sent.
    pub async fn reject_times(&self, group_key: &str, times: usize) {
        self.reject_counts.write().await.insert(group_key.to_string(), times);
    }

    /// Reject entries with `group_key` forever.
    pub async fn reject_always(&self, group_key: &str) {
        self.reject_always.write().await.insert(group_key.to_string());
    }

    /// Fail the next `count` batch requests as a whole.
    pub fn fail_requests(&self, count: usize) {
        self.transport_failures.store(count, Ordering::SeqCst);
    }

    pub async fn batch_calls(&self) -> Vec<BatchCall> {
        self.batches.read().await.clone()
    }

    pub async fn single_calls(&self) -> Vec<SingleCall> {
        self.singles.read().await.clone()
    }

    /// Group keys in every batch call, in call order.
    pub async fn published_keys(&self) -> Vec<String> {
        self.batches
            .read()
            .await
            .iter()
            .flat_map(|call| call.group_keys.iter().cloned())
            .collect()
    }

    fn take_transport_failure(&self) -> bool {
        self.transport_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn should_reject(&self, group_key: &str) -> bool {
        if self.reject_always.read().await.contains(group_key) {
            return true;
        }
        let mut counts = self.reject_counts.write().await;
        match counts.get_mut(group_key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Broker for ScriptedBroker {
    fn publish_one(&self, topic: &str, payload: &str, group_key: &str) -> BrokerFuture<'_, String> {
        let call = SingleCall {
            topic: topic.to_string(),
            group_key: group_key.to_string(),
            payload: payload.to_string(),
        };

        Box::pin(async move {
            let reject = self.should_reject(&call.group_key).await;
            self.singles.write().await.push(call);
            if reject {
                return Err(BrokerError("InternalError".to_string()));
            }
            Ok(format!("single-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
        })
    }

    fn publish_batch(&self, topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse> {
        let topic = topic.to_string();

        Box::pin(async move {
            self.batches.write().await.push(BatchCall {
                topic,
                ids: entries.iter().map(|e| e.id.clone()).collect(),
                group_keys: entries.iter().map(|e| e.group_key.clone()).collect(),
            });

            if self.take_transport_failure() {
                return Err(BrokerError("connection reset by peer".to_string()));
            }

            let mut response = BatchResponse::default();
            for entry in entries {
                if self.should_reject(&entry.group_key).await {
                    response.failed.push(Failed {
                        id: entry.id,
                        reason: "InternalError: throttled".to_string(),
                    });
                } else {
                    response.succeeded.push(Succeeded {
                        id: entry.id,
                        message_id: format!("mid-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
                    });
                }
            }
            Ok(response)
        })
    }
}
