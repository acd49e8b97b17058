// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Single-message publisher.

use crate::broker::Broker;
use crate::error::PublishError;
use crate::metrics;
use crate::record::OutboundMessage;
use crate::resilience::RetryPolicy;
use tracing::{debug, instrument, warn};

/// Publish one message, retrying up to `retry.max_attempts` times.
///
/// Returns the first non-empty broker-assigned id. An empty id counts as a
/// failed attempt. After the last attempt fails, returns
/// [`PublishError::Exhausted`] carrying the payload and the last error.
#[instrument(skip(broker, message, retry), fields(topic = %topic, key = %message.partition_key))]
pub async fn publish_one<B: Broker + ?Sized>(
    broker: &B,
    topic: &str,
    message: &OutboundMessage,
    retry: &RetryPolicy,
) -> Result<String, PublishError> {
    let mut last_error = String::from("no attempts made");

    for attempt in 1..=retry.max_attempts {
        if attempt > 1 {
            retry.wait(attempt - 1).await;
        }

        match broker
            .publish_one(topic, &message.payload, &message.partition_key)
            .await
        {
            Ok(id) if !id.is_empty() => {
                debug!(attempt, message_id = %id, "Message published");
                metrics::record_broker_call(topic, "single", "success");
                metrics::record_single_publish(topic, true, attempt);
                return Ok(id);
            }
            Ok(_) => {
                warn!(attempt, max_attempts = retry.max_attempts, "Broker returned an empty message id");
                metrics::record_broker_call(topic, "single", "empty_id");
                last_error = "broker returned an empty message id".to_string();
            }
            Err(e) => {
                warn!(attempt, max_attempts = retry.max_attempts, error = %e, "Publish request failed");
                metrics::record_broker_call(topic, "single", "transport_error");
                last_error = e.to_string();
            }
        }
    }

    metrics::record_single_publish(topic, false, retry.max_attempts);
    Err(PublishError::Exhausted {
        topic: topic.to_string(),
        payload: message.payload.clone(),
        last_error,
    })
}
