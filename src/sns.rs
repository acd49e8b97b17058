// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Amazon SNS broker (enabled with the `sns` feature).
//!
//! Maps the [`Broker`] contract onto `Publish` and `PublishBatch`. The
//! partition key becomes the `MessageGroupId`, so FIFO topics keep events for
//! the same record in order.

use crate::broker::{BatchEntry, BatchResponse, Broker, BrokerError, BrokerFuture, Failed, Succeeded};
use aws_config::BehaviorVersion;
use aws_sdk_sns::types::PublishBatchRequestEntry;
use aws_sdk_sns::Client as SnsClient;
use tracing::{debug, info};

/// Broker backed by an SNS client.
#[derive(Clone)]
pub struct SnsBroker {
    client: SnsClient,
}

impl SnsBroker {
    /// Build a client from the SDK's default credential and region chain,
    /// optionally overriding the region.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        info!(region = ?sdk_config.region().map(|r| r.as_ref().to_string()), "Created SNS client");
        Self::with_client(SnsClient::new(&sdk_config))
    }

    /// Wrap an existing client.
    pub fn with_client(client: SnsClient) -> Self {
        Self { client }
    }
}

impl Broker for SnsBroker {
    fn publish_one(&self, topic: &str, payload: &str, group_key: &str) -> BrokerFuture<'_, String> {
        let request = self
            .client
            .publish()
            .topic_arn(topic)
            .message(payload)
            .message_group_id(group_key);

        Box::pin(async move {
            let output = request
                .send()
                .await
                .map_err(|e| BrokerError(format!("SNS Publish failed: {}", e)))?;
            // An empty id is treated as a failure by the publisher
            Ok(output.message_id().unwrap_or_default().to_string())
        })
    }

    fn publish_batch(&self, topic: &str, entries: Vec<BatchEntry>) -> BrokerFuture<'_, BatchResponse> {
        let topic = topic.to_string();

        Box::pin(async move {
            let mut request_entries = Vec::with_capacity(entries.len());
            for entry in entries {
                let built = PublishBatchRequestEntry::builder()
                    .id(entry.id)
                    .message(entry.payload)
                    .message_group_id(entry.group_key)
                    .build()
                    .map_err(|e| BrokerError(format!("Invalid batch entry: {}", e)))?;
                request_entries.push(built);
            }

            let sent = request_entries.len();
            let output = self
                .client
                .publish_batch()
                .topic_arn(&topic)
                .set_publish_batch_request_entries(Some(request_entries))
                .send()
                .await
                .map_err(|e| BrokerError(format!("SNS PublishBatch failed: {}", e)))?;

            let succeeded: Vec<Succeeded> = output
                .successful()
                .iter()
                .filter_map(|ok| {
                    Some(Succeeded {
                        id: ok.id()?.to_string(),
                        message_id: ok.message_id().unwrap_or_default().to_string(),
                    })
                })
                .collect();

            let failed: Vec<Failed> = output
                .failed()
                .iter()
                .map(|err| Failed {
                    id: err.id().to_string(),
                    reason: match err.message() {
                        Some(message) => format!("{}: {}", err.code(), message),
                        None => err.code().to_string(),
                    },
                })
                .collect();

            debug!(
                topic = %topic,
                sent,
                succeeded = succeeded.len(),
                failed = failed.len(),
                "SNS PublishBatch response"
            );

            Ok(BatchResponse { succeeded, failed })
        })
    }
}
