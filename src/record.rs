// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Changed records, the watermark, and outbound messages.
//!
//! A [`ChangedRecord`] is anything the store can return that knows its
//! partition key and can be serialized to JSON. [`Product`] is the record
//! relayed in production. Each record becomes exactly one
//! [`OutboundMessage`]:
//!
//! ```text
//! Product { key_id: "SKU-1", .. } ──serialize──▶ OutboundMessage {
//!                                                   payload: "{\"keyId\":\"SKU-1\",..}",
//!                                                   partition_key: "SKU-1",
//!                                                }
//! ```

use crate::error::{RelayError, Result};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Watermark
// =============================================================================

/// Boundary of already-processed records.
///
/// Crosses the store boundary as RFC 3339 in UTC with fixed microsecond
/// precision, so string comparison in SQL matches chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// Sentinel used before the first cycle: 1900-01-01T00:00:00Z.
    pub fn beginning() -> Self {
        let start = NaiveDate::from_ymd_opt(1900, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self(start)
    }

    /// Wrap an instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// The wrapped instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Wire format used in store queries.
    pub fn to_wire(&self) -> String {
        format_timestamp(&self.0)
    }

    /// Parse the wire format (any RFC 3339 offset is accepted).
    pub fn parse_wire(s: &str) -> Option<Self> {
        parse_timestamp(s).map(Self)
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self::beginning()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Format a timestamp the way the store expects it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// Rejects instants whose UTC year falls outside `0..=9999`: those cannot be
/// written back in the fixed-width wire format.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|dt| (0..=9999).contains(&dt.year()))
}

// =============================================================================
// Records
// =============================================================================

/// A snapshot of one domain record that changed since the watermark.
pub trait ChangedRecord: Serialize + Send + Sync + 'static {
    /// Broker grouping key (keeps same-key messages in relative order).
    fn partition_key(&self) -> &str;

    /// Last-modified timestamp, if the store tracks one for this row.
    fn modified_at(&self) -> Option<DateTime<Utc>>;

    /// Serialize to the outbound wire message.
    fn to_message(&self) -> Result<OutboundMessage> {
        let payload = serde_json::to_string(self).map_err(|e| RelayError::Serialization {
            key: self.partition_key().to_string(),
            message: e.to_string(),
        })?;
        Ok(OutboundMessage::new(payload, self.partition_key()))
    }
}

/// A priced catalogue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Primary key (SKU).
    pub key_id: String,
    pub description: String,
    pub short_name: String,
    pub retail_price_1: f64,
    pub retail_price_2: f64,
    pub retail_price_3: f64,
    pub current_stock: f64,
    /// Last modification, maintained by the store.
    pub sync_stamp: Option<DateTime<Utc>>,
}

impl Product {
    /// A product with the given key and all prices set to `price`.
    pub fn priced(key_id: impl Into<String>, price: f64) -> Self {
        let key_id = key_id.into();
        Self {
            description: format!("Product {}", key_id),
            short_name: key_id.clone(),
            key_id,
            retail_price_1: price,
            retail_price_2: price,
            retail_price_3: price,
            current_stock: 0.0,
            sync_stamp: None,
        }
    }

    /// Whether every price field is positive (the "changed" predicate's
    /// business condition).
    pub fn is_priced(&self) -> bool {
        self.retail_price_1 > 0.0 && self.retail_price_2 > 0.0 && self.retail_price_3 > 0.0
    }
}

impl ChangedRecord for Product {
    fn partition_key(&self) -> &str {
        &self.key_id
    }

    fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.sync_stamp
    }
}

// =============================================================================
// Outbound messages
// =============================================================================

/// One serialized record, ready to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Serialized record.
    pub payload: String,
    /// Broker grouping key.
    pub partition_key: String,
}

impl OutboundMessage {
    pub fn new(payload: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            partition_key: partition_key.into(),
        }
    }
}

/// Serialize records in order. Fails on the first record that cannot be
/// serialized; a malformed event must not be silently dropped.
pub fn to_messages<R: ChangedRecord>(records: &[R]) -> Result<Vec<OutboundMessage>> {
    records.iter().map(ChangedRecord::to_message).collect()
}
