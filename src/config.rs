// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the change relay.
//!
//! Configuration is passed to [`RelayEngine::new()`](crate::RelayEngine::new)
//! and can be constructed programmatically or deserialized from YAML/JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use change_relay::config::RelayConfig;
//!
//! let config = RelayConfig {
//!     topic: "arn:aws:sns:eu-west-2:123456789012:products.fifo".into(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! RelayConfig
//! ├── topic: String                # Broker topic (ARN for SNS)
//! ├── settings: RelaySettings
//! │   ├── fetch: FetchConfig       # Paged record retrieval
//! │   ├── publish: PublishConfig   # Chunking and retries
//! │   └── cycle: CycleConfig       # Trigger interval
//! ├── store: StoreConfig           # SQLite record store
//! ├── broker: BrokerConfig         # Which broker to publish to
//! └── logging: LoggingConfig       # Log level and format
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! topic: "arn:aws:sns:eu-west-2:123456789012:products.fifo"
//!
//! settings:
//!   fetch:
//!     page_size: 200
//!   publish:
//!     max_attempts: 5
//!     retry_delay: "0s"
//!   cycle:
//!     interval: "5m"
//!     run_on_start: false
//!
//! store:
//!   sqlite_path: "/var/lib/relay/products.db"
//!
//! broker:
//!   kind: sns
//!   region: "eu-west-2"
//! ```

use crate::chunk::MAX_BATCH_ENTRIES;
use crate::error::{RelayError, Result};
use crate::resilience::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::store::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to `RelayEngine::new()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Topic every change event is published to.
    pub topic: String,

    /// Tunable parameters for fetching, publishing and the cycle trigger.
    #[serde(default)]
    pub settings: RelaySettings,

    /// Record store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Broker selection.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Log level and output format (applied by the binary).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            topic: "product-updates".to_string(),
            settings: RelaySettings::default(),
            store: StoreConfig::default(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Create a minimal config for testing.
    pub fn for_testing(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            settings: RelaySettings {
                cycle: CycleConfig {
                    interval: "50ms".to_string(),
                    run_on_start: true,
                },
                ..Default::default()
            },
            store: StoreConfig::in_memory(),
            broker: BrokerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load from a YAML (`.yaml`, `.yml`) or JSON (`.json`) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let config: Self = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| RelayError::Config(format!("Invalid YAML in {}: {}", path.display(), e)))?,
            Some("json") => serde_json::from_str(&raw)
                .map_err(|e| RelayError::Config(format!("Invalid JSON in {}: {}", path.display(), e)))?,
            other => {
                return Err(RelayError::Config(format!(
                    "Unsupported config format {:?} for {} (expected .yaml, .yml or .json)",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(RelayError::Config("topic must not be empty".to_string()));
        }
        if self.settings.fetch.page_size == 0 {
            return Err(RelayError::Config("settings.fetch.page_size must be positive".to_string()));
        }
        if self.settings.publish.max_attempts == 0 {
            return Err(RelayError::Config(
                "settings.publish.max_attempts must be positive".to_string(),
            ));
        }
        if self.settings.publish.chunk_size == 0 {
            return Err(RelayError::Config(
                "settings.publish.chunk_size must be positive".to_string(),
            ));
        }
        if self.store.sqlite_path.trim().is_empty() {
            return Err(RelayError::Config("store.sqlite_path must not be empty".to_string()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RelaySettings
// ═══════════════════════════════════════════════════════════════════════════════

/// General settings for the relay logic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelaySettings {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
}

/// Paged retrieval of changed records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records per page; one concurrent request per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

/// Chunking and retry settings for publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Messages per batch request (clamped to the broker cap of 10).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Attempts per chunk or single message, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Delay between attempts as a duration string (e.g., "0s", "200ms").
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,
}

fn default_chunk_size() -> usize {
    MAX_BATCH_ENTRIES
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay() -> String {
    "0s".to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_BATCH_ENTRIES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: "0s".to_string(),
        }
    }
}

impl PublishConfig {
    /// Chunk size clamped to what the broker accepts.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.clamp(1, MAX_BATCH_ENTRIES)
    }

    /// Parse the retry_delay string. Invalid values mean no delay.
    pub fn retry_delay_duration(&self) -> Duration {
        humantime::parse_duration(&self.retry_delay).unwrap_or(Duration::ZERO)
    }

    /// Retry policy for both publishers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, self.retry_delay_duration())
    }
}

/// Cycle trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Time between cycles as a duration string (e.g., "5m", "30s").
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Run the first cycle at startup instead of one interval later.
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_interval() -> String {
    "5m".to_string()
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            interval: "5m".to_string(),
            run_on_start: false,
        }
    }
}

impl CycleConfig {
    /// Parse the interval string. Invalid or zero values fall back to 5 minutes.
    pub fn interval_duration(&self) -> Duration {
        match humantime::parse_duration(&self.interval) {
            Ok(d) if !d.is_zero() => d,
            _ => Duration::from_secs(300),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// StoreConfig / BrokerConfig / LoggingConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// SQLite record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database holding the `items` table.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Connection pool size; bounds concurrent page queries.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_sqlite_path() -> String {
    "change_relay.db".to_string()
}

fn default_max_connections() -> u32 {
    4
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "change_relay.db".to_string(),
            max_connections: 4,
        }
    }
}

impl StoreConfig {
    /// In-memory SQLite (single connection, so every query sees the same database).
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: ":memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// Which broker implementation the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// Log messages instead of publishing them.
    #[default]
    Noop,
    /// Amazon SNS (requires the `sns` feature).
    Sns,
}

/// Broker selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub kind: BrokerKind,

    /// Region override; the SDK's default chain applies when unset.
    #[serde(default)]
    pub region: Option<String>,
}

/// Log level and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
