//! # Change Relay
//!
//! Detects records that changed in a relational store and republishes them as
//! domain events on a pub/sub topic.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────────┐
//! │                               change-relay                                │
//! │                                                                           │
//! │  ┌─────────────┐    ┌───────────────┐    ┌─────────────────────────────┐  │
//! │  │ Trigger     │───►│ RecordStore   │───►│ BatchPublisher              │  │
//! │  │ (interval)  │    │ (paged fetch) │    │ (chunks of 10, retry per id)│  │
//! │  └─────────────┘    └───────────────┘    └─────────────────────────────┘  │
//! │         │                   │                          │                  │
//! │         ▼                   ▼                          ▼                  │
//! │  ┌─────────────┐    ┌───────────────┐          ┌───────────────┐          │
//! │  │ Watermark   │    │ SQLite        │          │ Broker        │          │
//! │  │ (in memory) │    │ (WAL)         │          │ (SNS / no-op) │          │
//! │  └─────────────┘    └───────────────┘          └───────────────┘          │
//! └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Count records modified after the watermark, fetch them page by page
//!    (pages run concurrently, results keep query order)
//! 2. Move the watermark to now
//! 3. Serialize each record to JSON, keyed by its partition key
//! 4. Publish in chunks; entries the broker rejects are retried by id until
//!    confirmed or out of attempts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use change_relay::{NoOpBroker, RelayConfig, RelayEngine, SqliteRecordStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::default();
//!     let store = SqliteRecordStore::new(&config.store.sqlite_path, config.store.max_connections)
//!         .await
//!         .expect("Failed to open store");
//!
//!     let mut engine = RelayEngine::new(config, Arc::new(store), Arc::new(NoOpBroker::new()));
//!     engine.start().await.expect("Failed to start");
//!
//!     // Engine runs until shutdown signal
//!     engine.shutdown().await;
//! }
//! ```

pub mod batch;
pub mod broker;
pub mod chunk;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod record;
pub mod resilience;
pub mod single;
#[cfg(feature = "sns")]
pub mod sns;
pub mod store;

// Re-exports for convenience
pub use batch::{BatchPublisher, MessageFailure, PendingSet, PublishOutcome};
pub use broker::{BatchEntry, BatchResponse, Broker, NoOpBroker};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CycleConfig, FetchConfig, PublishConfig, RelayConfig, RelaySettings, StoreConfig};
pub use coordinator::{CycleOrchestrator, CycleReport, EngineState, RelayEngine};
pub use error::{PublishError, RelayError, Result};
pub use record::{ChangedRecord, OutboundMessage, Product, Watermark};
pub use resilience::RetryPolicy;
pub use store::{fetch_all_since, RecordStore, SqliteRecordStore};
