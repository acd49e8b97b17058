// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Relay engine coordinator.
//!
//! The main orchestrator that ties together:
//! - Changed-record retrieval via [`crate::store::RecordStore`]
//! - Chunked, retrying publication via [`crate::batch::BatchPublisher`]
//! - The watermark, owned by [`CycleOrchestrator`]
//! - The periodic trigger in [`trigger`]
//!
//! # Architecture
//!
//! ```text
//! RelayEngine::start()
//!     │
//!     └──▶ trigger task ── every interval ──▶ lock orchestrator ──▶ run_cycle()
//!                                                                     │
//!          fetch_all_since ──▶ advance watermark ──▶ serialize ──▶ publish_chunks
//! ```
//!
//! Cycles run one at a time: the trigger awaits each cycle before waiting for
//! the next tick, and the orchestrator sits behind a mutex so an on-demand
//! [`RelayEngine::run_once`] cannot overlap a triggered cycle either.

mod cycle;
pub mod trigger;
mod types;

pub use cycle::CycleOrchestrator;
pub use types::{CycleReport, EngineState};

use crate::batch::BatchPublisher;
use crate::broker::Broker;
use crate::clock::{Clock, SystemClock};
use crate::config::RelayConfig;
use crate::error::{PublishError, RelayError, Result};
use crate::metrics;
use crate::record::{ChangedRecord, Watermark};
use crate::store::RecordStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long shutdown waits for an in-flight cycle.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Turn a cycle result into the errors the trigger logs.
///
/// A cycle with undelivered messages yields one `PartialPublish` summary,
/// then one error per message: `Transport` when the broker was never
/// reached, `PublishExhausted` when it kept rejecting the message.
fn cycle_errors(topic: &str, result: Result<CycleReport>) -> Vec<RelayError> {
    let report = match result {
        Ok(report) => report,
        Err(e) => return vec![e],
    };
    if report.failures.is_empty() {
        return Vec::new();
    }

    let mut errors = Vec::with_capacity(report.failures.len() + 1);
    errors.push(RelayError::PartialPublish {
        topic: topic.to_string(),
        attempted: report.attempted,
        failed: report.errors(),
    });
    errors.extend(report.failures.into_iter().map(|failure| match failure.error {
        PublishError::Transport {
            message_id,
            attempts,
            reason,
        } => RelayError::transport(
            topic,
            format!(
                "chunk {} {} not delivered after {} attempts: {}",
                failure.chunk, message_id, attempts, reason
            ),
        ),
        other => RelayError::PublishExhausted(other),
    }));
    errors
}

/// Wait up to `timeout` for the trigger task, then abort it so no cycle
/// outlives shutdown.
async fn drain_trigger(handle: JoinHandle<()>, timeout: Duration) {
    let abort = handle.abort_handle();
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => debug!("Trigger task completed gracefully"),
        Ok(Err(e)) => warn!(error = %e, "Trigger task panicked during shutdown"),
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Trigger task timed out during shutdown, aborting in-flight cycle"
            );
            abort.abort();
        }
    }
}

/// The change relay engine.
///
/// Periodically republishes records changed since the last cycle.
pub struct RelayEngine<S: RecordStore, B: Broker, C: Clock = SystemClock> {
    config: RelayConfig,

    /// Engine state (broadcast to watchers)
    state_tx: watch::Sender<EngineState>,
    state_rx: watch::Receiver<EngineState>,

    orchestrator: Arc<Mutex<CycleOrchestrator<S, B, C>>>,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    /// Trigger task handle
    trigger_handle: Option<JoinHandle<()>>,
}

impl<S: RecordStore, B: Broker> RelayEngine<S, B, SystemClock> {
    /// Create a new engine using the system clock.
    ///
    /// The engine starts in `Created` state. Call [`start()`](Self::start)
    /// to begin relaying.
    pub fn new(config: RelayConfig, store: Arc<S>, broker: Arc<B>) -> Self {
        Self::with_clock(config, store, broker, Arc::new(SystemClock))
    }
}

impl<S: RecordStore, B: Broker, C: Clock> RelayEngine<S, B, C> {
    /// Create a new engine with an explicit clock (tests pin "now").
    pub fn with_clock(config: RelayConfig, store: Arc<S>, broker: Arc<B>, clock: Arc<C>) -> Self {
        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let publish = &config.settings.publish;
        let publisher = BatchPublisher::with_chunk_size(
            Arc::clone(&broker),
            publish.retry_policy(),
            publish.effective_chunk_size(),
        );
        let orchestrator = CycleOrchestrator::new(
            store,
            publisher,
            broker,
            clock,
            config.topic.clone(),
            config.settings.fetch.page_size,
        );

        Self {
            config,
            state_tx,
            state_rx,
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            shutdown_tx,
            shutdown_rx,
            trigger_handle: None,
        }
    }

    /// Get current engine state.
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if engine is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), EngineState::Running)
    }

    /// Topic events are published to.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Current watermark (waits for an in-flight cycle).
    pub async fn watermark(&self) -> Watermark {
        self.orchestrator.lock().await.watermark()
    }

    fn set_state(&self, state: EngineState) {
        let _ = self.state_tx.send(state);
        metrics::set_engine_state(&state.to_string());
    }

    /// Start the periodic trigger.
    ///
    /// Fails with `InvalidState` unless the engine is `Created`, and moves to
    /// `Failed` if the configuration is invalid.
    pub async fn start(&mut self) -> Result<()> {
        if self.state() != EngineState::Created {
            return Err(RelayError::InvalidState {
                expected: "Created".to_string(),
                actual: format!("{:?}", self.state()),
            });
        }

        if let Err(e) = self.config.validate() {
            error!(error = %e, "Refusing to start with invalid configuration");
            self.set_state(EngineState::Failed);
            return Err(e);
        }

        let interval = self.config.settings.cycle.interval_duration();
        let run_on_start = self.config.settings.cycle.run_on_start;

        info!(
            topic = %self.config.topic,
            interval_secs = interval.as_secs(),
            run_on_start,
            page_size = self.config.settings.fetch.page_size,
            max_attempts = self.config.settings.publish.max_attempts,
            "Starting change relay"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let shutdown_rx = self.shutdown_rx.clone();
        let topic = self.config.topic.clone();

        let handle = tokio::spawn(async move {
            trigger::run_every(
                interval,
                run_on_start,
                move || {
                    let orchestrator = Arc::clone(&orchestrator);
                    let topic = topic.clone();
                    async move {
                        let mut orchestrator = orchestrator.lock().await;
                        cycle_errors(&topic, orchestrator.run_cycle().await)
                    }
                },
                shutdown_rx,
            )
            .await;
        });

        debug!("Spawned trigger task");
        self.trigger_handle = Some(handle);

        self.set_state(EngineState::Running);
        info!("Change relay running");
        Ok(())
    }

    /// Run one cycle now, outside the trigger.
    ///
    /// Waits for an in-flight triggered cycle first.
    pub async fn run_once(&self) -> Result<CycleReport> {
        if matches!(self.state(), EngineState::ShuttingDown | EngineState::Stopped) {
            return Err(RelayError::Shutdown);
        }
        self.orchestrator.lock().await.run_cycle().await
    }

    /// Serialize and publish a single record immediately.
    pub async fn send_one(&self, record: &S::Record) -> Result<String> {
        let message = record.to_message()?;
        let orchestrator = self.orchestrator.lock().await;
        let message_id = orchestrator.send_one(&message).await?;
        debug!(key = %message.partition_key, message_id = %message_id, "Sent single event");
        Ok(message_id)
    }

    /// Shutdown the engine gracefully.
    ///
    /// Signals the trigger to stop and waits (bounded) for an in-flight cycle
    /// to finish.
    pub async fn shutdown(&mut self) {
        info!("Shutting down change relay");
        self.set_state(EngineState::ShuttingDown);

        let _ = self.shutdown_tx.send(true);

        if let Some(handle) = self.trigger_handle.take() {
            drain_trigger(handle, DRAIN_TIMEOUT).await;
        }

        self.set_state(EngineState::Stopped);
        info!("Change relay stopped");
    }
}
