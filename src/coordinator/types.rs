// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Engine state and cycle report types.
//!
//! # State Transitions
//!
//! ```text
//!                  start()
//! Created ───────────────────→ Running
//!    │                            │
//!    │ shutdown()                 │ shutdown()
//!    │                            ↓
//!    └──────────────────→ ShuttingDown ──→ Stopped
//!
//!  start() with an invalid config ──→ Failed
//! ```
//!
//! # State Descriptions
//!
//! - **Created**: Initial state after `RelayEngine::new()`. No trigger running.
//! - **Running**: Trigger task is firing cycles.
//! - **ShuttingDown**: `shutdown()` called. Waiting for the in-flight cycle.
//! - **Stopped**: Trigger task joined. Safe to drop.
//! - **Failed**: Could not start.

use crate::batch::MessageFailure;
use crate::record::Watermark;
use std::time::Duration;

/// State of the relay engine.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine created but not started.
    ///
    /// Call [`start()`](super::RelayEngine::start) to begin relaying.
    Created,

    /// Cycles are running on the configured interval.
    Running,

    /// Shutting down gracefully.
    ///
    /// The in-flight cycle (if any) finishes; no new cycle starts.
    ShuttingDown,

    /// Stopped.
    Stopped,

    /// Failed to start.
    ///
    /// Check logs for error details.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Running => write!(f, "Running"),
            EngineState::ShuttingDown => write!(f, "ShuttingDown"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}

/// Summary of one relay cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Watermark the fetch ran against.
    pub since: Watermark,
    /// Watermark after the cycle (the instant the fetch returned).
    pub watermark: Watermark,
    /// Records returned by the store.
    pub fetched: usize,
    /// Messages handed to the publisher.
    pub attempted: usize,
    /// Messages the broker confirmed.
    pub confirmed: usize,
    /// Messages that exhausted their retries, in chunk order.
    pub failures: Vec<MessageFailure>,
    pub duration: Duration,
}

impl CycleReport {
    /// A cycle that found nothing to publish.
    pub fn empty(since: Watermark, watermark: Watermark, duration: Duration) -> Self {
        Self {
            since,
            watermark,
            fetched: 0,
            attempted: 0,
            confirmed: 0,
            failures: Vec::new(),
            duration,
        }
    }

    /// Number of messages that could not be published.
    pub fn errors(&self) -> usize {
        self.failures.len()
    }

    /// Whether every fetched record was published.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.confirmed == self.attempted
    }
}
