// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the change relay.
//!
//! Errors are categorized by the stage of the pipeline that produced them
//! (record store, broker, serialization) and carry enough context to be
//! logged as structured fields.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Query` | Yes | Store unreachable or query rejected |
//! | `Transport` | Yes | Broker request failed as a whole |
//! | `PartialPublish` | Yes | Broker rejected some messages of a batch |
//! | `PublishExhausted` | No | Message still failing after the last attempt |
//! | `Serialization` | No | Record could not be turned into a payload |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Engine state machine violation |
//! | `Shutdown` | No | Engine is shutting down |
//!
//! Per-message outcomes of a publish use the lighter [`PublishError`], which is
//! `Clone` so it can live inside outcome reports. It converts into
//! [`RelayError`] when a cycle report is assembled.

use thiserror::Error;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while relaying changed records.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Record store query failed.
    ///
    /// Page fetches that fail with this error contribute an empty page;
    /// a failing count aborts the fetch for the cycle.
    #[error("Query error ({operation}): {message}")]
    Query {
        operation: String,
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The broker request itself failed (no per-message detail).
    #[error("Transport error ({topic}): {message}")]
    Transport { topic: String, message: String },

    /// The broker accepted the request but rejected specific messages.
    #[error("Partial publish on {topic}: {failed} of {attempted} messages rejected")]
    PartialPublish {
        topic: String,
        attempted: usize,
        failed: usize,
    },

    /// A message was still failing after every allowed attempt.
    #[error("Publish exhausted: {0}")]
    PublishExhausted(#[from] PublishError),

    /// A record could not be converted to its wire payload.
    ///
    /// Aborts the publish step of the whole cycle.
    #[error("Serialization error (key {key}): {message}")]
    Serialization { key: String, message: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine state machine violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Shutdown in progress.
    #[error("Shutdown in progress")]
    Shutdown,
}

impl RelayError {
    /// Create a query error from a sqlx error.
    pub fn query(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Query {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a query error without source.
    pub fn query_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error.
    pub fn transport(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Query { .. } => true,
            Self::Transport { .. } => true,
            Self::PartialPublish { .. } => true,
            Self::PublishExhausted(_) => false,
            Self::Serialization { .. } => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
            Self::Shutdown => false,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query { .. } => "query",
            Self::Transport { .. } => "transport",
            Self::PartialPublish { .. } => "partial_publish",
            Self::PublishExhausted(_) => "publish_exhausted",
            Self::Serialization { .. } => "serialization",
            Self::Config(_) => "config",
            Self::InvalidState { .. } => "invalid_state",
            Self::Shutdown => "shutdown",
        }
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        Self::query("unknown", e)
    }
}

/// Final failure of a single outbound message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The broker rejected this message on its last attempt.
    #[error("message {message_id} rejected by broker after {attempts} attempts: {reason}")]
    Rejected {
        message_id: String,
        attempts: usize,
        reason: String,
    },

    /// Every attempt failed at the transport level.
    #[error("message {message_id} not delivered after {attempts} attempts: {reason}")]
    Transport {
        message_id: String,
        attempts: usize,
        reason: String,
    },

    /// Single-message publish ran out of attempts.
    #[error("could not publish event to topic {topic} (payload: {payload}): {last_error}")]
    Exhausted {
        topic: String,
        payload: String,
        last_error: String,
    },
}

impl PublishError {
    /// Request-local id of the failed message, when one was assigned.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Rejected { message_id, .. } | Self::Transport { message_id, .. } => {
                Some(message_id)
            }
            Self::Exhausted { .. } => None,
        }
    }
}
