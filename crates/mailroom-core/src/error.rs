//! Error types for Mailroom
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use crate::actor::ActorId;
use std::fmt;
use thiserror::Error;

/// Result type alias for Mailroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Mailroom error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("Unknown client: communication id {communication_id} has no session")]
    UnknownClient { communication_id: i64 },

    // =========================================================================
    // Actor Errors
    // =========================================================================
    #[error("Actor not found: {id}")]
    ActorNotFound { id: ActorId },

    #[error("Actor mailbox full: {id}, depth: {depth}, limit: {limit}")]
    MailboxFull {
        id: ActorId,
        depth: usize,
        limit: usize,
    },

    #[error("Actor limit reached: {count} actors spawned, limit {limit}")]
    ActorLimitReached { count: u64, limit: u64 },

    #[error("Tick {tick} failed: {} actor handler(s) returned errors", .failures.len())]
    TickFailed {
        tick: u64,
        failures: Vec<ActorFailure>,
    },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Invalid argument: {name}, reason: {reason}")]
    InvalidArgument { name: String, reason: String },

    // =========================================================================
    // Simulation Errors
    // =========================================================================
    #[error("Tick budget exhausted after {ticks} ticks: {waiting_for}")]
    TickBudgetExhausted { ticks: u64, waiting_for: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an unknown client error
    pub fn unknown_client(communication_id: i64) -> Self {
        Self::UnknownClient { communication_id }
    }

    /// Create an actor not found error
    pub fn actor_not_found(id: ActorId) -> Self {
        Self::ActorNotFound { id }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Check if this error is retriable
    ///
    /// A full mailbox drains as the actor makes progress; everything else is
    /// a protocol or programming error.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::MailboxFull { .. })
    }

    /// Per-actor failures carried by a failed tick, empty for other errors
    pub fn failures(&self) -> &[ActorFailure] {
        match self {
            Self::TickFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// A handler error raised by one actor during a system tick
#[derive(Debug)]
pub struct ActorFailure {
    /// The actor whose handler failed
    pub actor: ActorId,
    /// What went wrong
    pub error: Error,
}

impl fmt::Display for ActorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.actor, self.error)
    }
}
