//! Board invariant verification
//!
//! Invariants are checked against a [`BoardSnapshot`], a plain-data capture of
//! the board taken from a running actor system.
//!
//! # TigerStyle
//!
//! - Violations include evidence for debugging
//! - Snapshots are plain data, so invariants can be unit tested without a
//!   running system
//!
//! # Example
//!
//! ```rust,ignore
//! let checker = InvariantChecker::new().with_board_invariants();
//! let snapshot = BoardSnapshot::capture(&system, dispatcher)?;
//! checker.verify_all(&snapshot)?;
//! ```

use mailroom_board::{
    BoardSystem, CommunicationId, Dispatcher, DispatcherMode, MessageId, MessageStore, Worker,
    WorkerHelper,
};
use mailroom_core::constants::USER_MESSAGE_BODY_LENGTH_CHARS_MAX;
use mailroom_core::ActorId;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Core Types
// =============================================================================

/// Error indicating an invariant violation
#[derive(Error, Debug, Clone)]
#[error("Invariant '{name}' violated: {message}")]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub name: String,
    /// Human-readable description of the violation
    pub message: String,
    /// Optional evidence (e.g., which actors were involved)
    pub evidence: Option<String>,
}

impl InvariantViolation {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            evidence: None,
        }
    }

    pub fn with_evidence(
        name: impl Into<String>,
        message: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            evidence: Some(evidence.into()),
        }
    }
}

/// A safety property of the board
pub trait Invariant {
    fn name(&self) -> &'static str;

    /// Check whether this invariant holds for the given snapshot
    fn check(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation>;
}

/// Checks multiple invariants against a snapshot
pub struct InvariantChecker {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantChecker {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    pub fn with_invariant(mut self, inv: impl Invariant + 'static) -> Self {
        self.invariants.push(Box::new(inv));
        self
    }

    /// Add every board invariant
    pub fn with_board_invariants(self) -> Self {
        self.with_invariant(UniqueIncreasingMessageIds)
            .with_invariant(SessionUniqueness)
            .with_invariant(ShutdownBarrier)
            .with_invariant(BodyLengthBounded::default())
    }

    /// Verify all invariants, returning the first violation (fail-fast)
    pub fn verify_all(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation> {
        for inv in &self.invariants {
            inv.check(state)?;
        }
        Ok(())
    }

    /// Verify all invariants, collecting every violation
    pub fn verify_all_collect(&self, state: &BoardSnapshot) -> Vec<InvariantViolation> {
        self.invariants
            .iter()
            .filter_map(|inv| inv.check(state).err())
            .collect()
    }

    pub fn invariant_names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|i| i.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl fmt::Debug for InvariantChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvariantChecker")
            .field("invariants", &self.invariant_names())
            .finish()
    }
}

// =============================================================================
// Board Snapshot
// =============================================================================

/// One worker as seen in a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: ActorId,
    pub active: bool,
    pub stopping: bool,
    pub sessions: Vec<CommunicationId>,
}

/// One stored message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSnapshot {
    /// Id the store files the message under
    pub key: MessageId,
    /// Id recorded on the message itself
    pub message_id: Option<MessageId>,
    pub body: String,
}

/// Plain-data capture of the board at one tick
#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    pub now: u64,
    pub dispatcher_active: bool,
    pub dispatcher_stopping: bool,
    pub store_active: bool,
    pub workers: Vec<WorkerSnapshot>,
    /// Stored messages in store order
    pub messages: Vec<StoredSnapshot>,
    /// Raw id the store will assign next
    pub next_message_id: u64,
    /// Helpers still ticking
    pub helpers_active: usize,
}

impl BoardSnapshot {
    /// Capture the board run by `dispatcher`
    ///
    /// Returns `None` if `dispatcher` is not a dispatcher or has not started
    /// its store yet.
    pub fn capture(system: &BoardSystem, dispatcher: ActorId) -> Option<Self> {
        let state = system.actor::<Dispatcher>(dispatcher)?;
        let store_id = state.store()?;
        let store = system.actor::<MessageStore>(store_id)?;

        let workers = state
            .workers()
            .iter()
            .filter_map(|id| {
                system.actor::<Worker>(*id).map(|worker| WorkerSnapshot {
                    id: *id,
                    active: system.is_active(*id),
                    stopping: worker.is_stopping(),
                    sessions: worker.sessions().map(|(cid, _)| cid).collect(),
                })
            })
            .collect();

        let messages = store
            .entries()
            .map(|(key, message)| StoredSnapshot {
                key,
                message_id: message.message_id,
                body: message.body.clone(),
            })
            .collect();

        let helpers_active = system
            .ids_of::<WorkerHelper>()
            .into_iter()
            .filter(|id| system.is_active(*id))
            .count();

        Some(Self {
            now: system.now(),
            dispatcher_active: system.is_active(dispatcher),
            dispatcher_stopping: state.mode() == DispatcherMode::Stopping,
            store_active: system.is_active(store_id),
            workers,
            messages,
            next_message_id: store.next_id().get(),
            helpers_active,
        })
    }
}

// =============================================================================
// Board Invariants
// =============================================================================

/// Stored message ids are exactly `1..next`, each filed under its own id
///
/// Ids are handed out in increasing order and messages are never removed, so
/// a reused or skipped id shows up as a count that disagrees with the next id.
pub struct UniqueIncreasingMessageIds;

impl Invariant for UniqueIncreasingMessageIds {
    fn name(&self) -> &'static str {
        "UniqueIncreasingMessageIds"
    }

    fn check(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation> {
        for stored in &state.messages {
            if stored.message_id != Some(stored.key) {
                return Err(InvariantViolation::with_evidence(
                    self.name(),
                    format!("message filed under {} carries another id", stored.key),
                    format!("{:?}", stored.message_id),
                ));
            }
            if stored.key.get() >= state.next_message_id {
                return Err(InvariantViolation::with_evidence(
                    self.name(),
                    format!("message id {} was not handed out yet", stored.key),
                    format!("next id {}", state.next_message_id),
                ));
            }
        }

        for pair in state.messages.windows(2) {
            if pair[1].key <= pair[0].key {
                return Err(InvariantViolation::with_evidence(
                    self.name(),
                    "message ids are not strictly increasing",
                    format!("{} followed by {}", pair[0].key, pair[1].key),
                ));
            }
        }

        let handed_out = state.next_message_id.saturating_sub(MessageId::FIRST.get());
        if state.messages.len() as u64 != handed_out {
            return Err(InvariantViolation::with_evidence(
                self.name(),
                "message ids were reused or skipped",
                format!(
                    "{} messages stored, {} ids handed out",
                    state.messages.len(),
                    handed_out
                ),
            ));
        }
        Ok(())
    }
}

/// A communication id is registered with at most one worker
pub struct SessionUniqueness;

impl Invariant for SessionUniqueness {
    fn name(&self) -> &'static str {
        "SessionUniqueness"
    }

    fn check(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation> {
        let mut owners: BTreeMap<CommunicationId, ActorId> = BTreeMap::new();
        for worker in &state.workers {
            for communication_id in &worker.sessions {
                if let Some(other) = owners.insert(*communication_id, worker.id) {
                    return Err(InvariantViolation::with_evidence(
                        self.name(),
                        format!("session {} is open on two workers", communication_id),
                        format!("{} and {}", other, worker.id),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Shutdown is a barrier
///
/// A worker only stops after the dispatcher entered stopping mode, and the
/// dispatcher only stops itself once the store and every worker are stopped.
pub struct ShutdownBarrier;

impl Invariant for ShutdownBarrier {
    fn name(&self) -> &'static str {
        "ShutdownBarrier"
    }

    fn check(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation> {
        if !state.dispatcher_stopping {
            if let Some(worker) = state.workers.iter().find(|w| w.stopping || !w.active) {
                return Err(InvariantViolation::with_evidence(
                    self.name(),
                    "worker stopped while the dispatcher is in normal mode",
                    worker.id.to_string(),
                ));
            }
        }

        if !state.dispatcher_active {
            if state.store_active {
                return Err(InvariantViolation::new(
                    self.name(),
                    "dispatcher stopped before the store",
                ));
            }
            if let Some(worker) = state.workers.iter().find(|w| w.active) {
                return Err(InvariantViolation::with_evidence(
                    self.name(),
                    "dispatcher stopped before every worker acknowledged",
                    worker.id.to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// No stored body is longer than the publish limit
pub struct BodyLengthBounded {
    pub chars_max: usize,
}

impl Default for BodyLengthBounded {
    fn default() -> Self {
        Self {
            chars_max: USER_MESSAGE_BODY_LENGTH_CHARS_MAX,
        }
    }
}

impl Invariant for BodyLengthBounded {
    fn name(&self) -> &'static str {
        "BodyLengthBounded"
    }

    fn check(&self, state: &BoardSnapshot) -> Result<(), InvariantViolation> {
        match state
            .messages
            .iter()
            .find(|stored| stored.body.chars().count() > self.chars_max)
        {
            Some(stored) => Err(InvariantViolation::with_evidence(
                self.name(),
                format!("message {} exceeds {} characters", stored.key, self.chars_max),
                stored.body.clone(),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: u64, sessions: &[CommunicationId]) -> WorkerSnapshot {
        WorkerSnapshot {
            id: ActorId::new(id),
            active: true,
            stopping: false,
            sessions: sessions.to_vec(),
        }
    }

    fn running() -> BoardSnapshot {
        BoardSnapshot {
            dispatcher_active: true,
            store_active: true,
            workers: vec![worker(2, &[1, 3]), worker(3, &[2])],
            messages: vec![stored(1, "a"), stored(2, "b")],
            next_message_id: 3,
            ..Default::default()
        }
    }

    fn stored(id: u64, body: &str) -> StoredSnapshot {
        StoredSnapshot {
            key: MessageId::new(id),
            message_id: Some(MessageId::new(id)),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_healthy_board_passes() {
        let checker = InvariantChecker::new().with_board_invariants();
        assert_eq!(checker.len(), 4);
        assert!(checker.verify_all(&running()).is_ok());
    }

    #[test]
    fn test_reused_message_id_detected() {
        // A store that rewound its counter overwrote message 2
        let mut state = running();
        state.messages[1].body = "c".into();
        state.next_message_id = 4;

        let err = UniqueIncreasingMessageIds.check(&state).unwrap_err();
        assert_eq!(err.name, "UniqueIncreasingMessageIds");
        assert!(err.evidence.is_some());
    }

    #[test]
    fn test_misfiled_message_detected() {
        let mut state = running();
        state.messages[0].message_id = Some(MessageId::new(2));
        assert!(UniqueIncreasingMessageIds.check(&state).is_err());

        let mut state = running();
        state.messages[1].message_id = None;
        assert!(UniqueIncreasingMessageIds.check(&state).is_err());
    }

    #[test]
    fn test_id_past_counter_detected() {
        let mut state = running();
        state.next_message_id = 2;

        let err = UniqueIncreasingMessageIds.check(&state).unwrap_err();
        assert!(err.message.contains("not handed out"));
    }

    #[test]
    fn test_empty_store_passes() {
        let state = BoardSnapshot {
            next_message_id: MessageId::FIRST.get(),
            ..Default::default()
        };
        assert!(UniqueIncreasingMessageIds.check(&state).is_ok());
    }

    #[test]
    fn test_shared_session_detected() {
        let mut state = running();
        state.workers[1].sessions.push(3);
        assert!(SessionUniqueness.check(&state).is_err());
    }

    #[test]
    fn test_early_dispatcher_stop_detected() {
        let mut state = running();
        state.dispatcher_stopping = true;
        state.dispatcher_active = false;
        state.store_active = false;
        state.workers[0].active = false;

        let violations = InvariantChecker::new()
            .with_board_invariants()
            .verify_all_collect(&state);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].name, "ShutdownBarrier");
    }

    #[test]
    fn test_worker_stopping_in_normal_mode_detected() {
        let mut state = running();
        state.workers[0].stopping = true;
        assert!(ShutdownBarrier.check(&state).is_err());
    }

    #[test]
    fn test_long_body_detected() {
        let mut state = running();
        state.messages.push(stored(3, "01234567890"));
        state.next_message_id = 4;
        assert!(BodyLengthBounded::default().check(&state).is_err());
    }
}
