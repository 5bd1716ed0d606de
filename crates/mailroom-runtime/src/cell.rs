//! Actor cell: per-actor scheduling state
//!
//! TigerStyle: Explicit processing states, one message in flight at a time.
//!
//! A cell owns everything the scheduler needs to know about one actor: its
//! inbound channel, its mailbox, the message currently being processed, the
//! remaining busy ticks and the actor's local clock. The actor's behavior lives
//! next to the cell in the system registry and never touches these fields.
//!
//! # Per-tick protocol
//!
//! 1. Increment the local clock
//! 2. Move every message the channel delivers into the mailbox
//! 3. If busy, burn one busy tick and stop
//! 4. If a message is in flight, it completes now; otherwise the next mailbox
//!    message becomes the one in flight and the cell turns busy for the
//!    message's duration
//!
//! The completed message (if any) is handed back to the system, which runs the
//! actor's handler only after all of the above is committed.

use crate::channel::Channel;
use crate::log::MessageLog;
use crate::mailbox::Mailbox;
use crate::message::Message;
use mailroom_core::constants::MESSAGE_DURATION_TICKS_MAX;
use mailroom_core::ActorId;
use tracing::{trace, warn};

/// Processing state of an actor cell
///
/// ```text
///        +--------+   dequeue    +--------+
///   +--> |  Idle  | -----------> |  Busy  | ---+ busy ticks left
///   |    +--------+              +--------+ <--+
///   |                                |
///   |                                | last busy tick burned
///   |                                v
///   |   handler runs          +------------+
///   +------------------------ | Completing |
///                             +------------+
/// ```
///
/// A message with duration zero goes straight from Idle to Completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellState {
    /// No message in flight
    #[default]
    Idle,
    /// A message is in flight and busy ticks remain
    Busy,
    /// A message is in flight and completes on the next tick
    Completing,
}

impl CellState {
    /// Whether the cell will dequeue a new message on its next tick
    pub fn accepts_next(&self) -> bool {
        matches!(self, CellState::Idle)
    }
}

/// Outcome of advancing a cell by one tick
#[derive(Debug)]
pub struct CellTick<M> {
    /// The message whose processing finished this tick
    pub completed: Option<M>,
    /// Messages that arrived but did not fit in the mailbox
    pub overflowed: usize,
}

/// Scheduling state for one actor
#[derive(Debug)]
pub struct ActorCell<M> {
    id: ActorId,
    channel: Box<dyn Channel<M>>,
    mailbox: Mailbox<M>,
    active_message: Option<M>,
    busy_ticks: u32,
    /// Ticks since spawn; equals the system clock once `stamp_start` ran
    time_since_system_start: u64,
    log: MessageLog<M>,
}

impl<M: Message> ActorCell<M> {
    /// Create a cell with the given inbound channel and mailbox depth limit
    pub fn new(id: ActorId, channel: Box<dyn Channel<M>>, mailbox_depth_max: usize) -> Self {
        Self {
            id,
            channel,
            mailbox: Mailbox::with_depth_max(mailbox_depth_max),
            active_message: None,
            busy_ticks: 0,
            time_since_system_start: 0,
            log: MessageLog::new(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Current processing state
    pub fn state(&self) -> CellState {
        match (&self.active_message, self.busy_ticks) {
            (None, _) => CellState::Idle,
            (Some(_), 0) => CellState::Completing,
            (Some(_), _) => CellState::Busy,
        }
    }

    /// Align the local clock with the system clock at spawn time
    pub(crate) fn stamp_start(&mut self, now: u64) {
        self.time_since_system_start = now;
    }

    /// Put a message on this actor's channel and log it as received
    pub(crate) fn enqueue(&mut self, message: M) {
        self.log.record_received(message.clone());
        self.channel.send(message);
    }

    pub(crate) fn log_mut(&mut self) -> &mut MessageLog<M> {
        &mut self.log
    }

    /// Swap the inbound channel, returning the old one
    ///
    /// Messages still in transit on the old channel stay with it.
    pub(crate) fn replace_channel(&mut self, channel: Box<dyn Channel<M>>) -> Box<dyn Channel<M>> {
        std::mem::replace(&mut self.channel, channel)
    }

    /// Advance the cell by one tick
    ///
    /// Performs all scheduling bookkeeping and returns the message whose
    /// processing completed, without running any handler.
    pub fn advance(&mut self) -> CellTick<M> {
        self.time_since_system_start = self.time_since_system_start.saturating_add(1);

        let overflowed = match self.mailbox.deliver(self.channel.tick()) {
            Ok(()) => 0,
            Err(overflow) => {
                warn!(actor = %self.id, error = %overflow, "Messages dropped on mailbox overflow");
                overflow.rejected_count
            }
        };

        if self.busy_ticks > 0 {
            self.busy_ticks -= 1;
            return CellTick {
                completed: None,
                overflowed,
            };
        }

        let completed = if let Some(message) = self.active_message.take() {
            Some(message)
        } else {
            if let Some(next) = self.mailbox.take_next() {
                let duration = next.duration_ticks();
                debug_assert!(
                    duration <= MESSAGE_DURATION_TICKS_MAX,
                    "message duration exceeds MESSAGE_DURATION_TICKS_MAX"
                );
                trace!(actor = %self.id, kind = next.kind(), duration, "Message dequeued");
                self.busy_ticks = duration;
                self.active_message = Some(next);
            }
            None
        };

        debug_assert!(self.active_message.is_some() || self.busy_ticks == 0);

        CellTick {
            completed,
            overflowed,
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn mailbox_len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn mailbox_depth_max(&self) -> usize {
        self.mailbox.depth_max()
    }

    pub fn in_transit_count(&self) -> usize {
        self.channel.in_transit_count()
    }

    pub fn busy_ticks(&self) -> u32 {
        self.busy_ticks
    }

    pub fn active_message(&self) -> Option<&M> {
        self.active_message.as_ref()
    }

    pub fn time_since_system_start(&self) -> u64 {
        self.time_since_system_start
    }

    pub fn log(&self) -> &MessageLog<M> {
        &self.log
    }
}
