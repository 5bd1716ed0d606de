//! Mailroom Runtime
//!
//! Discrete-time actor runtime.
//!
//! # Overview
//!
//! The runtime provides:
//! - Delayed per-actor inbound channels
//! - FIFO mailboxes with an explicit depth limit
//! - A busy/idle state machine that processes one message at a time
//! - An actor system that spawns, stops and ticks actors in rounds
//!
//! There are no threads and no wall-clock time. A driver advances the system
//! with `tick`/`run_for`; every active actor advances exactly once per tick.
//!
//! # TigerStyle
//! - Scheduling bookkeeping is committed before any handler runs
//! - Bounded mailboxes (no silent message drops)
//! - Every message told to an actor is logged for post-hoc assertions

pub mod actor;
pub mod cell;
pub mod channel;
pub mod log;
pub mod mailbox;
pub mod message;
pub mod system;

pub use actor::{Actor, AsAny, Context};
pub use cell::{ActorCell, CellState, CellTick};
pub use channel::{Channel, DelayChannel};
pub use log::MessageLog;
pub use mailbox::{Mailbox, MailboxOverflow};
pub use message::Message;
pub use system::ActorSystem;
