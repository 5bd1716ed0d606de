//! Mailroom Board
//!
//! A small message board built from cooperating actors.
//!
//! # Overview
//!
//! - [`Dispatcher`]: entry point for new sessions; routes them to workers and
//!   coordinates shutdown
//! - [`Worker`]: owns a session table and answers in-session requests
//! - [`WorkerHelper`]: one short-lived proxy per store operation, with
//!   bounded retry
//! - [`MessageStore`]: the single shared persistence actor
//! - [`RecordingClient`]: a client that records every reply it receives
//! - [`SessionClient`]: a client that runs one whole session on its own
//!
//! All actors speak [`BoardMessage`].

pub mod client;
pub mod dispatcher;
pub mod helper;
pub mod messages;
pub mod store;
pub mod user_message;
pub mod worker;

pub use client::{RecordingClient, SessionClient, SessionPhase};
pub use dispatcher::{worker_index, Dispatcher, DispatcherMode};
pub use helper::WorkerHelper;
pub use messages::{BoardMessage, ClientMessage, StoreOperation, StoreRequest};
pub use store::MessageStore;
pub use user_message::{CommunicationId, MessageId, UserMessage};
pub use worker::Worker;

/// Actor system specialised to board messages
pub type BoardSystem = mailroom_runtime::ActorSystem<BoardMessage>;
