//! Session dispatcher
//!
//! TigerStyle: Deterministic routing, one-way shutdown barrier.
//!
//! The dispatcher is the only actor a new client knows about. It spawns the
//! message store and the workers at startup, forwards each session request to
//! one worker, and runs the shutdown protocol:
//!
//! ```text
//!   Stop --> Dispatcher --Stop--> every worker
//!                       <-StopAck- each worker   (worker stopped on ack)
//!   last ack: stop store, stop dispatcher
//! ```

use crate::messages::{BoardMessage, ClientMessage};
use crate::store::MessageStore;
use crate::user_message::CommunicationId;
use crate::worker::Worker;
use mailroom_core::error::Result;
use mailroom_core::{ActorId, BoardConfig, DeterministicRng};
use mailroom_runtime::{Actor, Context, Message};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Select a worker index for a communication id
///
/// Draws one value from a generator seeded with the id and reduces it to
/// `[0, worker_count)` with a non-negative remainder. Deterministic for the
/// same id and worker count.
pub fn worker_index(communication_id: CommunicationId, worker_count: usize) -> usize {
    debug_assert!(worker_count > 0, "worker_count must be positive");

    let draw = DeterministicRng::for_communication(communication_id).next_i64();
    let index = draw.rem_euclid(worker_count as i64) as usize;

    debug_assert!(index < worker_count);
    index
}

/// Dispatcher mode
///
/// `Normal -> Stopping` is the only transition; `Stopping` ends with the
/// dispatcher stopping itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatcherMode {
    /// Routing new sessions to workers
    #[default]
    Normal,
    /// Rejecting new sessions and collecting worker acknowledgements
    Stopping,
}

/// Routes new sessions and coordinates shutdown
#[derive(Debug)]
pub struct Dispatcher {
    config: BoardConfig,
    mode: DispatcherMode,
    store: Option<ActorId>,
    workers: Vec<ActorId>,
    /// Workers that have not acknowledged `Stop` yet
    pending_acks: BTreeSet<ActorId>,
}

impl Dispatcher {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            mode: DispatcherMode::Normal,
            store: None,
            workers: Vec::new(),
            pending_acks: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> DispatcherMode {
        self.mode
    }

    /// Workers spawned at startup, in spawn order
    pub fn workers(&self) -> &[ActorId] {
        &self.workers
    }

    /// The message store, once started
    pub fn store(&self) -> Option<ActorId> {
        self.store
    }

    pub fn pending_acks(&self) -> &BTreeSet<ActorId> {
        &self.pending_acks
    }

    fn route(&self, ctx: &mut Context<'_, BoardMessage>, message: ClientMessage) -> Result<()> {
        let communication_id = message.communication_id();
        if self.workers.is_empty() {
            return self.reject(ctx, message);
        }

        let worker = self.workers[worker_index(communication_id, self.workers.len())];
        debug!(dispatcher = %ctx.id(), communication_id, %worker, "Session routed");
        ctx.tell(worker, message.into())
    }

    fn reject(&self, ctx: &mut Context<'_, BoardMessage>, message: ClientMessage) -> Result<()> {
        match message {
            ClientMessage::InitCommunication {
                client,
                communication_id,
            } => {
                debug!(dispatcher = %ctx.id(), communication_id, "Session rejected");
                ctx.tell(client, ClientMessage::OperationFailed { communication_id }.into())
            }
            other => {
                debug!(dispatcher = %ctx.id(), kind = other.kind(), "Dispatcher ignored message");
                Ok(())
            }
        }
    }

    fn begin_stopping(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        for worker in &self.workers {
            ctx.tell(*worker, BoardMessage::Stop)?;
            self.pending_acks.insert(*worker);
        }
        self.mode = DispatcherMode::Stopping;
        info!(dispatcher = %ctx.id(), workers = self.workers.len(), "Dispatcher stopping");

        if self.pending_acks.is_empty() {
            self.finish_stopping(ctx);
        }
        Ok(())
    }

    fn finish_stopping(&mut self, ctx: &mut Context<'_, BoardMessage>) {
        if let Some(store) = self.store {
            ctx.stop(store);
        }
        ctx.stop_self();
        info!(dispatcher = %ctx.id(), "Shutdown complete");
    }

    fn collect_ack(&mut self, ctx: &mut Context<'_, BoardMessage>, worker: ActorId) {
        if !self.pending_acks.remove(&worker) {
            debug!(dispatcher = %ctx.id(), %worker, "Unexpected stop acknowledgement");
            return;
        }

        ctx.stop(worker);
        debug!(
            dispatcher = %ctx.id(),
            %worker,
            pending = self.pending_acks.len(),
            "Stop acknowledged"
        );

        if self.pending_acks.is_empty() {
            self.finish_stopping(ctx);
        }
    }
}

impl Actor<BoardMessage> for Dispatcher {
    fn started(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        let store = ctx.spawn(MessageStore::new())?;
        self.store = Some(store);

        for _ in 0..self.config.worker_count {
            let worker = ctx.spawn(Worker::new(ctx.id(), store, self.config.clone()))?;
            self.workers.push(worker);
        }

        info!(
            dispatcher = %ctx.id(),
            %store,
            workers = self.workers.len(),
            "Dispatcher started"
        );
        Ok(())
    }

    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match (self.mode, message) {
            (DispatcherMode::Normal, BoardMessage::Stop) => self.begin_stopping(ctx),
            (
                DispatcherMode::Normal,
                BoardMessage::Client(message @ ClientMessage::InitCommunication { .. }),
            ) => self.route(ctx, message),
            (DispatcherMode::Stopping, BoardMessage::Client(message)) => self.reject(ctx, message),
            (DispatcherMode::Stopping, BoardMessage::StopAck { worker }) => {
                self.collect_ack(ctx, worker);
                Ok(())
            }
            (mode, other) => {
                debug!(dispatcher = %ctx.id(), ?mode, kind = other.kind(), "Dispatcher ignored message");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "dispatcher"
    }
}
