//! Session-handling worker
//!
//! TigerStyle: Unknown sessions are errors, shutdown rejections are not.

use crate::helper::WorkerHelper;
use crate::messages::{BoardMessage, ClientMessage, StoreOperation};
use crate::user_message::{CommunicationId, UserMessage};
use mailroom_core::error::{Error, Result};
use mailroom_core::{ActorId, BoardConfig};
use mailroom_runtime::{Actor, Context, Message};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Owns a session table and answers in-session requests
///
/// Store operations are delegated to one [`WorkerHelper`] each. After `Stop`
/// every request fails with `OperationFailed`.
#[derive(Debug)]
pub struct Worker {
    dispatcher: ActorId,
    store: ActorId,
    config: BoardConfig,
    /// communication id -> client
    sessions: BTreeMap<CommunicationId, ActorId>,
    stopping: bool,
}

impl Worker {
    pub fn new(dispatcher: ActorId, store: ActorId, config: BoardConfig) -> Self {
        Self {
            dispatcher,
            store,
            config,
            sessions: BTreeMap::new(),
            stopping: false,
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Client registered for a session
    pub fn client_for(&self, communication_id: CommunicationId) -> Option<ActorId> {
        self.sessions.get(&communication_id).copied()
    }

    /// Open sessions in communication id order
    pub fn sessions(&self) -> impl Iterator<Item = (CommunicationId, ActorId)> + '_ {
        self.sessions.iter().map(|(id, client)| (*id, *client))
    }

    fn session(&self, communication_id: CommunicationId) -> Result<ActorId> {
        self.client_for(communication_id)
            .ok_or_else(|| Error::unknown_client(communication_id))
    }

    /// Whether a message may be handed to the store for publishing
    pub fn is_publishable(&self, message: &UserMessage) -> bool {
        message.likes.is_empty()
            && message.is_new()
            && message.body_length_chars() <= self.config.body_length_chars_max
    }

    fn delegate(
        &self,
        ctx: &mut Context<'_, BoardMessage>,
        client: ActorId,
        communication_id: CommunicationId,
        operation: StoreOperation,
    ) -> Result<()> {
        let kind = operation.kind();
        let helper = ctx.spawn(WorkerHelper::new(
            self.store,
            client,
            communication_id,
            operation,
            &self.config,
        ))?;
        debug!(worker = %ctx.id(), %helper, communication_id, kind, "Delegated to helper");
        Ok(())
    }

    fn handle_request(
        &mut self,
        ctx: &mut Context<'_, BoardMessage>,
        message: ClientMessage,
    ) -> Result<()> {
        match message {
            ClientMessage::InitCommunication {
                client,
                communication_id,
            } => {
                self.sessions.insert(communication_id, client);
                debug!(worker = %ctx.id(), %client, communication_id, "Session opened");
                let ack = ClientMessage::InitAck {
                    worker: ctx.id(),
                    communication_id,
                };
                ctx.tell(client, ack.into())
            }
            ClientMessage::FinishCommunication { communication_id } => {
                let client = self.session(communication_id)?;
                self.sessions.remove(&communication_id);
                debug!(worker = %ctx.id(), %client, communication_id, "Session closed");
                ctx.tell(client, ClientMessage::FinishAck { communication_id }.into())
            }
            ClientMessage::Publish {
                message,
                communication_id,
            } => {
                let client = self.session(communication_id)?;
                if !self.is_publishable(&message) {
                    debug!(worker = %ctx.id(), communication_id, "Publish rejected");
                    return ctx.tell(client, ClientMessage::OperationFailed { communication_id }.into());
                }
                self.delegate(
                    ctx,
                    client,
                    communication_id,
                    StoreOperation::UpdateMessageStore(message),
                )
            }
            ClientMessage::RetrieveMessages {
                author,
                communication_id,
            } => {
                let client = self.session(communication_id)?;
                self.delegate(
                    ctx,
                    client,
                    communication_id,
                    StoreOperation::RetrieveFromStore { author },
                )
            }
            ClientMessage::Like {
                client_name,
                message_id,
                communication_id,
            } => {
                let client = self.session(communication_id)?;
                self.delegate(
                    ctx,
                    client,
                    communication_id,
                    StoreOperation::AddLike {
                        client_name,
                        message_id,
                    },
                )
            }
            reply => {
                debug!(worker = %ctx.id(), kind = reply.kind(), "Worker ignored reply");
                Ok(())
            }
        }
    }

    fn reject_while_stopping(
        &mut self,
        ctx: &mut Context<'_, BoardMessage>,
        message: ClientMessage,
    ) -> Result<()> {
        let communication_id = message.communication_id();
        let failed = ClientMessage::OperationFailed { communication_id };

        if let ClientMessage::InitCommunication { client, .. } = message {
            return ctx.tell(client, failed.into());
        }
        if message.is_reply() {
            debug!(worker = %ctx.id(), kind = message.kind(), "Worker ignored reply");
            return Ok(());
        }

        let finishing = matches!(message, ClientMessage::FinishCommunication { .. });
        let client = if finishing {
            self.sessions.remove(&communication_id)
        } else {
            self.client_for(communication_id)
        };

        match client {
            Some(client) => {
                debug!(
                    worker = %ctx.id(),
                    communication_id,
                    kind = message.kind(),
                    "Rejected while stopping"
                );
                ctx.tell(client, failed.into())
            }
            None => {
                warn!(
                    worker = %ctx.id(),
                    communication_id,
                    kind = message.kind(),
                    "Dropping request for unknown session while stopping"
                );
                Ok(())
            }
        }
    }
}

impl Actor<BoardMessage> for Worker {
    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match message {
            BoardMessage::Stop => {
                ctx.tell(self.dispatcher, BoardMessage::StopAck { worker: ctx.id() })?;
                self.stopping = true;
                info!(worker = %ctx.id(), sessions = self.sessions.len(), "Worker stopping");
                Ok(())
            }
            BoardMessage::Client(message) if self.stopping => {
                self.reject_while_stopping(ctx, message)
            }
            BoardMessage::Client(message) => self.handle_request(ctx, message),
            other => {
                debug!(worker = %ctx.id(), kind = other.kind(), "Worker ignored message");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}
