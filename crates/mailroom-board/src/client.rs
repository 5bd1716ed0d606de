//! Client actors
//!
//! [`RecordingClient`] only records what it is told and is driven from the
//! outside. [`SessionClient`] drives one complete session by itself: open,
//! publish, like its own message, retrieve, finish.

use crate::messages::{BoardMessage, ClientMessage};
use crate::user_message::{CommunicationId, MessageId, UserMessage};
use mailroom_core::error::Result;
use mailroom_core::ActorId;
use mailroom_runtime::{Actor, Context, Message};
use tracing::{debug, info};

/// A client that records every reply it receives
#[derive(Debug, Default)]
pub struct RecordingClient {
    name: String,
    replies: Vec<ClientMessage>,
}

impl RecordingClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every client message received, in processing order
    pub fn replies(&self) -> &[ClientMessage] {
        &self.replies
    }

    /// Replies for one session
    pub fn replies_for(&self, communication_id: CommunicationId) -> Vec<&ClientMessage> {
        self.replies
            .iter()
            .filter(|reply| reply.communication_id() == communication_id)
            .collect()
    }

    /// Number of replies of the given kind (e.g. `"InitAck"`)
    pub fn count(&self, kind: &str) -> usize {
        self.replies.iter().filter(|reply| reply.kind() == kind).count()
    }
}

impl Actor<BoardMessage> for RecordingClient {
    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match message {
            BoardMessage::Client(reply) => {
                debug!(client = %ctx.id(), kind = reply.kind(), "Client received reply");
                self.replies.push(reply);
            }
            other => debug!(client = %ctx.id(), kind = other.kind(), "Client ignored message"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording-client"
    }
}

/// Where a scripted session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Publishing,
    Liking,
    Retrieving,
    Finishing,
    /// Session finished normally
    Done,
    /// The board refused to open the session
    Rejected,
}

impl SessionPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionPhase::Done | SessionPhase::Rejected)
    }
}

/// A client that runs one complete session against a dispatcher
///
/// Each step waits for the previous step's reply. A failed publish skips the
/// like; other failures move on to the next step.
#[derive(Debug)]
pub struct SessionClient {
    name: String,
    dispatcher: ActorId,
    communication_id: CommunicationId,
    body: String,
    phase: SessionPhase,
    worker: Option<ActorId>,
    published: Option<MessageId>,
    replies: Vec<ClientMessage>,
}

impl SessionClient {
    pub fn new(
        name: impl Into<String>,
        dispatcher: ActorId,
        communication_id: CommunicationId,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dispatcher,
            communication_id,
            body: body.into(),
            phase: SessionPhase::Connecting,
            worker: None,
            published: None,
            replies: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn communication_id(&self) -> CommunicationId {
        self.communication_id
    }

    /// Id the store assigned to this client's message, if publishing succeeded
    pub fn published(&self) -> Option<MessageId> {
        self.published
    }

    pub fn replies(&self) -> &[ClientMessage] {
        &self.replies
    }

    fn request(&mut self, ctx: &mut Context<'_, BoardMessage>, message: ClientMessage) -> Result<()> {
        match self.worker {
            Some(worker) => ctx.tell(worker, message.into()),
            None => Ok(()),
        }
    }

    fn retrieve(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        self.phase = SessionPhase::Retrieving;
        let message = ClientMessage::RetrieveMessages {
            author: self.name.clone(),
            communication_id: self.communication_id,
        };
        self.request(ctx, message)
    }

    fn advance(&mut self, ctx: &mut Context<'_, BoardMessage>, reply: &ClientMessage) -> Result<()> {
        let communication_id = self.communication_id;
        match (self.phase, reply) {
            (SessionPhase::Connecting, ClientMessage::InitAck { worker, .. }) => {
                self.worker = Some(*worker);
                self.phase = SessionPhase::Publishing;
                let message = ClientMessage::Publish {
                    message: UserMessage::new(self.name.clone(), self.body.clone()),
                    communication_id,
                };
                self.request(ctx, message)
            }
            (SessionPhase::Connecting, ClientMessage::OperationFailed { .. }) => {
                info!(client = %ctx.id(), communication_id, "Session rejected");
                self.phase = SessionPhase::Rejected;
                Ok(())
            }
            (SessionPhase::Publishing, ClientMessage::OperationAck { message_id, .. }) => {
                self.published = *message_id;
                match message_id {
                    Some(message_id) => {
                        self.phase = SessionPhase::Liking;
                        let message = ClientMessage::Like {
                            client_name: self.name.clone(),
                            message_id: *message_id,
                            communication_id,
                        };
                        self.request(ctx, message)
                    }
                    None => self.retrieve(ctx),
                }
            }
            (SessionPhase::Publishing, ClientMessage::OperationFailed { .. })
            | (SessionPhase::Liking, ClientMessage::OperationAck { .. })
            | (SessionPhase::Liking, ClientMessage::OperationFailed { .. }) => self.retrieve(ctx),
            (SessionPhase::Retrieving, ClientMessage::FoundMessages { .. })
            | (SessionPhase::Retrieving, ClientMessage::OperationFailed { .. }) => {
                self.phase = SessionPhase::Finishing;
                self.request(ctx, ClientMessage::FinishCommunication { communication_id })
            }
            (SessionPhase::Finishing, ClientMessage::FinishAck { .. })
            | (SessionPhase::Finishing, ClientMessage::OperationFailed { .. }) => {
                info!(client = %ctx.id(), communication_id, "Session finished");
                self.phase = SessionPhase::Done;
                Ok(())
            }
            (phase, reply) => {
                debug!(client = %ctx.id(), ?phase, kind = reply.kind(), "Unexpected reply");
                Ok(())
            }
        }
    }
}

impl Actor<BoardMessage> for SessionClient {
    fn started(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        let message = ClientMessage::InitCommunication {
            client: ctx.id(),
            communication_id: self.communication_id,
        };
        ctx.tell(self.dispatcher, message.into())
    }

    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match message {
            BoardMessage::Client(reply) => {
                self.advance(ctx, &reply)?;
                self.replies.push(reply);
                Ok(())
            }
            other => {
                debug!(client = %ctx.id(), kind = other.kind(), "Client ignored message");
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "session-client"
    }
}
