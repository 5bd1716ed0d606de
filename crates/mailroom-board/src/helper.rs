//! Retrying store proxy
//!
//! TigerStyle: Bounded retries, exactly one terminal reply per request.
//!
//! A worker spawns one helper per store operation. The helper sends its
//! request when it starts, forwards the first reply it gets to the client and
//! stops. If no reply shows up within `helper_idle_ticks_max` ticks it resends,
//! up to `helper_retries_max` times, and then answers the client with
//! `OperationFailed` on its own.

use crate::messages::{BoardMessage, ClientMessage, StoreOperation, StoreRequest};
use crate::user_message::CommunicationId;
use mailroom_core::constants::CHANNEL_DELAY_TICKS_STORE;
use mailroom_core::error::Result;
use mailroom_core::{ActorId, BoardConfig};
use mailroom_runtime::{Actor, Channel, Context, DelayChannel, Message};
use tracing::{debug, warn};

/// Ephemeral actor proxying one request/response exchange with the store
#[derive(Debug)]
pub struct WorkerHelper {
    store: ActorId,
    client: ActorId,
    communication_id: CommunicationId,
    operation: StoreOperation,
    idle_ticks_max: u32,
    retries_max: u32,
    /// Ticks since the request was last sent
    idle_ticks: u32,
    retries: u32,
    sends: u32,
    stopping: bool,
}

impl WorkerHelper {
    pub fn new(
        store: ActorId,
        client: ActorId,
        communication_id: CommunicationId,
        operation: StoreOperation,
        config: &BoardConfig,
    ) -> Self {
        Self {
            store,
            client,
            communication_id,
            operation,
            idle_ticks_max: config.helper_idle_ticks_max,
            retries_max: config.helper_retries_max,
            idle_ticks: 0,
            retries: 0,
            sends: 0,
            stopping: false,
        }
    }

    /// Total times the request went to the store
    pub fn sends(&self) -> u32 {
        self.sends
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn client(&self) -> ActorId {
        self.client
    }

    fn send_request(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        let request = StoreRequest {
            reply_to: ctx.id(),
            communication_id: self.communication_id,
            operation: self.operation.clone(),
        };
        ctx.tell(self.store, request.into())?;
        self.sends += 1;
        self.idle_ticks = 0;
        Ok(())
    }
}

impl Actor<BoardMessage> for WorkerHelper {
    fn started(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        self.send_request(ctx)
    }

    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match message {
            BoardMessage::Client(reply) => {
                debug!(
                    helper = %ctx.id(),
                    communication_id = self.communication_id,
                    kind = reply.kind(),
                    "Forwarding store reply"
                );
                ctx.tell(self.client, reply.into())?;
                ctx.stop_self();
                // Suppresses the retry check later in this same tick.
                self.stopping = true;
                Ok(())
            }
            other => {
                debug!(helper = %ctx.id(), kind = other.kind(), "Helper ignored message");
                Ok(())
            }
        }
    }

    fn on_tick(&mut self, ctx: &mut Context<'_, BoardMessage>) -> Result<()> {
        if self.stopping {
            return Ok(());
        }

        let idle_ticks = self.idle_ticks;
        self.idle_ticks += 1;
        if idle_ticks < self.idle_ticks_max {
            return Ok(());
        }

        if self.retries == self.retries_max {
            warn!(
                helper = %ctx.id(),
                communication_id = self.communication_id,
                sends = self.sends,
                "Store unresponsive, giving up"
            );
            self.stopping = true;
            ctx.tell(
                self.client,
                ClientMessage::OperationFailed {
                    communication_id: self.communication_id,
                }
                .into(),
            )?;
            ctx.stop_self();
        } else {
            self.retries += 1;
            debug!(
                helper = %ctx.id(),
                communication_id = self.communication_id,
                retry = self.retries,
                "Resending store request"
            );
            self.send_request(ctx)?;
        }

        Ok(())
    }

    fn channel(&self) -> Option<Box<dyn Channel<BoardMessage>>> {
        Some(Box::new(DelayChannel::new(CHANNEL_DELAY_TICKS_STORE)))
    }

    fn name(&self) -> &'static str {
        "worker-helper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RecordingClient;
    use crate::user_message::UserMessage;
    use crate::BoardSystem;

    /// Store stand-in that swallows everything
    struct BlackHole;

    impl Actor<BoardMessage> for BlackHole {
        fn receive(&mut self, _ctx: &mut Context<'_, BoardMessage>, _message: BoardMessage) -> Result<()> {
            Ok(())
        }
    }

    fn publish_op() -> StoreOperation {
        StoreOperation::UpdateMessageStore(UserMessage::new("alice", "hi"))
    }

    #[test]
    fn test_helper_sends_on_start() {
        let mut system = BoardSystem::new();
        let store = system.spawn(BlackHole).unwrap();
        let client = system.spawn(RecordingClient::new("alice")).unwrap();
        let helper = system
            .spawn(WorkerHelper::new(store, client, 5, publish_op(), &BoardConfig::default()))
            .unwrap();

        let sent = system.message_log(helper).unwrap().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, store);
        match &sent[0].1 {
            BoardMessage::Store(request) => {
                assert_eq!(request.reply_to, helper);
                assert_eq!(request.communication_id, 5);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_helper_gives_up_after_retries() {
        let mut system = BoardSystem::new();
        let store = system.spawn(BlackHole).unwrap();
        let client = system.spawn(RecordingClient::new("alice")).unwrap();
        let helper = system
            .spawn(WorkerHelper::new(store, client, 5, publish_op(), &BoardConfig::default()))
            .unwrap();

        system.run_for(50).unwrap();

        assert!(!system.is_active(helper));
        let state = system.actor::<WorkerHelper>(helper).unwrap();
        assert_eq!(state.sends(), 3);
        assert_eq!(state.retries(), 2);

        let store_requests = system.message_log(store).unwrap().received().len();
        assert_eq!(store_requests, 3);

        let to_client: Vec<_> = system.message_log(helper).unwrap().sent_to(client).collect();
        assert_eq!(
            to_client,
            vec![&BoardMessage::Client(ClientMessage::OperationFailed {
                communication_id: 5
            })]
        );
    }

    #[test]
    fn test_helper_retry_timing() {
        let mut system = BoardSystem::new();
        let store = system.spawn(BlackHole).unwrap();
        let client = system.spawn(RecordingClient::new("alice")).unwrap();
        let helper = system
            .spawn(WorkerHelper::new(store, client, 5, publish_op(), &BoardConfig::default()))
            .unwrap();

        // Idle ticks 0, 1 and 2 pass quietly; the fourth tick resends.
        system.run_for(3).unwrap();
        assert_eq!(system.actor::<WorkerHelper>(helper).unwrap().sends(), 1);
        system.tick().unwrap();
        assert_eq!(system.actor::<WorkerHelper>(helper).unwrap().sends(), 2);
    }

    #[test]
    fn test_helper_forwards_reply_and_stops() {
        let mut system = BoardSystem::new();
        let store = system.spawn(BlackHole).unwrap();
        let client = system.spawn(RecordingClient::new("alice")).unwrap();
        let helper = system
            .spawn(WorkerHelper::new(store, client, 5, publish_op(), &BoardConfig::default()))
            .unwrap();

        let reply = ClientMessage::OperationAck {
            communication_id: 5,
            message_id: None,
        };
        system.tell(helper, reply.clone().into()).unwrap();
        system.run_for(10).unwrap();

        assert!(!system.is_active(helper));
        assert!(system.actor::<WorkerHelper>(helper).unwrap().is_stopping());
        assert_eq!(system.actor::<WorkerHelper>(helper).unwrap().sends(), 1);
        assert_eq!(
            system.actor::<RecordingClient>(client).unwrap().replies(),
            &[reply]
        );
    }
}
