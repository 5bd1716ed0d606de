//! Actor trait and handler context
//!
//! TigerStyle: Handlers see the system only through an explicit context.

use crate::channel::Channel;
use crate::message::Message;
use crate::system::ActorSystem;
use mailroom_core::error::Result;
use mailroom_core::ActorId;
use std::any::Any;

/// Downcasting support for actor behaviors
///
/// Blanket-implemented for every `'static` type, so actors never implement it
/// by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Actor behavior
///
/// The runtime owns scheduling (channel, mailbox, busy time); an actor only
/// decides what to do with a message once its processing time has elapsed.
///
/// Returning an error from a hook does not abort the tick in which it ran.
/// The system finishes the round and reports every failure together.
pub trait Actor<M: Message>: AsAny {
    /// Called once, right after the actor is registered and before any tick
    fn started(&mut self, _ctx: &mut Context<'_, M>) -> Result<()> {
        Ok(())
    }

    /// Handle a message whose processing time has elapsed
    fn receive(&mut self, ctx: &mut Context<'_, M>, message: M) -> Result<()>;

    /// Called at the end of every tick of this actor, after `receive`
    fn on_tick(&mut self, _ctx: &mut Context<'_, M>) -> Result<()> {
        Ok(())
    }

    /// Inbound channel for this actor
    ///
    /// `None` uses the system's default delay channel.
    fn channel(&self) -> Option<Box<dyn Channel<M>>> {
        None
    }

    /// Short name used in logs
    fn name(&self) -> &'static str {
        "actor"
    }
}

/// Handle through which a running hook talks to the system
pub struct Context<'a, M: Message> {
    system: &'a mut ActorSystem<M>,
    id: ActorId,
}

impl<'a, M: Message> Context<'a, M> {
    pub(crate) fn new(system: &'a mut ActorSystem<M>, id: ActorId) -> Self {
        Self { system, id }
    }

    /// Id of the actor this hook runs for
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Current system tick
    pub fn now(&self) -> u64 {
        self.system.now()
    }

    /// Send a message to another actor
    ///
    /// The message is logged as sent by this actor and received by the
    /// target. Fails only if the target was never spawned.
    pub fn tell(&mut self, target: ActorId, message: M) -> Result<()> {
        self.system.deliver(Some(self.id), target, message)
    }

    /// Spawn a child actor
    pub fn spawn<A: Actor<M>>(&mut self, actor: A) -> Result<ActorId> {
        self.system.spawn(actor)
    }

    /// Stop any actor
    pub fn stop(&mut self, id: ActorId) {
        self.system.stop(id);
    }

    /// Stop the actor this hook runs for
    pub fn stop_self(&mut self) {
        self.system.stop(self.id);
    }

    /// Whether an actor is still ticked by the system
    pub fn is_active(&self, id: ActorId) -> bool {
        self.system.is_active(id)
    }
}
