//! Actor system: registry and tick scheduler
//!
//! TigerStyle: Snapshot iteration, explicit limits, failures reported per tick.
//!
//! The system keeps every actor it ever spawned. Stopping an actor only removes
//! it from the active set; its state, mailbox and message log stay available
//! for inspection, and messages told to it are still logged and queued.

use crate::actor::{Actor, AsAny, Context};
use crate::cell::ActorCell;
use crate::channel::{Channel, DelayChannel};
use crate::log::MessageLog;
use crate::message::Message;
use mailroom_core::constants::ACTOR_SPAWNED_COUNT_MAX;
use mailroom_core::error::{ActorFailure, Error, Result};
use mailroom_core::{ActorId, SystemConfig};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, instrument, trace, warn};

/// Registry entry: scheduling state plus the behavior
///
/// The behavior is taken out while one of its hooks runs, so a hook may freely
/// mutate the system (including its own cell) through its context.
struct Slot<M: Message> {
    cell: ActorCell<M>,
    behavior: Option<Box<dyn Actor<M>>>,
    name: &'static str,
}

/// Discrete-time actor system
pub struct ActorSystem<M: Message> {
    config: SystemConfig,
    slots: BTreeMap<ActorId, Slot<M>>,
    /// Active actors in spawn order
    active: Vec<ActorId>,
    next_id: ActorId,
    now: u64,
}

impl<M: Message> ActorSystem<M> {
    /// Create a system with the default configuration
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    /// Create a system with the given configuration
    pub fn with_config(config: SystemConfig) -> Self {
        Self {
            config,
            slots: BTreeMap::new(),
            active: Vec::new(),
            next_id: ActorId::new(0),
            now: 0,
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Spawn an actor on the channel it asks for
    ///
    /// The actor is registered and active before its `started` hook runs, and
    /// its local clock is aligned with the system clock afterwards.
    pub fn spawn<A: Actor<M>>(&mut self, actor: A) -> Result<ActorId> {
        self.spawn_boxed(Box::new(actor), None)
    }

    /// Spawn an actor on an explicit channel, ignoring the one it asks for
    pub fn spawn_with_channel<A: Actor<M>>(
        &mut self,
        actor: A,
        channel: Box<dyn Channel<M>>,
    ) -> Result<ActorId> {
        self.spawn_boxed(Box::new(actor), Some(channel))
    }

    fn spawn_boxed(
        &mut self,
        mut behavior: Box<dyn Actor<M>>,
        channel: Option<Box<dyn Channel<M>>>,
    ) -> Result<ActorId> {
        let spawned = self.slots.len() as u64;
        if spawned >= ACTOR_SPAWNED_COUNT_MAX {
            return Err(Error::ActorLimitReached {
                count: spawned,
                limit: ACTOR_SPAWNED_COUNT_MAX,
            });
        }

        let id = self.next_id;
        self.next_id = id.next();

        let delay_ticks = self.config.channel_delay_ticks;
        let channel = channel
            .or_else(|| behavior.channel())
            .unwrap_or_else(|| Box::new(DelayChannel::new(delay_ticks)));
        let name = behavior.name();

        self.slots.insert(
            id,
            Slot {
                cell: ActorCell::new(id, channel, self.config.mailbox_depth_max),
                behavior: None,
                name,
            },
        );
        self.active.push(id);

        let started = {
            let mut ctx = Context::new(self, id);
            behavior.started(&mut ctx)
        };

        let now = self.now;
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| Error::internal(format!("{} vanished during start", id)))?;
        slot.behavior = Some(behavior);
        slot.cell.stamp_start(now);

        started?;

        info!(actor = %id, name, tick = now, "Actor spawned");
        Ok(id)
    }

    /// Remove an actor from the active set
    ///
    /// Idempotent. The actor stays inspectable and keeps accepting messages,
    /// which are queued but never processed.
    pub fn stop(&mut self, id: ActorId) {
        if let Some(position) = self.active.iter().position(|active| *active == id) {
            self.active.remove(position);
            let name = self.slots.get(&id).map(|slot| slot.name).unwrap_or("?");
            info!(actor = %id, name, tick = self.now, "Actor stopped");
        }
    }

    /// Swap an actor's inbound channel, returning the old one
    pub fn replace_channel(
        &mut self,
        id: ActorId,
        channel: Box<dyn Channel<M>>,
    ) -> Result<Box<dyn Channel<M>>> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| Error::actor_not_found(id))?;
        Ok(slot.cell.replace_channel(channel))
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Tell an actor a message from outside the system
    pub fn tell(&mut self, target: ActorId, message: M) -> Result<()> {
        self.deliver(None, target, message)
    }

    pub(crate) fn deliver(
        &mut self,
        sender: Option<ActorId>,
        target: ActorId,
        message: M,
    ) -> Result<()> {
        if !self.slots.contains_key(&target) {
            return Err(Error::actor_not_found(target));
        }

        trace!(from = ?sender, to = %target, kind = message.kind(), "Message told");

        if let Some(sender_slot) = sender.and_then(|from| self.slots.get_mut(&from)) {
            sender_slot.cell.log_mut().record_sent(target, message.clone());
        }

        let slot = self
            .slots
            .get_mut(&target)
            .ok_or_else(|| Error::actor_not_found(target))?;
        slot.cell.enqueue(message);

        Ok(())
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Advance every active actor by one tick, then the system clock
    ///
    /// Iterates over a snapshot of the active set: actors spawned during the
    /// round are first ticked next round, and actors stopped during the round
    /// still finish this one. Handler errors do not interrupt the round; they
    /// are returned together once the clock has advanced.
    #[instrument(skip(self), fields(tick = self.now), level = "trace")]
    pub fn tick(&mut self) -> Result<()> {
        let snapshot = self.active.clone();
        let mut failures = Vec::new();

        for id in snapshot {
            if let Err(error) = self.tick_actor(id) {
                warn!(actor = %id, tick = self.now, error = %error, "Actor handler failed");
                failures.push(ActorFailure { actor: id, error });
            }
        }

        let tick = self.now;
        self.now += 1;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::TickFailed { tick, failures })
        }
    }

    fn tick_actor(&mut self, id: ActorId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| Error::actor_not_found(id))?;

        let step = slot.cell.advance();
        let overflow = (step.overflowed > 0).then(|| Error::MailboxFull {
            id,
            depth: slot.cell.mailbox_len(),
            limit: slot.cell.mailbox_depth_max(),
        });

        let mut behavior = slot
            .behavior
            .take()
            .ok_or_else(|| Error::internal(format!("{} ticked while its hook is running", id)))?;

        let result = {
            let mut ctx = Context::new(self, id);
            match step.completed {
                Some(message) => behavior.receive(&mut ctx, message),
                None => Ok(()),
            }
            .and_then(|()| behavior.on_tick(&mut ctx))
        };

        if let Some(slot) = self.slots.get_mut(&id) {
            slot.behavior = Some(behavior);
        }

        result?;
        match overflow {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Run `ticks` ticks, stopping at the first failed one
    pub fn run_for(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Tick until `done` holds, returning the number of ticks taken
    ///
    /// Fails with `TickBudgetExhausted` if `done` does not hold within
    /// `max_ticks` ticks.
    pub fn run_until<F>(&mut self, max_ticks: u64, mut done: F) -> Result<u64>
    where
        F: FnMut(&Self) -> bool,
    {
        let start = self.now;
        while !done(self) {
            let elapsed = self.now - start;
            if elapsed >= max_ticks {
                return Err(Error::TickBudgetExhausted {
                    ticks: elapsed,
                    waiting_for: "run_until condition".to_string(),
                });
            }
            self.tick()?;
        }
        let elapsed = self.now - start;
        info!(ticks = elapsed, now = self.now, "Condition reached");
        Ok(elapsed)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Current system tick
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Whether an actor exists (active or stopped)
    pub fn contains(&self, id: ActorId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn is_active(&self, id: ActorId) -> bool {
        self.active.contains(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active actors in spawn order
    pub fn active_ids(&self) -> &[ActorId] {
        &self.active
    }

    /// Total actors ever spawned
    pub fn spawned_count(&self) -> usize {
        self.slots.len()
    }

    pub fn message_log(&self, id: ActorId) -> Option<&MessageLog<M>> {
        self.slots.get(&id).map(|slot| slot.cell.log())
    }

    pub fn cell(&self, id: ActorId) -> Option<&ActorCell<M>> {
        self.slots.get(&id).map(|slot| &slot.cell)
    }

    pub fn mailbox_len(&self, id: ActorId) -> Option<usize> {
        self.cell(id).map(ActorCell::mailbox_len)
    }

    pub fn busy_ticks(&self, id: ActorId) -> Option<u32> {
        self.cell(id).map(ActorCell::busy_ticks)
    }

    pub fn time_since_system_start(&self, id: ActorId) -> Option<u64> {
        self.cell(id).map(ActorCell::time_since_system_start)
    }

    /// Borrow an actor's behavior as its concrete type
    pub fn actor<T: Actor<M>>(&self, id: ActorId) -> Option<&T> {
        let behavior = self.slots.get(&id)?.behavior.as_deref()?;
        <dyn Actor<M> as AsAny>::as_any(behavior).downcast_ref::<T>()
    }

    /// Mutably borrow an actor's behavior as its concrete type
    pub fn actor_mut<T: Actor<M>>(&mut self, id: ActorId) -> Option<&mut T> {
        let behavior = self.slots.get_mut(&id)?.behavior.as_deref_mut()?;
        <dyn Actor<M> as AsAny>::as_any_mut(behavior).downcast_mut::<T>()
    }

    /// Ids of every actor (active or stopped) whose behavior is a `T`
    pub fn ids_of<T: Actor<M>>(&self) -> Vec<ActorId> {
        self.slots
            .keys()
            .copied()
            .filter(|id| self.actor::<T>(*id).is_some())
            .collect()
    }
}

impl<M: Message> Default for ActorSystem<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> fmt::Debug for ActorSystem<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("now", &self.now)
            .field("spawned", &self.slots.len())
            .field("active", &self.active)
            .finish()
    }
}
