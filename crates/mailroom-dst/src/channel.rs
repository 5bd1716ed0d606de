//! Fault-injecting channel
//!
//! TigerStyle: Faults are decided at send time from the shared seeded injector.

use crate::fault::{FaultInjector, FaultType};
use mailroom_runtime::{Channel, DelayChannel};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A `DelayChannel` that may drop, delay or duplicate what it is sent
///
/// Every `send` asks the injector about `operation`; fault filters match
/// against that name.
#[derive(Debug)]
pub struct LossyChannel<M> {
    inner: DelayChannel<M>,
    faults: Arc<FaultInjector>,
    operation: String,
    dropped_count: u64,
}

impl<M> LossyChannel<M> {
    pub fn new(delay_ticks: u32, faults: Arc<FaultInjector>, operation: impl Into<String>) -> Self {
        Self {
            inner: DelayChannel::new(delay_ticks),
            faults,
            operation: operation.into(),
            dropped_count: 0,
        }
    }

    /// Messages this channel has dropped so far
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

impl<M: Clone + fmt::Debug> Channel<M> for LossyChannel<M> {
    fn send(&mut self, message: M) {
        match self.faults.should_inject(&self.operation) {
            Some(FaultType::MessageDrop) => {
                self.dropped_count += 1;
                debug!(operation = %self.operation, ?message, "Message dropped");
            }
            Some(FaultType::MessageDelay { extra_ticks }) => {
                let delay = self.inner.delay_ticks().saturating_add(extra_ticks);
                self.inner.send_with_delay(message, delay);
            }
            Some(FaultType::MessageDuplicate) => {
                self.inner.send(message.clone());
                self.inner.send(message);
            }
            None => self.inner.send(message),
        }
    }

    fn tick(&mut self) -> Vec<M> {
        self.inner.tick()
    }

    fn in_transit_count(&self) -> usize {
        self.inner.in_transit_count()
    }
}
