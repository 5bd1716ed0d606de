//! Delayed inbound channels
//!
//! TigerStyle: Delivery order equals send order, no silent drops.
//!
//! Each actor owns one inbound channel that models the network between the
//! actor and whoever talks to it. The channel is advanced once per actor tick.

use std::fmt;

/// Transport between senders and a single receiving actor
///
/// Implementations decide how long messages stay in transit and whether they
/// arrive at all. The default is the reliable `DelayChannel`; simulations can
/// substitute lossy implementations per actor.
pub trait Channel<M>: fmt::Debug {
    /// Put a message in transit
    fn send(&mut self, message: M);

    /// Advance one tick
    ///
    /// Returns, in send order, every message that arrived.
    fn tick(&mut self) -> Vec<M>;

    /// Number of messages still in transit
    fn in_transit_count(&self) -> usize;
}

/// A message in transit with the ticks left before it arrives
#[derive(Debug, Clone)]
struct InTransit<M> {
    ticks_remaining: u32,
    message: M,
}

/// Reliable channel with a fixed delay
///
/// A message sent with delay `d` is returned by the `d + 1`-th call to
/// `tick`, so a delay of zero delivers on the next tick.
#[derive(Debug, Clone)]
pub struct DelayChannel<M> {
    delay_ticks: u32,
    in_transit: Vec<InTransit<M>>,
}

impl<M> DelayChannel<M> {
    /// Create a channel with the given fixed delay
    pub fn new(delay_ticks: u32) -> Self {
        Self {
            delay_ticks,
            in_transit: Vec::new(),
        }
    }

    /// The fixed delay of this channel
    pub fn delay_ticks(&self) -> u32 {
        self.delay_ticks
    }

    /// Put a message in transit with a delay other than the channel's own
    ///
    /// Used by decorators that add latency on top of the base delay.
    pub fn send_with_delay(&mut self, message: M, delay_ticks: u32) {
        self.in_transit.push(InTransit {
            ticks_remaining: delay_ticks,
            message,
        });
    }
}

impl<M: fmt::Debug> Channel<M> for DelayChannel<M> {
    fn send(&mut self, message: M) {
        self.send_with_delay(message, self.delay_ticks);
    }

    fn tick(&mut self) -> Vec<M> {
        let mut delivered = Vec::new();
        let mut remaining = Vec::with_capacity(self.in_transit.len());

        for entry in self.in_transit.drain(..) {
            if entry.ticks_remaining == 0 {
                delivered.push(entry.message);
            } else {
                remaining.push(InTransit {
                    ticks_remaining: entry.ticks_remaining - 1,
                    message: entry.message,
                });
            }
        }

        self.in_transit = remaining;
        delivered
    }

    fn in_transit_count(&self) -> usize {
        self.in_transit.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_delivers_next_tick() {
        let mut channel = DelayChannel::new(0);
        channel.send("hello");

        assert_eq!(channel.in_transit_count(), 1);
        assert_eq!(channel.tick(), vec!["hello"]);
        assert_eq!(channel.in_transit_count(), 0);
        assert!(channel.tick().is_empty());
    }

    #[test]
    fn test_delay_takes_delay_plus_one_ticks() {
        let mut channel = DelayChannel::new(2);
        channel.send(1);

        assert!(channel.tick().is_empty());
        assert!(channel.tick().is_empty());
        assert_eq!(channel.tick(), vec![1]);
    }

    #[test]
    fn test_delivery_preserves_send_order() {
        let mut channel = DelayChannel::new(1);
        channel.send(1);
        channel.send(2);
        channel.tick();
        channel.send(3);

        assert_eq!(channel.tick(), vec![1, 2]);
        assert_eq!(channel.tick(), vec![3]);
    }

    #[test]
    fn test_send_with_delay_overrides_base() {
        let mut channel = DelayChannel::new(0);
        channel.send_with_delay("late", 1);
        channel.send("early");

        assert_eq!(channel.tick(), vec!["early"]);
        assert_eq!(channel.tick(), vec!["late"]);
    }
}
