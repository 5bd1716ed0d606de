//! Actor mailbox
//!
//! TigerStyle: Bounded queue, arrivals past the limit are counted, never
//! silently lost.
//!
//! A cell hands its mailbox everything its channel delivered on one tick.
//! Arrivals keep channel order; whatever does not fit is rejected and
//! reported back so the system can surface a `MailboxFull` error.

use mailroom_core::constants::MAILBOX_DEPTH_MAX;
use std::collections::VecDeque;

/// Arrivals a mailbox could not hold on one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxOverflow {
    pub rejected_count: usize,
    pub depth_max: usize,
}

impl std::fmt::Display for MailboxOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mailbox full: rejected {} arrivals (limit: {})",
            self.rejected_count, self.depth_max
        )
    }
}

impl std::error::Error for MailboxOverflow {}

/// Bounded FIFO of delivered, not yet dequeued messages
#[derive(Debug)]
pub struct Mailbox<M> {
    queue: VecDeque<M>,
    depth_max: usize,
    /// Messages accepted over the mailbox's lifetime
    accepted_count: u64,
}

impl<M> Mailbox<M> {
    pub fn with_depth_max(depth_max: usize) -> Self {
        debug_assert!(depth_max > 0, "depth_max must be positive");
        debug_assert!(
            depth_max <= MAILBOX_DEPTH_MAX,
            "depth_max exceeds MAILBOX_DEPTH_MAX"
        );

        Self {
            queue: VecDeque::new(),
            depth_max,
            accepted_count: 0,
        }
    }

    /// Accept one tick's arrivals in order
    ///
    /// Everything past `depth_max` is rejected; the arrivals that fit are
    /// still queued.
    pub fn deliver(&mut self, arrivals: Vec<M>) -> Result<(), MailboxOverflow> {
        let room = self.depth_max.saturating_sub(self.queue.len());
        let rejected_count = arrivals.len().saturating_sub(room);

        for message in arrivals.into_iter().take(room) {
            self.queue.push_back(message);
            self.accepted_count = self.accepted_count.wrapping_add(1);
        }

        debug_assert!(self.queue.len() <= self.depth_max);
        if rejected_count > 0 {
            return Err(MailboxOverflow {
                rejected_count,
                depth_max: self.depth_max,
            });
        }
        Ok(())
    }

    /// Oldest queued message
    pub fn take_next(&mut self) -> Option<M> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn depth_max(&self) -> usize {
        self.depth_max
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrivals_keep_channel_order() {
        let mut mailbox = Mailbox::with_depth_max(10);

        mailbox.deliver(vec!["init", "publish"]).unwrap();
        mailbox.deliver(vec!["finish"]).unwrap();

        assert_eq!(mailbox.len(), 3);
        assert_eq!(mailbox.take_next(), Some("init"));
        assert_eq!(mailbox.take_next(), Some("publish"));
        assert_eq!(mailbox.take_next(), Some("finish"));
        assert!(mailbox.is_empty());
        assert!(mailbox.take_next().is_none());
    }

    #[test]
    fn test_overflow_keeps_what_fits() {
        let mut mailbox = Mailbox::with_depth_max(2);
        mailbox.deliver(vec![1]).unwrap();

        let overflow = mailbox.deliver(vec![2, 3, 4]).unwrap_err();
        assert_eq!(overflow.rejected_count, 2);
        assert_eq!(overflow.depth_max, 2);

        assert_eq!(mailbox.take_next(), Some(1));
        assert_eq!(mailbox.take_next(), Some(2));
        assert!(mailbox.take_next().is_none());
        assert_eq!(mailbox.accepted_count(), 2);
    }

    #[test]
    fn test_empty_delivery_is_fine() {
        let mut mailbox: Mailbox<u8> = Mailbox::with_depth_max(1);
        assert!(mailbox.deliver(Vec::new()).is_ok());
        assert_eq!(mailbox.accepted_count(), 0);
    }
}
