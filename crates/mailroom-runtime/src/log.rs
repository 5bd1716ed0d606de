//! Per-actor message log

use mailroom_core::ActorId;

/// Every message an actor was told and every message it told others
///
/// Messages are logged when they are told, not when they arrive, so the
/// received side includes messages still in transit or queued in the mailbox.
#[derive(Debug, Clone)]
pub struct MessageLog<M> {
    received: Vec<M>,
    sent: Vec<(ActorId, M)>,
}

impl<M> MessageLog<M> {
    pub fn new() -> Self {
        Self {
            received: Vec::new(),
            sent: Vec::new(),
        }
    }

    pub(crate) fn record_received(&mut self, message: M) {
        self.received.push(message);
    }

    pub(crate) fn record_sent(&mut self, target: ActorId, message: M) {
        self.sent.push((target, message));
    }

    /// Messages told to this actor, in telling order
    pub fn received(&self) -> &[M] {
        &self.received
    }

    /// Messages this actor told others, with their targets
    pub fn sent(&self) -> &[(ActorId, M)] {
        &self.sent
    }

    /// Messages this actor told one particular target
    pub fn sent_to(&self, target: ActorId) -> impl Iterator<Item = &M> {
        self.sent
            .iter()
            .filter(move |(to, _)| *to == target)
            .map(|(_, message)| message)
    }
}

impl<M> Default for MessageLog<M> {
    fn default() -> Self {
        Self::new()
    }
}
