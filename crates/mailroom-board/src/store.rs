//! Message store actor
//!
//! TigerStyle: Single owner of persisted messages, serialised by the scheduler.

use crate::messages::{BoardMessage, ClientMessage, StoreOperation, StoreRequest};
use crate::user_message::{MessageId, UserMessage};
use mailroom_core::constants::CHANNEL_DELAY_TICKS_STORE;
use mailroom_core::error::Result;
use mailroom_runtime::{Actor, Channel, Context, DelayChannel, Message};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The single shared persistence actor
///
/// Every operation runs inside one `receive` call and answers the requesting
/// helper with a reply that carries the request's communication id.
#[derive(Debug)]
pub struct MessageStore {
    messages: BTreeMap<MessageId, UserMessage>,
    next_id: MessageId,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
            next_id: MessageId::FIRST,
        }
    }

    /// Insert a new message, returning its assigned id
    ///
    /// Fails (returns `None`) if the message already carries an id or if a
    /// message with the same author and body is already stored.
    pub fn update(&mut self, message: UserMessage) -> Option<MessageId> {
        if !message.is_new() {
            return None;
        }

        let duplicate = self
            .messages
            .values()
            .any(|stored| stored.author == message.author && stored.body == message.body);
        if duplicate {
            return None;
        }

        let id = self.next_id;
        self.next_id = id.next();
        self.messages.insert(
            id,
            UserMessage {
                message_id: Some(id),
                ..message
            },
        );

        debug_assert!(self.next_id > id);
        Some(id)
    }

    /// Record a like, failing on unknown ids and repeated likes
    pub fn add_like(&mut self, client_name: &str, message_id: MessageId) -> bool {
        match self.messages.get_mut(&message_id) {
            Some(message) => message.likes.insert(client_name.to_string()),
            None => false,
        }
    }

    /// Every stored message by `author`, in id order
    pub fn find_by_author(&self, author: &str) -> Vec<UserMessage> {
        self.messages
            .values()
            .filter(|message| message.author == author)
            .cloned()
            .collect()
    }

    pub fn get(&self, message_id: MessageId) -> Option<&UserMessage> {
        self.messages.get(&message_id)
    }

    /// Stored messages in id order
    pub fn messages(&self) -> impl Iterator<Item = &UserMessage> {
        self.messages.values()
    }

    /// Stored messages with the id each is filed under
    pub fn entries(&self) -> impl Iterator<Item = (MessageId, &UserMessage)> {
        self.messages.iter().map(|(id, message)| (*id, message))
    }

    /// Id the next stored message will get
    pub fn next_id(&self) -> MessageId {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn handle(&mut self, request: StoreRequest) -> ClientMessage {
        let communication_id = request.communication_id;
        match request.operation {
            StoreOperation::RetrieveFromStore { author } => ClientMessage::FoundMessages {
                messages: self.find_by_author(&author),
                communication_id,
            },
            StoreOperation::AddLike {
                client_name,
                message_id,
            } => {
                if self.add_like(&client_name, message_id) {
                    debug!(%message_id, client_name = %client_name, "Like recorded");
                    ClientMessage::OperationAck {
                        communication_id,
                        message_id: Some(message_id),
                    }
                } else {
                    ClientMessage::OperationFailed { communication_id }
                }
            }
            StoreOperation::UpdateMessageStore(message) => match self.update(message) {
                Some(message_id) => {
                    info!(%message_id, communication_id, "Message stored");
                    ClientMessage::OperationAck {
                        communication_id,
                        message_id: Some(message_id),
                    }
                }
                None => ClientMessage::OperationFailed { communication_id },
            },
        }
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor<BoardMessage> for MessageStore {
    fn receive(&mut self, ctx: &mut Context<'_, BoardMessage>, message: BoardMessage) -> Result<()> {
        match message {
            BoardMessage::Store(request) => {
                let reply_to = request.reply_to;
                let reply = self.handle(request);
                ctx.tell(reply_to, reply.into())
            }
            other => {
                debug!(kind = other.kind(), "Store ignored message");
                Ok(())
            }
        }
    }

    fn channel(&self) -> Option<Box<dyn Channel<BoardMessage>>> {
        Some(Box::new(DelayChannel::new(CHANNEL_DELAY_TICKS_STORE)))
    }

    fn name(&self) -> &'static str {
        "message-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_assigns_increasing_ids() {
        let mut store = MessageStore::new();
        let first = store.update(UserMessage::new("alice", "one")).unwrap();
        let second = store.update(UserMessage::new("alice", "two")).unwrap();

        assert_eq!(first, MessageId::FIRST);
        assert!(second > first);
        assert_eq!(store.get(second).unwrap().message_id, Some(second));

        // A rejected update does not consume an id
        assert!(store.update(UserMessage::new("alice", "two")).is_none());
        assert_eq!(store.next_id(), MessageId::new(3));
        assert!(store.entries().all(|(key, m)| m.message_id == Some(key)));
    }

    #[test]
    fn test_update_rejects_duplicate_author_body() {
        let mut store = MessageStore::new();
        assert!(store.update(UserMessage::new("alice", "hi")).is_some());
        assert!(store.update(UserMessage::new("alice", "hi")).is_none());
        // Same body from someone else is fine.
        assert!(store.update(UserMessage::new("bob", "hi")).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_rejects_stored_message() {
        let mut store = MessageStore::new();
        let mut message = UserMessage::new("alice", "hi");
        message.message_id = Some(MessageId::new(9));
        assert!(store.update(message).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_like_at_most_once() {
        let mut store = MessageStore::new();
        let id = store.update(UserMessage::new("alice", "hi")).unwrap();

        assert!(store.add_like("bob", id));
        assert!(!store.add_like("bob", id));
        assert!(store.add_like("carol", id));
        assert!(!store.add_like("bob", MessageId::new(99)));
        assert_eq!(store.get(id).unwrap().likes.len(), 2);
    }

    #[test]
    fn test_find_by_author() {
        let mut store = MessageStore::new();
        store.update(UserMessage::new("alice", "one"));
        store.update(UserMessage::new("bob", "two"));
        store.update(UserMessage::new("alice", "three"));

        let found = store.find_by_author("alice");
        let bodies: Vec<_> = found.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "three"]);
        assert!(store.find_by_author("nobody").is_empty());
    }
}
