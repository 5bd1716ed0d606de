//! User-authored board messages

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Client-chosen session correlation key
///
/// Assumed unique per active session; the board never checks this.
pub type CommunicationId = i64;

/// Id assigned by the message store on insert
///
/// Always positive. A message that was never stored has no id.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// First id handed out by a fresh store
    pub const FIRST: MessageId = MessageId(1);

    pub fn new(raw: u64) -> Self {
        debug_assert!(raw > 0, "message ids are positive");
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A message posted to the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub author: String,
    pub body: String,
    /// Names of everyone who liked this message
    pub likes: BTreeSet<String>,
    /// `None` until the store persists the message
    pub message_id: Option<MessageId>,
}

impl UserMessage {
    /// A new, unstored message without likes
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
            likes: BTreeSet::new(),
            message_id: None,
        }
    }

    /// Whether the store has not assigned an id yet
    pub fn is_new(&self) -> bool {
        self.message_id.is_none()
    }

    /// Body length in characters (not bytes)
    pub fn body_length_chars(&self) -> usize {
        self.body.chars().count()
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} liked by :", self.author, self.body)?;
        let mut first = true;
        for name in &self.likes {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}
