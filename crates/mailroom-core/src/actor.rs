//! Actor identity
//!
//! TigerStyle: Ids are assigned by the actor system in spawn order and never reused.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a spawned actor
///
/// Ids are assigned sequentially by the actor system starting at 0. An actor
/// that has not been spawned has no id at all; the system hands the id back
/// from `spawn`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    /// Create an ActorId from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one in spawn order
    pub fn next(self) -> Self {
        debug_assert!(self.0 < u64::MAX, "actor id space exhausted");
        Self(self.0 + 1)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_sequence() {
        let first = ActorId::new(0);
        let second = first.next();

        assert_eq!(second.get(), 1);
        assert!(first < second);
    }

    #[test]
    fn test_actor_id_display() {
        assert_eq!(ActorId::new(7).to_string(), "actor-7");
    }
}
