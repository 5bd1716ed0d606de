//! Message contract

use std::fmt;

/// A message that can be told to an actor
///
/// Messages are immutable values once constructed. Every message declares how
/// many ticks the receiving actor stays busy before its handler runs.
pub trait Message: Clone + fmt::Debug + 'static {
    /// Ticks required to process this message
    fn duration_ticks(&self) -> u32;

    /// Short name used in logs
    fn kind(&self) -> &'static str {
        "message"
    }
}
