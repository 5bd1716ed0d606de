//! TigerStyle constants for Mailroom
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Channel Limits
// =============================================================================

/// Default delay of an actor's inbound channel in ticks
///
/// A delay of `d` delivers a message on the `d + 1`-th channel tick after it
/// was sent, so the default takes two ticks to arrive.
pub const CHANNEL_DELAY_TICKS_DEFAULT: u32 = 1;

/// Delay of the channels between helpers and the message store
pub const CHANNEL_DELAY_TICKS_STORE: u32 = 0;

/// Maximum configurable channel delay in ticks
pub const CHANNEL_DELAY_TICKS_MAX: u32 = 1_000;

// =============================================================================
// Actor Limits
// =============================================================================

/// Maximum depth of an actor mailbox
pub const MAILBOX_DEPTH_MAX: usize = 10_000;

/// Maximum number of actors a system will spawn over its lifetime
pub const ACTOR_SPAWNED_COUNT_MAX: u64 = 1_000_000;

/// Maximum processing time of a single message in ticks
pub const MESSAGE_DURATION_TICKS_MAX: u32 = 1_000;

// =============================================================================
// Message Board Limits
// =============================================================================

/// Default number of workers spawned by a dispatcher
pub const WORKERS_COUNT_DEFAULT: usize = 2;

/// Maximum number of workers a dispatcher may manage
pub const WORKERS_COUNT_MAX: usize = 1_024;

/// Maximum length of a published message body in characters
pub const USER_MESSAGE_BODY_LENGTH_CHARS_MAX: usize = 10;

/// Idle ticks a helper waits for a store reply before resending
pub const HELPER_IDLE_TICKS_MAX: u32 = 3;

/// Number of resends a helper attempts before reporting failure
pub const HELPER_RETRIES_COUNT_MAX: u32 = 2;

// =============================================================================
// DST Limits
// =============================================================================

/// Default tick budget for a simulation run
pub const DST_TICKS_COUNT_DEFAULT: u64 = 10_000;

/// Maximum tick budget for a simulation run
pub const DST_TICKS_COUNT_MAX: u64 = 10_000_000;

// Compile-time assertions for constant validity
const _: () = {
    assert!(CHANNEL_DELAY_TICKS_DEFAULT <= CHANNEL_DELAY_TICKS_MAX);
    assert!(CHANNEL_DELAY_TICKS_STORE <= CHANNEL_DELAY_TICKS_DEFAULT);
    assert!(WORKERS_COUNT_DEFAULT > 0);
    assert!(WORKERS_COUNT_DEFAULT <= WORKERS_COUNT_MAX);
    assert!(HELPER_IDLE_TICKS_MAX > 0);
    assert!(DST_TICKS_COUNT_DEFAULT <= DST_TICKS_COUNT_MAX);
};
