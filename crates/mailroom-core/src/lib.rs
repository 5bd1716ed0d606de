//! Mailroom Core
//!
//! Core types, errors, and constants for the mailroom actor simulation.
//!
//! # Overview
//!
//! Mailroom is a discrete-time simulation of the actor model. Actors exchange
//! messages through delayed channels, process one message at a time, and are
//! advanced by an explicit tick counter instead of wall-clock time.
//!
//! # TigerStyle
//!
//! - Explicit limits with big-endian naming (e.g., `MAILBOX_DEPTH_MAX`)
//! - Units in names (`_TICKS_`, `_COUNT_`, `_CHARS_`)
//! - Deterministic given the same seed

pub mod actor;
pub mod config;
pub mod constants;
pub mod error;
pub mod rng;
pub mod telemetry;

pub use actor::ActorId;
pub use config::{BoardConfig, MailroomConfig, SystemConfig};
pub use constants::*;
pub use error::{ActorFailure, Error, Result};
pub use rng::DeterministicRng;
pub use telemetry::{init_telemetry, LogFormat, TelemetryConfig, TelemetryGuard};
