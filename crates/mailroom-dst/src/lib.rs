//! Mailroom DST - Deterministic Simulation Testing
//!
//! Seeded, fault-injecting simulation of the message board.
//!
//! # Overview
//!
//! - Reproducible random numbers (`DeterministicRng`, re-exported from core)
//! - Fault injection (`FaultInjector`) consulted by `LossyChannel`
//! - A `Simulation` harness that boots a dispatcher and hands the test a
//!   `SimEnvironment`
//! - Board invariants checked against `BoardSnapshot`s
//!
//! # Example
//!
//! ```rust,ignore
//! use mailroom_dst::{FaultConfig, FaultType, SimConfig, Simulation};
//!
//! #[test]
//! fn test_with_faults() {
//!     let config = SimConfig::from_env_or_random();
//!     Simulation::new(config)
//!         .with_fault(FaultConfig::new(FaultType::MessageDrop, 0.1))
//!         .run(|env| {
//!             let client = env.spawn_session("alice", 1, "hello")?;
//!             env.run_until("session finished", |env| env.session_finished(client))?;
//!             Ok(())
//!         })
//!         .unwrap();
//! }
//! ```
//!
//! # TigerStyle
//!
//! - All runs are deterministic given the same seed
//! - Always log the seed for reproducibility
//! - Explicit fault types and probabilities

pub mod channel;
pub mod fault;
pub mod invariants;
pub mod simulation;

pub use channel::LossyChannel;
pub use fault::{FaultConfig, FaultInjector, FaultInjectorBuilder, FaultStats, FaultType};
pub use invariants::{
    BoardSnapshot, BodyLengthBounded, Invariant, InvariantChecker, InvariantViolation,
    SessionUniqueness, ShutdownBarrier, StoredSnapshot, UniqueIncreasingMessageIds, WorkerSnapshot,
};
pub use mailroom_core::DeterministicRng;
pub use simulation::{SimConfig, SimEnvironment, Simulation, SimulationError};
