//! Simulation harness for deterministic testing
//!
//! TigerStyle: Reproducible test execution with explicit configuration.
//!
//! The actor system is single-threaded and driven tick by tick, so the seed
//! alone decides routing, fault injection and every interleaving. Running the
//! same test with `DST_SEED=12345` replays it exactly.

use crate::channel::LossyChannel;
use crate::fault::{FaultConfig, FaultInjector, FaultInjectorBuilder};
use crate::invariants::{BoardSnapshot, InvariantChecker, InvariantViolation};
use mailroom_board::{
    BoardMessage, BoardSystem, CommunicationId, Dispatcher, MessageStore, RecordingClient,
    SessionClient,
};
use mailroom_core::constants::{
    CHANNEL_DELAY_TICKS_STORE, DST_TICKS_COUNT_DEFAULT, DST_TICKS_COUNT_MAX,
};
use mailroom_core::{
    ActorId, BoardConfig, DeterministicRng, Error, MailroomConfig, Result, SystemConfig,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Operation name the store's lossy channel reports to the fault injector
pub const STORE_DELIVERY_OPERATION: &str = "deliver:message-store";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a simulation
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Tick budget for every `run_until` in the test
    pub max_ticks: u64,
    /// Actor system configuration
    pub system: SystemConfig,
    /// Message board configuration
    pub board: BoardConfig,
}

impl SimConfig {
    /// Create a new simulation config with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            max_ticks: DST_TICKS_COUNT_DEFAULT,
            system: SystemConfig::default(),
            board: BoardConfig::default(),
        }
    }

    /// Create config from DST_SEED environment variable or random
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("DST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);

        info!(seed = seed, "DST seed (set DST_SEED={} to replay)", seed);

        Self::new(seed)
    }

    /// Set the number of workers the dispatcher spawns
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.board.worker_count = worker_count;
        self
    }

    /// Set the tick budget of `run_until`
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        debug_assert!(ticks <= DST_TICKS_COUNT_MAX);
        self.max_ticks = ticks;
        self
    }

    /// Take system and board settings from a loaded configuration
    pub fn with_config(mut self, config: MailroomConfig) -> Self {
        self.system = config.system;
        self.board = config.board;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_ticks == 0 || self.max_ticks > DST_TICKS_COUNT_MAX {
            return Err(Error::invalid_configuration(
                "max_ticks",
                format!("must be in 1..={}", DST_TICKS_COUNT_MAX),
            ));
        }
        MailroomConfig {
            system: self.system.clone(),
            board: self.board.clone(),
        }
        .validate()
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Environment provided to simulation tests
///
/// Owns a booted board: the dispatcher has started, so the store and the
/// workers exist before the test body runs.
pub struct SimEnvironment {
    /// The actor system running the board
    pub system: BoardSystem,
    /// Deterministic RNG for the test body
    pub rng: DeterministicRng,
    /// Fault injector (shared with every lossy channel)
    pub faults: Arc<FaultInjector>,
    dispatcher: ActorId,
    config: SimConfig,
    checker: Option<InvariantChecker>,
    violation: Option<InvariantViolation>,
}

impl SimEnvironment {
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> ActorId {
        self.dispatcher
    }

    pub fn dispatcher_state(&self) -> Option<&Dispatcher> {
        self.system.actor::<Dispatcher>(self.dispatcher)
    }

    pub fn store(&self) -> Option<ActorId> {
        self.dispatcher_state().and_then(|d| d.store())
    }

    pub fn store_state(&self) -> Option<&MessageStore> {
        self.store()
            .and_then(|store| self.system.actor::<MessageStore>(store))
    }

    /// Workers in spawn order
    pub fn workers(&self) -> Vec<ActorId> {
        self.dispatcher_state()
            .map(|d| d.workers().to_vec())
            .unwrap_or_default()
    }

    /// Spawn a client that only records replies
    pub fn spawn_client(&mut self, name: &str) -> Result<ActorId> {
        self.system.spawn(RecordingClient::new(name))
    }

    /// Spawn a client that runs one full session against the dispatcher
    pub fn spawn_session(
        &mut self,
        name: &str,
        communication_id: CommunicationId,
        body: &str,
    ) -> Result<ActorId> {
        let dispatcher = self.dispatcher;
        self.system
            .spawn(SessionClient::new(name, dispatcher, communication_id, body))
    }

    pub fn client(&self, id: ActorId) -> Option<&RecordingClient> {
        self.system.actor::<RecordingClient>(id)
    }

    pub fn session(&self, id: ActorId) -> Option<&SessionClient> {
        self.system.actor::<SessionClient>(id)
    }

    /// Whether a session client reached a final phase
    pub fn session_finished(&self, id: ActorId) -> bool {
        self.session(id)
            .map(|session| session.phase().is_finished())
            .unwrap_or(false)
    }

    pub fn tell(&mut self, target: ActorId, message: BoardMessage) -> Result<()> {
        self.system.tell(target, message)
    }

    /// Ask the dispatcher to shut the board down
    pub fn stop_board(&mut self) -> Result<()> {
        let dispatcher = self.dispatcher;
        self.system.tell(dispatcher, BoardMessage::Stop)
    }

    /// Whether the dispatcher has stopped itself
    pub fn board_stopped(&self) -> bool {
        !self.system.is_active(self.dispatcher)
    }

    /// Route an actor's inbound messages through the fault injector
    pub fn make_lossy(&mut self, id: ActorId, delay_ticks: u32, operation: &str) -> Result<()> {
        let channel = LossyChannel::new(delay_ticks, self.faults.clone(), operation);
        self.system.replace_channel(id, Box::new(channel))?;
        Ok(())
    }

    /// Current system tick
    pub fn now(&self) -> u64 {
        self.system.now()
    }

    /// Run `ticks` ticks
    pub fn run_for(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Tick until `done` holds, within the configured tick budget
    ///
    /// Returns the number of ticks taken.
    pub fn run_until<F>(&mut self, waiting_for: &str, mut done: F) -> Result<u64>
    where
        F: FnMut(&Self) -> bool,
    {
        let start = self.now();
        while !done(self) {
            let elapsed = self.now() - start;
            if elapsed >= self.config.max_ticks {
                return Err(Error::TickBudgetExhausted {
                    ticks: elapsed,
                    waiting_for: waiting_for.to_string(),
                });
            }
            self.step()?;
        }
        Ok(self.now() - start)
    }

    /// Capture the board as plain data
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        BoardSnapshot::capture(&self.system, self.dispatcher)
    }

    /// Check the configured invariants against the current board
    pub fn check_invariants(&self) -> std::result::Result<(), InvariantViolation> {
        match (&self.checker, self.snapshot()) {
            (Some(checker), Some(snapshot)) => checker.verify_all(&snapshot),
            _ => Ok(()),
        }
    }

    /// Tick once, remembering the first invariant violation seen
    fn step(&mut self) -> Result<()> {
        self.system.tick()?;
        if self.violation.is_none() {
            if let Err(violation) = self.check_invariants() {
                warn!(tick = self.now(), %violation, "Invariant violated");
                self.violation = Some(violation);
            }
        }
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Main simulation harness
pub struct Simulation {
    config: SimConfig,
    fault_configs: Vec<FaultConfig>,
    /// Invariants checked after every tick and once the test returns
    invariant_checker: Option<InvariantChecker>,
}

impl Simulation {
    /// Create a new simulation with the given config
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            fault_configs: Vec::new(),
            invariant_checker: None,
        }
    }

    /// Add a fault configuration
    pub fn with_fault(mut self, fault: FaultConfig) -> Self {
        self.fault_configs.push(fault);
        self
    }

    /// Add multiple fault configurations
    pub fn with_faults(mut self, faults: Vec<FaultConfig>) -> Self {
        self.fault_configs.extend(faults);
        self
    }

    /// Add an invariant checker for verified simulation runs
    pub fn with_invariants(mut self, checker: InvariantChecker) -> Self {
        self.invariant_checker = Some(checker);
        self
    }

    /// Boot the board and run the test function against it
    ///
    /// When faults are configured, the store's inbound channel is lossy.
    pub fn run<F, T>(self, test: F) -> std::result::Result<T, SimulationError>
    where
        F: FnOnce(&mut SimEnvironment) -> Result<T>,
    {
        self.config
            .validate()
            .map_err(SimulationError::SetupFailed)?;

        let seed = self.config.seed;
        let rng = DeterministicRng::new(seed);

        let has_faults = !self.fault_configs.is_empty();
        let mut fault_builder = FaultInjectorBuilder::new(rng.stream("faults"));
        for fault in self.fault_configs {
            fault_builder = fault_builder.with_fault(fault);
        }
        let faults = Arc::new(fault_builder.build());

        let mut system = BoardSystem::with_config(self.config.system.clone());
        let dispatcher = system
            .spawn(Dispatcher::new(self.config.board.clone()))
            .map_err(SimulationError::SetupFailed)?;

        let mut env = SimEnvironment {
            system,
            rng,
            faults,
            dispatcher,
            config: self.config,
            checker: self.invariant_checker,
            violation: None,
        };

        if has_faults {
            let store = env.store().ok_or_else(|| {
                SimulationError::SetupFailed(Error::internal("dispatcher started without a store"))
            })?;
            env.make_lossy(store, CHANNEL_DELAY_TICKS_STORE, STORE_DELIVERY_OPERATION)
                .map_err(SimulationError::SetupFailed)?;
        }

        info!(
            seed,
            workers = env.workers().len(),
            faults = has_faults,
            "Simulation started"
        );

        let output = test(&mut env)?;

        if let Some(violation) = env.violation.take() {
            return Err(SimulationError::InvariantViolation(violation));
        }
        env.check_invariants()?;

        info!(seed, ticks = env.now(), "Simulation finished");
        Ok(output)
    }
}

/// Errors from simulation
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The board could not be booted
    #[error("Simulation setup failed: {0}")]
    SetupFailed(Error),
    /// Test function returned an error
    #[error("Test failed: {0}")]
    TestFailed(#[from] Error),
    /// An invariant was violated
    #[error("{0}")]
    InvariantViolation(#[from] InvariantViolation),
}
