//! Full-board scenario run by `mailroom simulate`
//!
//! Every client runs one session (init, publish, like, retrieve, finish),
//! then the board is shut down.

use mailroom_board::SessionPhase;
use mailroom_dst::simulation::STORE_DELIVERY_OPERATION;
use mailroom_dst::{FaultConfig, FaultType, InvariantChecker, SimConfig, Simulation, SimulationError};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Maximum number of scripted clients per run
pub const SCENARIO_CLIENTS_COUNT_MAX: usize = 10_000;

/// What to run on top of the board
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub clients: usize,
    /// Probability that a message to the store is lost
    pub drop_probability: f64,
}

/// Outcome of one scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub seed: u64,
    pub workers: usize,
    pub ticks: u64,
    pub sessions_done: usize,
    pub sessions_rejected: usize,
    pub replies_by_kind: BTreeMap<String, usize>,
    pub messages_stored: usize,
    pub likes_stored: usize,
    pub store_messages_dropped: u64,
    pub shutdown_completed: bool,
}

pub fn run_scenario(
    config: SimConfig,
    options: &ScenarioOptions,
) -> Result<ScenarioSummary, SimulationError> {
    debug_assert!(options.clients <= SCENARIO_CLIENTS_COUNT_MAX);
    debug_assert!((0.0..=1.0).contains(&options.drop_probability));

    let seed = config.seed;
    let mut simulation =
        Simulation::new(config).with_invariants(InvariantChecker::new().with_board_invariants());
    if options.drop_probability > 0.0 {
        simulation = simulation.with_fault(
            FaultConfig::new(FaultType::MessageDrop, options.drop_probability)
                .with_filter(STORE_DELIVERY_OPERATION),
        );
    }

    let clients = options.clients;
    simulation.run(move |env| {
        let mut sessions = Vec::with_capacity(clients);
        for i in 0..clients {
            let name = format!("client-{}", i);
            let body = format!("hello {}", i);
            sessions.push(env.spawn_session(&name, i as i64, &body)?);
        }

        env.run_until("all sessions finished", |env| {
            sessions.iter().all(|s| env.session_finished(*s))
        })?;
        info!(ticks = env.now(), sessions = clients, "Sessions finished");

        env.stop_board()?;
        env.run_until("board stopped", |env| env.board_stopped())?;

        let mut replies_by_kind = BTreeMap::new();
        let mut sessions_done = 0;
        let mut sessions_rejected = 0;
        for session in sessions.iter().filter_map(|s| env.session(*s)) {
            match session.phase() {
                SessionPhase::Done => sessions_done += 1,
                SessionPhase::Rejected => sessions_rejected += 1,
                _ => {}
            }
            for reply in session.replies() {
                *replies_by_kind.entry(reply.kind().to_string()).or_insert(0) += 1;
            }
        }

        let (messages_stored, likes_stored) = env
            .store_state()
            .map(|store| {
                let likes = store.messages().map(|m| m.likes.len()).sum();
                (store.len(), likes)
            })
            .unwrap_or_default();

        Ok(ScenarioSummary {
            seed,
            workers: env.workers().len(),
            ticks: env.now(),
            sessions_done,
            sessions_rejected,
            replies_by_kind,
            messages_stored,
            likes_stored,
            store_messages_dropped: env.faults.trigger_count("message_drop"),
            shutdown_completed: env.board_stopped(),
        })
    })
}
