//! Mailroom CLI
//!
//! TigerStyle: Command-line driver for the message board with explicit error
//! handling.

mod scenario;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mailroom_core::{init_telemetry, MailroomConfig, TelemetryConfig, DST_TICKS_COUNT_DEFAULT};
use mailroom_dst::SimConfig;
use mailroom_functions::{available_days_off, CsvSink, FunctionError, RecordingSink};
use scenario::{run_scenario, ScenarioOptions, ScenarioSummary, SCENARIO_CLIENTS_COUNT_MAX};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Mailroom CLI
#[derive(Parser, Debug)]
#[command(name = "mailroom")]
#[command(about = "Discrete-time actor simulation of a message board")]
#[command(version)]
struct Cli {
    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON configuration file (system and board settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one session per client against a simulated board, then shut it down
    Simulate {
        /// Number of scripted clients
        #[arg(long, default_value_t = 4)]
        clients: usize,

        /// Seed (default: DST_SEED or random)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of workers (overrides the configuration file)
        #[arg(long)]
        workers: Option<usize>,

        /// Probability that a message to the store is lost
        #[arg(long, default_value_t = 0.0)]
        drop_probability: f64,

        /// Tick budget for each phase of the run
        #[arg(long, default_value_t = DST_TICKS_COUNT_DEFAULT)]
        max_ticks: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute available days off
    DaysOff {
        /// Contracted hours per week (20-40)
        #[arg(long)]
        hours: i32,

        /// Worked days (0-200)
        #[arg(long)]
        days: i32,

        /// Overtime hours (0-22)
        #[arg(long)]
        overtime: i32,

        /// Append the call to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _telemetry = init_telemetry(
        TelemetryConfig::new("mailroom-cli")
            .with_verbosity(cli.verbose)
            .with_env_overrides(),
    )
    .context("Failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => MailroomConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => MailroomConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            clients,
            seed,
            workers,
            drop_probability,
            max_ticks,
            json,
        } => cmd_simulate(
            config,
            clients,
            seed,
            workers,
            drop_probability,
            max_ticks,
            json,
        ),
        Commands::DaysOff {
            hours,
            days,
            overtime,
            csv,
        } => cmd_days_off(hours, days, overtime, csv),
    }
}

/// Run the board scenario and print its summary
fn cmd_simulate(
    config: MailroomConfig,
    clients: usize,
    seed: Option<u64>,
    workers: Option<usize>,
    drop_probability: f64,
    max_ticks: u64,
    json: bool,
) -> Result<()> {
    if clients == 0 || clients > SCENARIO_CLIENTS_COUNT_MAX {
        bail!("--clients must be in 1..={}", SCENARIO_CLIENTS_COUNT_MAX);
    }
    if !(0.0..=1.0).contains(&drop_probability) {
        bail!("--drop-probability must be in [0, 1], got {}", drop_probability);
    }

    let base = match seed {
        Some(seed) => SimConfig::new(seed),
        None => SimConfig::from_env_or_random(),
    };
    let mut sim_config = base.with_config(config);
    sim_config.max_ticks = max_ticks;
    if let Some(workers) = workers {
        sim_config = sim_config.with_workers(workers);
    }
    sim_config.validate().context("Invalid simulation configuration")?;

    let options = ScenarioOptions {
        clients,
        drop_probability,
    };
    let summary = run_scenario(sim_config, &options).context("Simulation failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &ScenarioSummary) {
    println!();
    println!("{}", "Simulation summary".bold());
    println!("  {} {}", "Seed:".bold(), summary.seed);
    println!("  {} {}", "Workers:".bold(), summary.workers);
    println!("  {} {}", "Ticks:".bold(), summary.ticks);
    println!(
        "  {} {} done, {} rejected",
        "Sessions:".bold(),
        summary.sessions_done,
        summary.sessions_rejected
    );
    println!(
        "  {} {} ({} likes)",
        "Stored messages:".bold(),
        summary.messages_stored,
        summary.likes_stored
    );
    if summary.store_messages_dropped > 0 {
        println!(
            "  {} {}",
            "Dropped store messages:".bold(),
            summary.store_messages_dropped.to_string().yellow()
        );
    }

    println!("  {}", "Replies:".bold());
    for (kind, count) in &summary.replies_by_kind {
        println!("    {:<18} {}", kind, count);
    }

    let shutdown = if summary.shutdown_completed {
        "completed".green()
    } else {
        "incomplete".red()
    };
    println!("  {} {}", "Shutdown:".bold(), shutdown);
    println!();
}

/// Evaluate the leave calculator once
fn cmd_days_off(hours: i32, days: i32, overtime: i32, csv: Option<PathBuf>) -> Result<()> {
    let result = match &csv {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            available_days_off(hours, days, overtime, &mut CsvSink::new(file))
        }
        None => available_days_off(hours, days, overtime, &mut RecordingSink::new()),
    };

    match result {
        Ok(days_off) => {
            println!("{} {}", "Available days off:".bold(), days_off.to_string().green());
            Ok(())
        }
        Err(e @ FunctionError::InvalidArgument { .. }) => {
            eprintln!("{} {}", "Rejected:".red().bold(), e);
            Err(e.into())
        }
        Err(e) => Err(e).context("Failed to record the calculation"),
    }
}
