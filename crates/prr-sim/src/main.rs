//! PRR network simulation runner.
//!
//! Drives a seeded stream of random operations through the reference model
//! and the real registry in lockstep, checking every invariant after each
//! step. Exits with an error at the first divergence.
//!
//! # Usage
//!
//! ```bash
//! # Default run
//! prr-sim --seed 42 --steps 10000
//!
//! # Sweep seeds, letting either side hang up
//! prr-sim --seed 100 --runs 50 --any-participant
//!
//! # Watch every operation
//! RUST_LOG=prr_harness=trace prr-sim --steps 20
//! ```

use clap::Parser;
use prr_core::EndPolicy;
use prr_harness::{SimConfig, SimDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// PRR network simulation
#[derive(Parser, Debug)]
#[command(name = "prr-sim")]
#[command(about = "Model-checked simulation of the PRR telecom network")]
#[command(version)]
struct Args {
    /// First RNG seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(short, long, default_value_t = 1)]
    runs: u64,

    /// Operations per run
    #[arg(long, default_value_t = 1_000)]
    steps: usize,

    /// Number of clients
    #[arg(short, long, default_value_t = 3)]
    clients: usize,

    /// Terminals registered before the first operation
    #[arg(short, long, default_value_t = 6)]
    terminals: u8,

    /// Let the receiving side end calls too
    #[arg(long)]
    any_participant: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let end_policy =
        if args.any_participant { EndPolicy::AnyParticipant } else { EndPolicy::OriginatorOnly };
    tracing::info!(runs = args.runs, steps = args.steps, ?end_policy, "PRR simulation starting");

    let mut totals = (0usize, 0usize, 0usize);
    for seed in args.seed..args.seed.saturating_add(args.runs) {
        let config = SimConfig {
            seed,
            clients: args.clients,
            terminals: args.terminals,
            steps: args.steps,
            end_policy,
        };

        let report = SimDriver::new(config)?.run().inspect_err(|error| {
            tracing::error!(seed, %error, "simulation diverged");
        })?;

        tracing::info!(
            seed,
            terminals = report.terminals,
            communications = report.communications,
            payments = report.global_payments,
            debts = report.global_debts,
            "run complete"
        );
        totals.0 += report.succeeded;
        totals.1 += report.refused;
        totals.2 += report.communications;
    }

    let (succeeded, refused, communications) = totals;
    tracing::info!(succeeded, refused, communications, "all runs passed");
    Ok(())
}
