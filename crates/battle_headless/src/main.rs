//! Headless battle runner.
//!
//! Plays battles without graphics, controlled from the command line or via
//! JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Play one battle to the end
//! cargo run -p battle_headless -- run assets/battles/shield_wall.ron
//!
//! # Step a battle from a controller process
//! cargo run -p battle_headless -- interactive assets/battles/duelists.ron
//!
//! # Run a battle several times in parallel and compare hashes
//! cargo run -p battle_headless -- verify assets/battles/cavalry_charge.ron --runs 8
//!
//! # Play every battle in a directory
//! cargo run -p battle_headless -- batch assets/battles --output results/batch.json
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_core::components::Team;
use battle_headless::{
    batch::{run_batch, BatchConfig},
    catalog::load_catalog_or_default,
    runner::{verify_setup, HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, ScenarioError},
    Response,
};

#[derive(Parser)]
#[command(name = "battle_headless")]
#[command(about = "Headless battle runner for scripted verification and batch runs")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Unit catalog (RON); the built-in roster is used when omitted
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one battle to the end
    Run {
        /// Battle file to load
        battle: PathBuf,

        /// Output a snapshot after every tick
        #[arg(long)]
        snapshots: bool,
    },

    /// Step a battle with JSON commands on stdin
    Interactive {
        /// Battle file to load
        battle: PathBuf,

        /// Output a snapshot after every tick instead of once per command
        #[arg(long)]
        snapshots: bool,
    },

    /// Verify determinism by running the same battle several times
    Verify {
        /// Battle file to load
        battle: PathBuf,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },

    /// Play every battle file in a directory
    Batch {
        /// Directory of battle files
        #[arg(default_value = "assets/battles")]
        dir: PathBuf,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Override every battle's tick budget
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Output file for the JSON summary
        #[arg(short, long, default_value = "results/batch_results.json")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let catalog = cli.catalog.as_deref();
    let outcome = match cli.command {
        Commands::Run { battle, snapshots } => cmd_run(&battle, catalog, snapshots),
        Commands::Interactive { battle, snapshots } => cmd_interactive(&battle, catalog, snapshots),
        Commands::Verify { battle, runs } => cmd_verify(&battle, catalog, runs),
        Commands::Batch {
            dir,
            parallel,
            max_ticks,
            output,
        } => cmd_batch(dir, catalog, parallel, max_ticks, &output),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            let _ = io::stdout().write_all(Response::error(e.to_string(), None).to_json_line().as_bytes());
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    }
}

fn load_runner(battle: &Path, catalog: Option<&Path>, snapshots: bool) -> Result<HeadlessRunner, ScenarioError> {
    let catalog = load_catalog_or_default(catalog)?;
    let scenario = Scenario::load(battle)?;
    tracing::info!(name = %scenario.name, file = %battle.display(), "Loaded battle");
    let setup = scenario.into_setup(&catalog)?;
    Ok(HeadlessRunner::new(setup)?.with_config(HeadlessConfig {
        emit_snapshots: snapshots,
    }))
}

/// Play one battle to the end.
fn cmd_run(battle: &Path, catalog: Option<&Path>, snapshots: bool) -> Result<bool, ScenarioError> {
    let runner = load_runner(battle, catalog, snapshots)?;
    let result = runner.run_to_end(io::stdout().lock())?;
    tracing::info!(outcome = ?result.outcome, ticks = result.ticks, "Battle finished");
    Ok(true)
}

/// Serve JSON commands on stdin.
fn cmd_interactive(battle: &Path, catalog: Option<&Path>, snapshots: bool) -> Result<bool, ScenarioError> {
    tracing::info!("Starting interactive session");
    let runner = load_runner(battle, catalog, snapshots)?;
    runner.run_interactive(io::stdin().lock(), io::stdout().lock())?;
    Ok(true)
}

/// Run the same battle `runs` times and compare.
fn cmd_verify(battle: &Path, catalog: Option<&Path>, runs: usize) -> Result<bool, ScenarioError> {
    let catalog = load_catalog_or_default(catalog)?;
    let setup = Scenario::load(battle)?.into_setup(&catalog)?;

    tracing::info!(runs, file = %battle.display(), "Verifying determinism");
    let report = verify_setup(&setup, runs.max(1))?;

    if let Some(response) = report.to_response() {
        io::stdout().write_all(response.to_json_line().as_bytes())?;
    }

    if report.is_deterministic() {
        eprintln!("✓ Determinism verified: {} runs, hash {:?}", runs.max(1), report.unique_hashes());
        Ok(true)
    } else {
        eprintln!("✗ Determinism FAILED: {} distinct hashes", report.unique_hashes().len());
        Ok(false)
    }
}

/// Play every battle in a directory and write a JSON summary.
fn cmd_batch(
    dir: PathBuf,
    catalog: Option<&Path>,
    parallel: usize,
    max_ticks: Option<u64>,
    output: &Path,
) -> Result<bool, ScenarioError> {
    let catalog = load_catalog_or_default(catalog)?;
    let mut config = BatchConfig::new(dir).with_parallel(parallel);
    if let Some(max_ticks) = max_ticks {
        config = config.with_max_ticks(max_ticks);
    }

    let results = run_batch(config, &catalog)?;
    results.save(output)?;
    tracing::info!(path = %output.display(), "Saved batch results");

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles played: {}", results.battles.len());
    eprintln!("Team A wins:    {}", results.wins(Team::A));
    eprintln!("Team B wins:    {}", results.wins(Team::B));
    eprintln!("Draws:          {}", results.draws());
    if !results.errors.is_empty() {
        eprintln!("Failed:         {}", results.errors.len());
        for error in &results.errors {
            eprintln!("  {}: {}", error.file, error.message);
        }
    }
    eprintln!("Duration:       {:.2}s", results.duration_seconds);

    Ok(results.errors.is_empty())
}
