//! `GameMaster` referee
//!
//! Launches a master and its players as child processes and routes their
//! line protocol until the match ends.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use gamemaster_core::config::load_config;
use gamemaster_referee::{Referee, TracingSink};

#[derive(Parser, Debug)]
#[command(name = "gamemaster")]
#[command(version, about = "GameMaster referee - runs one match between player programs")]
struct Args {
    /// Player command lines, master first. Each one is split on spaces, so
    /// quote it as a single shell argument (e.g. "./server --quiet").
    /// Defaults to `programs` from settings.json.
    programs: Vec<String>,

    /// Log level filter for the referee (e.g. "info", "debug", "warn").
    #[arg(long, env = "GAMEMASTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GAMEMASTER_LOG_JSON")]
    log_json: bool,

    /// Milliseconds to wait for a killed player to be reaped at shutdown.
    #[arg(long, env = "GAMEMASTER_KILL_TIMEOUT_MS")]
    kill_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cwd = std::env::current_dir()?;
    let mut config = load_config(Some(cwd.as_path()))?.referee;
    if !args.programs.is_empty() {
        config.programs = args.programs;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    config.log_json |= args.log_json;
    if let Some(ms) = args.kill_timeout_ms {
        config.kill_timeout_ms = ms;
    }

    gamemaster_core::tracing_init::init_tracing(&config.log_level, config.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        players = config.programs.len(),
        "Starting gamemaster"
    );

    let referee = Referee::new(config.programs, Arc::new(TracingSink))
        .with_kill_timeout(Duration::from_millis(config.kill_timeout_ms));

    match referee.run().await {
        Ok(outcome) => {
            for (id, name) in &outcome.names {
                info!(id, name = %name, "Final player name");
            }
            info!(
                reason = ?outcome.reason,
                broadcasts = outcome.stats.broadcasts,
                forwarded = outcome.stats.forwarded,
                commands = outcome.stats.commands,
                "Game over"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Match could not start");
            Err(e.into())
        }
    }
}
