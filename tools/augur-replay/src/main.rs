//! Augur Replay
//!
//! Feeds a JSON-lines event log through the belief service and prints the
//! resulting snapshot. Configuration comes from `AUGUR_*` variables and an
//! optional `.env` file; flags override both.

mod events;

use anyhow::{Context, Result};
use augur_core::config::load_env;
use augur_core::{init_logging, AugurConfig};
use augur_plugin_beliefs::{BeliefService, Orchestrator, TraitInference};
use augur_storage_local::{open_store, MemoryStateStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// State directory (overrides AUGUR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Trait table JSON (overrides AUGUR_TRAIT_TABLES)
    #[arg(long, global = true)]
    trait_tables: Option<PathBuf>,

    /// Keep state in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Number of history entries to print
    #[arg(long, global = true)]
    history: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every event in a JSON-lines file, then print the snapshot
    Replay {
        /// Event log
        #[arg(short, long)]
        events: PathBuf,

        /// Agent id
        #[arg(short, long)]
        agent: String,

        /// Skip events that fail instead of stopping
        #[arg(long)]
        keep_going: bool,
    },
    /// Print the current snapshot of an agent
    Snapshot {
        /// Agent id
        #[arg(short, long)]
        agent: String,
    },
}

fn build_config(cli: &Cli) -> Result<AugurConfig> {
    let mut config = AugurConfig::from_env();
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(path) = &cli.trait_tables {
        config.trait_tables = Some(path.clone());
    }
    if cli.ephemeral {
        config.persist_state = false;
    }
    if let Some(window) = cli.history {
        config.history_window = window;
    }
    config.validate()?;
    Ok(config)
}

fn build_service(config: &AugurConfig) -> Result<BeliefService> {
    let inference = match &config.trait_tables {
        Some(path) => TraitInference::from_path(path)
            .with_context(|| format!("loading trait tables from {}", path.display()))?,
        None => TraitInference::default(),
    };
    let store = if config.persist_state {
        open_store(config)?
    } else {
        Arc::new(MemoryStateStore::new())
    };
    Ok(BeliefService::with_orchestrator(store, Orchestrator::new(inference))
        .with_history_window(config.history_window))
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env()?;
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(&config.log_level);

    let service = build_service(&config)?;

    let agent = match &cli.command {
        Command::Replay {
            events: log_path,
            agent,
            keep_going,
        } => {
            let text = std::fs::read_to_string(log_path)
                .with_context(|| format!("reading {}", log_path.display()))?;
            let parsed = events::parse_events(&text)?;
            tracing::info!("Replaying {} events for '{}'", parsed.len(), agent);

            let mut failed = 0usize;
            for (line, event) in &parsed {
                if let Err(e) = events::apply(&service, agent, event).await {
                    if !keep_going {
                        return Err(e.context(format!("line {}", line)));
                    }
                    failed += 1;
                    tracing::warn!("line {}: {:#}", line, e);
                }
            }
            if failed > 0 {
                tracing::warn!("{} of {} events failed", failed, parsed.len());
            }
            service.flush().await?;
            agent
        }
        Command::Snapshot { agent } => agent,
    };

    let snapshot = service.snapshot(agent).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
