//! # Pregen
//!
//! Pre-generates every chunk inside the world border, a few per tick, in
//! steps separated by full restarts, resuming from a checkpoint after each
//! one.
//!
//! This crate ties together:
//! - World: chunk generation, populate pass and persistence
//! - Job: the resumable fill job
//! - The tick loop, console, world border and restart policy

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod border;
mod config;
mod console;
mod restart;
mod server;
mod timing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pregen_job::CheckpointStore;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;
use crate::console::ConsoleCommand;
use crate::server::{Server, ServerExit};

#[derive(Parser)]
#[command(name = "pregen")]
#[command(version)]
#[command(about = "Resumable chunk pre-generation inside a world border")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding config.toml, the job checkpoint and the world
    #[arg(short, long, global = true, default_value = "pregen-data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Run the server, resuming any checkpointed fill job
    Run,

    /// Start a fill job, then run the server
    Fill {
        /// Optional `freq pad step`
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },

    /// Print the checkpointed fill job
    Status {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("pregen=info".parse()?))
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data directory {}", cli.data_dir.display()))?;
    let config = EngineConfig::load_or_create(&cli.data_dir);

    match cli.command {
        Command::Status { json } => print_status(&config, &cli.data_dir, json),
        Command::Run => serve(config, &cli.data_dir, None),
        Command::Fill { args } => serve(config, &cli.data_dir, Some(ConsoleCommand::Fill(args))),
    }
}

fn serve(config: EngineConfig, data_dir: &Path, first: Option<ConsoleCommand>) -> Result<()> {
    info!("Pregen starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let commands = console::spawn_stdin_reader().context("starting console reader")?;
    let mut server = Server::new(config, data_dir).with_commands(commands);
    if let Some(command) = first {
        server.execute(command).report();
    }

    match server.run() {
        ServerExit::Stopped => {
            info!("Pregen shutdown complete");
            Ok(())
        },
        ServerExit::Restart { code } => {
            info!("Exiting with code {code} for the next step");
            drop(server);
            std::process::exit(code);
        },
    }
}

fn print_status(config: &EngineConfig, data_dir: &Path, json: bool) -> Result<()> {
    let store = CheckpointStore::in_dir(data_dir, &config.job.checkpoint_file);
    let Some(state) = store
        .try_load()
        .with_context(|| format!("reading {}", store.path().display()))?
    else {
        println!("No fill job recorded");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        let status = if state.running { "running" } else { "stopped" };
        println!("Fill job {status}: {}", state.summary());
    }
    Ok(())
}
