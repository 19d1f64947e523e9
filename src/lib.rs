//! worksync library root.
//! Exposes CLI parser, high-level run() function, and internal modules.

pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod server;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;

/// Central command dispatcher
pub fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Serve { .. } => cli::commands::serve::handle(&cli.command, cfg),
        Commands::Backfill { .. } => cli::commands::backfill::handle(&cli.command, cfg),
        Commands::Recompute { .. } => cli::commands::recompute::handle(&cli.command, cfg),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
    }
}

/// Entry point used by main.rs
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load();

    // Apply database overrides from the command line before dispatching.
    if let Some(custom_db) = &cli.server_db {
        cfg.server_database = custom_db.clone();
    }
    if let Some(custom_db) = &cli.client_db {
        cfg.client_database = custom_db.clone();
    }

    dispatch(&cli, &cfg)
}
