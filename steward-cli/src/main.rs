//! Steward CLI - Command-line interface
//!
//! Operator commands over the steward service registry: inspect the
//! assembled catalogs, list and remove persistent service roots, and manage
//! `steward.ini`.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "steward")]
#[command(version = steward::VERSION)]
#[command(about = "Inspect and manage steward services", long_about = None)]
struct Cli {
    /// System home to use instead of the configured one
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the assembled implementation catalogs and scheme table
    Catalog,

    /// List persistent service roots under the system home
    Roots,

    /// Show the canonical form of a service name
    Canonical {
        /// Service name, optionally prefixed with a scheme (e.g. memory:db)
        name: String,
    },

    /// Remove the durable root of a persistent service
    Remove {
        /// Service name, optionally prefixed with a scheme
        name: String,
    },

    /// Manage steward.ini settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        home,
        debug,
        command,
    } = cli;
    let runner = || CliRunner::with_options(debug, home.clone());

    match command {
        Commands::Catalog => commands::catalog::run(&runner()?),
        Commands::Roots => commands::services::run_roots(&runner()?),
        Commands::Canonical { name } => commands::services::run_canonical(&runner()?, &name),
        Commands::Remove { name } => commands::services::run_remove(&runner()?, &name),
        Commands::Config(command) => commands::config::run(command),
    }
}
