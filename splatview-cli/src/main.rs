//! splatview CLI - Command-line harness
//!
//! Drives the viewer lifecycle against the simulated engine so timings,
//! fallbacks and teardown can be observed without a browser.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "splatview")]
#[command(version = splatview::VERSION)]
#[command(about = "Progressive 3D viewer lifecycle harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Where to write it (default: ~/.splatview/config.ini)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Mount one viewer against the simulated engine and print every transition
    Simulate(SimulateArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { path, force } => commands::init::run(path, force),
        Commands::Simulate(args) => commands::simulate::run(args),
    };

    if let Err(e) = result {
        e.exit();
    }
}
