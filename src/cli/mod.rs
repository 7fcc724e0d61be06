//! CLI interface for tradesim
//!
//! Provides subcommands for:
//! - `simulate`: Run a Monte Carlo simulation over a journal export
//! - `history`: List, show, delete and export saved simulations
//! - `config`: Show configuration

mod history;
mod simulate;

pub use history::{HistoryArgs, HistoryCommand};
pub use simulate::{OutputFormat, SimulateArgs};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tradesim")]
#[command(about = "Monte Carlo performance simulation for trading journal strategies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation
    Simulate(SimulateArgs),
    /// Manage saved simulations
    History(HistoryArgs),
    /// Show configuration
    Config,
}
