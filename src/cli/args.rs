//! CLI argument definitions
//!
//! Commands:
//! - catalogdb init --config <path>
//! - catalogdb start --config <path>
//! - catalogdb request --config <path>
//! - catalogdb seed --config <path>
//! - catalogdb compact --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// catalogdb - product catalog with per-category attribute schemas
#[derive(Parser, Debug)]
#[command(name = "catalogdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the data directory layout
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./catalogdb.json")]
        config: PathBuf,
    },

    /// Serve JSON-lines requests from stdin
    Start {
        #[arg(long, default_value = "./catalogdb.json")]
        config: PathBuf,
    },

    /// Answer one request read from stdin and exit
    Request {
        #[arg(long, default_value = "./catalogdb.json")]
        config: PathBuf,
    },

    /// Load the demo catalog
    Seed {
        #[arg(long, default_value = "./catalogdb.json")]
        config: PathBuf,
    },

    /// Snapshot the catalog and truncate the WAL
    Compact {
        #[arg(long, default_value = "./catalogdb.json")]
        config: PathBuf,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init { .. } => "init",
            Command::Start { .. } => "start",
            Command::Request { .. } => "request",
            Command::Seed { .. } => "seed",
            Command::Compact { .. } => "compact",
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        match self {
            Command::Init { config }
            | Command::Start { config }
            | Command::Request { config }
            | Command::Seed { config }
            | Command::Compact { config } => config,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
