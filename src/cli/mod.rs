//! Command-line interface
//!
//! - init: create the data directory layout
//! - start: serve JSON-lines requests from stdin
//! - request: answer one request and exit
//! - seed: load the demo catalog
//! - compact: snapshot and truncate the WAL

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{boot, compact, init, request, run, run_command, seed, serve, start};
pub use errors::{CliError, CliResult};
