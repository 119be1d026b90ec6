//! CLI command implementations
//!
//! Every command loads the config, installs logging and then opens the
//! catalog, which recovers its state from the snapshot and WAL before any
//! request is served.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::json;
use tracing::info;

use crate::api::ApiHandler;
use crate::catalog::{seed_demo, Catalog};
use crate::config::CatalogConfig;
use crate::observability::{init_logging, Event};
use crate::wal::{wal_path, WalWriter};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_lines, read_request, write_json, write_json_to, write_response};

/// Main CLI entry point; the only function main.rs calls.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    let config = CatalogConfig::load(cmd.config_path())?;
    init_logging(&config.log_level, config.log_format());

    info!(event = %Event::BootStart, command = cmd.name(), "catalogdb starting");
    info!(
        event = %Event::ConfigLoaded,
        data_dir = %config.data_path().display(),
        log_format = %config.log_format(),
        "configuration loaded"
    );

    match cmd {
        Command::Init { .. } => init(&config),
        Command::Start { .. } => start(&config),
        Command::Request { .. } => request(&config),
        Command::Seed { .. } => seed(&config),
        Command::Compact { .. } => compact(&config),
    }
}

/// Creates the data directory layout. Writes no WAL records.
pub fn init(config: &CatalogConfig) -> CliResult<()> {
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::AlreadyInitialized(data_dir.to_path_buf()));
    }

    fs::create_dir_all(data_dir).map_err(|source| CliError::CreateDataDir {
        path: data_dir.to_path_buf(),
        source,
    })?;
    WalWriter::open(data_dir, 1).map_err(CliError::CreateWal)?;

    write_response(json!({
        "initialized": true,
        "data_dir": data_dir.display().to_string(),
    }))
}

/// Serves JSON-lines requests from stdin until EOF.
pub fn start(config: &CatalogConfig) -> CliResult<()> {
    let handler = ApiHandler::new(boot(config)?);

    info!(event = %Event::Serving, "serving requests from stdin");

    let served = serve(&handler, io::stdin().lock(), &mut io::stdout().lock())?;

    info!(
        event = %Event::ShutdownComplete,
        requests = served,
        "input closed, shutting down"
    );
    Ok(())
}

/// Answers each input line with one output line. Returns the number of
/// requests handled.
///
/// A malformed request gets an error response. The loop ends early on an
/// I/O failure, or once a fatal WAL failure has halted the store; the
/// failing request is still answered first.
pub fn serve<R: BufRead, W: Write>(
    handler: &ApiHandler,
    input: R,
    output: &mut W,
) -> CliResult<usize> {
    let mut served = 0;
    for line in read_lines(input) {
        let response = handler.handle(&line?);
        write_json_to(output, &response.to_json())?;
        served += 1;

        if handler.is_halted() {
            return Err(CliError::StoreHalted);
        }
    }
    Ok(served)
}

/// Answers one request read from stdin.
pub fn request(config: &CatalogConfig) -> CliResult<()> {
    let handler = ApiHandler::new(boot(config)?);
    let request = read_request()?;
    write_json(&handler.handle(&request).to_json())
}

/// Loads the demo catalog.
pub fn seed(config: &CatalogConfig) -> CliResult<()> {
    let mut catalog = boot(config)?;
    let report = seed_demo(&mut catalog).map_err(CliError::catalog("seed demo catalog"))?;
    write_response(report)
}

pub fn compact(config: &CatalogConfig) -> CliResult<()> {
    let mut catalog = boot(config)?;
    let compacted = catalog.compact().map_err(CliError::catalog("compact store"))?;
    write_response(compacted)
}

/// Opens the catalog of an initialized data directory.
pub fn boot(config: &CatalogConfig) -> CliResult<Catalog> {
    let data_dir = config.data_path();
    if !is_initialized(data_dir) {
        return Err(CliError::NotInitialized(data_dir.to_path_buf()));
    }

    Catalog::open(data_dir, config.catalog_settings()).map_err(CliError::catalog("open catalog"))
}

fn is_initialized(data_dir: &Path) -> bool {
    wal_path(data_dir).exists()
}
