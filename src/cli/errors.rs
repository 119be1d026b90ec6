//! CLI errors
//!
//! Every CLI error ends the process with a non-zero exit. The display form
//! leads with a stable `CATALOG_CLI_*` code.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::wal::WalError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("CATALOG_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("CATALOG_CLI_CONFIG_ERROR: cannot create data directory {}: {source}", .path.display())]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CATALOG_CLI_CONFIG_ERROR: cannot create WAL: {0}")]
    CreateWal(#[source] WalError),

    /// stdin/stdout failure
    #[error("CATALOG_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),

    #[error("CATALOG_CLI_IO_ERROR: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CATALOG_CLI_IO_ERROR: empty input")]
    EmptyInput,

    #[error("CATALOG_CLI_ALREADY_INITIALIZED: {} already holds a catalog", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("CATALOG_CLI_NOT_INITIALIZED: {} holds no catalog; run 'catalogdb init' first", .0.display())]
    NotInitialized(PathBuf),

    /// The catalog could not be opened or a command against it failed
    #[error("CATALOG_CLI_BOOT_FAILED: {action}: {source}")]
    Catalog {
        action: &'static str,
        #[source]
        source: CatalogError,
    },

    /// A WAL failure closed the store while serving
    #[error("CATALOG_CLI_STORE_HALTED: store closed to writes after a fatal WAL failure; restart to recover")]
    StoreHalted,
}

impl CliError {
    pub(crate) fn catalog(action: &'static str) -> impl FnOnce(CatalogError) -> Self {
        move |source| CliError::Catalog { action, source }
    }

    /// Stable code, the prefix of the display form
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) | CliError::CreateDataDir { .. } | CliError::CreateWal(_) => {
                "CATALOG_CLI_CONFIG_ERROR"
            }
            CliError::Io(_) | CliError::Json(_) | CliError::EmptyInput => "CATALOG_CLI_IO_ERROR",
            CliError::AlreadyInitialized(_) => "CATALOG_CLI_ALREADY_INITIALIZED",
            CliError::NotInitialized(_) => "CATALOG_CLI_NOT_INITIALIZED",
            CliError::Catalog { .. } => "CATALOG_CLI_BOOT_FAILED",
            CliError::StoreHalted => "CATALOG_CLI_STORE_HALTED",
        }
    }
}
