//! Write-ahead log for the catalog store
//!
//! Every store transaction is committed as exactly one WAL record. A record
//! is acknowledged only after it has been written and fsynced, so a
//! transaction is either fully durable or absent.
//!
//! # Record framing
//!
//! - Record Length (u32 LE), including the length field and checksum
//! - Record Type (u8)
//! - Sequence Number (u64 LE)
//! - Payload (opaque bytes, the encoded mutation batch)
//! - Checksum (u32 LE, CRC32 over everything before it)
//!
//! Any checksum mismatch, truncation or sequence gap is corruption and halts
//! replay. There is no repair and no skipping.

mod errors;
mod reader;
mod record;
mod writer;

pub use errors::{WalError, WalResult};
pub use reader::WalReader;
pub use record::{compute_checksum, RecordType, WalRecord};
pub use writer::WalWriter;

use std::path::{Path, PathBuf};

/// Returns the WAL file location inside a data directory.
pub fn wal_path(data_dir: &Path) -> PathBuf {
    data_dir.join("wal").join("wal.log")
}
