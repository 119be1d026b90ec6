//! Point-in-time snapshot of the catalog tables
//!
//! Written as `snapshot.json` in the data directory:
//!
//! 1. Serialize to `snapshot.json.tmp`
//! 2. fsync the temporary file
//! 3. Rename over `snapshot.json`
//! 4. fsync the data directory
//!
//! A crash at any step leaves either the old or the new snapshot in place.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::errors::{StorageError, StorageResult};
use super::records::Timestamp;
use super::tables::TableImage;

pub const SNAPSHOT_FILE: &str = "snapshot.json";
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    /// Highest WAL sequence whose effects are included
    pub last_sequence: u64,
    pub created_at: Timestamp,
    pub tables: TableImage,
}

impl Snapshot {
    pub fn new(last_sequence: u64, tables: TableImage) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            last_sequence,
            created_at: Utc::now(),
            tables,
        }
    }
}

pub fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_FILE)
}

/// Loads the snapshot, if one has been written.
pub fn load(data_dir: &Path) -> StorageResult<Option<Snapshot>> {
    let path = snapshot_path(data_dir);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::snapshot(&path, e)),
    };

    let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::Corrupt(format!("unreadable snapshot {}: {}", path.display(), e))
    })?;

    if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported snapshot format version {}",
            snapshot.format_version
        )));
    }

    Ok(Some(snapshot))
}

/// Atomically replaces the snapshot.
pub fn write(data_dir: &Path, snapshot: &Snapshot) -> StorageResult<()> {
    let path = snapshot_path(data_dir);
    let tmp_path = data_dir.join(format!("{}.tmp", SNAPSHOT_FILE));

    let bytes = serde_json::to_vec_pretty(snapshot)?;

    let mut file = File::create(&tmp_path).map_err(|e| StorageError::snapshot(&tmp_path, e))?;
    file.write_all(&bytes)
        .map_err(|e| StorageError::snapshot(&tmp_path, e))?;
    file.sync_all()
        .map_err(|e| StorageError::snapshot(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, &path).map_err(|e| StorageError::snapshot(&path, e))?;
    fsync_dir(data_dir)
}

fn fsync_dir(path: &Path) -> StorageResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| StorageError::snapshot(path, e))?;
    dir.sync_all().map_err(|e| StorageError::snapshot(path, e))
}
