//! WAL writer with fsync enforcement
//!
//! Every append is followed by fsync. A commit is acknowledged to the caller
//! only after fsync returns.
//!
//! The writer tracks the length of the acknowledged log. Bytes past it belong
//! to no acknowledged record: a failed append cuts them off before
//! returning, and the next append cuts off anything found there. If the cut
//! itself fails, or fsync fails, the writer halts and refuses all further
//! writes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use super::errors::{WalError, WalResult};
use super::reader::WalReader;
use super::record::WalRecord;

/// Append-only writer over `<data_dir>/wal/wal.log`.
#[derive(Debug)]
pub struct WalWriter {
    wal_path: PathBuf,
    file: File,
    /// Next sequence number to assign (never reused)
    next_sequence: u64,
    /// File length covering exactly the acknowledged records
    acknowledged_len: u64,
    halted: bool,
}

impl WalWriter {
    /// Opens or creates the WAL inside `data_dir`.
    ///
    /// Numbering continues after the highest sequence already in the log,
    /// and never goes below `min_next_sequence`. The store passes the
    /// position just after its snapshot so numbering survives truncation.
    pub fn open(data_dir: &Path, min_next_sequence: u64) -> WalResult<Self> {
        let wal_path = super::wal_path(data_dir);
        let wal_dir = wal_path.parent().unwrap_or(data_dir).to_path_buf();

        if !wal_dir.exists() {
            fs::create_dir_all(&wal_dir).map_err(|e| {
                WalError::write(
                    format!("Failed to create WAL directory: {}", wal_dir.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)
            .map_err(|e| {
                WalError::write(format!("Failed to open WAL file: {}", wal_path.display()), e)
            })?;

        let next_sequence = Self::determine_next_sequence(&wal_path)?.max(min_next_sequence.max(1));
        let acknowledged_len = file
            .metadata()
            .map_err(|e| WalError::write("Failed to read WAL metadata", e))?
            .len();

        Ok(Self {
            wal_path,
            file,
            next_sequence,
            acknowledged_len,
            halted: false,
        })
    }

    /// Scans the existing log for its highest sequence number.
    fn determine_next_sequence(wal_path: &Path) -> WalResult<u64> {
        let metadata = match fs::metadata(wal_path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(WalError::write("Failed to read WAL metadata", e)),
        };

        if metadata.len() == 0 {
            return Ok(1);
        }

        let mut reader = WalReader::open(wal_path)?;
        let mut max_sequence = 0u64;
        while let Some(record) = reader.read_next()? {
            max_sequence = max_sequence.max(record.sequence_number);
        }

        Ok(max_sequence + 1)
    }

    pub fn path(&self) -> &Path {
        &self.wal_path
    }

    pub fn next_sequence_number(&self) -> u64 {
        self.next_sequence
    }

    /// Returns the last assigned sequence number, or 0 if none.
    pub fn last_sequence_number(&self) -> u64 {
        self.next_sequence.saturating_sub(1)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Appends one commit record and fsyncs it.
    ///
    /// Returns the sequence number assigned to the record. The sequence is
    /// consumed only when fsync succeeds. On failure no byte of the record
    /// stays in the log, or the writer halts.
    pub fn append(&mut self, payload: Vec<u8>) -> WalResult<u64> {
        self.ensure_open()?;
        self.discard_stray_tail()?;

        let sequence_number = self.next_sequence;
        let serialized = WalRecord::commit(sequence_number, payload).serialize();

        if let Err(e) = self.file.write_all(&serialized) {
            self.cut_to_acknowledged()?;
            return Err(WalError::write(
                format!("Failed to write WAL record at sequence {}", sequence_number),
                e,
            ));
        }

        if let Err(e) = self.file.sync_all() {
            // After a failed fsync the page cache cannot be trusted; cut the
            // record off as far as possible and stop writing either way.
            let _ = self.cut_to_acknowledged();
            self.halt();
            return Err(WalError::fsync(
                format!("fsync failed after WAL append at sequence {}", sequence_number),
                e,
            ));
        }

        self.acknowledged_len += serialized.len() as u64;
        self.next_sequence += 1;

        Ok(sequence_number)
    }

    /// Explicitly fsync the WAL file.
    pub fn fsync(&mut self) -> WalResult<()> {
        self.ensure_open()?;
        if let Err(e) = self.file.sync_all() {
            self.halt();
            return Err(WalError::fsync("Explicit WAL fsync failed", e));
        }
        Ok(())
    }

    /// Empties the log after its contents have been captured in a snapshot.
    ///
    /// Sequence numbering is not reset; the next append continues where the
    /// truncated log left off.
    pub fn truncate(&mut self) -> WalResult<()> {
        self.ensure_open()?;
        self.acknowledged_len = 0;
        self.cut_to_acknowledged()
    }

    fn ensure_open(&self) -> WalResult<()> {
        if self.halted {
            return Err(WalError::Halted);
        }
        Ok(())
    }

    /// Removes bytes past the acknowledged length left by an earlier failure.
    fn discard_stray_tail(&mut self) -> WalResult<()> {
        let len = self
            .file
            .metadata()
            .map_err(|e| WalError::write("Failed to read WAL metadata", e))?
            .len();

        if len != self.acknowledged_len {
            warn!(
                file_len = len,
                acknowledged_len = self.acknowledged_len,
                "discarding unacknowledged WAL tail"
            );
            self.cut_to_acknowledged()?;
        }
        Ok(())
    }

    /// Truncates the file to the acknowledged length and fsyncs it, halting
    /// the writer if that fails.
    fn cut_to_acknowledged(&mut self) -> WalResult<()> {
        let result = self
            .file
            .set_len(self.acknowledged_len)
            .and_then(|()| self.file.sync_all());

        result.map_err(|e| {
            self.halt();
            WalError::TornTail {
                context: format!(
                    "Failed to cut {} back to {} bytes",
                    self.wal_path.display(),
                    self.acknowledged_len
                ),
                source: e,
            }
        })
    }

    pub(crate) fn halt(&mut self) {
        if !self.halted {
            error!(path = %self.wal_path.display(), "WAL halted; refusing further writes");
        }
        self.halted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn batch(tag: &str) -> Vec<u8> {
        format!(r#"[{{"tag":"{}"}}]"#, tag).into_bytes()
    }

    #[test]
    fn test_writer_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let wal_dir = temp_dir.path().join("wal");
        assert!(!wal_dir.exists());

        let _writer = WalWriter::open(temp_dir.path(), 1).unwrap();

        assert!(wal_dir.join("wal.log").exists());
    }

    #[test]
    fn test_sequence_numbers_increment_from_one() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
        assert_eq!(writer.last_sequence_number(), 0);

        assert_eq!(writer.append(batch("a")).unwrap(), 1);
        assert_eq!(writer.append(batch("b")).unwrap(), 2);
        assert_eq!(writer.last_sequence_number(), 2);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
            writer.append(batch("a")).unwrap();
            writer.append(batch("b")).unwrap();
        }

        let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
        assert_eq!(writer.next_sequence_number(), 3);
        assert_eq!(writer.append(batch("c")).unwrap(), 3);
    }

    #[test]
    fn test_minimum_sequence_applies_to_empty_log() {
        let temp_dir = TempDir::new().unwrap();
        let writer = WalWriter::open(temp_dir.path(), 40).unwrap();
        assert_eq!(writer.next_sequence_number(), 40);
    }

    #[test]
    fn test_truncate_keeps_numbering() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
        writer.append(batch("a")).unwrap();
        writer.append(batch("b")).unwrap();

        writer.truncate().unwrap();
        assert_eq!(fs::metadata(writer.path()).unwrap().len(), 0);

        assert_eq!(writer.append(batch("c")).unwrap(), 3);

        let mut reader = WalReader::open(writer.path()).unwrap();
        let record = reader.read_next().unwrap().unwrap();
        assert_eq!(record.sequence_number, 3);
        assert_eq!(record.payload, batch("c"));
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_unacknowledged_tail_is_cut_before_next_append() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
        writer.append(batch("a")).unwrap();

        // A whole record that was written but never acknowledged.
        let mut file = OpenOptions::new().append(true).open(writer.path()).unwrap();
        file.write_all(&WalRecord::commit(2, batch("lost")).serialize()).unwrap();

        assert_eq!(writer.append(batch("b")).unwrap(), 2);

        let mut reader = WalReader::open(writer.path()).unwrap();
        let records = reader.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].payload, batch("b"));
    }

    #[test]
    fn test_halted_writer_refuses_writes() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = WalWriter::open(temp_dir.path(), 1).unwrap();
        writer.append(batch("a")).unwrap();
        writer.halt();

        let err = writer.append(batch("b")).unwrap_err();
        assert!(matches!(err, WalError::Halted));
        assert!(err.is_fatal());
        assert!(matches!(writer.truncate(), Err(WalError::Halted)));
        assert!(matches!(writer.fsync(), Err(WalError::Halted)));
        assert_eq!(writer.last_sequence_number(), 1);
    }
}
