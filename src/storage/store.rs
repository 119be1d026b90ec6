//! Store lifecycle: recovery, transactions and compaction

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::errors::{StorageError, StorageResult};
use super::mutation::{decode_batch, encode_batch, Mutation};
use super::snapshot::{self, Snapshot};
use super::tables::{Tables, Undo};
use crate::observability::Event;
use crate::wal::{self, WalReader, WalWriter};

#[derive(Debug)]
pub struct CatalogStore {
    data_dir: PathBuf,
    tables: Tables,
    wal: WalWriter,
}

impl CatalogStore {
    /// Opens the store, rebuilding tables from snapshot and WAL.
    ///
    /// Any corrupt record halts the open; the store never starts from a
    /// partially replayed log.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let (mut tables, snapshot_sequence) = match snapshot::load(data_dir)? {
            Some(snapshot) => (Tables::from_image(snapshot.tables)?, snapshot.last_sequence),
            None => (Tables::new(), 0),
        };

        let mut last_applied = snapshot_sequence;
        let mut replayed = 0usize;

        if wal::wal_path(data_dir).exists() {
            let mut reader = WalReader::open_from_data_dir(data_dir)?;
            while let Some(record) = reader.read_next()? {
                if record.sequence_number <= snapshot_sequence {
                    continue;
                }
                if record.sequence_number != last_applied + 1 {
                    return Err(StorageError::Corrupt(format!(
                        "WAL resumes at sequence {} but state ends at {}",
                        record.sequence_number, last_applied
                    )));
                }

                let batch = decode_batch(&record.payload).map_err(|e| {
                    StorageError::Corrupt(format!(
                        "undecodable batch at sequence {}: {}",
                        record.sequence_number, e
                    ))
                })?;
                for mutation in &batch {
                    tables.apply(mutation).map_err(|e| {
                        StorageError::Corrupt(format!(
                            "replay of sequence {} failed: {}",
                            record.sequence_number, e
                        ))
                    })?;
                }

                last_applied = record.sequence_number;
                replayed += 1;
            }
        }

        let wal = WalWriter::open(data_dir, last_applied + 1)?;

        info!(
            event = %Event::RecoveryReplayComplete,
            snapshot_sequence,
            replayed_records = replayed,
            last_sequence = last_applied,
            "catalog store opened"
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            tables,
            wal,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Last committed WAL sequence, 0 for an empty store
    pub fn last_sequence(&self) -> u64 {
        self.wal.last_sequence_number()
    }

    /// True once a WAL failure has closed the store to writes. Reads keep
    /// working; the process should stop and recover on restart.
    pub fn is_halted(&self) -> bool {
        self.wal.is_halted()
    }

    #[cfg(test)]
    pub(crate) fn halt_writes(&mut self) {
        self.wal.halt();
    }

    /// Starts a transaction. Dropping it without commit reverts it.
    pub fn begin(&mut self) -> Transaction<'_> {
        Transaction {
            store: self,
            batch: Vec::new(),
            undo: Vec::new(),
            finished: false,
        }
    }

    /// Writes a snapshot of the current tables and truncates the WAL.
    ///
    /// Returns the sequence captured by the snapshot.
    pub fn compact(&mut self) -> StorageResult<u64> {
        let last_sequence = self.last_sequence();
        self.wal.fsync()?;

        let snapshot = Snapshot::new(last_sequence, self.tables.to_image());
        snapshot::write(&self.data_dir, &snapshot)?;

        self.wal.truncate()?;

        info!(
            event = %Event::SnapshotComplete,
            last_sequence,
            "snapshot written and WAL truncated"
        );
        Ok(last_sequence)
    }
}

/// A write transaction over the store.
pub struct Transaction<'a> {
    store: &'a mut CatalogStore,
    batch: Vec<Mutation>,
    undo: Vec<Undo>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    /// Applies a mutation, enforcing storage constraints.
    pub fn apply(&mut self, mutation: Mutation) -> StorageResult<()> {
        let undo = self.store.tables.apply(&mutation)?;
        self.undo.push(undo);
        self.batch.push(mutation);
        Ok(())
    }

    /// Makes the transaction durable as a single WAL record.
    ///
    /// Returns the record's sequence number, or the current last sequence
    /// for an empty transaction. On failure every mutation is reverted.
    pub fn commit(mut self) -> StorageResult<u64> {
        if self.batch.is_empty() {
            self.finished = true;
            return Ok(self.store.last_sequence());
        }

        let payload = match encode_batch(&self.batch) {
            Ok(payload) => payload,
            Err(e) => {
                self.revert_all();
                return Err(e.into());
            }
        };

        match self.store.wal.append(payload) {
            Ok(sequence) => {
                self.finished = true;
                debug!(
                    event = %Event::WalCommit,
                    sequence,
                    mutations = self.batch.len(),
                    "transaction committed"
                );
                Ok(sequence)
            }
            Err(e) => {
                if e.is_fatal() {
                    error!(error = %e, "WAL append failed fatally, reverting transaction");
                } else {
                    warn!(error = %e, "WAL append failed, reverting transaction");
                }
                self.revert_all();
                Err(e.into())
            }
        }
    }

    fn revert_all(&mut self) {
        while let Some(undo) = self.undo.pop() {
            self.store.tables.revert(undo);
        }
        self.batch.clear();
        self.finished = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.revert_all();
        }
    }
}
