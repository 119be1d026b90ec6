//! Lifecycle events
//!
//! Carried as the `event` field of log records so they can be filtered by
//! name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Boot & lifecycle
    BootStart,
    ConfigLoaded,
    Serving,
    ShutdownComplete,

    // Store
    /// Snapshot loaded and WAL replayed
    RecoveryReplayComplete,
    /// Transaction durable in the WAL
    WalCommit,
    /// Snapshot written, WAL truncated
    SnapshotComplete,
    /// A fatal WAL failure closed the store to writes
    StoreHalted,

    // Requests
    RequestComplete,
    /// Request failed with a caller-facing error
    RequestRejected,

    // Catalog
    /// Stored values rewritten after an attribute definition change
    ValuesMigrated,
    /// Binding removed together with product values
    ForcedUnbind,
    SeedComplete,
}

impl Event {
    /// Returns the event name as it appears in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::RecoveryReplayComplete => "RECOVERY_REPLAY_COMPLETE",
            Event::WalCommit => "WAL_COMMIT",
            Event::SnapshotComplete => "SNAPSHOT_COMPLETE",
            Event::StoreHalted => "STORE_HALTED",
            Event::RequestComplete => "REQUEST_COMPLETE",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::ValuesMigrated => "VALUES_MIGRATED",
            Event::ForcedUnbind => "FORCED_UNBIND",
            Event::SeedComplete => "SEED_COMPLETE",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::WalCommit.as_str(), "WAL_COMMIT");
        assert_eq!(Event::RecoveryReplayComplete.to_string(), "RECOVERY_REPLAY_COMPLETE");
    }
}
