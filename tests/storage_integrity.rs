//! Store integrity tests
//!
//! - Committed transactions survive reopen
//! - A failed or abandoned transaction leaves no rows behind
//! - Compaction preserves state and sequence numbering
//! - Bytes of an unacknowledged commit never reach a later replay
//! - Corrupted persisted state is never silently accepted

use catalogdb::storage::{
    snapshot_path, Attribute, Binding, CatalogStore, Category, CategoryId, Mutation, StorageError,
};
use catalogdb::schema::DataType;
use catalogdb::wal::{wal_path, WalReader, WalRecord};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn category(id: CategoryId, name: &str) -> Mutation {
    let now = Utc::now();
    Mutation::PutCategory {
        category: Category {
            id,
            name: name.to_string(),
            description: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    }
}

fn attribute(id: i64, name: &str) -> Mutation {
    let now = Utc::now();
    Mutation::PutAttribute {
        attribute: Attribute {
            id,
            name: name.to_string(),
            data_type: DataType::Text,
            allowed_values: None,
            validation_regex: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    }
}

fn binding(category_id: CategoryId, attribute_id: i64) -> Mutation {
    let now = Utc::now();
    Mutation::PutBinding {
        binding: Binding {
            category_id,
            attribute_id,
            is_required: false,
            is_unique: false,
            default_value: None,
            position: 0,
            created_at: now,
            updated_at: now,
        },
    }
}

fn commit(store: &mut CatalogStore, mutations: Vec<Mutation>) -> Result<u64, StorageError> {
    let mut txn = store.begin();
    for mutation in mutations {
        txn.apply(mutation)?;
    }
    txn.commit()
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_committed_rows_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        commit(&mut store, vec![category(1, "Dresses"), attribute(1, "Color")]).unwrap();
        commit(&mut store, vec![binding(1, 1)]).unwrap();
    }

    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.last_sequence(), 2);
    assert_eq!(store.tables().category_by_name("Dresses").unwrap().id, 1);
    assert!(store.tables().binding(1, 1).is_some());
}

#[test]
fn test_one_record_per_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();

    let sequence = commit(
        &mut store,
        vec![category(1, "Dresses"), category(2, "Shoes"), attribute(1, "Size")],
    )
    .unwrap();
    assert_eq!(sequence, 1);
}

// =============================================================================
// Atomicity
// =============================================================================

#[test]
fn test_failed_transaction_leaves_no_rows() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();

    // The binding names a category that does not exist.
    let err = commit(&mut store, vec![attribute(1, "Color"), binding(9, 1)]).unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));

    assert!(store.tables().attribute(1).is_none());
    assert_eq!(store.last_sequence(), 0);

    drop(store);
    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.tables().attributes().count(), 0);
}

#[test]
fn test_dropped_transaction_reverts() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();
    commit(&mut store, vec![category(1, "Dresses")]).unwrap();

    {
        let mut txn = store.begin();
        txn.apply(category(1, "Gowns")).unwrap();
        txn.apply(category(2, "Shoes")).unwrap();
    }

    assert_eq!(store.tables().category(1).unwrap().name, "Dresses");
    assert!(store.tables().category(2).is_none());
    assert!(store.tables().category_by_name("Gowns").is_none());
}

#[test]
fn test_unique_names_enforced() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();
    commit(&mut store, vec![category(1, "Dresses")]).unwrap();

    let err = commit(&mut store, vec![category(2, "Dresses")]).unwrap_err();
    assert!(matches!(
        err,
        StorageError::UniqueViolation {
            constraint: "categories.name",
            ..
        }
    ));
}

#[test]
fn test_bound_attribute_delete_restricted() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();
    commit(&mut store, vec![category(1, "Dresses"), attribute(1, "Color"), binding(1, 1)]).unwrap();

    let err = commit(&mut store, vec![Mutation::DeleteAttribute { id: 1 }]).unwrap_err();
    assert!(matches!(err, StorageError::Restricted { .. }));
    assert!(store.tables().attribute(1).is_some());
}

// =============================================================================
// Unacknowledged Writes
// =============================================================================

#[test]
fn test_unacknowledged_record_is_not_replayed() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        assert_eq!(commit(&mut store, vec![category(1, "Dresses")]).unwrap(), 1);

        // What a commit whose fsync failed leaves behind: a full record at the
        // next sequence for a transaction that was reverted in memory.
        let mut file = OpenOptions::new()
            .append(true)
            .open(wal_path(temp_dir.path()))
            .unwrap();
        file.write_all(&WalRecord::commit(2, b"[]".to_vec()).serialize())
            .unwrap();

        assert_eq!(commit(&mut store, vec![category(2, "Shoes")]).unwrap(), 2);
    }

    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.last_sequence(), 2);
    assert_eq!(store.tables().category(2).unwrap().name, "Shoes");
}

#[test]
fn test_torn_tail_is_cut_before_next_commit() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        commit(&mut store, vec![category(1, "Dresses")]).unwrap();

        let partial = WalRecord::commit(2, b"[]".to_vec()).serialize();
        let mut file = OpenOptions::new()
            .append(true)
            .open(wal_path(temp_dir.path()))
            .unwrap();
        file.write_all(&partial[..partial.len() / 2]).unwrap();

        commit(&mut store, vec![category(2, "Shoes")]).unwrap();
        assert!(!store.is_halted());
    }

    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.tables().categories().count(), 2);
}

// =============================================================================
// Compaction
// =============================================================================

#[test]
fn test_compaction_preserves_state_and_numbering() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        commit(&mut store, vec![category(1, "Dresses")]).unwrap();
        commit(&mut store, vec![category(2, "Shoes")]).unwrap();

        assert_eq!(store.compact().unwrap(), 2);
        assert_eq!(fs::metadata(wal_path(temp_dir.path())).unwrap().len(), 0);
        assert!(snapshot_path(temp_dir.path()).exists());

        assert_eq!(commit(&mut store, vec![attribute(1, "Color")]).unwrap(), 3);
    }

    let mut reader = WalReader::open_from_data_dir(temp_dir.path()).unwrap();
    let sequences: Vec<u64> = reader.read_all().unwrap().iter().map(|r| r.sequence_number).collect();
    assert_eq!(sequences, vec![3]);

    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.last_sequence(), 3);
    assert_eq!(store.tables().categories().count(), 2);
    assert!(store.tables().attribute_by_name("Color").is_some());
}

#[test]
fn test_compacting_twice_is_harmless() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = CatalogStore::open(temp_dir.path()).unwrap();
    commit(&mut store, vec![category(1, "Dresses")]).unwrap();

    store.compact().unwrap();
    store.compact().unwrap();
    drop(store);

    let store = CatalogStore::open(temp_dir.path()).unwrap();
    assert_eq!(store.tables().categories().count(), 1);
    assert_eq!(store.last_sequence(), 1);
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn test_corrupted_wal_halts_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        commit(&mut store, vec![category(1, "Dresses")]).unwrap();
    }

    let path = wal_path(temp_dir.path());
    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let err = CatalogStore::open(temp_dir.path()).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_unreadable_snapshot_halts_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let mut store = CatalogStore::open(temp_dir.path()).unwrap();
        commit(&mut store, vec![category(1, "Dresses")]).unwrap();
        store.compact().unwrap();
    }

    fs::write(snapshot_path(temp_dir.path()), b"{\"format_version\":").unwrap();

    let err = CatalogStore::open(temp_dir.path()).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt(_)));
}
