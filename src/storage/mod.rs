//! Catalog store
//!
//! Relational tables kept in memory and made durable through the WAL.
//! On open the store loads `snapshot.json`, then replays every WAL record
//! newer than the snapshot. Writes go through a [`Transaction`]: mutations
//! apply immediately with an undo log and are committed as one fsynced WAL
//! record, or reverted.

mod errors;
mod mutation;
mod records;
mod snapshot;
mod store;
mod tables;

pub use errors::{StorageError, StorageResult};
pub use mutation::{decode_batch, encode_batch, Mutation};
pub use records::{
    Attribute, AttributeId, Binding, Category, CategoryId, Product, ProductId, ProductStatus,
    StoredValue, Timestamp,
};
pub use snapshot::{snapshot_path, Snapshot, SNAPSHOT_FILE};
pub use store::{CatalogStore, Transaction};
pub use tables::{TableImage, Tables};
