//! catalogdb - a product catalog with dynamic, per-category attribute schemas
//!
//! Attributes are defined once and bound to categories; each binding says
//! whether the attribute is required or unique within the category and may
//! carry a default. Product writes are validated against the live schema of
//! their category, coerced to the attribute's type and stored as text.
//!
//! Layers, bottom up:
//! - `wal`: checksummed, fsynced append-only log
//! - `storage`: in-memory tables, transactions, snapshots and recovery
//! - `schema`: data types, coercion, storage codecs, schema resolution
//! - `catalog`: the engine operations
//! - `api`: JSON request boundary
//! - `cli`: command-line entry points

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod observability;
pub mod schema;
pub mod storage;
pub mod wal;
