// crates/concord-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite State Store
// Description: Durable StateStore backend using SQLite WAL.
// Purpose: Persist Concord shared state across gateway restarts.
// Dependencies: concord-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`StateStore`](concord_core::StateStore)
//! implementation. Committed entries live in a single scoped key-value table;
//! every applied change set is one transaction and leaves a hashed record in
//! an append-only commit log. Security posture: database contents are
//! untrusted and size-checked on read.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::CommitRecord;
pub use store::MAX_VALUE_BYTES;
pub use store::SqliteStateStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
