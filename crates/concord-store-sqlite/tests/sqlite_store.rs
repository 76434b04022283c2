// crates/concord-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite StateStore behavior.
// Purpose: Ensure atomic, durable commits and fail-closed reads.
// Dependencies: concord-store-sqlite, concord-core, rusqlite, tempfile, proptest
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed state store: durability across
//! reopen, all-or-nothing change sets, commit log retention, schema version
//! checks, and a gateway dispatch committing through the store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use concord_core::Address;
use concord_core::CallContext;
use concord_core::CallError;
use concord_core::ChangeSet;
use concord_core::Contract;
use concord_core::ContractDirectory;
use concord_core::DEFAULT_HASH_ALGORITHM;
use concord_core::Gateway;
use concord_core::GatewayConfig;
use concord_core::Invocation;
use concord_core::Selector;
use concord_core::StateKey;
use concord_core::StateStore;
use concord_core::StoreError;
use concord_store_sqlite::MAX_VALUE_BYTES;
use concord_store_sqlite::SqliteStateStore;
use concord_store_sqlite::SqliteStoreConfig;
use concord_store_sqlite::SqliteStoreError;
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn store_for(path: &std::path::Path) -> SqliteStateStore {
    SqliteStateStore::new(SqliteStoreConfig::new(path)).unwrap()
}

fn key(scope: u64, slot: &[u8]) -> StateKey {
    StateKey::new(Address::from_low_u64(scope), slot.to_vec())
}

fn changes(entries: &[(StateKey, Option<Vec<u8>>)]) -> ChangeSet {
    let mut changes = ChangeSet::new();
    for (key, value) in entries {
        changes.insert(key.clone(), value.clone());
    }
    changes
}

/// Increments a counter slot in the caller-visible scope.
struct Counter;

const COUNTER_SLOT: &[u8] = b"count";

impl Contract for Counter {
    fn call(&self, ctx: &mut CallContext<'_, '_>, _input: &[u8]) -> Result<Vec<u8>, CallError> {
        let next = ctx.read_uint(COUNTER_SLOT)? + 1;
        ctx.write_uint(COUNTER_SLOT, next)?;
        Ok(next.to_be_bytes().to_vec())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn sqlite_store_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("state.sqlite"));
    let a = key(1, b"a");
    assert_eq!(store.read(&a).unwrap(), None);
    store.apply(&changes(&[(a.clone(), Some(vec![1, 2, 3]))])).unwrap();
    assert_eq!(store.read(&a).unwrap(), Some(vec![1, 2, 3]));
}

#[test]
fn sqlite_store_scopes_keys_by_address() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("state.sqlite"));
    store.apply(&changes(&[(key(1, b"slot"), Some(vec![1]))])).unwrap();
    assert_eq!(store.read(&key(2, b"slot")).unwrap(), None);
}

#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("state.sqlite");
    {
        let store = store_for(&path);
        store.apply(&changes(&[(key(1, b"a"), Some(vec![7]))])).unwrap();
    }
    let reopened = store_for(&path);
    assert_eq!(reopened.read(&key(1, b"a")).unwrap(), Some(vec![7]));
    assert_eq!(reopened.commit_log().unwrap().len(), 1);
}

#[test]
fn sqlite_store_applies_deletions() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("state.sqlite"));
    let a = key(1, b"a");
    store.apply(&changes(&[(a.clone(), Some(vec![1]))])).unwrap();
    store.apply(&changes(&[(a.clone(), None)])).unwrap();
    assert_eq!(store.read(&a).unwrap(), None);
}

#[test]
fn sqlite_store_rejects_oversized_change_set_atomically() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("state.sqlite"));
    let small = key(1, b"small");
    let large = key(1, b"large");
    let err = store
        .apply(&changes(&[
            (small.clone(), Some(vec![1])),
            (large.clone(), Some(vec![0; MAX_VALUE_BYTES + 1])),
        ]))
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
    assert_eq!(store.read(&small).unwrap(), None);
    assert!(store.commit_log().unwrap().is_empty());
}

#[test]
fn sqlite_store_rejects_oversized_value_on_read() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.sqlite");
    let store = store_for(&path);
    let a = key(1, b"a");
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection
        .execute(
            "INSERT INTO state_entries (scope, slot, value) VALUES (?1, ?2, ?3)",
            rusqlite::params![a.scope.to_string(), a.slot, vec![0_u8; MAX_VALUE_BYTES + 1]],
        )
        .unwrap();
    let err = store.read(&a).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[test]
fn sqlite_store_records_commit_hashes() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("state.sqlite"));
    let first = changes(&[(key(1, b"a"), Some(vec![1])), (key(1, b"b"), None)]);
    let second = changes(&[(key(1, b"a"), Some(vec![2]))]);
    store.apply(&first).unwrap();
    store.apply(&ChangeSet::new()).unwrap();
    store.apply(&second).unwrap();
    let log = store.commit_log().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].sequence, 1);
    assert_eq!(log[0].entry_count, 2);
    assert_eq!(log[0].digest, first.digest(DEFAULT_HASH_ALGORITHM));
    assert_eq!(log[1].digest, second.digest(DEFAULT_HASH_ALGORITHM));
    assert_eq!(store.latest_commit().unwrap(), Some(log[1].clone()));
}

#[test]
fn sqlite_store_rejects_commit_over_stale_reads() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.sqlite");
    let store = store_for(&path);
    let other_writer = store_for(&path);
    let x = key(1, b"x");
    let y = key(1, b"y");
    let observed = changes(&[(x.clone(), None)]);
    other_writer.apply(&changes(&[(x.clone(), Some(vec![9]))])).unwrap();

    let err = store
        .apply_if_unchanged(&observed, &changes(&[(y.clone(), Some(vec![1]))]))
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
    assert_eq!(store.read(&y).unwrap(), None);
    assert_eq!(store.commit_log().unwrap().len(), 1);

    let current = changes(&[(x.clone(), Some(vec![9]))]);
    store.apply_if_unchanged(&current, &changes(&[(y.clone(), Some(vec![1]))])).unwrap();
    assert_eq!(store.read(&y).unwrap(), Some(vec![1]));
    store.apply_if_unchanged(&current, &ChangeSet::new()).unwrap();
    assert_eq!(store.commit_log().unwrap().len(), 2);
}

#[test]
fn sqlite_store_enforces_commit_log_retention() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(temp.path().join("state.sqlite"));
    config.max_commit_log = Some(2);
    let store = SqliteStateStore::new(config).unwrap();
    for value in 0 .. 5_u8 {
        store.apply(&changes(&[(key(1, b"a"), Some(vec![value]))])).unwrap();
    }
    let sequences: Vec<u64> =
        store.commit_log().unwrap().iter().map(|record| record.sequence).collect();
    assert_eq!(sequences, vec![4, 5]);
}

#[test]
fn sqlite_store_rejects_zero_retention() {
    let temp = TempDir::new().unwrap();
    let mut config = SqliteStoreConfig::new(temp.path().join("state.sqlite"));
    config.max_commit_log = Some(0);
    assert!(matches!(SqliteStateStore::new(config), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_version_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.sqlite");
    drop(store_for(&path));
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", rusqlite::params![]).unwrap();
    drop(connection);
    let result = SqliteStateStore::new(SqliteStoreConfig::new(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_rejects_invalid_hash_algorithm_in_log() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.sqlite");
    let store = store_for(&path);
    store.apply(&changes(&[(key(1, b"a"), Some(vec![1]))])).unwrap();
    let connection = rusqlite::Connection::open(&path).unwrap();
    connection.execute("UPDATE commit_log SET hash_algorithm = 'md5'", rusqlite::params![]).unwrap();
    assert!(matches!(store.commit_log(), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let result = SqliteStateStore::new(SqliteStoreConfig::new(temp.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_overlong_path_component() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a".repeat(300));
    let result = SqliteStateStore::new(SqliteStoreConfig::new(path));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn gateway_dispatch_commits_through_sqlite_store() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.sqlite");
    let implementation = Address::from_low_u64(0x1001);
    let caller = Address::from_low_u64(0xa11ce);
    let selector = Selector::from_signature("increment()");
    let mut directory = ContractDirectory::new();
    directory.deploy(implementation, Arc::new(Counter));
    {
        let mut gateway =
            Gateway::new(GatewayConfig::default(), store_for(&path), directory);
        gateway.add_implementation(implementation, &[], caller).unwrap();
        gateway.dispatch(&Invocation::new(caller, selector, Vec::new())).unwrap();
        gateway.dispatch(&Invocation::new(caller, selector, Vec::new())).unwrap();
    }
    let store = store_for(&path);
    let gateway_address = GatewayConfig::default().address;
    let stored = store.read(&StateKey::new(gateway_address, COUNTER_SLOT.to_vec())).unwrap();
    let mut word = [0_u8; 32];
    word[16 ..].copy_from_slice(&2_u128.to_be_bytes());
    assert_eq!(stored, Some(word.to_vec()));
    assert_eq!(store.commit_log().unwrap().len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sqlite_store_matches_last_write(values in proptest::collection::vec(
        proptest::option::of(proptest::collection::vec(any::<u8>(), 0 .. 16)),
        1 .. 8,
    )) {
        let temp = TempDir::new().unwrap();
        let store = store_for(&temp.path().join("state.sqlite"));
        let a = key(1, b"a");
        for value in &values {
            store.apply(&changes(&[(a.clone(), value.clone())])).unwrap();
        }
        prop_assert_eq!(store.read(&a).unwrap(), values.last().cloned().flatten());
    }
}
