// crates/concord-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite State Store
// Description: Durable StateStore backed by SQLite WAL.
// Purpose: Commit change sets atomically and keep a hashed commit log.
// Dependencies: concord-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`StateStore`] using `SQLite`. Committed
//! entries are rows of `state_entries(scope, slot, value)`; a change set is
//! applied inside one transaction, so either every entry lands or none does.
//! Each non-empty commit appends a record to `commit_log` carrying the change
//! set's canonical hash. Conditional commits verify their observed reads
//! inside the same write transaction. Reads fail closed on oversized values.
//! Security posture: database contents are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use concord_core::ChangeSet;
use concord_core::DEFAULT_HASH_ALGORITHM;
use concord_core::HashAlgorithm;
use concord_core::HashDigest;
use concord_core::StateKey;
use concord_core::StateStore;
use concord_core::StoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum size of a single stored value.
pub const MAX_VALUE_BYTES: usize = 256 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` state store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional number of commit log records to keep (older ones pruned).
    #[serde(default)]
    pub max_commit_log: Option<u64>,
}

impl SqliteStoreConfig {
    /// Creates a config with default pragmas for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_commit_log: None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// An observed entry changed before the commit.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// A value exceeded [`MAX_VALUE_BYTES`].
    #[error("sqlite store value too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual value size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "value exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a `rusqlite` error into the engine variant.
#[allow(clippy::needless_pass_by_value, reason = "Used as a map_err adapter.")]
fn db_error(error: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(error.to_string())
}

// ============================================================================
// SECTION: Commit Log
// ============================================================================

/// One applied change set as recorded in the commit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Monotonic commit sequence number, starting at 1.
    pub sequence: u64,
    /// Canonical hash of the applied change set.
    pub digest: HashDigest,
    /// Number of touched keys.
    pub entry_count: u64,
    /// Commit time in unix milliseconds.
    pub committed_at_ms: i64,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed state store with WAL support.
#[derive(Clone)]
pub struct SqliteStateStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteStateStore {
    /// Opens an `SQLite`-backed state store, creating the schema on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is rejected, the database
    /// cannot be opened, or the stored schema version is unsupported.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        if config.max_commit_log == Some(0) {
            return Err(SqliteStoreError::Invalid(
                "max_commit_log must be greater than zero".to_string(),
            ));
        }
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the retained commit log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the log cannot be read or a record
    /// is malformed.
    pub fn commit_log(&self) -> Result<Vec<CommitRecord>, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT sequence, change_hash, hash_algorithm, entry_count, committed_at FROM \
                 commit_log ORDER BY sequence ASC",
            )
            .map_err(db_error)?;
        let rows = statement
            .query_map(params![], |row| {
                let sequence: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let algorithm: String = row.get(2)?;
                let entry_count: i64 = row.get(3)?;
                let committed_at: i64 = row.get(4)?;
                Ok((sequence, hash, algorithm, entry_count, committed_at))
            })
            .map_err(db_error)?;
        let mut records = Vec::new();
        for row in rows {
            let (sequence, value, algorithm, entry_count, committed_at_ms) =
                row.map_err(db_error)?;
            let sequence = u64::try_from(sequence).map_err(|_| {
                SqliteStoreError::Corrupt(format!("negative commit sequence {sequence}"))
            })?;
            let entry_count = u64::try_from(entry_count).map_err(|_| {
                SqliteStoreError::Corrupt(format!("negative entry count in commit {sequence}"))
            })?;
            records.push(CommitRecord {
                sequence,
                digest: HashDigest {
                    algorithm: parse_hash_algorithm(&algorithm)?,
                    value,
                },
                entry_count,
                committed_at_ms,
            });
        }
        Ok(records)
    }

    /// Returns the most recent commit record, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the log cannot be read.
    pub fn latest_commit(&self) -> Result<Option<CommitRecord>, SqliteStoreError> {
        Ok(self.commit_log()?.pop())
    }

    /// Reads the committed value stored under `key`.
    fn read_entry(&self, key: &StateKey) -> Result<Option<Vec<u8>>, SqliteStoreError> {
        let scope = key.scope.to_string();
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction().map_err(db_error)?;
        let length: Option<i64> = tx
            .query_row(
                "SELECT length(value) FROM state_entries WHERE scope = ?1 AND slot = ?2",
                params![scope, key.slot],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        let value = match length {
            None => None,
            Some(length) => {
                let length = usize::try_from(length).map_err(|_| {
                    SqliteStoreError::Corrupt(format!("negative value length under {scope}"))
                })?;
                if length > MAX_VALUE_BYTES {
                    return Err(SqliteStoreError::TooLarge {
                        max_bytes: MAX_VALUE_BYTES,
                        actual_bytes: length,
                    });
                }
                let bytes: Vec<u8> = tx
                    .query_row(
                        "SELECT value FROM state_entries WHERE scope = ?1 AND slot = ?2",
                        params![scope, key.slot],
                        |row| row.get(0),
                    )
                    .map_err(db_error)?;
                Some(bytes)
            }
        };
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(value)
    }

    /// Applies a change set in a single transaction after verifying that
    /// every observed entry is unchanged.
    fn apply_changes(
        &self,
        observed: &ChangeSet,
        changes: &ChangeSet,
    ) -> Result<(), SqliteStoreError> {
        if changes.is_empty() && observed.is_empty() {
            return Ok(());
        }
        for value in changes.iter().filter_map(|(_, value)| value.as_ref()) {
            if value.len() > MAX_VALUE_BYTES {
                return Err(SqliteStoreError::TooLarge {
                    max_bytes: MAX_VALUE_BYTES,
                    actual_bytes: value.len(),
                });
            }
        }
        let digest = changes.digest(DEFAULT_HASH_ALGORITHM);
        let entry_count = i64::try_from(changes.len())
            .map_err(|_| SqliteStoreError::Invalid("change set too large".to_string()))?;
        let committed_at = unix_millis();
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        verify_observed(&tx, observed)?;
        if changes.is_empty() {
            tx.commit().map_err(db_error)?;
            return Ok(());
        }
        for (key, value) in changes {
            let scope = key.scope.to_string();
            match value {
                Some(bytes) => {
                    tx.execute(
                        "INSERT INTO state_entries (scope, slot, value) VALUES (?1, ?2, ?3) ON \
                         CONFLICT(scope, slot) DO UPDATE SET value = excluded.value",
                        params![scope, key.slot, bytes],
                    )
                    .map_err(db_error)?;
                }
                None => {
                    tx.execute(
                        "DELETE FROM state_entries WHERE scope = ?1 AND slot = ?2",
                        params![scope, key.slot],
                    )
                    .map_err(db_error)?;
                }
            }
        }
        tx.execute(
            "INSERT INTO commit_log (change_hash, hash_algorithm, entry_count, committed_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![digest.value, digest.algorithm.label(), entry_count, committed_at],
        )
        .map_err(db_error)?;
        let sequence = tx.last_insert_rowid();
        enforce_retention(&tx, sequence, self.config.max_commit_log)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.read_entry(key).map_err(StoreError::from)
    }

    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        self.apply_changes(&ChangeSet::new(), changes).map_err(StoreError::from)
    }

    fn apply_if_unchanged(&self, observed: &ChangeSet, changes: &ChangeSet) -> Result<(), StoreError> {
        self.apply_changes(observed, changes).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails with [`SqliteStoreError::Conflict`] when a committed entry no longer
/// matches the value observed for it.
fn verify_observed(tx: &Transaction<'_>, observed: &ChangeSet) -> Result<(), SqliteStoreError> {
    for (key, expected) in observed {
        let current: Option<Vec<u8>> = tx
            .query_row(
                "SELECT value FROM state_entries WHERE scope = ?1 AND slot = ?2",
                params![key.scope.to_string(), key.slot],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        if current != *expected {
            return Err(SqliteStoreError::Conflict(format!("{key} changed since it was read")));
        }
    }
    Ok(())
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS state_entries (
                    scope TEXT NOT NULL,
                    slot BLOB NOT NULL,
                    value BLOB NOT NULL,
                    PRIMARY KEY (scope, slot)
                );
                CREATE TABLE IF NOT EXISTS commit_log (
                    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                    change_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    entry_count INTEGER NOT NULL,
                    committed_at INTEGER NOT NULL
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Prunes commit log records beyond the configured retention.
fn enforce_retention(
    tx: &Transaction<'_>,
    latest_sequence: i64,
    max_commit_log: Option<u64>,
) -> Result<(), SqliteStoreError> {
    let Some(max_commit_log) = max_commit_log else {
        return Ok(());
    };
    let max_commit_log = i64::try_from(max_commit_log)
        .map_err(|_| SqliteStoreError::Invalid("max_commit_log too large".to_string()))?;
    if latest_sequence > max_commit_log {
        tx.execute(
            "DELETE FROM commit_log WHERE sequence <= ?1",
            params![latest_sequence - max_commit_log],
        )
        .map_err(db_error)?;
    }
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Parses a stored hash algorithm label.
fn parse_hash_algorithm(label: &str) -> Result<HashAlgorithm, SqliteStoreError> {
    match label {
        "sha256" => Ok(HashAlgorithm::Sha256),
        other => Err(SqliteStoreError::Invalid(format!("unsupported hash algorithm: {other}"))),
    }
}
