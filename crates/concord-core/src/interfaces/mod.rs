// crates/concord-core/src/interfaces/mod.rs
// ============================================================================
// Module: Concord Interfaces
// Description: Contracts for callable units and committed state storage.
// Purpose: Define the collaborator surfaces the gateway consumes.
// Dependencies: crate::core, crate::runtime::context, thiserror
// ============================================================================

//! ## Overview
//! The gateway never embeds business logic or storage backends. Callable
//! units (implementations and check targets) implement [`Contract`];
//! committed state lives behind [`StateStore`]. Implementations must be
//! deterministic given their inputs and state, and must fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::ChangeSet;
use crate::core::StateKey;
use crate::runtime::context::CallContext;

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Host-level failures that abort the whole invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The execution meter ran out.
    #[error("budget exhausted: limit {limit}, requested {requested} more")]
    BudgetExhausted {
        /// Meter limit.
        limit: u64,
        /// Units requested by the failing charge.
        requested: u64,
    },
    /// Committed state could not be read.
    #[error("state read failed: {0}")]
    Store(String),
}

/// Failure of a contract call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The callee reverted; its writes are rolled back.
    #[error("call reverted ({} bytes of revert data)", .0.len())]
    Revert(Vec<u8>),
    /// The host aborted execution.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl CallError {
    /// Builds a revert carrying `reason` as revert data.
    #[must_use]
    pub fn revert(reason: impl AsRef<[u8]>) -> Self {
        Self::Revert(reason.as_ref().to_vec())
    }
}

/// Callable unit: an implementation or a check target.
pub trait Contract: Send + Sync {
    /// Executes `input` (selector followed by arguments) in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Revert`] to reject the call, or propagates
    /// [`CallError::Host`] from context operations.
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError>;
}

// ============================================================================
// SECTION: State Store
// ============================================================================

/// State store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("state store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("state store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("state store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("state store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("state store error: {0}")]
    Store(String),
    /// Committed state changed after it was read.
    #[error("state store conflict: {0}")]
    Conflict(String),
}

/// Committed shared state.
pub trait StateStore {
    /// Reads the committed value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when reading fails.
    fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Applies every entry of `changes` atomically: all or nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the commit fails; no entry is applied.
    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError>;

    /// Applies `changes` atomically if every key in `observed` still holds
    /// the recorded value (`None` records an absent key).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when an observed key changed since it
    /// was read, or any other [`StoreError`] when the commit fails. No entry
    /// is applied on error.
    fn apply_if_unchanged(&self, observed: &ChangeSet, changes: &ChangeSet) -> Result<(), StoreError>;
}
