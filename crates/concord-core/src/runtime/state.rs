// crates/concord-core/src/runtime/state.rs
// ============================================================================
// Module: Concord Working State
// Description: Pinned committed reads and isolated write overlays.
// Purpose: Let each implementation execute without observing siblings' writes.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A [`PinnedState`] fixes the committed value of every key the first time
//! any run of a dispatch reads it, so sibling runs observe the same pre-state
//! even if another writer commits meanwhile. The recorded reads are handed to
//! [`StateStore::apply_if_unchanged`] at commit time.
//!
//! A [`WorkingState`] reads through a pinned state and keeps its own writes
//! in a [`ChangeSet`]. Checkpoints snapshot the overlay so a
//! reverted frame rolls back exactly its own writes. Dropping a working state
//! discards it; only [`WorkingState::into_changes`] lets writes escape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;

use crate::core::ChangeSet;
use crate::core::StateKey;
use crate::interfaces::StateStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Pinned State
// ============================================================================

/// Committed pre-state shared by every run of one dispatch.
pub struct PinnedState<'s> {
    /// Committed store.
    base: &'s dyn StateStore,
    /// First observed value of every key read so far.
    observed: RefCell<ChangeSet>,
}

impl<'s> PinnedState<'s> {
    /// Pins reads of `base` for the lifetime of one dispatch.
    #[must_use]
    pub fn new(base: &'s dyn StateStore) -> Self {
        Self {
            base,
            observed: RefCell::new(ChangeSet::new()),
        }
    }

    /// Reads `key`, returning the value observed by the first read.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the committed store fails.
    pub fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.observed.borrow().get(key) {
            return Ok(value.clone());
        }
        let value = self.base.read(key)?;
        self.observed.borrow_mut().insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Consumes the pin, returning every observed key and value.
    #[must_use]
    pub fn into_observed(self) -> ChangeSet {
        self.observed.into_inner()
    }
}

// ============================================================================
// SECTION: Working State
// ============================================================================

/// Snapshot of an overlay taken at frame entry.
#[derive(Debug, Clone)]
pub struct Checkpoint(ChangeSet);

/// Per-implementation working copy of shared state.
pub struct WorkingState<'s> {
    /// Pinned committed state the overlay reads through to.
    base: &'s PinnedState<'s>,
    /// Uncommitted writes.
    changes: ChangeSet,
}

impl<'s> WorkingState<'s> {
    /// Creates an empty overlay over `base`.
    #[must_use]
    pub const fn new(base: &'s PinnedState<'s>) -> Self {
        Self {
            base,
            changes: ChangeSet::new(),
        }
    }

    /// Reads `key`, preferring uncommitted writes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the committed store fails.
    pub fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError> {
        match self.changes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.base.read(key),
        }
    }

    /// Records a write, or a deletion when `value` is `None`.
    pub fn write(&mut self, key: StateKey, value: Option<Vec<u8>>) {
        self.changes.insert(key, value);
    }

    /// Snapshots the overlay.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.changes.clone())
    }

    /// Restores the overlay to `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.changes = checkpoint.0;
    }

    /// Returns the pending writes.
    #[must_use]
    pub const fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Consumes the overlay, returning its writes.
    #[must_use]
    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}
