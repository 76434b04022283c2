// crates/concord-core/src/runtime/store.rs
// ============================================================================
// Module: Concord In-Memory Store
// Description: In-memory committed state store and shared store wrapper.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryStateStore`] keeps committed state in a mutex-guarded map and
//! applies a change set under a single lock, so readers never observe a
//! partial commit. [`SharedStateStore`] erases the backend type so callers
//! can pick a store at runtime (for example from configuration).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::ChangeSet;
use crate::core::StateKey;
use crate::interfaces::StateStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory committed state for tests and embedded use.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    /// Committed entries protected by a mutex.
    entries: Arc<Mutex<BTreeMap<StateKey, Vec<u8>>>>,
}

impl InMemoryStateStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns a copy of every committed entry in key order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Store`] when the mutex is poisoned.
    pub fn snapshot(&self) -> Result<BTreeMap<StateKey, Vec<u8>>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("state store mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

impl StateStore for InMemoryStateStore {
    fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("state store mutex poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        self.apply_if_unchanged(&ChangeSet::new(), changes)
    }

    fn apply_if_unchanged(&self, observed: &ChangeSet, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("state store mutex poisoned".to_string()))?;
        if let Some((key, _)) =
            observed.iter().find(|(key, expected)| guard.get(*key) != expected.as_ref())
        {
            return Err(StoreError::Conflict(format!("{key} changed since it was read")));
        }
        for (key, value) in changes {
            match value {
                Some(bytes) => {
                    guard.insert(key.clone(), bytes.clone());
                }
                None => {
                    guard.remove(key);
                }
            }
        }
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared state store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedStateStore {
    /// Inner store implementation.
    inner: Arc<dyn StateStore + Send + Sync>,
}

impl SharedStateStore {
    /// Wraps a state store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl StateStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn StateStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl StateStore for SharedStateStore {
    fn read(&self, key: &StateKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.read(key)
    }

    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        self.inner.apply(changes)
    }

    fn apply_if_unchanged(&self, observed: &ChangeSet, changes: &ChangeSet) -> Result<(), StoreError> {
        self.inner.apply_if_unchanged(observed, changes)
    }
}
