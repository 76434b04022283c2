// crates/concord-core/src/core/state.rs
// ============================================================================
// Module: Concord State Types
// Description: Keys and change sets for the shared key-value state.
// Purpose: Define the unit of atomic commit produced by a working copy.
// Dependencies: crate::core::{hashing, identifiers}, serde
// ============================================================================

//! ## Overview
//! Shared state is a flat key-value map. Each key is scoped by the address
//! whose storage it belongs to; implementations execute in the gateway's
//! scope, collaborators in their own. A [`ChangeSet`] is the ordered write
//! overlay of one working copy, where `None` records a deletion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::hex;
use crate::core::identifiers::Address;

// ============================================================================
// SECTION: State Key
// ============================================================================

/// Scoped state key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    /// Address owning the slot.
    pub scope: Address,
    /// Slot bytes within the scope.
    #[serde(with = "hex::serde_bytes")]
    pub slot: Vec<u8>,
}

impl StateKey {
    /// Creates a scoped key.
    #[must_use]
    pub fn new(scope: Address, slot: impl Into<Vec<u8>>) -> Self {
        Self {
            scope,
            slot: slot.into(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, hex::encode_prefixed(&self.slot))
    }
}

// ============================================================================
// SECTION: Change Set
// ============================================================================

/// Ordered write overlay; `None` values are deletions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    /// Pending writes keyed in canonical order.
    entries: BTreeMap<StateKey, Option<Vec<u8>>>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Records a write (or a deletion when `value` is `None`).
    pub fn insert(&mut self, key: StateKey, value: Option<Vec<u8>>) {
        self.entries.insert(key, value);
    }

    /// Returns the pending value for `key`: `Some(None)` is a recorded deletion.
    #[must_use]
    pub fn get(&self, key: &StateKey) -> Option<&Option<Vec<u8>>> {
        self.entries.get(key)
    }

    /// Returns the number of touched keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no key was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in canonical key order.
    pub fn iter(&self) -> btree_map::Iter<'_, StateKey, Option<Vec<u8>>> {
        self.entries.iter()
    }

    /// Returns the canonical byte form used for hashing.
    ///
    /// Per entry: `scope (20) | slot_len (4, BE) | slot | present (1)` and,
    /// when present, `value_len (4, BE) | value`.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, value) in &self.entries {
            out.extend_from_slice(key.scope.as_bytes());
            push_framed(&mut out, &key.slot);
            match value {
                Some(bytes) => {
                    out.push(1);
                    push_framed(&mut out, bytes);
                }
                None => out.push(0),
            }
        }
        out
    }

    /// Hashes the canonical byte form.
    #[must_use]
    pub fn digest(&self, algorithm: HashAlgorithm) -> HashDigest {
        hash_bytes(algorithm, &self.canonical_bytes())
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = (&'a StateKey, &'a Option<Vec<u8>>);
    type IntoIter = btree_map::Iter<'a, StateKey, Option<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Appends a 4-byte big-endian length followed by `bytes`.
pub(crate) fn push_framed(out: &mut Vec<u8>, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
}
