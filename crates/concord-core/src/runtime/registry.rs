// crates/concord-core/src/runtime/registry.rs
// ============================================================================
// Module: Concord Implementation Registry
// Description: Ordered implementation list and per-selector check descriptors.
// Purpose: Hold what the dispatcher runs and what it compares.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The registry is an ordered, append-only list of implementation addresses
//! (position 0 is the primary) plus, per selector, an ordered list of check
//! descriptors. Check order is significant: it is the order results are fed
//! into the aggregate digest. Individual entries are never edited; the only
//! removal path is [`ImplementationRegistry::clear_checks`], which drops a
//! selector's whole list.
//!
//! Descriptors are decoded and validated at registration time so the hot
//! dispatch path never sees malformed bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Address;
use crate::core::CallDescriptor;
use crate::core::DescriptorError;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::HashError;
use crate::core::Selector;
use crate::core::hashing::hash_canonical_json;
use crate::core::hex;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum number of implementations.
pub const DEFAULT_MAX_IMPLEMENTATIONS: usize = 16;
/// Default maximum number of checks per selector.
pub const DEFAULT_MAX_CHECKS_PER_SELECTOR: usize = 64;
/// Default maximum encoded descriptor size in bytes.
pub const DEFAULT_MAX_DESCRIPTOR_BYTES: usize = 4 * 1024;

/// Registry size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLimits {
    /// Maximum number of implementations.
    pub max_implementations: usize,
    /// Maximum number of checks registered for one selector.
    pub max_checks_per_selector: usize,
    /// Maximum encoded descriptor size in bytes.
    pub max_descriptor_bytes: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_implementations: DEFAULT_MAX_IMPLEMENTATIONS,
            max_checks_per_selector: DEFAULT_MAX_CHECKS_PER_SELECTOR,
            max_descriptor_bytes: DEFAULT_MAX_DESCRIPTOR_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry mutation and restore errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The implementation is already registered.
    #[error("implementation {0} is already registered")]
    DuplicateImplementation(Address),
    /// The implementation list is full.
    #[error("implementation limit reached (max {max})")]
    ImplementationLimit {
        /// Configured maximum.
        max: usize,
    },
    /// A check limit was exceeded.
    #[error("check limit exceeded: {0}")]
    CheckLimit(String),
    /// The descriptor bytes are malformed.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(#[from] DescriptorError),
    /// Restored registry state is inconsistent.
    #[error("invalid registry state: {0}")]
    InvalidState(String),
}

// ============================================================================
// SECTION: Check Descriptor
// ============================================================================

/// A registered check: a target address and its validated query descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CheckDescriptorRecord", into = "CheckDescriptorRecord")]
pub struct CheckDescriptor {
    /// Address queried by the check.
    target: Address,
    /// Canonical encoded descriptor bytes.
    encoded: Vec<u8>,
    /// Decoded descriptor.
    call: CallDescriptor,
}

impl CheckDescriptor {
    /// Decodes and validates `encoded` for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the bytes are malformed.
    pub fn new(target: Address, encoded: impl Into<Vec<u8>>) -> Result<Self, DescriptorError> {
        let encoded = encoded.into();
        let call = CallDescriptor::decode(&encoded)?;
        Ok(Self {
            target,
            encoded,
            call,
        })
    }

    /// Returns the check target.
    #[must_use]
    pub const fn target(&self) -> Address {
        self.target
    }

    /// Returns the canonical descriptor bytes.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Returns the decoded descriptor.
    #[must_use]
    pub const fn call(&self) -> &CallDescriptor {
        &self.call
    }
}

/// Serialized form of a check descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckDescriptorRecord {
    /// Check target.
    target: Address,
    /// Hex-encoded descriptor bytes.
    #[serde(with = "hex::serde_bytes")]
    descriptor: Vec<u8>,
}

impl TryFrom<CheckDescriptorRecord> for CheckDescriptor {
    type Error = DescriptorError;

    fn try_from(record: CheckDescriptorRecord) -> Result<Self, Self::Error> {
        Self::new(record.target, record.descriptor)
    }
}

impl From<CheckDescriptor> for CheckDescriptorRecord {
    fn from(check: CheckDescriptor) -> Self {
        Self {
            target: check.target,
            descriptor: check.encoded,
        }
    }
}

// ============================================================================
// SECTION: Registry State
// ============================================================================

/// Serializable registry contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryState {
    /// Implementations in registration order.
    pub implementations: Vec<Address>,
    /// Checks per selector, in registration order.
    pub checks: BTreeMap<Selector, Vec<CheckDescriptor>>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Ordered implementation registry with per-selector checks.
#[derive(Debug, Clone, Default)]
pub struct ImplementationRegistry {
    /// Size limits.
    limits: RegistryLimits,
    /// Registry contents.
    state: RegistryState,
}

impl ImplementationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(limits: RegistryLimits) -> Self {
        Self {
            limits,
            state: RegistryState::default(),
        }
    }

    /// Restores a registry from serialized state, re-validating every limit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the state violates a limit or repeats an
    /// implementation.
    pub fn from_state(state: RegistryState, limits: RegistryLimits) -> Result<Self, RegistryError> {
        if state.implementations.len() > limits.max_implementations {
            return Err(RegistryError::InvalidState(format!(
                "{} implementations exceed limit {}",
                state.implementations.len(),
                limits.max_implementations
            )));
        }
        let mut seen = BTreeSet::new();
        for address in &state.implementations {
            if !seen.insert(*address) {
                return Err(RegistryError::InvalidState(format!(
                    "implementation {address} listed twice"
                )));
            }
        }
        for (selector, checks) in &state.checks {
            if checks.len() > limits.max_checks_per_selector {
                return Err(RegistryError::InvalidState(format!(
                    "selector {selector} has {} checks (max {})",
                    checks.len(),
                    limits.max_checks_per_selector
                )));
            }
            if let Some(check) =
                checks.iter().find(|check| check.encoded().len() > limits.max_descriptor_bytes)
            {
                return Err(RegistryError::InvalidState(format!(
                    "selector {selector} descriptor is {} bytes (max {})",
                    check.encoded().len(),
                    limits.max_descriptor_bytes
                )));
            }
        }
        Ok(Self {
            limits,
            state,
        })
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> RegistryLimits {
        self.limits
    }

    /// Returns the serializable registry contents.
    #[must_use]
    pub const fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Verifies `address` could be appended without mutating the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateImplementation`] or
    /// [`RegistryError::ImplementationLimit`].
    pub fn ensure_admissible(&self, address: &Address) -> Result<(), RegistryError> {
        if self.state.implementations.contains(address) {
            return Err(RegistryError::DuplicateImplementation(*address));
        }
        if self.state.implementations.len() >= self.limits.max_implementations {
            return Err(RegistryError::ImplementationLimit {
                max: self.limits.max_implementations,
            });
        }
        Ok(())
    }

    /// Appends `address` and returns its registry index.
    ///
    /// # Errors
    ///
    /// Same as [`ImplementationRegistry::ensure_admissible`].
    pub fn push_implementation(&mut self, address: Address) -> Result<usize, RegistryError> {
        self.ensure_admissible(&address)?;
        self.state.implementations.push(address);
        Ok(self.state.implementations.len() - 1)
    }

    /// Appends a check for `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedDescriptor`] for invalid bytes and
    /// [`RegistryError::CheckLimit`] when a limit would be exceeded.
    pub fn register_check(
        &mut self,
        selector: Selector,
        target: Address,
        encoded: &[u8],
    ) -> Result<(), RegistryError> {
        if encoded.len() > self.limits.max_descriptor_bytes {
            return Err(RegistryError::CheckLimit(format!(
                "descriptor is {} bytes (max {})",
                encoded.len(),
                self.limits.max_descriptor_bytes
            )));
        }
        let check = CheckDescriptor::new(target, encoded)?;
        let checks = self.state.checks.entry(selector).or_default();
        if checks.len() >= self.limits.max_checks_per_selector {
            return Err(RegistryError::CheckLimit(format!(
                "selector {selector} already has {} checks",
                checks.len()
            )));
        }
        checks.push(check);
        Ok(())
    }

    /// Removes every check for `selector`, returning how many were removed.
    pub fn clear_checks(&mut self, selector: &Selector) -> usize {
        self.state.checks.remove(selector).map_or(0, |checks| checks.len())
    }

    /// Returns the checks for `selector` in registration order.
    #[must_use]
    pub fn checks(&self, selector: &Selector) -> &[CheckDescriptor] {
        self.state.checks.get(selector).map_or(&[], Vec::as_slice)
    }

    /// Returns every implementation in registry order.
    #[must_use]
    pub fn implementations(&self) -> &[Address] {
        &self.state.implementations
    }

    /// Returns the implementation at `index`.
    #[must_use]
    pub fn implementation(&self, index: usize) -> Option<Address> {
        self.state.implementations.get(index).copied()
    }

    /// Returns the number of implementations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.implementations.len()
    }

    /// Returns true when no implementation is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.implementations.is_empty()
    }

    /// Hashes the canonical JSON form of the registry contents.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        hash_canonical_json(algorithm, &self.state)
    }
}
