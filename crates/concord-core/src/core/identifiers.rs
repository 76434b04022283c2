// crates/concord-core/src/core/identifiers.rs
// ============================================================================
// Module: Concord Identifiers
// Description: Fixed-width addresses and operation selectors.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Concord identifies every callable unit (implementation, collaborator,
//! caller, the gateway itself) by a 20-byte [`Address`] and every logical
//! operation by a 4-byte [`Selector`]. Both serialize as `0x`-prefixed
//! lowercase hex strings and parse with strict length checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::hex;
use crate::core::hex::HexError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Byte width of an [`Address`].
pub const ADDRESS_LEN: usize = 20;
/// Byte width of a [`Selector`].
pub const SELECTOR_LEN: usize = 4;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier text is not valid hex.
    #[error("invalid identifier hex: {0}")]
    Hex(#[from] HexError),
    /// Identifier has the wrong byte width.
    #[error("invalid identifier length: expected {expected} bytes, got {actual}")]
    Length {
        /// Required byte width.
        expected: usize,
        /// Decoded byte width.
        actual: usize,
    },
}

// ============================================================================
// SECTION: Address
// ============================================================================

/// 20-byte identity of a callable unit or caller.
///
/// # Invariants
/// - Always exactly [`ADDRESS_LEN`] bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0; ADDRESS_LEN]);

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose low eight bytes hold `value` (big-endian).
    #[must_use]
    pub const fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        let tail = value.to_be_bytes();
        let mut index = 0;
        while index < tail.len() {
            bytes[ADDRESS_LEN - tail.len() + index] = tail[index];
            index += 1;
        }
        Self(bytes)
    }

    /// Creates an address from a byte slice of exactly [`ADDRESS_LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Length`] when the slice width is wrong.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let array: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| IdentifierError::Length {
            expected: ADDRESS_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = IdentifierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&hex::decode(text)?)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

// ============================================================================
// SECTION: Selector
// ============================================================================

/// 4-byte identifier of a logical operation shared by all implementations.
///
/// # Invariants
/// - Always exactly [`SELECTOR_LEN`] bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector([u8; SELECTOR_LEN]);

impl Selector {
    /// Creates a selector from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; SELECTOR_LEN]) -> Self {
        Self(bytes)
    }

    /// Derives a selector from a canonical signature such as
    /// `transfer(address,uint256)`: the first four bytes of its SHA-256 digest.
    #[must_use]
    pub fn from_signature(signature: &str) -> Self {
        let digest = Sha256::digest(signature.as_bytes());
        let mut bytes = [0u8; SELECTOR_LEN];
        bytes.copy_from_slice(&digest[.. SELECTOR_LEN]);
        Self(bytes)
    }

    /// Reads the selector prefix of an inbound call, if present.
    #[must_use]
    pub fn from_call_prefix(input: &[u8]) -> Option<Self> {
        let prefix: [u8; SELECTOR_LEN] = input.get(.. SELECTOR_LEN)?.try_into().ok()?;
        Some(Self(prefix))
    }

    /// Returns the raw selector bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SELECTOR_LEN] {
        &self.0
    }
}

impl FromStr for Selector {
    type Err = IdentifierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(text)?;
        let array: [u8; SELECTOR_LEN] =
            bytes.as_slice().try_into().map_err(|_| IdentifierError::Length {
                expected: SELECTOR_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_prefixed(&self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
