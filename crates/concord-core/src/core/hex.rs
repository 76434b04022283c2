// crates/concord-core/src/core/hex.rs
// ============================================================================
// Module: Concord Hex Encoding
// Description: Lowercase hex helpers shared by identifiers, digests, and serde.
// Purpose: Provide one canonical textual form for binary values.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Concord renders every binary value (addresses, selectors, descriptors,
//! digests) as lowercase hex. Parsing accepts an optional `0x` prefix and
//! either letter case; encoding is always lowercase without a prefix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when decoding hex text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// Input has an odd number of hex digits.
    #[error("hex input has odd length: {0}")]
    OddLength(usize),
    /// Input contains a non-hex character.
    #[error("invalid hex character at position {0}")]
    InvalidCharacter(usize),
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Encodes bytes as a lowercase hex string with a `0x` prefix.
#[must_use]
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", encode(bytes))
}

/// Decodes hex text with an optional `0x` prefix.
///
/// # Errors
///
/// Returns [`HexError`] when the input is not valid hex.
pub fn decode(text: &str) -> Result<Vec<u8>, HexError> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    let raw = digits.as_bytes();
    let mut out = Vec::with_capacity(raw.len() / 2);
    for (index, pair) in raw.chunks_exact(2).enumerate() {
        let high = nibble(pair[0]).ok_or(HexError::InvalidCharacter(index * 2))?;
        let low = nibble(pair[1]).ok_or(HexError::InvalidCharacter(index * 2 + 1))?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

/// Maps one ASCII hex digit to its value.
const fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0' ..= b'9' => Some(digit - b'0'),
        b'a' ..= b'f' => Some(digit - b'a' + 10),
        b'A' ..= b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

// ============================================================================
// SECTION: Serde Support
// ============================================================================

/// Serde adapter serializing `Vec<u8>` fields as `0x`-prefixed hex strings.
pub mod serde_bytes {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use serde::de::Error as _;

    /// Serializes bytes as prefixed hex.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when writing fails.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_prefixed(bytes))
    }

    /// Deserializes prefixed or bare hex into bytes.
    ///
    /// # Errors
    ///
    /// Returns a deserializer error when the input is not valid hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode(&text).map_err(D::Error::custom)
    }
}
