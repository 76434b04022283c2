// crates/concord-core/src/core/abi.rs
// ============================================================================
// Module: Concord ABI Words
// Description: 32-byte word encoding for literals, environment values, and calls.
// Purpose: Give every encoder one canonical byte form for typed values.
// Dependencies: crate::core::identifiers, thiserror
// ============================================================================

//! ## Overview
//! Values exchanged with implementations and check targets use fixed 32-byte
//! words: unsigned integers are big-endian and left-padded, addresses are
//! left-padded, booleans are `0`/`1`, and fixed byte strings (including
//! selectors) are right-padded. There is exactly one encoding per value, which
//! is what lets independently authored encoders agree byte-for-byte.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::identifiers::ADDRESS_LEN;
use crate::core::identifiers::Address;
use crate::core::identifiers::Selector;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Byte width of an ABI word.
pub const WORD_LEN: usize = 32;

/// One ABI word.
pub type Word = [u8; WORD_LEN];

/// Typed value that encodes to exactly one ABI word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer (up to 128 significant bits).
    Uint(u128),
    /// 20-byte identity.
    Address(Address),
    /// Boolean flag.
    Bool(bool),
    /// Fixed byte string of 1 to 32 bytes, right-padded.
    FixedBytes(Vec<u8>),
}

impl AbiValue {
    /// Encodes the value as a single word.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::FixedBytesWidth`] when a fixed byte string is empty
    /// or longer than a word.
    pub fn encode(&self) -> Result<Word, AbiError> {
        match self {
            Self::Uint(value) => Ok(encode_uint(*value)),
            Self::Address(address) => Ok(encode_address(*address)),
            Self::Bool(flag) => Ok(encode_bool(*flag)),
            Self::FixedBytes(bytes) => encode_fixed_bytes(bytes),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when encoding or decoding ABI words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Input ended before a full word.
    #[error("abi input truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// Integer does not fit in 128 bits.
    #[error("abi uint exceeds 128 bits")]
    Overflow,
    /// Word is not a canonical boolean.
    #[error("abi bool word is not 0 or 1")]
    InvalidBool,
    /// Word has non-zero padding above a 20-byte address.
    #[error("abi address word has non-zero padding")]
    InvalidAddress,
    /// Fixed byte string width outside 1..=32.
    #[error("abi fixed bytes width must be 1..=32, got {0}")]
    FixedBytesWidth(usize),
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Encodes an unsigned integer as a big-endian, left-padded word.
#[must_use]
pub fn encode_uint(value: u128) -> Word {
    let mut word = [0u8; WORD_LEN];
    word[WORD_LEN - 16 ..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encodes an address as a left-padded word.
#[must_use]
pub fn encode_address(address: Address) -> Word {
    let mut word = [0u8; WORD_LEN];
    word[WORD_LEN - ADDRESS_LEN ..].copy_from_slice(address.as_bytes());
    word
}

/// Encodes a boolean as `0` or `1`.
#[must_use]
pub fn encode_bool(flag: bool) -> Word {
    encode_uint(u128::from(flag))
}

/// Encodes a selector as a right-padded word.
#[must_use]
pub fn encode_selector(selector: Selector) -> Word {
    let mut word = [0u8; WORD_LEN];
    word[.. selector.as_bytes().len()].copy_from_slice(selector.as_bytes());
    word
}

/// Encodes a fixed byte string as a right-padded word.
///
/// # Errors
///
/// Returns [`AbiError::FixedBytesWidth`] when the width is outside 1..=32.
pub fn encode_fixed_bytes(bytes: &[u8]) -> Result<Word, AbiError> {
    if bytes.is_empty() || bytes.len() > WORD_LEN {
        return Err(AbiError::FixedBytesWidth(bytes.len()));
    }
    let mut word = [0u8; WORD_LEN];
    word[.. bytes.len()].copy_from_slice(bytes);
    Ok(word)
}

/// Encodes a call: `selector ‖ word_1 ‖ ... ‖ word_n`.
///
/// # Errors
///
/// Returns [`AbiError`] when any argument fails to encode.
pub fn encode_call(selector: Selector, args: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    let mut out = Vec::with_capacity(selector.as_bytes().len() + args.len() * WORD_LEN);
    out.extend_from_slice(selector.as_bytes());
    for arg in args {
        out.extend_from_slice(&arg.encode()?);
    }
    Ok(out)
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Returns the `index`-th word of `data`.
///
/// # Errors
///
/// Returns [`AbiError::Truncated`] when `data` holds fewer words.
pub fn word_at(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let start = index.saturating_mul(WORD_LEN);
    let end = start.saturating_add(WORD_LEN);
    data.get(start .. end).ok_or(AbiError::Truncated {
        needed: end,
        available: data.len(),
    })
}

/// Decodes a big-endian unsigned integer word.
///
/// # Errors
///
/// Returns [`AbiError`] when the word is short or exceeds 128 bits.
pub fn decode_uint(word: &[u8]) -> Result<u128, AbiError> {
    let word = exact_word(word)?;
    if word[.. WORD_LEN - 16].iter().any(|byte| *byte != 0) {
        return Err(AbiError::Overflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[WORD_LEN - 16 ..]);
    Ok(u128::from_be_bytes(low))
}

/// Decodes a left-padded address word.
///
/// # Errors
///
/// Returns [`AbiError`] when the word is short or has non-zero padding.
pub fn decode_address(word: &[u8]) -> Result<Address, AbiError> {
    let word = exact_word(word)?;
    if word[.. WORD_LEN - ADDRESS_LEN].iter().any(|byte| *byte != 0) {
        return Err(AbiError::InvalidAddress);
    }
    Address::from_slice(&word[WORD_LEN - ADDRESS_LEN ..]).map_err(|_| AbiError::InvalidAddress)
}

/// Decodes a canonical boolean word.
///
/// # Errors
///
/// Returns [`AbiError`] when the word is short or not `0`/`1`.
pub fn decode_bool(word: &[u8]) -> Result<bool, AbiError> {
    match decode_uint(word) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        Ok(_) | Err(AbiError::Overflow) => Err(AbiError::InvalidBool),
        Err(err) => Err(err),
    }
}

/// Returns the leading word of `word`, failing when it is shorter than one word.
fn exact_word(word: &[u8]) -> Result<&[u8], AbiError> {
    if word.len() < WORD_LEN {
        return Err(AbiError::Truncated {
            needed: WORD_LEN,
            available: word.len(),
        });
    }
    Ok(&word[.. WORD_LEN])
}
