// crates/concord-core/src/core/descriptor.rs
// ============================================================================
// Module: Concord Call Descriptor Codec
// Description: Canonical binary encoding of check query specifications.
// Purpose: Describe how to build a read-only query from literals, inbound
//          call bytes, and ambient values.
// Dependencies: crate::core::{abi, environment, identifiers}, serde, thiserror
// ============================================================================

//! ## Overview
//! A call descriptor names a target selector and an ordered list of query
//! arguments. Wire layout:
//!
//! ```text
//! selector (4) | argc (1) | { kind (1) | payload }*
//!   kind 0x00 Static   : len (2, BE) | literal bytes
//!   kind 0x01 CallData : offset (2, BE) | length (2, BE)
//!   kind 0x02 Env      : env tag (1)
//! ```
//!
//! The encoding is canonical: one byte string per logical descriptor, so
//! sibling implementations registering the same query reproduce it exactly.
//! Decoding rejects truncation, trailing bytes, and unknown tags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::abi::AbiError;
use crate::core::abi::AbiValue;
use crate::core::abi::Word;
use crate::core::environment::EnvError;
use crate::core::environment::EnvKind;
use crate::core::hex;
use crate::core::identifiers::SELECTOR_LEN;
use crate::core::identifiers::Selector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of arguments in one descriptor.
pub const MAX_ARGUMENTS: usize = u8::MAX as usize;
/// Maximum byte length of one static literal.
pub const MAX_STATIC_BYTES: usize = u16::MAX as usize;
/// Wire tag for [`QueryArgument::Static`].
const TAG_STATIC: u8 = 0x00;
/// Wire tag for [`QueryArgument::CallData`].
const TAG_CALL_DATA: u8 = 0x01;
/// Wire tag for [`QueryArgument::Env`].
const TAG_ENV: u8 = 0x02;
/// Header width: selector plus argument count.
const HEADER_LEN: usize = SELECTOR_LEN + 1;

// ============================================================================
// SECTION: Query Arguments
// ============================================================================

/// One argument of a check query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryArgument {
    /// Literal bytes baked into the descriptor.
    Static {
        /// ABI-encoded literal.
        #[serde(with = "hex::serde_bytes")]
        value: Vec<u8>,
    },
    /// Byte range of the inbound call, resolved at dispatch time.
    CallData {
        /// Start offset into the inbound call.
        offset: u16,
        /// Number of bytes to copy.
        length: u16,
    },
    /// Ambient value resolved at dispatch time.
    Env {
        /// Environment kind.
        env: EnvKind,
    },
}

impl QueryArgument {
    /// Builds a static argument from a typed ABI value.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError`] when the value cannot be encoded.
    pub fn literal(value: &AbiValue) -> Result<Self, AbiError> {
        Ok(Self::Static {
            value: value.encode()?.to_vec(),
        })
    }

    /// Builds a static argument from raw pre-encoded bytes.
    #[must_use]
    pub fn raw(value: impl Into<Vec<u8>>) -> Self {
        Self::Static {
            value: value.into(),
        }
    }

    /// Builds a call-data slice argument.
    #[must_use]
    pub const fn call_data(offset: u16, length: u16) -> Self {
        Self::CallData {
            offset,
            length,
        }
    }

    /// Builds an environment argument.
    #[must_use]
    pub const fn env(env: EnvKind) -> Self {
        Self::Env {
            env,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Descriptor encoding and decoding errors (all are malformed descriptors).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Input ended before the declared content.
    #[error("descriptor truncated at byte {offset}: need {needed} more bytes")]
    Truncated {
        /// Offset where more bytes were required.
        offset: usize,
        /// Bytes still required.
        needed: usize,
    },
    /// Input continues past the declared content.
    #[error("descriptor has {0} trailing bytes")]
    TrailingBytes(usize),
    /// Unknown argument kind tag.
    #[error("unknown argument kind tag {0:#04x}")]
    UnknownArgumentKind(u8),
    /// Unknown environment kind tag.
    #[error("unknown environment kind tag {0:#04x}")]
    UnknownEnvKind(u8),
    /// Too many arguments for the one-byte count.
    #[error("descriptor has {0} arguments (max {MAX_ARGUMENTS})")]
    TooManyArguments(usize),
    /// Static literal too long for the two-byte length prefix.
    #[error("static literal is {0} bytes (max {MAX_STATIC_BYTES})")]
    StaticTooLarge(usize),
}

/// Errors raised when building a query from a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryBuildError {
    /// A call-data slice reaches past the inbound call.
    #[error("call data range {offset}+{length} exceeds inbound call of {input_len} bytes")]
    OutOfBoundsCallData {
        /// Requested offset.
        offset: u16,
        /// Requested length.
        length: u16,
        /// Actual inbound call length.
        input_len: usize,
    },
    /// An environment value could not be resolved.
    #[error(transparent)]
    Env(#[from] EnvError),
}

// ============================================================================
// SECTION: Call Descriptor
// ============================================================================

/// Decoded specification of a check query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    /// Selector invoked on the check target.
    pub selector: Selector,
    /// Ordered query arguments.
    pub arguments: Vec<QueryArgument>,
}

impl CallDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(selector: Selector, arguments: Vec<QueryArgument>) -> Self {
        Self {
            selector,
            arguments,
        }
    }

    /// Encodes the descriptor to its canonical wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when argument count or literal sizes exceed
    /// the wire limits.
    pub fn encode(&self) -> Result<Vec<u8>, DescriptorError> {
        encode(self.selector, &self.arguments)
    }

    /// Decodes a descriptor from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the bytes are malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorError> {
        decode(bytes)
    }

    /// Verifies every call-data slice fits an inbound call of `input_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`QueryBuildError::OutOfBoundsCallData`] on the first violation.
    pub fn check_bounds(&self, input_len: usize) -> Result<(), QueryBuildError> {
        for argument in &self.arguments {
            if let QueryArgument::CallData {
                offset,
                length,
            } = argument
                && usize::from(*offset) + usize::from(*length) > input_len
            {
                return Err(QueryBuildError::OutOfBoundsCallData {
                    offset: *offset,
                    length: *length,
                    input_len,
                });
            }
        }
        Ok(())
    }

    /// Builds the query bytes: `selector ‖ arg_1 ‖ ... ‖ arg_n`.
    ///
    /// Bounds are verified for every call-data slice before any environment
    /// value is resolved, so an out-of-bounds slice is always reported as such.
    ///
    /// # Errors
    ///
    /// Returns [`QueryBuildError`] on out-of-bounds slices or unresolvable
    /// environment values.
    pub fn build_query<F>(&self, inbound: &[u8], mut resolve_env: F) -> Result<Vec<u8>, QueryBuildError>
    where
        F: FnMut(EnvKind) -> Result<Word, EnvError>,
    {
        self.check_bounds(inbound.len())?;
        let mut query = Vec::with_capacity(SELECTOR_LEN + self.arguments.len() * 32);
        query.extend_from_slice(self.selector.as_bytes());
        for argument in &self.arguments {
            match argument {
                QueryArgument::Static {
                    value,
                } => query.extend_from_slice(value),
                QueryArgument::CallData {
                    offset,
                    length,
                } => {
                    let start = usize::from(*offset);
                    let end = start + usize::from(*length);
                    query.extend_from_slice(&inbound[start .. end]);
                }
                QueryArgument::Env {
                    env,
                } => query.extend_from_slice(&resolve_env(*env)?),
            }
        }
        Ok(query)
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Encodes a selector and arguments to the canonical wire form.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the argument count or a literal length
/// exceeds the wire limits.
pub fn encode(selector: Selector, arguments: &[QueryArgument]) -> Result<Vec<u8>, DescriptorError> {
    let count =
        u8::try_from(arguments.len()).map_err(|_| DescriptorError::TooManyArguments(arguments.len()))?;
    let mut out = Vec::with_capacity(HEADER_LEN + arguments.len() * 5);
    out.extend_from_slice(selector.as_bytes());
    out.push(count);
    for argument in arguments {
        match argument {
            QueryArgument::Static {
                value,
            } => {
                let len = u16::try_from(value.len())
                    .map_err(|_| DescriptorError::StaticTooLarge(value.len()))?;
                out.push(TAG_STATIC);
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(value);
            }
            QueryArgument::CallData {
                offset,
                length,
            } => {
                out.push(TAG_CALL_DATA);
                out.extend_from_slice(&offset.to_be_bytes());
                out.extend_from_slice(&length.to_be_bytes());
            }
            QueryArgument::Env {
                env,
            } => {
                out.push(TAG_ENV);
                out.push(env.tag());
            }
        }
    }
    Ok(out)
}

/// Decodes the canonical wire form.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the bytes are truncated, carry trailing
/// data, or contain unknown tags.
pub fn decode(bytes: &[u8]) -> Result<CallDescriptor, DescriptorError> {
    let mut reader = Reader::new(bytes);
    let selector_bytes: [u8; SELECTOR_LEN] = reader.array()?;
    let [count] = reader.array::<1>()?;
    let mut arguments = Vec::with_capacity(usize::from(count));
    for _ in 0 .. count {
        let [tag] = reader.array::<1>()?;
        let argument = match tag {
            TAG_STATIC => {
                let len = u16::from_be_bytes(reader.array()?);
                QueryArgument::Static {
                    value: reader.take(usize::from(len))?.to_vec(),
                }
            }
            TAG_CALL_DATA => {
                let offset = u16::from_be_bytes(reader.array()?);
                let length = u16::from_be_bytes(reader.array()?);
                QueryArgument::CallData {
                    offset,
                    length,
                }
            }
            TAG_ENV => {
                let [env_tag] = reader.array::<1>()?;
                let env = EnvKind::try_from(env_tag)
                    .map_err(|_| DescriptorError::UnknownEnvKind(env_tag))?;
                QueryArgument::Env {
                    env,
                }
            }
            other => return Err(DescriptorError::UnknownArgumentKind(other)),
        };
        arguments.push(argument);
    }
    let remaining = reader.remaining();
    if remaining != 0 {
        return Err(DescriptorError::TrailingBytes(remaining));
    }
    Ok(CallDescriptor {
        selector: Selector::new(selector_bytes),
        arguments,
    })
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Bounds-checked cursor over descriptor bytes.
struct Reader<'a> {
    /// Full input.
    bytes: &'a [u8],
    /// Current read offset.
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader at offset zero.
    const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
        }
    }

    /// Takes the next `len` bytes.
    fn take(&mut self, len: usize) -> Result<&'a [u8], DescriptorError> {
        let available = self.remaining();
        if len > available {
            return Err(DescriptorError::Truncated {
                offset: self.offset,
                needed: len - available,
            });
        }
        let slice = &self.bytes[self.offset .. self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Takes the next `N` bytes as an array.
    fn array<const N: usize>(&mut self) -> Result<[u8; N], DescriptorError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Returns the number of unread bytes.
    const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }
}
