// crates/concord-core/src/core/environment.rs
// ============================================================================
// Module: Concord Environment Accessor
// Description: Ambient values resolved at query time.
// Purpose: Map environment kinds to ABI words for a given invocation context.
// Dependencies: crate::core::{abi, identifiers}, serde, thiserror
// ============================================================================

//! ## Overview
//! Environment values are resolved when a check runs, never at registration
//! time. Block-level values come from the host's [`HostEnvironment`];
//! call-level values (caller, requested selector, attached value, remaining
//! budget) come from the [`InvocationContext`] of the frame doing the
//! resolving, so a nested call sees its own sender. Resolution is a pure
//! function of those two inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::abi::Word;
use crate::core::abi::encode_address;
use crate::core::abi::encode_selector;
use crate::core::abi::encode_uint;
use crate::core::identifiers::Address;
use crate::core::identifiers::Selector;

// ============================================================================
// SECTION: Environment Kinds
// ============================================================================

/// Ambient value kinds addressable from a check descriptor.
///
/// # Invariants
/// - Wire tags are stable; see [`EnvKind::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvKind {
    /// Block-level counter / sequence id.
    SequenceId,
    /// Identity of the current coordinator (block producer).
    CoordinatorIdentity,
    /// Pseudo-randomness seed.
    RandomnessSeed,
    /// Block-level resource limit.
    ResourceLimit,
    /// Ordinal position (logical clock) of the current block.
    OrdinalPosition,
    /// Budget remaining in the current execution.
    RemainingBudget,
    /// Immediate caller of the current frame.
    CallerIdentity,
    /// Selector requested by the current frame's input.
    RequestedSelector,
    /// Value attached to the current frame.
    AttachedValue,
    /// Price per budget unit.
    PriceUnit,
    /// Identity that originated the top-level invocation.
    OriginatorIdentity,
}

impl EnvKind {
    /// All kinds in wire-tag order.
    pub const ALL: [Self; 11] = [
        Self::SequenceId,
        Self::CoordinatorIdentity,
        Self::RandomnessSeed,
        Self::ResourceLimit,
        Self::OrdinalPosition,
        Self::RemainingBudget,
        Self::CallerIdentity,
        Self::RequestedSelector,
        Self::AttachedValue,
        Self::PriceUnit,
        Self::OriginatorIdentity,
    ];

    /// Returns the one-byte wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::SequenceId => 0,
            Self::CoordinatorIdentity => 1,
            Self::RandomnessSeed => 2,
            Self::ResourceLimit => 3,
            Self::OrdinalPosition => 4,
            Self::RemainingBudget => 5,
            Self::CallerIdentity => 6,
            Self::RequestedSelector => 7,
            Self::AttachedValue => 8,
            Self::PriceUnit => 9,
            Self::OriginatorIdentity => 10,
        }
    }

    /// Returns the stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SequenceId => "sequence_id",
            Self::CoordinatorIdentity => "coordinator_identity",
            Self::RandomnessSeed => "randomness_seed",
            Self::ResourceLimit => "resource_limit",
            Self::OrdinalPosition => "ordinal_position",
            Self::RemainingBudget => "remaining_budget",
            Self::CallerIdentity => "caller_identity",
            Self::RequestedSelector => "requested_selector",
            Self::AttachedValue => "attached_value",
            Self::PriceUnit => "price_unit",
            Self::OriginatorIdentity => "originator_identity",
        }
    }

    /// Parses a snake-case label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }
}

impl TryFrom<u8> for EnvKind {
    type Error = EnvError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or(EnvError::UnsupportedEnvKind(tag))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when resolving environment values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnvError {
    /// The kind is unknown or the host does not provide it.
    #[error("unsupported environment kind: {0}")]
    UnsupportedEnvKind(u8),
}

// ============================================================================
// SECTION: Host Environment
// ============================================================================

/// Block-level ambient values supplied by the host.
///
/// # Invariants
/// - `None` marks a value the host does not provide; resolving it fails with
///   [`EnvError::UnsupportedEnvKind`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostEnvironment {
    /// Block-level counter.
    #[serde(default)]
    pub sequence_id: Option<u64>,
    /// Current coordinator identity.
    #[serde(default)]
    pub coordinator: Option<Address>,
    /// Pseudo-randomness seed.
    #[serde(default)]
    pub randomness_seed: Option<u128>,
    /// Block-level resource limit.
    #[serde(default)]
    pub resource_limit: Option<u64>,
    /// Ordinal position (logical clock).
    #[serde(default)]
    pub ordinal_position: Option<u64>,
    /// Price per budget unit.
    #[serde(default)]
    pub price_unit: Option<u128>,
}

// ============================================================================
// SECTION: Invocation Context
// ============================================================================

/// Call-level values of the frame resolving an environment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationContext {
    /// Immediate caller of the frame.
    pub caller: Address,
    /// External caller that started the top-level invocation.
    pub originator: Address,
    /// Selector requested by the frame's input, when it carries one.
    pub selector: Option<Selector>,
    /// Value attached to the frame.
    pub value: u128,
    /// Budget remaining at resolution time.
    pub remaining_budget: u64,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves `kind` to an ABI word.
///
/// # Errors
///
/// Returns [`EnvError::UnsupportedEnvKind`] when the value is unavailable.
pub fn resolve(
    kind: EnvKind,
    host: &HostEnvironment,
    invocation: &InvocationContext,
) -> Result<Word, EnvError> {
    let unsupported = EnvError::UnsupportedEnvKind(kind.tag());
    let word = match kind {
        EnvKind::SequenceId => encode_uint(u128::from(host.sequence_id.ok_or(unsupported)?)),
        EnvKind::CoordinatorIdentity => encode_address(host.coordinator.ok_or(unsupported)?),
        EnvKind::RandomnessSeed => encode_uint(host.randomness_seed.ok_or(unsupported)?),
        EnvKind::ResourceLimit => encode_uint(u128::from(host.resource_limit.ok_or(unsupported)?)),
        EnvKind::OrdinalPosition => {
            encode_uint(u128::from(host.ordinal_position.ok_or(unsupported)?))
        }
        EnvKind::RemainingBudget => encode_uint(u128::from(invocation.remaining_budget)),
        EnvKind::CallerIdentity => encode_address(invocation.caller),
        EnvKind::RequestedSelector => encode_selector(invocation.selector.ok_or(unsupported)?),
        EnvKind::AttachedValue => encode_uint(invocation.value),
        EnvKind::PriceUnit => encode_uint(host.price_unit.ok_or(unsupported)?),
        EnvKind::OriginatorIdentity => encode_address(invocation.originator),
    };
    Ok(word)
}
