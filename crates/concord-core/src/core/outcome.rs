// crates/concord-core/src/core/outcome.rs
// ============================================================================
// Module: Concord Execution Outcomes
// Description: Per-implementation outcomes, divergence records, and reports.
// Purpose: Carry the results compared by the consistency oracle.
// Dependencies: crate::core::hashing, serde
// ============================================================================

//! ## Overview
//! An [`ExecutionOutcome`] exists only for the duration of one dispatch.
//! Implementations are consistent for an invocation iff every outcome's
//! `(success, digest)` pair equals the primary's.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::hex;

// ============================================================================
// SECTION: Execution Outcome
// ============================================================================

/// Result of running one implementation and its checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Whether the implementation returned without reverting.
    pub success: bool,
    /// Return data, or revert data when `success` is false.
    #[serde(with = "hex::serde_bytes")]
    pub return_data: Vec<u8>,
    /// Aggregate digest over the check results.
    pub digest: HashDigest,
}

impl ExecutionOutcome {
    /// Returns true when `other` agrees on success flag and digest.
    #[must_use]
    pub fn agrees_with(&self, other: &Self) -> bool {
        self.success == other.success && self.digest == other.digest
    }
}

// ============================================================================
// SECTION: Divergence
// ============================================================================

/// Evidence of disagreement between implementations.
///
/// # Invariants
/// - `disagreeing` is sorted, non-empty, and never contains index 0.
/// - `digests` and `success` are indexed by registry position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// Registry indices whose outcome differs from the primary's.
    pub disagreeing: Vec<usize>,
    /// Aggregate digest of every implementation.
    pub digests: Vec<HashDigest>,
    /// Success flag of every implementation.
    pub success: Vec<bool>,
}

impl Divergence {
    /// Compares every outcome to the primary's and returns the divergence, if any.
    #[must_use]
    pub fn detect(outcomes: &[ExecutionOutcome]) -> Option<Self> {
        let primary = outcomes.first()?;
        let disagreeing: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, outcome)| !outcome.agrees_with(primary))
            .map(|(index, _)| index)
            .collect();
        if disagreeing.is_empty() {
            return None;
        }
        Some(Self {
            disagreeing,
            digests: outcomes.iter().map(|outcome| outcome.digest.clone()).collect(),
            success: outcomes.iter().map(|outcome| outcome.success).collect(),
        })
    }

    /// Renders the disagreeing indices as a comma-separated list.
    #[must_use]
    pub fn indices_label(&self) -> String {
        self.disagreeing.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

// ============================================================================
// SECTION: Diagnostic Report
// ============================================================================

/// Consistency verdict for a simulated invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsistencyVerdict {
    /// All implementations agree with the primary.
    Consistent,
    /// Some implementations disagree with the primary.
    Inconsistent {
        /// Registry indices that disagree.
        disagreeing: Vec<usize>,
    },
}

/// Off-path diagnostic result of a simulated invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Whether the primary implementation succeeded.
    pub success: bool,
    /// Primary return data or revert data.
    #[serde(with = "hex::serde_bytes")]
    pub return_data: Vec<u8>,
    /// Primary aggregate digest.
    pub digest: HashDigest,
    /// Result of the consistency comparison.
    pub verdict: ConsistencyVerdict,
}
