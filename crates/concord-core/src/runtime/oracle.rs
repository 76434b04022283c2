// crates/concord-core/src/runtime/oracle.rs
// ============================================================================
// Module: Concord Consistency Oracle
// Description: Check evaluation and aggregate digest computation.
// Purpose: Reduce one implementation's observable effects to a digest.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! After an implementation runs, every check registered for the selector is
//! evaluated against that implementation's working copy, in registration
//! order. Each check produces a [`CheckResult`]; the results are framed and
//! hashed into the aggregate digest compared across implementations.
//!
//! Framing per check: `status (1) | len (4, BE) | payload`. Success uses
//! status `0x01` and the returned bytes; failure uses status `0x00` and
//! `code (1) | detail`. Length prefixes make the concatenation injective, so
//! distinct result sequences never collide before hashing.
//!
//! A missing target, a reverting target or an unsupported environment value
//! is a failure *state* that feeds the digest. Out-of-bounds call data and
//! host faults abort the whole dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Address;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::InvocationContext;
use crate::core::QueryBuildError;
use crate::core::environment;
use crate::core::environment::EnvError;
use crate::core::hashing::hash_bytes;
use crate::core::state::push_framed;
use crate::interfaces::CallError;
use crate::runtime::context::CallContext;
use crate::runtime::context::ExecutionHost;
use crate::runtime::context::Frame;
use crate::runtime::context::Meter;
use crate::runtime::gateway::GatewayError;
use crate::runtime::registry::CheckDescriptor;
use crate::runtime::state::WorkingState;

// ============================================================================
// SECTION: Check Results
// ============================================================================

/// Status byte for a successful check.
const STATUS_SUCCESS: u8 = 0x01;
/// Status byte for a failed check.
const STATUS_FAILURE: u8 = 0x00;
/// Failure code: target reverted.
const FAILURE_REVERTED: u8 = 0x01;
/// Failure code: environment value unsupported.
const FAILURE_UNSUPPORTED_ENV: u8 = 0x02;
/// Failure code: no contract at target.
const FAILURE_MISSING_TARGET: u8 = 0x03;

/// Why a check produced no return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// The target reverted with this data.
    Reverted(Vec<u8>),
    /// An environment argument could not be resolved.
    UnsupportedEnv(u8),
    /// No contract exists at the target address.
    MissingTarget(Address),
}

/// Outcome of evaluating one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// The query returned these bytes.
    Success(Vec<u8>),
    /// The query failed.
    Failure(CheckFailure),
}

impl CheckResult {
    /// Appends the framed form of this result to `out`.
    fn frame_into(&self, out: &mut Vec<u8>) {
        match self {
            Self::Success(data) => {
                out.push(STATUS_SUCCESS);
                push_framed(out, data);
            }
            Self::Failure(failure) => {
                out.push(STATUS_FAILURE);
                let mut payload = Vec::new();
                match failure {
                    CheckFailure::Reverted(data) => {
                        payload.push(FAILURE_REVERTED);
                        payload.extend_from_slice(data);
                    }
                    CheckFailure::UnsupportedEnv(tag) => {
                        payload.push(FAILURE_UNSUPPORTED_ENV);
                        payload.push(*tag);
                    }
                    CheckFailure::MissingTarget(address) => {
                        payload.push(FAILURE_MISSING_TARGET);
                        payload.extend_from_slice(address.as_bytes());
                    }
                }
                push_framed(out, &payload);
            }
        }
    }
}

/// Hashes check results, in order, into an aggregate digest.
#[must_use]
pub fn aggregate_digest(algorithm: HashAlgorithm, results: &[CheckResult]) -> HashDigest {
    let mut framed = Vec::new();
    for result in results {
        result.frame_into(&mut framed);
    }
    hash_bytes(algorithm, &framed)
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates `checks` against the working copy of one implementation run.
///
/// Each check is a read-only call from the gateway. Environment arguments
/// resolve against `invocation` with the budget remaining at build time.
pub(crate) fn evaluate_checks(
    checks: &[CheckDescriptor],
    inbound: &[u8],
    invocation: &InvocationContext,
    state: &mut WorkingState<'_>,
    meter: &mut Meter,
    host: ExecutionHost<'_>,
) -> Result<Vec<CheckResult>, GatewayError> {
    let mut results = Vec::with_capacity(checks.len());
    for check in checks {
        let descriptor = check.call();
        let built = descriptor.build_query(inbound, |kind| {
            let frame_view = InvocationContext {
                remaining_budget: meter.remaining(),
                ..*invocation
            };
            environment::resolve(kind, host.environment, &frame_view)
        });
        let query = match built {
            Ok(query) => query,
            Err(QueryBuildError::Env(EnvError::UnsupportedEnvKind(tag))) => {
                results.push(CheckResult::Failure(CheckFailure::UnsupportedEnv(tag)));
                continue;
            }
            Err(QueryBuildError::OutOfBoundsCallData {
                offset,
                length,
                input_len,
            }) => {
                return Err(GatewayError::OutOfBoundsCallData {
                    offset,
                    length,
                    input_len,
                });
            }
        };
        let Some((code, scope)) = host.route(check.target()) else {
            results.push(CheckResult::Failure(CheckFailure::MissingTarget(check.target())));
            continue;
        };
        let frame = Frame {
            caller: host.gateway,
            address: check.target(),
            scope,
            selector: Some(descriptor.selector),
            value: 0,
            read_only: true,
            depth: 0,
        };
        match CallContext::invoke(state, meter, host, frame, code.as_ref(), &query) {
            Ok(data) => results.push(CheckResult::Success(data)),
            Err(CallError::Revert(data)) => {
                results.push(CheckResult::Failure(CheckFailure::Reverted(data)));
            }
            Err(CallError::Host(err)) => return Err(err.into()),
        }
    }
    Ok(results)
}
