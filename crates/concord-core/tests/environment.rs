// crates/concord-core/tests/environment.rs
// ============================================================================
// Module: Environment Accessor Tests
// Description: Tests for ambient value resolution and ABI word encoding.
// Purpose: Ensure environment kinds resolve deterministically or fail closed.
// Dependencies: concord-core
// ============================================================================
//! ## Overview
//! Resolves every environment kind against a fully populated host and checks
//! that absent host values and unknown tags are reported as unsupported.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use concord_core::Address;
use concord_core::EnvError;
use concord_core::EnvKind;
use concord_core::HostEnvironment;
use concord_core::InvocationContext;
use concord_core::Selector;
use concord_core::abi::decode_address;
use concord_core::abi::decode_uint;
use concord_core::abi::encode_selector;
use concord_core::environment::resolve;

fn full_host() -> HostEnvironment {
    HostEnvironment {
        sequence_id: Some(42),
        coordinator: Some(Address::from_low_u64(0xc0)),
        randomness_seed: Some(u128::MAX),
        resource_limit: Some(30_000_000),
        ordinal_position: Some(1_700_000_000),
        price_unit: Some(7),
    }
}

fn invocation() -> InvocationContext {
    InvocationContext {
        caller: Address::from_low_u64(0xca11),
        originator: Address::from_low_u64(0x01),
        selector: Some(Selector::new([1, 2, 3, 4])),
        value: 99,
        remaining_budget: 12_345,
    }
}

#[test]
fn tags_are_stable_and_invertible() {
    for (index, kind) in EnvKind::ALL.into_iter().enumerate() {
        assert_eq!(usize::from(kind.tag()), index);
        assert_eq!(EnvKind::try_from(kind.tag()).unwrap(), kind);
        assert_eq!(EnvKind::from_label(kind.as_str()), Some(kind));
    }
    assert_eq!(EnvKind::try_from(11).unwrap_err(), EnvError::UnsupportedEnvKind(11));
}

#[test]
fn resolves_block_level_values() {
    let host = full_host();
    let ctx = invocation();
    let uint = |kind| decode_uint(&resolve(kind, &host, &ctx).unwrap()).unwrap();
    assert_eq!(uint(EnvKind::SequenceId), 42);
    assert_eq!(uint(EnvKind::RandomnessSeed), u128::MAX);
    assert_eq!(uint(EnvKind::ResourceLimit), 30_000_000);
    assert_eq!(uint(EnvKind::OrdinalPosition), 1_700_000_000);
    assert_eq!(uint(EnvKind::PriceUnit), 7);
    let coordinator = resolve(EnvKind::CoordinatorIdentity, &host, &ctx).unwrap();
    assert_eq!(decode_address(&coordinator).unwrap(), Address::from_low_u64(0xc0));
}

#[test]
fn resolves_call_level_values_from_context() {
    let host = HostEnvironment::default();
    let ctx = invocation();
    let caller = resolve(EnvKind::CallerIdentity, &host, &ctx).unwrap();
    assert_eq!(decode_address(&caller).unwrap(), ctx.caller);
    let originator = resolve(EnvKind::OriginatorIdentity, &host, &ctx).unwrap();
    assert_eq!(decode_address(&originator).unwrap(), Address::from_low_u64(0x01));
    let value = resolve(EnvKind::AttachedValue, &host, &ctx).unwrap();
    assert_eq!(decode_uint(&value).unwrap(), 99);
    let budget = resolve(EnvKind::RemainingBudget, &host, &ctx).unwrap();
    assert_eq!(decode_uint(&budget).unwrap(), 12_345);
    let selector = resolve(EnvKind::RequestedSelector, &host, &ctx).unwrap();
    assert_eq!(selector, encode_selector(Selector::new([1, 2, 3, 4])));
    assert_eq!(&selector[.. 4], &[1, 2, 3, 4]);
    assert!(selector[4 ..].iter().all(|byte| *byte == 0));
}

#[test]
fn absent_host_values_are_unsupported() {
    let host = HostEnvironment::default();
    let ctx = invocation();
    for kind in [
        EnvKind::SequenceId,
        EnvKind::CoordinatorIdentity,
        EnvKind::RandomnessSeed,
        EnvKind::ResourceLimit,
        EnvKind::OrdinalPosition,
        EnvKind::PriceUnit,
    ] {
        assert_eq!(
            resolve(kind, &host, &ctx).unwrap_err(),
            EnvError::UnsupportedEnvKind(kind.tag())
        );
    }
}

#[test]
fn missing_selector_is_unsupported() {
    let ctx = InvocationContext {
        selector: None,
        ..invocation()
    };
    assert_eq!(
        resolve(EnvKind::RequestedSelector, &HostEnvironment::default(), &ctx).unwrap_err(),
        EnvError::UnsupportedEnvKind(7)
    );
}

#[test]
fn resolution_is_deterministic() {
    let host = full_host();
    let ctx = invocation();
    for kind in EnvKind::ALL {
        assert_eq!(resolve(kind, &host, &ctx), resolve(kind, &host, &ctx));
    }
}
