// crates/concord-core/tests/common/mod.rs
// ============================================================================
// Module: Gateway Test Fixtures
// Description: Sample contracts and gateway builders for integration tests.
// Purpose: Share token implementations, collaborators, and wiring.
// Dependencies: concord-core
// ============================================================================
//! ## Overview
//! Provides two independently written token ledgers that agree on every
//! input, a leaky ledger that credits the recipient without debiting the
//! sender, and small collaborators for nested-call and budget tests. All
//! implementations share the gateway-scope storage layout
//! `b"balance" ‖ holder`.

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
    dead_code,
    reason = "Test-only helpers; not every test binary uses every fixture."
)]

use std::sync::Arc;

use concord_core::AbiError;
use concord_core::AbiValue;
use concord_core::Address;
use concord_core::CallContext;
use concord_core::CallDescriptor;
use concord_core::CallError;
use concord_core::Contract;
use concord_core::ContractDirectory;
use concord_core::EnvKind;
use concord_core::Gateway;
use concord_core::GatewayConfig;
use concord_core::InMemoryStateStore;
use concord_core::Invocation;
use concord_core::QueryArgument;
use concord_core::SELECTOR_LEN;
use concord_core::Selector;
use concord_core::StateKey;
use concord_core::StateStore;
use concord_core::abi::decode_address;
use concord_core::abi::decode_uint;
use concord_core::abi::encode_address;
use concord_core::abi::encode_bool;
use concord_core::abi::encode_call;
use concord_core::abi::encode_uint;
use concord_core::abi::word_at;

// ============================================================================
// SECTION: Addresses
// ============================================================================

/// Initial token holder.
pub const ALICE: Address = Address::from_low_u64(0xa11ce);
/// Second holder.
pub const BOB: Address = Address::from_low_u64(0xb0b);
/// Reference ledger implementation.
pub const REFERENCE: Address = Address::from_low_u64(0x1001);
/// Independently written ledger implementation.
pub const ALTERNATE: Address = Address::from_low_u64(0x1002);
/// Ledger that forgets to debit the sender.
pub const LEAKY: Address = Address::from_low_u64(0x1003);
/// Collaborator that records its caller.
pub const RECORDER: Address = Address::from_low_u64(0x2001);
/// Implementation that forwards to [`RECORDER`].
pub const RELAY: Address = Address::from_low_u64(0x2002);
/// Implementation that writes many slots.
pub const SPINNER: Address = Address::from_low_u64(0x2003);

/// Initial supply minted to [`ALICE`].
pub const INITIAL_SUPPLY: u128 = 1_000;

// ============================================================================
// SECTION: Selectors
// ============================================================================

/// `initialize(address,uint256)`
pub fn initialize_selector() -> Selector {
    Selector::from_signature("initialize(address,uint256)")
}

/// `transfer(address,uint256)`
pub fn transfer_selector() -> Selector {
    Selector::from_signature("transfer(address,uint256)")
}

/// `balanceOf(address)`
pub fn balance_of_selector() -> Selector {
    Selector::from_signature("balanceOf(address)")
}

/// `totalSupply()`
pub fn total_supply_selector() -> Selector {
    Selector::from_signature("totalSupply()")
}

/// `record()`
pub fn record_selector() -> Selector {
    Selector::from_signature("record()")
}

/// `relay(address)`
pub fn relay_selector() -> Selector {
    Selector::from_signature("relay(address)")
}

/// `spin(uint256)`
pub fn spin_selector() -> Selector {
    Selector::from_signature("spin(uint256)")
}

// ============================================================================
// SECTION: Encoding Helpers
// ============================================================================

/// Maps ABI decoding failures to reverts.
fn abi<T>(result: Result<T, AbiError>) -> Result<T, CallError> {
    result.map_err(|err| CallError::revert(err.to_string()))
}

/// Splits an inbound call into its selector and argument bytes.
fn split(input: &[u8]) -> Result<(Selector, &[u8]), CallError> {
    let selector =
        Selector::from_call_prefix(input).ok_or_else(|| CallError::revert("missing selector"))?;
    Ok((selector, &input[SELECTOR_LEN ..]))
}

/// Storage slot holding `holder`'s balance.
pub fn balance_slot(holder: Address) -> Vec<u8> {
    let mut slot = b"balance".to_vec();
    slot.extend_from_slice(holder.as_bytes());
    slot
}

/// Storage slot holding the total supply.
pub const SUPPLY_SLOT: &[u8] = b"supply";

/// Encodes `initialize(owner, supply)`.
pub fn initialize_call(owner: Address, supply: u128) -> Vec<u8> {
    encode_call(initialize_selector(), &[AbiValue::Address(owner), AbiValue::Uint(supply)])
        .expect("encode initialize")
}

/// Encodes the arguments of `transfer(to, amount)`.
pub fn transfer_args(to: Address, amount: u128) -> Vec<u8> {
    let mut args = encode_address(to).to_vec();
    args.extend_from_slice(&encode_uint(amount));
    args
}

/// Builds a transfer invocation from `caller`.
pub fn transfer(caller: Address, to: Address, amount: u128) -> Invocation {
    Invocation::new(caller, transfer_selector(), transfer_args(to, amount))
}

/// Reads a committed balance directly from the store.
pub fn committed_balance(store: &InMemoryStateStore, gateway: Address, holder: Address) -> u128 {
    store
        .read(&StateKey::new(gateway, balance_slot(holder)))
        .expect("read balance")
        .map_or(0, |bytes| decode_uint(&bytes).expect("balance word"))
}

// ============================================================================
// SECTION: Token Ledgers
// ============================================================================

/// Handles the selectors every ledger implements identically.
fn ledger_common(
    ctx: &mut CallContext<'_, '_>,
    selector: Selector,
    args: &[u8],
) -> Result<Option<Vec<u8>>, CallError> {
    if selector == initialize_selector() {
        if ctx.read(SUPPLY_SLOT)?.is_some() {
            return Err(CallError::revert("already initialized"));
        }
        let owner = abi(decode_address(abi(word_at(args, 0))?))?;
        let supply = abi(decode_uint(abi(word_at(args, 1))?))?;
        ctx.write_uint(SUPPLY_SLOT, supply)?;
        ctx.write_uint(&balance_slot(owner), supply)?;
        return Ok(Some(Vec::new()));
    }
    if selector == balance_of_selector() {
        let holder = abi(decode_address(abi(word_at(args, 0))?))?;
        return Ok(Some(encode_uint(ctx.read_uint(&balance_slot(holder))?).to_vec()));
    }
    if selector == total_supply_selector() {
        return Ok(Some(encode_uint(ctx.read_uint(SUPPLY_SLOT)?).to_vec()));
    }
    Ok(None)
}

/// Decodes `transfer(to, amount)` arguments.
fn transfer_params(args: &[u8]) -> Result<(Address, u128), CallError> {
    let to = abi(decode_address(abi(word_at(args, 0))?))?;
    let amount = abi(decode_uint(abi(word_at(args, 1))?))?;
    Ok((to, amount))
}

/// Ledger that debits then credits.
pub struct ReferenceToken;

impl Contract for ReferenceToken {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, args) = split(input)?;
        if let Some(output) = ledger_common(ctx, selector, args)? {
            return Ok(output);
        }
        if selector != transfer_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let (to, amount) = transfer_params(args)?;
        let from = ctx.caller();
        let from_balance = ctx.read_uint(&balance_slot(from))?;
        if from_balance < amount {
            return Err(CallError::revert("insufficient balance"));
        }
        ctx.write_uint(&balance_slot(from), from_balance - amount)?;
        let to_balance = ctx.read_uint(&balance_slot(to))?;
        let credited =
            to_balance.checked_add(amount).ok_or_else(|| CallError::revert("balance overflow"))?;
        ctx.write_uint(&balance_slot(to), credited)?;
        Ok(encode_bool(true).to_vec())
    }
}

/// Ledger written independently: reads both balances up front.
pub struct AlternateToken;

impl Contract for AlternateToken {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, args) = split(input)?;
        if let Some(output) = ledger_common(ctx, selector, args)? {
            return Ok(output);
        }
        if selector != transfer_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let (to, amount) = transfer_params(args)?;
        let from = ctx.caller();
        let balances = (ctx.read_uint(&balance_slot(from))?, ctx.read_uint(&balance_slot(to))?);
        let Some(remaining) = balances.0.checked_sub(amount) else {
            return Err(CallError::revert("insufficient balance"));
        };
        if from == to {
            ctx.write_uint(&balance_slot(from), balances.0)?;
            return Ok(encode_bool(true).to_vec());
        }
        let credited =
            balances.1.checked_add(amount).ok_or_else(|| CallError::revert("balance overflow"))?;
        ctx.write_uint(&balance_slot(to), credited)?;
        ctx.write_uint(&balance_slot(from), remaining)?;
        Ok(encode_bool(true).to_vec())
    }
}

/// Ledger that credits the recipient but never debits the sender.
pub struct LeakyToken;

impl Contract for LeakyToken {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, args) = split(input)?;
        if let Some(output) = ledger_common(ctx, selector, args)? {
            return Ok(output);
        }
        if selector != transfer_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let (to, amount) = transfer_params(args)?;
        let from = ctx.caller();
        if ctx.read_uint(&balance_slot(from))? < amount {
            return Err(CallError::revert("insufficient balance"));
        }
        let to_balance = ctx.read_uint(&balance_slot(to))?;
        ctx.write_uint(&balance_slot(to), to_balance.saturating_add(amount))?;
        Ok(encode_bool(true).to_vec())
    }
}

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Storage slot where [`Recorder`] keeps its last caller.
pub const LAST_CALLER_SLOT: &[u8] = b"last_caller";

/// Records its immediate caller in its own scope and returns it.
pub struct Recorder;

impl Contract for Recorder {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, _) = split(input)?;
        if selector != record_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let caller = encode_address(ctx.caller());
        ctx.write(LAST_CALLER_SLOT, caller.to_vec())?;
        Ok(caller.to_vec())
    }
}

/// Forwards `relay(target)` to `target.record()` and returns its answer.
pub struct Relay;

impl Contract for Relay {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, args) = split(input)?;
        if selector != relay_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let target = abi(decode_address(abi(word_at(args, 0))?))?;
        ctx.call(target, record_selector().as_bytes(), 0)
    }
}

/// Writes `n` distinct slots; used to exhaust budgets.
pub struct Spinner;

impl Contract for Spinner {
    fn call(&self, ctx: &mut CallContext<'_, '_>, input: &[u8]) -> Result<Vec<u8>, CallError> {
        let (selector, args) = split(input)?;
        if selector != spin_selector() {
            return Err(CallError::revert("unknown selector"));
        }
        let rounds = abi(decode_uint(abi(word_at(args, 0))?))?;
        for round in 0 .. rounds {
            // Swallow host errors to prove the meter latches exhaustion.
            let _ = ctx.write_uint(&round.to_be_bytes(), round);
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// SECTION: Gateway Builders
// ============================================================================

/// Directory with every fixture contract deployed.
pub fn directory() -> ContractDirectory {
    let mut directory = ContractDirectory::new();
    let contracts: [(Address, Arc<dyn Contract>); 6] = [
        (REFERENCE, Arc::new(ReferenceToken)),
        (ALTERNATE, Arc::new(AlternateToken)),
        (LEAKY, Arc::new(LeakyToken)),
        (RECORDER, Arc::new(Recorder)),
        (RELAY, Arc::new(Relay)),
        (SPINNER, Arc::new(Spinner)),
    ];
    for (address, contract) in contracts {
        directory.deploy(address, contract);
    }
    directory
}

/// Descriptor bytes for `balanceOf(caller)` using the caller environment value.
pub fn balance_of_caller_descriptor() -> Vec<u8> {
    CallDescriptor::new(balance_of_selector(), vec![QueryArgument::env(EnvKind::CallerIdentity)])
        .encode()
        .expect("encode descriptor")
}

/// Descriptor bytes for `balanceOf(to)` sliced from the inbound transfer.
pub fn balance_of_recipient_descriptor() -> Vec<u8> {
    CallDescriptor::new(balance_of_selector(), vec![QueryArgument::call_data(4, 32)])
        .encode()
        .expect("encode descriptor")
}

/// Builds a token gateway over `implementations`, minting [`INITIAL_SUPPLY`]
/// to [`ALICE`] through the primary's init data and registering balance checks
/// for `transfer`.
pub fn token_gateway(implementations: &[Address]) -> (Gateway<InMemoryStateStore>, InMemoryStateStore) {
    let store = InMemoryStateStore::new();
    let mut gateway = Gateway::new(GatewayConfig::default(), store.clone(), directory());
    for (index, implementation) in implementations.iter().enumerate() {
        let init = if index == 0 { initialize_call(ALICE, INITIAL_SUPPLY) } else { Vec::new() };
        gateway.add_implementation(*implementation, &init, ALICE).expect("add implementation");
    }
    let target = gateway.address();
    gateway
        .register_check(transfer_selector(), target, &balance_of_caller_descriptor())
        .expect("register caller check");
    gateway
        .register_check(transfer_selector(), target, &balance_of_recipient_descriptor())
        .expect("register recipient check");
    (gateway, store)
}
