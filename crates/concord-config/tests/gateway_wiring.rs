// crates/concord-config/tests/gateway_wiring.rs
// =============================================================================
// Module: Gateway Wiring Tests
// Description: Build a gateway from configuration and dispatch through it.
// Purpose: Ensure store, audit sink, and environment settings take effect.
// =============================================================================

//! Gateway wiring tests for concord-config.

use std::sync::Arc;

use concord_config::ConcordConfig;
use concord_core::Address;
use concord_core::CallContext;
use concord_core::CallError;
use concord_core::Contract;
use concord_core::ContractDirectory;
use concord_core::EnvKind;
use concord_core::Invocation;
use concord_core::Selector;
use concord_core::StateKey;
use concord_core::StateStore;

type TestResult = Result<(), String>;

/// Stores the configured sequence id under its own slot.
struct SequenceRecorder;

/// Slot written by [`SequenceRecorder`].
const SEQUENCE_SLOT: &[u8] = b"sequence";

impl Contract for SequenceRecorder {
    fn call(&self, ctx: &mut CallContext<'_, '_>, _input: &[u8]) -> Result<Vec<u8>, CallError> {
        let word = ctx.env(EnvKind::SequenceId).map_err(|err| CallError::revert(err.to_string()))?;
        ctx.write(SEQUENCE_SLOT, word.to_vec())?;
        Ok(word.to_vec())
    }
}

#[test]
fn configured_gateway_commits_to_sqlite_and_audits_to_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let db = dir.path().join("state.db");
    let audit = dir.path().join("audit.jsonl");
    let toml_str = format!(
        "[environment]\nsequence_id = 42\n\n[store]\ntype = \"sqlite\"\npath = \
         \"{}\"\n\n[audit]\ntype = \"file\"\npath = \"{}\"\n",
        db.display(),
        audit.display()
    );
    let config = ConcordConfig::from_toml_str(&toml_str).map_err(|err| err.to_string())?;
    let implementation = Address::from_low_u64(0x1001);
    let caller = Address::from_low_u64(0xa11ce);
    let mut directory = ContractDirectory::new();
    directory.deploy(implementation, Arc::new(SequenceRecorder));
    let mut gateway = config.build_gateway(directory).map_err(|err| err.to_string())?;
    gateway.add_implementation(implementation, &[], caller).map_err(|err| err.to_string())?;
    let output = gateway
        .dispatch(&Invocation::new(caller, Selector::from_signature("record()"), Vec::new()))
        .map_err(|err| err.to_string())?;
    if output.last() != Some(&42) {
        return Err("environment value not exposed to the implementation".to_string());
    }
    drop(gateway);

    let store = config.open_state_store().map_err(|err| err.to_string())?;
    let stored = store
        .read(&StateKey::new(config.gateway.address, SEQUENCE_SLOT.to_vec()))
        .map_err(|err| err.to_string())?;
    if stored != Some(output) {
        return Err("dispatch did not persist to the sqlite store".to_string());
    }
    let lines = std::fs::read_to_string(&audit).map_err(|err| err.to_string())?;
    if !lines.lines().any(|line| line.contains("\"gateway_dispatch\"")) {
        return Err("dispatch audit record missing".to_string());
    }
    if !lines.lines().any(|line| line.contains("\"gateway_registry\"")) {
        return Err("registry audit record missing".to_string());
    }
    Ok(())
}
