// crates/concord-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Default Tests
// Description: Validate defaults and the canonical example.
// Purpose: Ensure an empty file yields the runtime defaults.
// =============================================================================

//! Default and example config tests for concord-config.

use concord_config::AuditSinkType;
use concord_config::ConcordConfig;
use concord_config::StoreType;
use concord_config::config_toml_example;
use concord_core::GatewayConfig;
use concord_core::HashAlgorithm;
use concord_core::HostEnvironment;

mod common;

type TestResult = Result<(), String>;

#[test]
fn empty_config_matches_runtime_defaults() -> TestResult {
    let config = ConcordConfig::from_toml_str("").map_err(|err| err.to_string())?;
    if config.gateway_config() != GatewayConfig::default() {
        return Err("empty config diverges from GatewayConfig::default".to_string());
    }
    if config.host_environment() != HostEnvironment::default() {
        return Err("empty config should not provide environment values".to_string());
    }
    if config.store.store_type != StoreType::Memory || config.audit.sink != AuditSinkType::None {
        return Err("empty config should use memory store and no audit".to_string());
    }
    Ok(())
}

#[test]
fn example_config_parses_and_validates() -> TestResult {
    let config =
        ConcordConfig::from_toml_str(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.store.store_type != StoreType::Sqlite {
        return Err("example should use the sqlite store".to_string());
    }
    if config.environment.sequence_id != Some(1) {
        return Err("example environment not applied".to_string());
    }
    if config.gateway_config().limits.max_descriptor_bytes != 4096 {
        return Err("example limits not applied".to_string());
    }
    Ok(())
}

#[test]
fn omitted_hash_algorithm_defaults_to_sha256() -> TestResult {
    let config = ConcordConfig::from_toml_str("[gateway]\ndefault_budget = 9\n")
        .map_err(|err| err.to_string())?;
    if config.gateway_config().hash_algorithm != HashAlgorithm::Sha256 {
        return Err("omitted hash_algorithm should default to sha256".to_string());
    }
    if HashAlgorithm::default() != HashAlgorithm::Sha256 {
        return Err("HashAlgorithm::default should be sha256".to_string());
    }
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    for toml_str in [
        "[gateway]\nbogus = 1\n",
        "[unknown]\n",
        "[environment]\nclock = 3\n",
        "[environment]\noriginator = \"0x0000000000000000000000000000000000000001\"\n",
    ] {
        match ConcordConfig::from_toml_str(toml_str) {
            Err(concord_config::ConfigError::Parse(_)) => {}
            Err(error) => return Err(format!("unexpected error for {toml_str}: {error}")),
            Ok(_) => return Err(format!("expected parse error for {toml_str}")),
        }
    }
    Ok(())
}

#[test]
fn partial_sections_keep_field_defaults() -> TestResult {
    let config = common::config_from_toml(
        "[gateway]\ndefault_budget = 5\n[limits]\nmax_implementations = 3\n",
    )
    .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    let gateway = config.gateway_config();
    if gateway.default_budget != 5 || gateway.limits.max_implementations != 3 {
        return Err("explicit values not applied".to_string());
    }
    if gateway.max_call_depth != GatewayConfig::default().max_call_depth {
        return Err("omitted field lost its default".to_string());
    }
    Ok(())
}
