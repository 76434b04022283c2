// crates/concord-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `concord.toml`. The example is validated by the crate's
//! tests so it never drifts from the model.

/// Returns a canonical example `concord.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[gateway]
address = "0x000000000000000000000000000000000000c0c0"
hash_algorithm = "sha256"
default_budget = 10000000
max_call_depth = 64

[gateway.costs]
call = 700
storage_read = 200
storage_write = 5000
input_byte = 16

[limits]
max_implementations = 16
max_checks_per_selector = 64
max_descriptor_bytes = 4096

[environment]
sequence_id = 1
ordinal_position = 1700000000
coordinator = "0x00000000000000000000000000000000000c0de0"
resource_limit = 30000000
# randomness_seed = 0
# price_unit = 1

[store]
type = "sqlite"
path = "concord.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000
max_commit_log = 10000

[audit]
type = "file"
path = "concord-audit.jsonl"
"#,
    )
}
