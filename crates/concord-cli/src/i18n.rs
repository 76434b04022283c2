// crates/concord-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and placeholder substitution for the CLI.
// Purpose: Centralize user-facing strings.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The Concord CLI keeps user-facing strings in a small static catalog and
//! routes all runtime output through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// Formatted value substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "concord {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("selector.invalid", "Invalid selector {value}: {error}"),
    ("argument.format", "Invalid argument {value}: expected KIND:VALUE"),
    ("argument.unknown_kind", "Unknown argument kind {kind} (expected {expected})"),
    ("argument.invalid_value", "Invalid {kind} value {value}: {error}"),
    ("argument.env_unknown", "Unknown environment kind {value}"),
    ("descriptor.hex_invalid", "Invalid descriptor hex: {error}"),
    ("descriptor.encode_failed", "Failed to encode descriptor: {error}"),
    ("descriptor.decode_failed", "Failed to decode descriptor: {error}"),
    ("descriptor.input_missing", "Provide descriptor hex or --input PATH."),
    ("descriptor.serialize_failed", "Failed to serialize descriptor: {error}"),
    ("store.memory", "The configured store is in-memory; it keeps no commit log."),
    ("store.open_failed", "Failed to open state store: {error}"),
    ("store.log_failed", "Failed to read commit log: {error}"),
    ("store.serialize_failed", "Failed to serialize commit record: {error}"),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Formats `key` from the catalog, substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static catalog.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::translate;

    #[test]
    fn substitutes_named_placeholders() {
        let message = crate::t!("input.read_failed", kind = "descriptor", path = "a.bin", error = 5);
        assert_eq!(message, "Failed to read descriptor at a.bin: 5");
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        assert_eq!(translate("no.such.key", Vec::new()), "no.such.key");
    }
}
