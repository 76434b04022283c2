// crates/concord-config/src/lib.rs
// ============================================================================
// Module: Concord Config Library
// Description: Canonical config model, validation, and gateway wiring.
// Purpose: Single source of truth for concord.toml semantics.
// Dependencies: concord-core, concord-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `concord-config` defines the configuration model for a Concord gateway:
//! gateway identity and metering, registry limits, static host environment
//! values, the state store backend, and the audit sink. Validation is strict
//! and fail-closed.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
