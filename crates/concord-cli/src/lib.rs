// crates/concord-cli/src/lib.rs
// ============================================================================
// Module: Concord CLI Library
// Description: Shared helpers for the Concord command-line interface.
// Purpose: Provide reusable components (message catalog) for the binary.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) routes every user-facing string through [`t!`] so output
//! wording lives in one place.
//!
//! Security posture: CLI inputs are untrusted and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and formatting helpers.
pub mod i18n;
