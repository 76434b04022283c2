// crates/concord-core/src/lib.rs
// ============================================================================
// Module: Concord Core Library
// Description: Public API surface for the Concord execution gateway.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Concord exposes one logical interface backed by several independently
//! authored implementations of the same operation. Every invocation runs all
//! of them against isolated copies of shared state and commits only when an
//! auxiliary digest, computed from configurable read-only checks, agrees
//! bit-for-bit across all of them.
//!
//! The crate is backend-agnostic: contracts implement [`Contract`] and
//! committed state lives behind [`StateStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CallError;
pub use interfaces::Contract;
pub use interfaces::HostError;
pub use interfaces::StateStore;
pub use interfaces::StoreError;
pub use runtime::CallContext;
pub use runtime::CheckDescriptor;
pub use runtime::ContractDirectory;
pub use runtime::CostSchedule;
pub use runtime::Gateway;
pub use runtime::GatewayAuditSink;
pub use runtime::GatewayConfig;
pub use runtime::GatewayError;
pub use runtime::ImplementationRegistry;
pub use runtime::InMemoryAuditSink;
pub use runtime::InMemoryStateStore;
pub use runtime::Invocation;
pub use runtime::RegistryError;
pub use runtime::RegistryLimits;
pub use runtime::RegistryState;
pub use runtime::SharedStateStore;
