// crates/concord-core/src/runtime/mod.rs
// ============================================================================
// Module: Concord Runtime
// Description: Execution host, registry, consistency oracle, and gateway.
// Purpose: Execute invocations across redundant implementations.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the dispatch protocol. Every entry point, from
//! tests to the CLI, goes through [`Gateway`] so the unanimity rule has one
//! implementation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod context;
pub mod gateway;
pub mod oracle;
pub mod registry;
pub mod state;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::DispatchAuditEvent;
pub use audit::DispatchMode;
pub use audit::DispatchOutcome;
pub use audit::GatewayAuditSink;
pub use audit::GatewayFileAuditSink;
pub use audit::GatewayNoopAuditSink;
pub use audit::GatewayStderrAuditSink;
pub use audit::InMemoryAuditSink;
pub use audit::RegistryAction;
pub use audit::RegistryAuditEvent;
pub use context::CallContext;
pub use context::ContractDirectory;
pub use context::CostSchedule;
pub use context::Meter;
pub use gateway::Gateway;
pub use gateway::GatewayConfig;
pub use gateway::GatewayError;
pub use gateway::Invocation;
pub use oracle::CheckFailure;
pub use oracle::CheckResult;
pub use oracle::aggregate_digest;
pub use registry::CheckDescriptor;
pub use registry::ImplementationRegistry;
pub use registry::RegistryError;
pub use registry::RegistryLimits;
pub use registry::RegistryState;
pub use state::PinnedState;
pub use state::WorkingState;
pub use store::InMemoryStateStore;
pub use store::SharedStateStore;
