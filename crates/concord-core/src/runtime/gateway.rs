// crates/concord-core/src/runtime/gateway.rs
// ============================================================================
// Module: Concord Gateway
// Description: Diverse-redundancy dispatcher with unanimity commit rule.
// Purpose: Run every implementation, compare digests, commit only on agreement.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! The gateway is the single canonical execution path. For each invocation it
//! runs every registered implementation against its own working copy of the
//! committed state, evaluates the selector's checks against each copy, and
//! compares `(success, digest)` pairs with the primary's (index 0).
//!
//! - Any disagreement discards every working copy and fails with
//!   [`GatewayError::InconsistentImplementations`].
//! - Unanimous success commits the primary's change set in one
//!   [`StateStore::apply`] and returns its return data.
//! - Unanimous revert commits nothing and fails with
//!   [`GatewayError::Reverted`].
//!
//! Each implementation runs under its own meter initialised to the
//! invocation budget, so the sequential protocol is equivalent to running
//! all implementations in parallel over independent snapshots. Budget
//! exhaustion and store faults abort the dispatch before any commit.
//!
//! Security posture: implementations are untrusted and fail closed; there is
//! no majority rule and no retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Address;
use crate::core::ChangeSet;
use crate::core::ConsistencyVerdict;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::DescriptorError;
use crate::core::DiagnosticReport;
use crate::core::Divergence;
use crate::core::ExecutionOutcome;
use crate::core::HashAlgorithm;
use crate::core::HashDigest;
use crate::core::HostEnvironment;
use crate::core::InvocationContext;
use crate::core::QueryBuildError;
use crate::core::Selector;
use crate::core::hashing::hash_bytes;
use crate::interfaces::CallError;
use crate::interfaces::HostError;
use crate::interfaces::StateStore;
use crate::interfaces::StoreError;
use crate::runtime::audit::DispatchAuditEvent;
use crate::runtime::audit::DispatchAuditEventParams;
use crate::runtime::audit::DispatchMode;
use crate::runtime::audit::DispatchOutcome;
use crate::runtime::audit::GatewayAuditSink;
use crate::runtime::audit::GatewayNoopAuditSink;
use crate::runtime::audit::RegistryAction;
use crate::runtime::audit::RegistryAuditEvent;
use crate::runtime::context::CallContext;
use crate::runtime::context::ContractDirectory;
use crate::runtime::context::CostSchedule;
use crate::runtime::context::ExecutionHost;
use crate::runtime::context::Frame;
use crate::runtime::context::Meter;
use crate::runtime::oracle::aggregate_digest;
use crate::runtime::oracle::evaluate_checks;
use crate::runtime::registry::CheckDescriptor;
use crate::runtime::registry::ImplementationRegistry;
use crate::runtime::registry::RegistryError;
use crate::runtime::registry::RegistryLimits;
use crate::runtime::registry::RegistryState;
use crate::runtime::state::PinnedState;
use crate::runtime::state::WorkingState;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default gateway address.
pub const DEFAULT_GATEWAY_ADDRESS: Address = Address::from_low_u64(0xc0c0);
/// Default per-implementation execution budget.
pub const DEFAULT_BUDGET: u64 = 10_000_000;
/// Default maximum nested call depth.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 64;

/// Gateway runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Address the gateway is reachable at; implementations write in its scope.
    pub address: Address,
    /// Hash algorithm for digests and fingerprints.
    pub hash_algorithm: HashAlgorithm,
    /// Budget used when an invocation does not carry one.
    pub default_budget: u64,
    /// Maximum nested call depth.
    pub max_call_depth: u32,
    /// Execution cost schedule.
    pub costs: CostSchedule,
    /// Registry size limits.
    pub limits: RegistryLimits,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_GATEWAY_ADDRESS,
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
            default_budget: DEFAULT_BUDGET,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            costs: CostSchedule::default(),
            limits: RegistryLimits::default(),
        }
    }
}

// ============================================================================
// SECTION: Invocation
// ============================================================================

/// One external call routed through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// External caller.
    pub caller: Address,
    /// Originator of the transaction carrying this call.
    pub originator: Address,
    /// Requested selector.
    pub selector: Selector,
    /// ABI-encoded arguments (without the selector).
    pub args: Vec<u8>,
    /// Attached value.
    pub value: u128,
    /// Per-implementation budget; `None` uses the gateway default.
    pub budget: Option<u64>,
}

impl Invocation {
    /// Creates an invocation with no attached value and the default budget.
    #[must_use]
    pub fn new(caller: Address, selector: Selector, args: impl Into<Vec<u8>>) -> Self {
        Self {
            caller,
            originator: caller,
            selector,
            args: args.into(),
            value: 0,
            budget: None,
        }
    }

    /// Attaches `value`.
    #[must_use]
    pub const fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }

    /// Sets an originator distinct from the immediate caller.
    #[must_use]
    pub const fn with_originator(mut self, originator: Address) -> Self {
        self.originator = originator;
        self
    }

    /// Sets an explicit budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: u64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Returns the inbound call bytes: `selector ‖ args`.
    #[must_use]
    pub fn inbound(&self) -> Vec<u8> {
        let mut inbound = Vec::with_capacity(self.selector.as_bytes().len() + self.args.len());
        inbound.extend_from_slice(self.selector.as_bytes());
        inbound.extend_from_slice(&self.args);
        inbound
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No implementation is registered.
    #[error("no implementations registered")]
    NoImplementations,
    /// The implementation is already registered.
    #[error("implementation {0} is already registered")]
    DuplicateImplementation(Address),
    /// No contract exists at the implementation address.
    #[error("no contract deployed at implementation address {0}")]
    UnknownImplementation(Address),
    /// The implementation list is full.
    #[error("implementation limit reached (max {max})")]
    ImplementationLimit {
        /// Configured maximum.
        max: usize,
    },
    /// Initialization data reverted; the registration was rolled back.
    #[error("initialization of {implementation} reverted")]
    InitializationFailed {
        /// Implementation being registered.
        implementation: Address,
        /// Revert data.
        data: Vec<u8>,
    },
    /// The descriptor bytes are malformed.
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(#[from] DescriptorError),
    /// A check limit was exceeded.
    #[error("check limit exceeded: {0}")]
    CheckLimit(String),
    /// Restored registry state is invalid.
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),
    /// A call-data slice reaches past the inbound call.
    #[error("call data range {offset}+{length} exceeds inbound call of {input_len} bytes")]
    OutOfBoundsCallData {
        /// Requested offset.
        offset: u16,
        /// Requested length.
        length: u16,
        /// Inbound call length.
        input_len: usize,
    },
    /// Implementations disagree with the primary.
    #[error("inconsistent implementations: [{}] disagree with primary", .0.indices_label())]
    InconsistentImplementations(Divergence),
    /// Every implementation reverted.
    #[error("all implementations reverted")]
    Reverted {
        /// Primary revert data.
        data: Vec<u8>,
    },
    /// An execution meter ran out.
    #[error("budget exhausted: limit {limit}, requested {requested} more")]
    BudgetExhausted {
        /// Meter limit.
        limit: u64,
        /// Units requested by the failing charge.
        requested: u64,
    },
    /// The state store failed.
    #[error("state store error: {0}")]
    Store(String),
}

impl GatewayError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoImplementations => "no_implementations",
            Self::DuplicateImplementation(_) => "duplicate_implementation",
            Self::UnknownImplementation(_) => "unknown_implementation",
            Self::ImplementationLimit {
                ..
            } => "implementation_limit",
            Self::InitializationFailed {
                ..
            } => "initialization_failed",
            Self::MalformedDescriptor(_) => "malformed_descriptor",
            Self::CheckLimit(_) => "check_limit",
            Self::InvalidRegistry(_) => "invalid_registry",
            Self::OutOfBoundsCallData {
                ..
            } => "out_of_bounds_call_data",
            Self::InconsistentImplementations(_) => "inconsistent_implementations",
            Self::Reverted {
                ..
            } => "reverted",
            Self::BudgetExhausted {
                ..
            } => "budget_exhausted",
            Self::Store(_) => "store",
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateImplementation(address) => {
                Self::DuplicateImplementation(address)
            }
            RegistryError::ImplementationLimit {
                max,
            } => Self::ImplementationLimit {
                max,
            },
            RegistryError::CheckLimit(message) => Self::CheckLimit(message),
            RegistryError::MalformedDescriptor(err) => Self::MalformedDescriptor(err),
            RegistryError::InvalidState(message) => Self::InvalidRegistry(message),
        }
    }
}

impl From<HostError> for GatewayError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::BudgetExhausted {
                limit,
                requested,
            } => Self::BudgetExhausted {
                limit,
                requested,
            },
            HostError::Store(message) => Self::Store(message),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Outcome and writes of one implementation run.
struct ImplementationRun {
    /// Comparable outcome.
    outcome: ExecutionOutcome,
    /// Writes made by the run.
    changes: ChangeSet,
}

/// Audit fields that depend on how an invocation ended.
struct DispatchSummary {
    /// Outcome label.
    outcome: DispatchOutcome,
    /// Error kind label.
    error_kind: Option<&'static str>,
    /// Disagreeing registry indices.
    disagreeing: Vec<usize>,
    /// Primary aggregate digest.
    primary_digest: Option<HashDigest>,
    /// Number of state entries committed.
    committed_entries: usize,
}

impl DispatchSummary {
    /// Summary for an invocation aborted by `err`.
    fn aborted(err: &GatewayError) -> Self {
        let (outcome, disagreeing) = match err {
            GatewayError::InconsistentImplementations(divergence) => {
                (DispatchOutcome::Inconsistent, divergence.disagreeing.clone())
            }
            GatewayError::Reverted {
                ..
            } => (DispatchOutcome::Reverted, Vec::new()),
            _ => (DispatchOutcome::Aborted, Vec::new()),
        };
        Self {
            outcome,
            error_kind: Some(err.kind()),
            disagreeing,
            primary_digest: None,
            committed_entries: 0,
        }
    }
}

/// Diverse-redundancy execution gateway.
pub struct Gateway<S> {
    /// Runtime configuration.
    config: GatewayConfig,
    /// Committed shared state.
    store: S,
    /// Deployed contracts.
    directory: ContractDirectory,
    /// Implementations and checks.
    registry: ImplementationRegistry,
    /// Block-level ambient values.
    environment: HostEnvironment,
    /// Audit sink.
    audit: Arc<dyn GatewayAuditSink>,
}

impl<S> Gateway<S>
where
    S: StateStore,
{
    /// Creates a gateway with an empty registry and a no-op audit sink.
    #[must_use]
    pub fn new(config: GatewayConfig, store: S, directory: ContractDirectory) -> Self {
        Self {
            config,
            store,
            directory,
            registry: ImplementationRegistry::new(config.limits),
            environment: HostEnvironment::default(),
            audit: Arc::new(GatewayNoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn GatewayAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the block-level ambient values.
    pub fn set_environment(&mut self, environment: HostEnvironment) {
        self.environment = environment;
    }

    /// Returns the block-level ambient values.
    #[must_use]
    pub const fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns the gateway address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.config.address
    }

    /// Returns the committed state store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the contract directory.
    #[must_use]
    pub const fn directory(&self) -> &ContractDirectory {
        &self.directory
    }

    /// Returns the contract directory for deploying collaborators.
    pub const fn directory_mut(&mut self) -> &mut ContractDirectory {
        &mut self.directory
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &ImplementationRegistry {
        &self.registry
    }

    /// Replaces the registry with restored state.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRegistry`] when the state violates a
    /// limit, and [`GatewayError::UnknownImplementation`] when an
    /// implementation has no deployed contract.
    pub fn restore_registry(&mut self, state: RegistryState) -> Result<(), GatewayError> {
        if let Some(missing) =
            state.implementations.iter().find(|address| !self.directory.contains(address))
        {
            return Err(GatewayError::UnknownImplementation(*missing));
        }
        self.registry = ImplementationRegistry::from_state(state, self.config.limits)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Appends `implementation`, running `init_data` once against it first.
    ///
    /// Init data executes in the gateway scope with `caller` as the sender;
    /// its writes are committed only when it succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateImplementation`],
    /// [`GatewayError::ImplementationLimit`],
    /// [`GatewayError::UnknownImplementation`], or
    /// [`GatewayError::InitializationFailed`] when init reverts.
    pub fn add_implementation(
        &mut self,
        implementation: Address,
        init_data: &[u8],
        caller: Address,
    ) -> Result<usize, GatewayError> {
        let result = self.admit_implementation(implementation, init_data, caller);
        self.record_registry(
            RegistryAction::AddImplementation,
            None,
            Some(implementation),
            result.as_ref().err(),
        );
        result
    }

    /// Validates, initializes and appends an implementation.
    fn admit_implementation(
        &mut self,
        implementation: Address,
        init_data: &[u8],
        caller: Address,
    ) -> Result<usize, GatewayError> {
        self.registry.ensure_admissible(&implementation)?;
        let code = self
            .directory
            .get(&implementation)
            .ok_or(GatewayError::UnknownImplementation(implementation))?;
        if !init_data.is_empty() {
            let host = self.execution_host(implementation, caller);
            let pinned = PinnedState::new(&self.store);
            let mut state = WorkingState::new(&pinned);
            let mut meter = Meter::new(self.config.default_budget);
            let frame = Frame {
                caller,
                address: self.config.address,
                scope: self.config.address,
                selector: Selector::from_call_prefix(init_data),
                value: 0,
                read_only: false,
                depth: 0,
            };
            match CallContext::invoke(
                &mut state,
                &mut meter,
                host,
                frame,
                code.as_ref(),
                init_data,
            ) {
                Ok(_) => {}
                Err(CallError::Revert(data)) => {
                    return Err(GatewayError::InitializationFailed {
                        implementation,
                        data,
                    });
                }
                Err(CallError::Host(err)) => return Err(err.into()),
            }
            if let Some(fault) = meter.fault() {
                return Err(fault.clone().into());
            }
            let changes = state.into_changes();
            self.store.apply_if_unchanged(&pinned.into_observed(), &changes)?;
        }
        Ok(self.registry.push_implementation(implementation)?)
    }

    /// Appends a check for `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedDescriptor`] for invalid bytes and
    /// [`GatewayError::CheckLimit`] when a limit would be exceeded.
    pub fn register_check(
        &mut self,
        selector: Selector,
        target: Address,
        descriptor: &[u8],
    ) -> Result<(), GatewayError> {
        let result = self
            .registry
            .register_check(selector, target, descriptor)
            .map_err(GatewayError::from);
        self.record_registry(
            RegistryAction::RegisterCheck,
            Some(selector),
            Some(target),
            result.as_ref().err(),
        );
        result
    }

    /// Removes every check for `selector`, returning how many were removed.
    pub fn clear_checks(&mut self, selector: Selector) -> usize {
        let removed = self.registry.clear_checks(&selector);
        self.record_registry(RegistryAction::ClearChecks, Some(selector), None, None);
        removed
    }

    /// Returns the checks for `selector` in registration order.
    #[must_use]
    pub fn checks(&self, selector: &Selector) -> &[CheckDescriptor] {
        self.registry.checks(selector)
    }

    /// Returns every implementation in registry order.
    #[must_use]
    pub fn implementations(&self) -> &[Address] {
        self.registry.implementations()
    }

    /// Returns the implementation at `index`.
    #[must_use]
    pub fn implementation(&self, index: usize) -> Option<Address> {
        self.registry.implementation(index)
    }

    // ------------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------------

    /// Runs every implementation and commits the primary's writes on unanimity.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InconsistentImplementations`] on disagreement,
    /// [`GatewayError::Reverted`] when every implementation reverted, and
    /// aborts with [`GatewayError::NoImplementations`],
    /// [`GatewayError::OutOfBoundsCallData`],
    /// [`GatewayError::BudgetExhausted`] or [`GatewayError::Store`]. No state
    /// is committed on any error.
    pub fn dispatch(&mut self, invocation: &Invocation) -> Result<Vec<u8>, GatewayError> {
        let inbound = invocation.inbound();
        match self.dispatch_inner(invocation, &inbound) {
            Ok((return_data, summary)) => {
                self.record_dispatch(DispatchMode::Dispatch, invocation, &inbound, summary);
                Ok(return_data)
            }
            Err(err) => {
                let summary = DispatchSummary::aborted(&err);
                self.record_dispatch(DispatchMode::Dispatch, invocation, &inbound, summary);
                Err(err)
            }
        }
    }

    /// Executes, compares and commits one invocation.
    fn dispatch_inner(
        &self,
        invocation: &Invocation,
        inbound: &[u8],
    ) -> Result<(Vec<u8>, DispatchSummary), GatewayError> {
        let pinned = PinnedState::new(&self.store);
        let runs = self.execute_all(invocation, inbound, &pinned)?;
        let outcomes: Vec<ExecutionOutcome> = runs.iter().map(|run| run.outcome.clone()).collect();
        if let Some(divergence) = Divergence::detect(&outcomes) {
            return Err(GatewayError::InconsistentImplementations(divergence));
        }
        let primary = runs.into_iter().next().ok_or(GatewayError::NoImplementations)?;
        if !primary.outcome.success {
            return Err(GatewayError::Reverted {
                data: primary.outcome.return_data,
            });
        }
        self.store.apply_if_unchanged(&pinned.into_observed(), &primary.changes)?;
        let summary = DispatchSummary {
            outcome: DispatchOutcome::Committed,
            error_kind: None,
            disagreeing: Vec::new(),
            primary_digest: Some(primary.outcome.digest),
            committed_entries: primary.changes.len(),
        };
        Ok((primary.outcome.return_data, summary))
    }

    /// Runs the full protocol without committing and reports the primary's
    /// outcome with the consistency verdict.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NoImplementations`],
    /// [`GatewayError::OutOfBoundsCallData`],
    /// [`GatewayError::BudgetExhausted`] or [`GatewayError::Store`].
    pub fn simulate(&self, invocation: &Invocation) -> Result<DiagnosticReport, GatewayError> {
        let inbound = invocation.inbound();
        let result = self.simulate_inner(invocation, &inbound);
        let summary = match &result {
            Ok(report) => DispatchSummary {
                outcome: DispatchOutcome::Simulated,
                error_kind: None,
                disagreeing: match &report.verdict {
                    ConsistencyVerdict::Consistent => Vec::new(),
                    ConsistencyVerdict::Inconsistent {
                        disagreeing,
                    } => disagreeing.clone(),
                },
                primary_digest: Some(report.digest.clone()),
                committed_entries: 0,
            },
            Err(err) => DispatchSummary::aborted(err),
        };
        self.record_dispatch(DispatchMode::Simulate, invocation, &inbound, summary);
        result
    }

    /// Executes and compares one invocation without committing.
    fn simulate_inner(
        &self,
        invocation: &Invocation,
        inbound: &[u8],
    ) -> Result<DiagnosticReport, GatewayError> {
        let pinned = PinnedState::new(&self.store);
        let runs = self.execute_all(invocation, inbound, &pinned)?;
        let outcomes: Vec<ExecutionOutcome> = runs.into_iter().map(|run| run.outcome).collect();
        let verdict = match Divergence::detect(&outcomes) {
            Some(divergence) => ConsistencyVerdict::Inconsistent {
                disagreeing: divergence.disagreeing,
            },
            None => ConsistencyVerdict::Consistent,
        };
        let primary = outcomes.into_iter().next().ok_or(GatewayError::NoImplementations)?;
        Ok(DiagnosticReport {
            success: primary.success,
            return_data: primary.return_data,
            digest: primary.digest,
            verdict,
        })
    }

    /// Runs every implementation and its checks over isolated working copies
    /// of the same pinned pre-state.
    fn execute_all(
        &self,
        invocation: &Invocation,
        inbound: &[u8],
        pinned: &PinnedState<'_>,
    ) -> Result<Vec<ImplementationRun>, GatewayError> {
        if self.registry.is_empty() {
            return Err(GatewayError::NoImplementations);
        }
        let checks = self.registry.checks(&invocation.selector);
        for check in checks {
            if let Err(QueryBuildError::OutOfBoundsCallData {
                offset,
                length,
                input_len,
            }) = check.call().check_bounds(inbound.len())
            {
                return Err(GatewayError::OutOfBoundsCallData {
                    offset,
                    length,
                    input_len,
                });
            }
        }
        let budget = invocation.budget.unwrap_or(self.config.default_budget);

        let mut runs = Vec::with_capacity(self.registry.len());
        for implementation in self.registry.implementations() {
            let code = self
                .directory
                .get(implementation)
                .ok_or(GatewayError::UnknownImplementation(*implementation))?;
            let host = self.execution_host(*implementation, invocation.originator);
            let mut state = WorkingState::new(pinned);
            let mut meter = Meter::new(budget);
            let frame = Frame {
                caller: invocation.caller,
                address: self.config.address,
                scope: self.config.address,
                selector: Some(invocation.selector),
                value: invocation.value,
                read_only: false,
                depth: 0,
            };
            let (success, return_data) =
                match CallContext::invoke(&mut state, &mut meter, host, frame, code.as_ref(), inbound)
                {
                    Ok(data) => (true, data),
                    Err(CallError::Revert(data)) => (false, data),
                    Err(CallError::Host(err)) => return Err(err.into()),
                };
            if let Some(fault) = meter.fault() {
                return Err(fault.clone().into());
            }
            let context = InvocationContext {
                caller: invocation.caller,
                originator: invocation.originator,
                selector: Some(invocation.selector),
                value: invocation.value,
                remaining_budget: meter.remaining(),
            };
            let results = evaluate_checks(checks, inbound, &context, &mut state, &mut meter, host)?;
            if let Some(fault) = meter.fault() {
                return Err(fault.clone().into());
            }
            runs.push(ImplementationRun {
                outcome: ExecutionOutcome {
                    success,
                    return_data,
                    digest: aggregate_digest(self.config.hash_algorithm, &results),
                },
                changes: state.into_changes(),
            });
        }
        Ok(runs)
    }

    /// Builds the execution parameters for a run of `implementation`.
    const fn execution_host(&self, implementation: Address, originator: Address) -> ExecutionHost<'_> {
        ExecutionHost {
            directory: &self.directory,
            costs: &self.config.costs,
            environment: &self.environment,
            originator,
            gateway: self.config.address,
            implementation,
            max_depth: self.config.max_call_depth,
        }
    }

    // ------------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------------

    /// Emits a dispatch audit event.
    fn record_dispatch(
        &self,
        mode: DispatchMode,
        invocation: &Invocation,
        inbound: &[u8],
        summary: DispatchSummary,
    ) {
        let event = DispatchAuditEvent::new(DispatchAuditEventParams {
            mode,
            selector: invocation.selector,
            caller: invocation.caller,
            input_hash: hash_bytes(self.config.hash_algorithm, inbound),
            implementation_count: self.registry.len(),
            check_count: self.registry.checks(&invocation.selector).len(),
            outcome: summary.outcome,
            error_kind: summary.error_kind,
            disagreeing: summary.disagreeing,
            primary_digest: summary.primary_digest,
            committed_entries: summary.committed_entries,
        });
        self.audit.record_dispatch(&event);
    }

    /// Emits a registry audit event.
    fn record_registry(
        &self,
        action: RegistryAction,
        selector: Option<Selector>,
        address: Option<Address>,
        error: Option<&GatewayError>,
    ) {
        let fingerprint = self.registry.fingerprint(self.config.hash_algorithm).ok();
        let event = RegistryAuditEvent::new(
            action,
            selector,
            address,
            error.map(GatewayError::kind),
            fingerprint,
        );
        self.audit.record_registry(&event);
    }
}
