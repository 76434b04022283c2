// crates/concord-core/src/runtime/audit.rs
// ============================================================================
// Module: Concord Audit Logging
// Description: Structured audit events for dispatch and registry changes.
// Purpose: Emit hash-only JSON-lines audit records without hard dependencies.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every dispatch, simulation and registry mutation produces one audit event.
//! Raw call data never leaves the gateway: events carry only its hash, the
//! counts involved and the outcome. Sinks are deliberately small so
//! deployments can route events to their preferred pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Address;
use crate::core::HashDigest;
use crate::core::Selector;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Whether an invocation was dispatched or simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Committing dispatch.
    Dispatch,
    /// Non-committing dry run.
    Simulate,
}

/// Outcome label for a dispatch audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// All implementations agreed and the primary's writes were committed.
    Committed,
    /// All implementations agreed on a revert; nothing committed.
    Reverted,
    /// Implementations disagreed; nothing committed.
    Inconsistent,
    /// A dry run completed; nothing committed.
    Simulated,
    /// The invocation was aborted by an error before comparison.
    Aborted,
}

/// Registry mutation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryAction {
    /// Implementation registration.
    AddImplementation,
    /// Check registration.
    RegisterCheck,
    /// Whole-selector check removal.
    ClearChecks,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Dispatch audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Dispatch or simulate.
    pub mode: DispatchMode,
    /// Requested selector.
    pub selector: Selector,
    /// Invocation caller.
    pub caller: Address,
    /// Hash of the inbound call bytes.
    pub input_hash: HashDigest,
    /// Number of registered implementations.
    pub implementation_count: usize,
    /// Number of checks evaluated per implementation.
    pub check_count: usize,
    /// Outcome label.
    pub outcome: DispatchOutcome,
    /// Error kind label when the outcome is not a success.
    pub error_kind: Option<&'static str>,
    /// Registry indices disagreeing with the primary.
    pub disagreeing: Vec<usize>,
    /// Primary aggregate digest when one was computed.
    pub primary_digest: Option<HashDigest>,
    /// Number of state entries committed.
    pub committed_entries: usize,
}

/// Inputs required to construct a dispatch audit event.
pub struct DispatchAuditEventParams {
    /// Dispatch or simulate.
    pub mode: DispatchMode,
    /// Requested selector.
    pub selector: Selector,
    /// Invocation caller.
    pub caller: Address,
    /// Hash of the inbound call bytes.
    pub input_hash: HashDigest,
    /// Number of registered implementations.
    pub implementation_count: usize,
    /// Number of checks evaluated per implementation.
    pub check_count: usize,
    /// Outcome label.
    pub outcome: DispatchOutcome,
    /// Error kind label.
    pub error_kind: Option<&'static str>,
    /// Disagreeing registry indices.
    pub disagreeing: Vec<usize>,
    /// Primary aggregate digest.
    pub primary_digest: Option<HashDigest>,
    /// Number of state entries committed.
    pub committed_entries: usize,
}

impl DispatchAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: DispatchAuditEventParams) -> Self {
        Self {
            event: "gateway_dispatch",
            timestamp_ms: now_ms(),
            mode: params.mode,
            selector: params.selector,
            caller: params.caller,
            input_hash: params.input_hash,
            implementation_count: params.implementation_count,
            check_count: params.check_count,
            outcome: params.outcome,
            error_kind: params.error_kind,
            disagreeing: params.disagreeing,
            primary_digest: params.primary_digest,
            committed_entries: params.committed_entries,
        }
    }
}

/// Registry audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Registry action.
    pub action: RegistryAction,
    /// Selector for check actions.
    pub selector: Option<Selector>,
    /// Implementation or check target address.
    pub address: Option<Address>,
    /// Whether the mutation was applied.
    pub accepted: bool,
    /// Error kind label when rejected.
    pub error_kind: Option<&'static str>,
    /// Registry fingerprint after the action.
    pub fingerprint: Option<HashDigest>,
}

impl RegistryAuditEvent {
    /// Creates a new registry audit event with a consistent timestamp.
    #[must_use]
    pub fn new(
        action: RegistryAction,
        selector: Option<Selector>,
        address: Option<Address>,
        error_kind: Option<&'static str>,
        fingerprint: Option<HashDigest>,
    ) -> Self {
        Self {
            event: "gateway_registry",
            timestamp_ms: now_ms(),
            action,
            selector,
            address,
            accepted: error_kind.is_none(),
            error_kind,
            fingerprint,
        }
    }
}

/// Returns the current time in milliseconds since the epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gateway events.
pub trait GatewayAuditSink: Send + Sync {
    /// Record a dispatch audit event.
    fn record_dispatch(&self, event: &DispatchAuditEvent);

    /// Record a registry audit event.
    fn record_registry(&self, _event: &RegistryAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct GatewayStderrAuditSink;

impl GatewayAuditSink for GatewayStderrAuditSink {
    fn record_dispatch(&self, event: &DispatchAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct GatewayFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl GatewayFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes `event` and appends it as one line.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl GatewayAuditSink for GatewayFileAuditSink {
    fn record_dispatch(&self, event: &DispatchAuditEvent) {
        self.append(event);
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        self.append(event);
    }
}

/// Audit sink that retains events in memory for inspection.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    /// Recorded dispatch events.
    dispatches: Mutex<Vec<DispatchAuditEvent>>,
    /// Recorded registry events.
    registry: Mutex<Vec<RegistryAuditEvent>>,
}

impl InMemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded dispatch events.
    #[must_use]
    pub fn dispatches(&self) -> Vec<DispatchAuditEvent> {
        self.dispatches.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns a copy of the recorded registry events.
    #[must_use]
    pub fn registry_events(&self) -> Vec<RegistryAuditEvent> {
        self.registry.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl GatewayAuditSink for InMemoryAuditSink {
    fn record_dispatch(&self, event: &DispatchAuditEvent) {
        if let Ok(mut events) = self.dispatches.lock() {
            events.push(event.clone());
        }
    }

    fn record_registry(&self, event: &RegistryAuditEvent) {
        if let Ok(mut events) = self.registry.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op audit sink.
pub struct GatewayNoopAuditSink;

impl GatewayAuditSink for GatewayNoopAuditSink {
    fn record_dispatch(&self, _event: &DispatchAuditEvent) {}

    fn record_registry(&self, _event: &RegistryAuditEvent) {}
}
