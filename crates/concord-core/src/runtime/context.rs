// crates/concord-core/src/runtime/context.rs
// ============================================================================
// Module: Concord Execution Context
// Description: Call frames, metering, and nested call routing.
// Purpose: Give contracts metered, scoped access to working state and peers.
// Dependencies: crate::{core, interfaces}, serde
// ============================================================================

//! ## Overview
//! Every contract call runs inside a [`CallContext`] frame. A frame carries
//! its caller, the storage scope its reads and writes touch, the attached
//! value, a read-only flag and its nesting depth. Nested calls are journaled:
//! a checkpoint is taken at frame entry and a revert rolls back exactly that
//! frame's writes.
//!
//! Calls addressed to the gateway are served by the implementation under
//! test in the gateway's scope, mirroring delegated execution. Any other
//! address is looked up in the [`ContractDirectory`] and runs in its own scope.
//!
//! Security posture: contracts are untrusted; the [`Meter`] latches the first
//! host fault so a contract that swallows a nested error cannot hide budget
//! exhaustion or a store failure from the dispatcher.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Address;
use crate::core::EnvError;
use crate::core::EnvKind;
use crate::core::HostEnvironment;
use crate::core::InvocationContext;
use crate::core::Selector;
use crate::core::StateKey;
use crate::core::Word;
use crate::core::abi::decode_uint;
use crate::core::abi::encode_uint;
use crate::core::environment;
use crate::interfaces::CallError;
use crate::interfaces::Contract;
use crate::interfaces::HostError;
use crate::runtime::state::WorkingState;

// ============================================================================
// SECTION: Contract Directory
// ============================================================================

/// Addresses with deployed callable code.
#[derive(Clone, Default)]
pub struct ContractDirectory {
    /// Deployed contracts keyed by address.
    contracts: BTreeMap<Address, Arc<dyn Contract>>,
}

impl ContractDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `contract` at `address`, returning any contract it replaced.
    pub fn deploy(
        &mut self,
        address: Address,
        contract: Arc<dyn Contract>,
    ) -> Option<Arc<dyn Contract>> {
        self.contracts.insert(address, contract)
    }

    /// Returns the contract deployed at `address`.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<Arc<dyn Contract>> {
        self.contracts.get(address).cloned()
    }

    /// Returns true when code exists at `address`.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Returns the number of deployed contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns true when nothing is deployed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl fmt::Debug for ContractDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.contracts.keys()).finish()
    }
}

// ============================================================================
// SECTION: Metering
// ============================================================================

/// Per-operation execution costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostSchedule {
    /// Cost of entering any call frame.
    pub call: u64,
    /// Cost of one storage read.
    pub storage_read: u64,
    /// Cost of one storage write or deletion.
    pub storage_write: u64,
    /// Cost per byte of call input.
    pub input_byte: u64,
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            call: 700,
            storage_read: 200,
            storage_write: 5_000,
            input_byte: 16,
        }
    }
}

/// Execution meter for one implementation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meter {
    /// Budget limit.
    limit: u64,
    /// Units consumed so far.
    used: u64,
    /// First host fault observed, latched for the dispatcher.
    fault: Option<HostError>,
}

impl Meter {
    /// Creates a meter with `limit` units.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            fault: None,
        }
    }

    /// Charges `units`; exhaustion is latched and reported.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::BudgetExhausted`] when the charge exceeds the limit
    /// or a fault was already latched.
    pub fn charge(&mut self, units: u64) -> Result<(), HostError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        match self.used.checked_add(units) {
            Some(total) if total <= self.limit => {
                self.used = total;
                Ok(())
            }
            _ => {
                let err = HostError::BudgetExhausted {
                    limit: self.limit,
                    requested: units,
                };
                self.used = self.limit;
                self.fault = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Latches `fault` unless an earlier fault is already recorded.
    pub fn record_fault(&mut self, fault: HostError) -> HostError {
        self.fault.get_or_insert(fault).clone()
    }

    /// Returns the units still available.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Returns the units consumed.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Returns the latched fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&HostError> {
        self.fault.as_ref()
    }
}

// ============================================================================
// SECTION: Execution Host
// ============================================================================

/// Immutable per-run execution parameters shared by every frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExecutionHost<'h> {
    /// Deployed contracts.
    pub(crate) directory: &'h ContractDirectory,
    /// Cost schedule.
    pub(crate) costs: &'h CostSchedule,
    /// Block-level ambient values.
    pub(crate) environment: &'h HostEnvironment,
    /// External caller that started the run.
    pub(crate) originator: Address,
    /// Gateway address.
    pub(crate) gateway: Address,
    /// Implementation serving calls addressed to the gateway.
    pub(crate) implementation: Address,
    /// Maximum nesting depth.
    pub(crate) max_depth: u32,
}

impl ExecutionHost<'_> {
    /// Resolves the code and storage scope serving calls to `target`.
    pub(crate) fn route(&self, target: Address) -> Option<(Arc<dyn Contract>, Address)> {
        if target == self.gateway {
            return self.directory.get(&self.implementation).map(|code| (code, self.gateway));
        }
        self.directory.get(&target).map(|code| (code, target))
    }
}

// ============================================================================
// SECTION: Frames
// ============================================================================

/// Metadata of one call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Immediate caller.
    pub(crate) caller: Address,
    /// Address the frame was invoked at.
    pub(crate) address: Address,
    /// Storage scope for reads and writes.
    pub(crate) scope: Address,
    /// Selector carried by the frame input.
    pub(crate) selector: Option<Selector>,
    /// Attached value.
    pub(crate) value: u128,
    /// Whether writes are forbidden.
    pub(crate) read_only: bool,
    /// Nesting depth; root frames are depth zero.
    pub(crate) depth: u32,
}

/// Execution context handed to a contract for one call frame.
pub struct CallContext<'c, 's> {
    /// Working copy shared by every frame of the run.
    state: &'c mut WorkingState<'s>,
    /// Meter shared by every frame of the run.
    meter: &'c mut Meter,
    /// Run parameters.
    host: ExecutionHost<'c>,
    /// This frame's metadata.
    frame: Frame,
}

impl<'s> CallContext<'_, 's> {
    /// Runs `code` in a fresh frame, rolling back its writes on revert.
    pub(crate) fn invoke(
        state: &mut WorkingState<'s>,
        meter: &mut Meter,
        host: ExecutionHost<'_>,
        frame: Frame,
        code: &dyn Contract,
        input: &[u8],
    ) -> Result<Vec<u8>, CallError> {
        let input_len = u64::try_from(input.len()).unwrap_or(u64::MAX);
        meter.charge(host.costs.call.saturating_add(host.costs.input_byte.saturating_mul(input_len)))?;
        let checkpoint = state.checkpoint();
        let mut ctx = CallContext {
            state,
            meter,
            host,
            frame,
        };
        let result = code.call(&mut ctx, input);
        if matches!(result, Err(CallError::Revert(_))) {
            ctx.state.rollback(checkpoint);
        }
        result
    }

    /// Returns the immediate caller.
    #[must_use]
    pub const fn caller(&self) -> Address {
        self.frame.caller
    }

    /// Returns the address this frame was invoked at.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.frame.address
    }

    /// Returns the value attached to this frame.
    #[must_use]
    pub const fn value(&self) -> u128 {
        self.frame.value
    }

    /// Returns true when writes are forbidden.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.frame.read_only
    }

    /// Returns the nesting depth.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.frame.depth
    }

    /// Returns the budget still available.
    #[must_use]
    pub const fn remaining_budget(&self) -> u64 {
        self.meter.remaining()
    }

    /// Resolves an ambient value for this frame.
    ///
    /// # Errors
    ///
    /// Returns [`EnvError::UnsupportedEnvKind`] when the host does not provide it.
    pub fn env(&self, kind: EnvKind) -> Result<Word, EnvError> {
        let invocation = InvocationContext {
            caller: self.frame.caller,
            originator: self.host.originator,
            selector: self.frame.selector,
            value: self.frame.value,
            remaining_budget: self.meter.remaining(),
        };
        environment::resolve(kind, self.host.environment, &invocation)
    }

    // ------------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------------

    /// Reads `slot` in this frame's scope.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Host`] on budget exhaustion or store failure.
    pub fn read(&mut self, slot: &[u8]) -> Result<Option<Vec<u8>>, CallError> {
        self.meter.charge(self.host.costs.storage_read)?;
        let key = StateKey::new(self.frame.scope, slot);
        match self.state.read(&key) {
            Ok(value) => Ok(value),
            Err(err) => Err(self.meter.record_fault(HostError::Store(err.to_string())).into()),
        }
    }

    /// Writes `value` to `slot` in this frame's scope.
    ///
    /// # Errors
    ///
    /// Reverts in read-only frames; returns [`CallError::Host`] on budget
    /// exhaustion.
    pub fn write(&mut self, slot: &[u8], value: impl Into<Vec<u8>>) -> Result<(), CallError> {
        self.store(slot, Some(value.into()))
    }

    /// Deletes `slot` in this frame's scope.
    ///
    /// # Errors
    ///
    /// Reverts in read-only frames; returns [`CallError::Host`] on budget
    /// exhaustion.
    pub fn remove(&mut self, slot: &[u8]) -> Result<(), CallError> {
        self.store(slot, None)
    }

    /// Reads `slot` as an unsigned ABI word; absent slots read as zero.
    ///
    /// # Errors
    ///
    /// Reverts when the stored bytes are not a valid word.
    pub fn read_uint(&mut self, slot: &[u8]) -> Result<u128, CallError> {
        match self.read(slot)? {
            Some(bytes) => decode_uint(&bytes).map_err(|err| CallError::revert(err.to_string())),
            None => Ok(0),
        }
    }

    /// Writes `value` to `slot` as an ABI word.
    ///
    /// # Errors
    ///
    /// Reverts in read-only frames; returns [`CallError::Host`] on budget
    /// exhaustion.
    pub fn write_uint(&mut self, slot: &[u8], value: u128) -> Result<(), CallError> {
        self.write(slot, encode_uint(value))
    }

    /// Records a write or deletion after metering and read-only checks.
    fn store(&mut self, slot: &[u8], value: Option<Vec<u8>>) -> Result<(), CallError> {
        if self.frame.read_only {
            return Err(CallError::revert("state write in read-only frame"));
        }
        self.meter.charge(self.host.costs.storage_write)?;
        self.state.write(StateKey::new(self.frame.scope, slot), value);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Nested Calls
    // ------------------------------------------------------------------------

    /// Calls `target` with `input`, attaching `value`. The callee sees this
    /// frame's address as its caller.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Revert`] when the callee reverts, is missing, or
    /// the depth limit is reached; [`CallError::Host`] on host faults.
    pub fn call(&mut self, target: Address, input: &[u8], value: u128) -> Result<Vec<u8>, CallError> {
        if self.frame.read_only && value != 0 {
            return Err(CallError::revert("value transfer in read-only frame"));
        }
        self.nested(target, input, value, self.frame.read_only)
    }

    /// Calls `target` read-only; any write in the callee reverts.
    ///
    /// # Errors
    ///
    /// Same as [`CallContext::call`].
    pub fn static_call(&mut self, target: Address, input: &[u8]) -> Result<Vec<u8>, CallError> {
        self.nested(target, input, 0, true)
    }

    /// Routes and runs a nested frame.
    fn nested(
        &mut self,
        target: Address,
        input: &[u8],
        value: u128,
        read_only: bool,
    ) -> Result<Vec<u8>, CallError> {
        let depth = self.frame.depth.saturating_add(1);
        if depth > self.host.max_depth {
            return Err(CallError::revert("call depth limit exceeded"));
        }
        let Some((code, scope)) = self.host.route(target) else {
            return Err(CallError::revert("no contract at target address"));
        };
        let frame = Frame {
            caller: self.frame.address,
            address: target,
            scope,
            selector: Selector::from_call_prefix(input),
            value,
            read_only,
            depth,
        };
        CallContext::invoke(self.state, self.meter, self.host, frame, code.as_ref(), input)
    }
}
