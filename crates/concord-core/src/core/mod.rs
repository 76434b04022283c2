// crates/concord-core/src/core/mod.rs
// ============================================================================
// Module: Concord Core Types
// Description: Identifiers, ABI words, descriptors, environment, and state types.
// Purpose: Provide the pure data model shared by the runtime and tooling.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Pure types with no I/O: everything here is deterministic and safe to use
//! from tooling as well as from the gateway runtime.

pub mod abi;
pub mod descriptor;
pub mod environment;
pub mod hashing;
pub mod hex;
pub mod identifiers;
pub mod outcome;
pub mod state;

pub use abi::AbiError;
pub use abi::AbiValue;
pub use abi::WORD_LEN;
pub use abi::Word;
pub use descriptor::CallDescriptor;
pub use descriptor::DescriptorError;
pub use descriptor::QueryArgument;
pub use descriptor::QueryBuildError;
pub use environment::EnvError;
pub use environment::EnvKind;
pub use environment::HostEnvironment;
pub use environment::InvocationContext;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::ADDRESS_LEN;
pub use identifiers::Address;
pub use identifiers::IdentifierError;
pub use identifiers::SELECTOR_LEN;
pub use identifiers::Selector;
pub use outcome::ConsistencyVerdict;
pub use outcome::DiagnosticReport;
pub use outcome::Divergence;
pub use outcome::ExecutionOutcome;
pub use state::ChangeSet;
pub use state::StateKey;
