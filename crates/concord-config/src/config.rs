// crates/concord-config/src/config.rs
// ============================================================================
// Module: Concord Configuration
// Description: Configuration loading, validation, and gateway wiring.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: concord-core, concord-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path resolves from an explicit argument, then `CONCORD_CONFIG`, then
//! `./concord.toml`. Every section has defaults, so an empty file describes
//! an in-memory gateway without auditing. Unknown keys are rejected.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use concord_core::Address;
use concord_core::ContractDirectory;
use concord_core::CostSchedule;
use concord_core::Gateway;
use concord_core::GatewayAuditSink;
use concord_core::GatewayConfig;
use concord_core::HashAlgorithm;
use concord_core::HostEnvironment;
use concord_core::InMemoryStateStore;
use concord_core::RegistryLimits;
use concord_core::SharedStateStore;
use concord_core::runtime::GatewayFileAuditSink;
use concord_core::runtime::GatewayNoopAuditSink;
use concord_core::runtime::GatewayStderrAuditSink;
use concord_core::runtime::gateway::DEFAULT_BUDGET;
use concord_core::runtime::gateway::DEFAULT_GATEWAY_ADDRESS;
use concord_core::runtime::gateway::DEFAULT_MAX_CALL_DEPTH;
use concord_core::runtime::registry::DEFAULT_MAX_CHECKS_PER_SELECTOR;
use concord_core::runtime::registry::DEFAULT_MAX_DESCRIPTOR_BYTES;
use concord_core::runtime::registry::DEFAULT_MAX_IMPLEMENTATIONS;
use concord_store_sqlite::SqliteStateStore;
use concord_store_sqlite::SqliteStoreConfig;
use concord_store_sqlite::SqliteStoreMode;
use concord_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "concord.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CONCORD_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for `gateway.max_call_depth`.
pub const MAX_CALL_DEPTH_LIMIT: u32 = 1024;
/// Upper bound for `limits.max_implementations`.
pub const MAX_IMPLEMENTATIONS_LIMIT: usize = 256;
/// Upper bound for `limits.max_checks_per_selector`.
pub const MAX_CHECKS_PER_SELECTOR_LIMIT: usize = 1024;
/// Upper bound for `limits.max_descriptor_bytes`.
pub const MAX_DESCRIPTOR_BYTES_LIMIT: usize = 64 * 1024;
/// Smallest useful descriptor: selector plus argument count.
const MIN_DESCRIPTOR_BYTES: usize = 5;
/// Default `SQLite` busy timeout (ms).
const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Concord gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConcordConfig {
    /// Gateway identity, hashing and metering.
    #[serde(default)]
    pub gateway: GatewaySection,
    /// Registry size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Static host environment values exposed to checks and contracts.
    #[serde(default)]
    pub environment: HostEnvironment,
    /// Committed state backend.
    #[serde(default)]
    pub store: StoreConfig,
    /// Audit sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Optional config source metadata (not serialized).
    #[serde(skip)]
    pub source_modified_at: Option<SystemTime>,
}

impl ConcordConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_modified_at = fs::metadata(&resolved).and_then(|meta| meta.modified()).ok();
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.limits.validate()?;
        self.store.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the runtime gateway configuration.
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            address: self.gateway.address,
            hash_algorithm: self.gateway.hash_algorithm,
            default_budget: self.gateway.default_budget,
            max_call_depth: self.gateway.max_call_depth,
            costs: self.gateway.costs,
            limits: self.limits.registry_limits(),
        }
    }

    /// Returns the configured host environment.
    #[must_use]
    pub fn host_environment(&self) -> HostEnvironment {
        self.environment.clone()
    }

    /// Opens the configured state store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Store`] when the backend cannot be opened.
    pub fn open_state_store(&self) -> Result<SharedStateStore, ConfigError> {
        match self.store.store_type {
            StoreType::Memory => Ok(SharedStateStore::from_store(InMemoryStateStore::new())),
            StoreType::Sqlite => {
                let config = self.store.sqlite_config()?;
                let store = SqliteStateStore::new(config)
                    .map_err(|err| ConfigError::Store(err.to_string()))?;
                Ok(SharedStateStore::from_store(store))
            }
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_audit_sink(&self) -> Result<Arc<dyn GatewayAuditSink>, ConfigError> {
        match self.audit.sink {
            AuditSinkType::None => Ok(Arc::new(GatewayNoopAuditSink)),
            AuditSinkType::Stderr => Ok(Arc::new(GatewayStderrAuditSink)),
            AuditSinkType::File => {
                let path = self.audit.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("file audit sink requires path".to_string())
                })?;
                let sink = GatewayFileAuditSink::new(path)
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Wires a gateway from this configuration over `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the store or audit sink cannot be opened.
    pub fn build_gateway(
        &self,
        directory: ContractDirectory,
    ) -> Result<Gateway<SharedStateStore>, ConfigError> {
        let store = self.open_state_store()?;
        let audit = self.build_audit_sink()?;
        let mut gateway =
            Gateway::new(self.gateway_config(), store, directory).with_audit_sink(audit);
        gateway.set_environment(self.host_environment());
        Ok(gateway)
    }
}

/// Gateway identity, hashing and metering.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// Address the gateway executes implementations under.
    #[serde(default = "default_gateway_address")]
    pub address: Address,
    /// Hash algorithm for digests and fingerprints.
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Budget granted to invocations that do not carry one.
    #[serde(default = "default_budget")]
    pub default_budget: u64,
    /// Maximum nested call depth.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: u32,
    /// Execution cost schedule.
    #[serde(default)]
    pub costs: CostSchedule,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            address: default_gateway_address(),
            hash_algorithm: HashAlgorithm::default(),
            default_budget: default_budget(),
            max_call_depth: default_max_call_depth(),
            costs: CostSchedule::default(),
        }
    }
}

impl GatewaySection {
    /// Validates gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.address == Address::ZERO {
            return Err(ConfigError::Invalid("gateway.address must be non-zero".to_string()));
        }
        if self.default_budget == 0 {
            return Err(ConfigError::Invalid(
                "gateway.default_budget must be greater than zero".to_string(),
            ));
        }
        if self.max_call_depth == 0 || self.max_call_depth > MAX_CALL_DEPTH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "gateway.max_call_depth must be between 1 and {MAX_CALL_DEPTH_LIMIT}"
            )));
        }
        if self.costs.call == 0 {
            return Err(ConfigError::Invalid(
                "gateway.costs.call must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Registry size limits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum number of implementations.
    #[serde(default = "default_max_implementations")]
    pub max_implementations: usize,
    /// Maximum checks registered for one selector.
    #[serde(default = "default_max_checks_per_selector")]
    pub max_checks_per_selector: usize,
    /// Maximum encoded descriptor size in bytes.
    #[serde(default = "default_max_descriptor_bytes")]
    pub max_descriptor_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_implementations: default_max_implementations(),
            max_checks_per_selector: default_max_checks_per_selector(),
            max_descriptor_bytes: default_max_descriptor_bytes(),
        }
    }
}

impl LimitsConfig {
    /// Returns the runtime registry limits.
    #[must_use]
    pub const fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits {
            max_implementations: self.max_implementations,
            max_checks_per_selector: self.max_checks_per_selector,
            max_descriptor_bytes: self.max_descriptor_bytes,
        }
    }

    /// Validates registry limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_implementations == 0 || self.max_implementations > MAX_IMPLEMENTATIONS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "limits.max_implementations must be between 1 and {MAX_IMPLEMENTATIONS_LIMIT}"
            )));
        }
        if self.max_checks_per_selector > MAX_CHECKS_PER_SELECTOR_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "limits.max_checks_per_selector must be at most {MAX_CHECKS_PER_SELECTOR_LIMIT}"
            )));
        }
        if self.max_descriptor_bytes < MIN_DESCRIPTOR_BYTES
            || self.max_descriptor_bytes > MAX_DESCRIPTOR_BYTES_LIMIT
        {
            return Err(ConfigError::Invalid(format!(
                "limits.max_descriptor_bytes must be between {MIN_DESCRIPTOR_BYTES} and \
                 {MAX_DESCRIPTOR_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// State store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional number of commit log records to retain.
    #[serde(default)]
    pub max_commit_log: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            max_commit_log: None,
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            StoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StoreType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
                validate_path_string("store.path", &path.to_string_lossy())?;
                if self.max_commit_log == Some(0) {
                    return Err(ConfigError::Invalid(
                        "store max_commit_log must be greater than zero".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Returns the `SQLite` store configuration for the sqlite backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no path is configured.
    pub fn sqlite_config(&self) -> Result<SqliteStoreConfig, ConfigError> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| ConfigError::Invalid("sqlite store requires path".to_string()))?;
        Ok(SqliteStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            max_commit_log: self.max_commit_log,
        })
    }
}

/// State store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Use the in-memory store.
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(rename = "type", default)]
    pub sink: AuditSinkType,
    /// JSON-lines output path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkType::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (AuditSinkType::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

/// Audit sink type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkType {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration or opening outputs.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// The configured state store could not be opened.
    #[error("config store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Returns the default gateway address.
const fn default_gateway_address() -> Address {
    DEFAULT_GATEWAY_ADDRESS
}

/// Returns the default invocation budget.
const fn default_budget() -> u64 {
    DEFAULT_BUDGET
}

/// Returns the default maximum call depth.
const fn default_max_call_depth() -> u32 {
    DEFAULT_MAX_CALL_DEPTH
}

/// Returns the default implementation limit.
const fn default_max_implementations() -> usize {
    DEFAULT_MAX_IMPLEMENTATIONS
}

/// Returns the default per-selector check limit.
const fn default_max_checks_per_selector() -> usize {
    DEFAULT_MAX_CHECKS_PER_SELECTOR
}

/// Returns the default descriptor size limit.
const fn default_max_descriptor_bytes() -> usize {
    DEFAULT_MAX_DESCRIPTOR_BYTES
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_store_busy_timeout_ms() -> u64 {
    DEFAULT_STORE_BUSY_TIMEOUT_MS
}
