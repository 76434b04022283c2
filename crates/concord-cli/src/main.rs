// crates/concord-cli/src/main.rs
// ============================================================================
// Module: Concord CLI Entry Point
// Description: Command dispatcher for Concord deployment tooling.
// Purpose: Offline helpers for selectors, check descriptors, config, and store.
// Dependencies: clap, concord-config, concord-core, concord-store-sqlite, serde_json
// ============================================================================

//! ## Overview
//! The Concord CLI provides reference tooling for deployment scripts: it
//! derives selectors, encodes and decodes check descriptors in the canonical
//! wire format, validates `concord.toml`, and prints the durable store's
//! commit log. All user-facing strings are routed through the message
//! catalog. Security posture: inputs are untrusted and size-limited.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use concord_cli::t;
use concord_config::ConcordConfig;
use concord_config::MAX_DESCRIPTOR_BYTES_LIMIT;
use concord_config::StoreType;
use concord_core::AbiValue;
use concord_core::Address;
use concord_core::CallDescriptor;
use concord_core::EnvKind;
use concord_core::QueryArgument;
use concord_core::Selector;
use concord_core::hex;
use concord_store_sqlite::SqliteStateStore;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a hex-encoded descriptor input file.
const MAX_DESCRIPTOR_INPUT_BYTES: usize = MAX_DESCRIPTOR_BYTES_LIMIT * 2 + 16;

/// Argument kinds accepted by `descriptor encode --arg`.
const ARGUMENT_KINDS: &str = "static, uint, bool, address, calldata, env";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "concord", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive a selector from a function signature.
    Selector(SelectorCommand),
    /// Check descriptor encoding utilities.
    Descriptor {
        /// Selected descriptor subcommand.
        #[command(subcommand)]
        command: DescriptorCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Durable store utilities.
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Arguments for selector derivation.
#[derive(Args, Debug)]
struct SelectorCommand {
    /// Canonical signature, e.g. `transfer(address,uint256)`.
    signature: String,
}

/// Descriptor subcommands.
#[derive(Subcommand, Debug)]
enum DescriptorCommand {
    /// Encode a descriptor to `0x`-prefixed hex.
    Encode(DescriptorEncodeCommand),
    /// Decode a descriptor and print it as JSON.
    Decode(DescriptorDecodeCommand),
}

/// Arguments for descriptor encoding.
#[derive(Args, Debug)]
struct DescriptorEncodeCommand {
    /// Target selector as `0x`-hex or a signature.
    #[arg(long, value_name = "SELECTOR", value_parser = parse_selector)]
    selector: Selector,
    /// Query argument as `KIND:VALUE`, repeatable and ordered.
    #[arg(long = "arg", value_name = "KIND:VALUE", value_parser = parse_query_argument)]
    arguments: Vec<QueryArgument>,
}

/// Arguments for descriptor decoding.
#[derive(Args, Debug)]
struct DescriptorDecodeCommand {
    /// Descriptor bytes as hex.
    #[arg(value_name = "HEX", conflicts_with = "input")]
    hex: Option<String>,
    /// File holding the descriptor as hex text.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
    /// Print the canonical example config.
    Example,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to concord.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Print the commit log as JSON lines, oldest first.
    Log(StoreLogCommand),
}

/// Arguments for commit log inspection.
#[derive(Args, Debug)]
struct StoreLogCommand {
    /// Optional config file path (defaults to concord.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print only the most recent N records.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Selector(command) => command_selector(&command),
        Commands::Descriptor {
            command,
        } => command_descriptor(command),
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Store {
            command,
        } => command_store(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Selector Command
// ============================================================================

/// Executes the selector derivation command.
fn command_selector(command: &SelectorCommand) -> CliResult<ExitCode> {
    let selector = Selector::from_signature(&command.signature);
    write_stdout_line(&selector.to_string())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Descriptor Commands
// ============================================================================

/// Dispatches descriptor subcommands.
fn command_descriptor(command: DescriptorCommand) -> CliResult<ExitCode> {
    match command {
        DescriptorCommand::Encode(command) => command_descriptor_encode(command),
        DescriptorCommand::Decode(command) => command_descriptor_decode(&command),
    }
}

/// Executes the descriptor encode command.
fn command_descriptor_encode(command: DescriptorEncodeCommand) -> CliResult<ExitCode> {
    let descriptor = CallDescriptor::new(command.selector, command.arguments);
    let bytes = descriptor
        .encode()
        .map_err(|err| CliError::new(t!("descriptor.encode_failed", error = err)))?;
    write_stdout_line(&hex::encode_prefixed(&bytes))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the descriptor decode command.
fn command_descriptor_decode(command: &DescriptorDecodeCommand) -> CliResult<ExitCode> {
    let text = match (&command.hex, &command.input) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_text_with_limit(path, "descriptor", MAX_DESCRIPTOR_INPUT_BYTES)?,
        (None, None) => return Err(CliError::new(t!("descriptor.input_missing"))),
    };
    let bytes = hex::decode(text.trim())
        .map_err(|err| CliError::new(t!("descriptor.hex_invalid", error = err)))?;
    let descriptor = CallDescriptor::decode(&bytes)
        .map_err(|err| CliError::new(t!("descriptor.decode_failed", error = err)))?;
    let json = serde_json::to_string_pretty(&descriptor)
        .map_err(|err| CliError::new(t!("descriptor.serialize_failed", error = err)))?;
    write_stdout_line(&json).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => command_config_example(),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = ConcordConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the canonical example config.
fn command_config_example() -> CliResult<ExitCode> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(concord_config::config_toml_example().as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Dispatches store subcommands.
fn command_store(command: StoreCommand) -> CliResult<ExitCode> {
    match command {
        StoreCommand::Log(command) => command_store_log(&command),
    }
}

/// Prints the durable store's commit log.
fn command_store_log(command: &StoreLogCommand) -> CliResult<ExitCode> {
    let config = ConcordConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if config.store.store_type == StoreType::Memory {
        return Err(CliError::new(t!("store.memory")));
    }
    let store_config = config
        .store
        .sqlite_config()
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let store = SqliteStateStore::new(store_config)
        .map_err(|err| CliError::new(t!("store.open_failed", error = err)))?;
    let records =
        store.commit_log().map_err(|err| CliError::new(t!("store.log_failed", error = err)))?;
    let skip = command.limit.map_or(0, |limit| records.len().saturating_sub(limit));
    for record in records.iter().skip(skip) {
        let line = serde_json::to_string(record)
            .map_err(|err| CliError::new(t!("store.serialize_failed", error = err)))?;
        write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

/// Parses a selector given as `0x`-hex or as a function signature.
fn parse_selector(value: &str) -> Result<Selector, String> {
    if value.contains('(') {
        return Ok(Selector::from_signature(value));
    }
    value.parse::<Selector>().map_err(|err| t!("selector.invalid", value = value, error = err))
}

/// Parses a `KIND:VALUE` query argument.
fn parse_query_argument(spec: &str) -> Result<QueryArgument, String> {
    let Some((kind, value)) = spec.split_once(':') else {
        return Err(t!("argument.format", value = spec));
    };
    let invalid = |error: &dyn std::fmt::Display| {
        t!("argument.invalid_value", kind = kind, value = value, error = error)
    };
    match kind {
        "static" => hex::decode(value).map(QueryArgument::raw).map_err(|err| invalid(&err)),
        "uint" => {
            let number = value.parse::<u128>().map_err(|err| invalid(&err))?;
            QueryArgument::literal(&AbiValue::Uint(number)).map_err(|err| invalid(&err))
        }
        "bool" => {
            let flag = value.parse::<bool>().map_err(|err| invalid(&err))?;
            QueryArgument::literal(&AbiValue::Bool(flag)).map_err(|err| invalid(&err))
        }
        "address" => {
            let address = value.parse::<Address>().map_err(|err| invalid(&err))?;
            QueryArgument::literal(&AbiValue::Address(address)).map_err(|err| invalid(&err))
        }
        "calldata" => {
            let Some((offset, length)) = value.split_once(':') else {
                return Err(t!("argument.format", value = spec));
            };
            let offset = offset.parse::<u16>().map_err(|err| invalid(&err))?;
            let length = length.parse::<u16>().map_err(|err| invalid(&err))?;
            Ok(QueryArgument::call_data(offset, length))
        }
        "env" => EnvKind::from_label(value)
            .map(QueryArgument::env)
            .ok_or_else(|| t!("argument.env_unknown", value = value)),
        other => Err(t!("argument.unknown_kind", kind = other, expected = ARGUMENT_KINDS)),
    }
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a UTF-8 text input with a size limit, mapping failures to catalog messages.
fn read_text_with_limit(path: &Path, kind: &str, max_bytes: usize) -> CliResult<String> {
    let path_label = path.display();
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(error) => {
            CliError::new(t!("input.read_failed", kind = kind, path = path_label, error = error))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path_label,
            size = size,
            limit = limit
        )),
    })?;
    String::from_utf8(bytes).map_err(|err| {
        CliError::new(t!("input.read_failed", kind = kind, path = path_label, error = err))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
