// crates/concord-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and bounded reads.
// Purpose: Ensure CLI inputs are parsed strictly and reads fail closed.
// Dependencies: concord-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Validates `KIND:VALUE` argument parsing, selector parsing, the clap command
//! tree, and `read_bytes_with_limit` size enforcement.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use concord_core::AbiValue;
use concord_core::Address;
use concord_core::EnvKind;
use concord_core::QueryArgument;
use concord_core::Selector;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::DescriptorCommand;
use super::ReadLimitError;
use super::StoreCommand;
use super::parse_query_argument;
use super::parse_selector;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("small.hex");
    fs::write(&path, b"0x1234").unwrap();
    let bytes = read_bytes_with_limit(&path, 16).unwrap();
    assert_eq!(bytes, b"0x1234");
}

#[test]
fn read_bytes_with_limit_allows_exact_limit() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("exact.hex");
    fs::write(&path, [b'a'; 8]).unwrap();
    assert_eq!(read_bytes_with_limit(&path, 8).unwrap().len(), 8);
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("large.hex");
    fs::write(&path, [b'a'; 9]).unwrap();
    let err = read_bytes_with_limit(&path, 8).unwrap_err();
    match err {
        ReadLimitError::TooLarge {
            size,
            limit,
        } => {
            assert_eq!(size, 9);
            assert_eq!(limit, 8);
        }
        ReadLimitError::Io(error) => panic!("unexpected io error: {error}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = read_bytes_with_limit(&temp.path().join("missing.hex"), 8).unwrap_err();
    assert!(matches!(err, ReadLimitError::Io(_)));
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn parse_query_argument_accepts_every_kind() {
    assert_eq!(parse_query_argument("static:0xdead").unwrap(), QueryArgument::raw(vec![0xde, 0xad]));
    assert_eq!(
        parse_query_argument("uint:7").unwrap(),
        QueryArgument::literal(&AbiValue::Uint(7)).unwrap()
    );
    assert_eq!(
        parse_query_argument("bool:true").unwrap(),
        QueryArgument::literal(&AbiValue::Bool(true)).unwrap()
    );
    let address = Address::from_low_u64(0xbeef);
    assert_eq!(
        parse_query_argument(&format!("address:{address}")).unwrap(),
        QueryArgument::literal(&AbiValue::Address(address)).unwrap()
    );
    assert_eq!(parse_query_argument("calldata:4:32").unwrap(), QueryArgument::call_data(4, 32));
    assert_eq!(
        parse_query_argument("env:caller_identity").unwrap(),
        QueryArgument::env(EnvKind::CallerIdentity)
    );
}

#[test]
fn parse_query_argument_rejects_missing_kind() {
    let err = parse_query_argument("0x1234").unwrap_err();
    assert!(err.contains("expected KIND:VALUE"), "{err}");
}

#[test]
fn parse_query_argument_rejects_unknown_kind() {
    let err = parse_query_argument("float:1.5").unwrap_err();
    assert!(err.contains("Unknown argument kind float"), "{err}");
}

#[test]
fn parse_query_argument_rejects_bad_values() {
    assert!(parse_query_argument("uint:-1").is_err());
    assert!(parse_query_argument("bool:yes").is_err());
    assert!(parse_query_argument("static:0xabc").is_err());
    assert!(parse_query_argument("calldata:4").is_err());
    assert!(parse_query_argument("calldata:70000:1").is_err());
    let err = parse_query_argument("env:weather").unwrap_err();
    assert!(err.contains("Unknown environment kind weather"), "{err}");
}

#[test]
fn parse_selector_accepts_hex_and_signatures() {
    let derived = Selector::from_signature("balanceOf(address)");
    assert_eq!(parse_selector("balanceOf(address)").unwrap(), derived);
    assert_eq!(parse_selector(&derived.to_string()).unwrap(), derived);
    assert!(parse_selector("0x1234").is_err());
}

// ============================================================================
// SECTION: Command Tree
// ============================================================================

#[test]
fn cli_parses_descriptor_encode_arguments_in_order() {
    let cli = Cli::try_parse_from([
        "concord",
        "descriptor",
        "encode",
        "--selector",
        "isAllowed(address,uint256)",
        "--arg",
        "env:caller_identity",
        "--arg",
        "calldata:4:32",
    ])
    .unwrap();
    let Some(Commands::Descriptor {
        command: DescriptorCommand::Encode(command),
    }) = cli.command
    else {
        panic!("expected descriptor encode");
    };
    assert_eq!(command.selector, Selector::from_signature("isAllowed(address,uint256)"));
    assert_eq!(
        command.arguments,
        vec![QueryArgument::env(EnvKind::CallerIdentity), QueryArgument::call_data(4, 32)]
    );
}

#[test]
fn cli_rejects_invalid_argument_spec() {
    let result = Cli::try_parse_from([
        "concord",
        "descriptor",
        "encode",
        "--selector",
        "check()",
        "--arg",
        "nope",
    ]);
    assert!(result.is_err());
}

#[test]
fn cli_rejects_hex_and_input_together() {
    let result =
        Cli::try_parse_from(["concord", "descriptor", "decode", "0x00", "--input", "file.hex"]);
    assert!(result.is_err());
}

#[test]
fn cli_parses_store_log_limit() {
    let cli = Cli::try_parse_from(["concord", "store", "log", "--limit", "3"]).unwrap();
    let Some(Commands::Store {
        command: StoreCommand::Log(command),
    }) = cli.command
    else {
        panic!("expected store log");
    };
    assert_eq!(command.limit, Some(3));
    assert!(command.config.is_none());
}

#[test]
fn cli_accepts_version_without_subcommand() {
    let cli = Cli::try_parse_from(["concord", "--version"]).unwrap();
    assert!(cli.show_version);
    assert!(cli.command.is_none());
}
