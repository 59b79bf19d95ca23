// crates/unit-verify-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for locale resolution, overrides and reports.
// Purpose: Ensure console output and flag handling stay stable.
// Dependencies: unit-verify-cli main helpers
// ============================================================================

//! ## Overview
//! Validates the helpers behind the CLI entry point: locale selection,
//! command-line overrides layered on the config, and the failure report.

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

use std::path::PathBuf;

use unit_verify_core::CaseError;
use unit_verify_core::CaseFailure;
use unit_verify_core::Descriptor;

use super::EventSinkKind;
use super::LangArg;
use super::Locale;
use super::VerifyConfig;
use super::apply_overrides;
use super::failure_report;
use super::resolve_locale;
use super::running_line;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn failure(artifact_text: Option<&str>, output: &str) -> CaseFailure {
    CaseFailure {
        descriptor: "broken.container".to_string(),
        artifact: "broken.service".to_string(),
        error: CaseError::UnexpectedArtifactState {
            artifact: "broken.service".to_string(),
            present: true,
        },
        output: output.to_string(),
        artifact_text: artifact_text.map(str::to_string),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn resolve_locale_prefers_flag() {
    let locale = resolve_locale(Some(LangArg::Ca), Some("en")).unwrap();
    assert_eq!(locale, Locale::Ca);
}

#[test]
fn resolve_locale_reads_env() {
    assert_eq!(resolve_locale(None, Some("ca_ES")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
}

#[test]
fn resolve_locale_rejects_unknown_env_value() {
    let err = resolve_locale(None, Some("xx")).unwrap_err();
    assert!(err.to_string().contains("UNIT_VERIFY_LANG"));
}

#[test]
fn overrides_set_timeout_and_event_log() {
    let mut config = VerifyConfig::default();
    apply_overrides(&mut config, Some(250), Some(PathBuf::from("events.jsonl"))).unwrap();
    assert_eq!(config.generator.timeout_ms, Some(250));
    assert_eq!(config.events.sink, EventSinkKind::File);
    assert_eq!(config.events.path, Some(PathBuf::from("events.jsonl")));
}

#[test]
fn overrides_are_validated() {
    let mut config = VerifyConfig::default();
    let err = apply_overrides(&mut config, Some(0), None).unwrap_err();
    assert!(err.to_string().contains("timeout_ms"));
}

#[test]
fn running_line_marks_leak_checked_runs() {
    let descriptor = Descriptor::from_text("web.container", "[Container]\n").unwrap();
    assert_eq!(running_line(&descriptor, false), "Running testcase web.container");
    assert_eq!(running_line(&descriptor, true), "Running testcase web.container (in leakcheck)");
}

#[test]
fn failure_report_frames_artifact_text() {
    let lines = failure_report(&failure(Some("[Service]\nExecStart=/bin/true\n"), ""));
    assert_eq!(
        lines,
        vec![
            "Failed testcase broken.container: Unexpected success".to_string(),
            "-------- broken.service ----------".to_string(),
            "[Service]\nExecStart=/bin/true".to_string(),
            "------------------".to_string(),
        ]
    );
}

#[test]
fn failure_report_includes_generator_output() {
    let lines = failure_report(&failure(None, "converting failed\n"));
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "Generator output:");
    assert_eq!(lines[2], "converting failed");
}
