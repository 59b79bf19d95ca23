//! Config load validation tests for unit-verify-config.
// crates/unit-verify-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards and value checks.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use unit_verify_config::ConfigError;
use unit_verify_config::EventSinkKind;
use unit_verify_config::VerifyConfig;
use unit_verify_core::GeneratorLauncher;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<VerifyConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(VerifyConfig::load(Some(path)), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(VerifyConfig::load(Some(path)), "config path component too long")
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_invalid(VerifyConfig::load(Some(&path)), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'a'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(VerifyConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(VerifyConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_unknown_keys() -> TestResult {
    let file = write_config("[generator]\nunit_dir_env = \"X\"\n")?;
    assert_invalid(VerifyConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_empty_file_yields_defaults() -> TestResult {
    let file = write_config("")?;
    let config = VerifyConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config != VerifyConfig::default() {
        return Err(format!("unexpected config: {config:?}"));
    }
    if config.generator.unit_dirs_env != "QUADLET_UNIT_DIRS" {
        return Err("default unit dirs variable changed".to_string());
    }
    if config.leak_check.program != "valgrind" || config.leak_check.error_exit_code != 99 {
        return Err("unexpected leak-check defaults".to_string());
    }
    Ok(())
}

#[test]
fn load_reads_every_section() -> TestResult {
    let file = write_config(
        r#"
[generator]
unit_dirs_env = "UNIT_DIRS"
passthrough_env = ["PATH", "HOME"]
timeout_ms = 2500

[leak_check]
program = "memcheck"
args = ["--strict"]
error_exit_code = 7

[events]
sink = "stderr"
"#,
    )?;
    let config = VerifyConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.generator.unit_dirs_env != "UNIT_DIRS"
        || config.generator.passthrough_env != ["PATH", "HOME"]
        || config.generator.timeout() != Some(Duration::from_millis(2500))
    {
        return Err(format!("unexpected generator config: {:?}", config.generator));
    }
    let wrapper = config.leak_check.wrapper();
    if wrapper.program != "memcheck" || wrapper.args != ["--strict"] || wrapper.error_exit_code != 7
    {
        return Err(format!("unexpected wrapper: {wrapper:?}"));
    }
    if config.events.sink != EventSinkKind::Stderr {
        return Err("expected stderr sink".to_string());
    }
    Ok(())
}

#[test]
fn rejects_zero_timeout() {
    let result = VerifyConfig::from_toml("[generator]\ntimeout_ms = 0\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_excessive_timeout() {
    let result = VerifyConfig::from_toml("[generator]\ntimeout_ms = 3600001\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_bad_env_names() -> TestResult {
    assert_invalid(
        VerifyConfig::from_toml("[generator]\nunit_dirs_env = \"\"\n"),
        "generator.unit_dirs_env must be non-empty",
    )?;
    assert_invalid(
        VerifyConfig::from_toml("[generator]\npassthrough_env = [\"A=B\"]\n"),
        "generator.passthrough_env must not contain",
    )
}

#[test]
fn rejects_empty_leak_check_program() -> TestResult {
    assert_invalid(
        VerifyConfig::from_toml("[leak_check]\nprogram = \"  \"\n"),
        "leak_check.program must be non-empty",
    )
}

#[test]
fn rejects_zero_leak_check_exit_code() -> TestResult {
    assert_invalid(
        VerifyConfig::from_toml("[leak_check]\nerror_exit_code = 0\n"),
        "leak_check.error_exit_code must be non-zero",
    )
}

#[test]
fn file_sink_requires_path() -> TestResult {
    assert_invalid(
        VerifyConfig::from_toml("[events]\nsink = \"file\"\n"),
        "events.path is required",
    )
}

#[test]
fn rejects_unknown_sink_kind() -> TestResult {
    assert_invalid(VerifyConfig::from_toml("[events]\nsink = \"syslog\"\n"), "config parse error")
}

#[test]
fn file_sink_opens_event_log() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let log = dir.path().join("events.jsonl");
    let text = format!("[events]\nsink = \"file\"\npath = {:?}\n", log.display().to_string());
    let config = VerifyConfig::from_toml(&text).map_err(|err| err.to_string())?;
    config.events.open_sink().map_err(|err| err.to_string())?;
    if !log.is_file() {
        return Err("event log was not created".to_string());
    }
    Ok(())
}

#[test]
fn launcher_honors_leak_check_flag() {
    let config = VerifyConfig::default();
    assert!(!config.launcher("/usr/bin/generator", false).leak_checked());
    assert!(config.launcher("/usr/bin/generator", true).leak_checked());
}
