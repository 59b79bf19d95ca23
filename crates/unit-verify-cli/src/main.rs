// crates/unit-verify-cli/src/main.rs
// ============================================================================
// Module: Unit Verify CLI Entry Point
// Description: Runs every descriptor in a directory against a unit generator.
// Purpose: Provide a localized, fail-fast console front end for the harness.
// Dependencies: clap, thiserror, tokio, unit-verify-config, unit-verify-core
// ============================================================================

//! ## Overview
//! `unit-verify <descriptor-dir> <generator>` discovers descriptors, runs the
//! generator once per descriptor and checks the embedded directives. The
//! process exits with status 0 when every case passes and 1 on the first
//! failure or on any setup error. All console text goes through the i18n
//! catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::CommandFactory;
use clap::Parser;
use clap::ValueEnum;
use thiserror::Error;
use unit_verify_cli::i18n::Locale;
use unit_verify_cli::i18n::set_locale;
use unit_verify_cli::t;
use unit_verify_config::EventSinkKind;
use unit_verify_config::VerifyConfig;
use unit_verify_core::CaseFailure;
use unit_verify_core::Descriptor;
use unit_verify_core::GeneratorLauncher;
use unit_verify_core::Harness;
use unit_verify_core::discover;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "UNIT_VERIFY_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "unit-verify", disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Preferred output language (overrides `UNIT_VERIFY_LANG`).
    #[arg(long, value_enum, value_name = "LANG")]
    lang: Option<LangArg>,
    /// Config file (overrides `UNIT_VERIFY_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Wrap every generator run in the configured leak checker.
    #[arg(long)]
    leakcheck: bool,
    /// Per-case generator time limit in milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
    /// Append JSON-line run events to this file.
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
    /// Directory holding `*.container` and `*.volume` descriptors.
    #[arg(value_name = "DESCRIPTOR_DIR", required_unless_present = "show_version")]
    descriptor_dir: Option<PathBuf>,
    /// Unit generator executable.
    #[arg(value_name = "GENERATOR", required_unless_present = "show_version")]
    generator: Option<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and runs the verifier.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let (Some(descriptor_dir), Some(generator)) = (cli.descriptor_dir, cli.generator) else {
        return Err(CliError::new(Cli::command().render_usage().to_string()));
    };

    let mut config = VerifyConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    apply_overrides(&mut config, cli.timeout_ms, cli.event_log)?;
    command_verify(&config, &descriptor_dir, generator, cli.leakcheck).await
}

/// Runs every descriptor in `descriptor_dir` against `generator`.
async fn command_verify(
    config: &VerifyConfig,
    descriptor_dir: &Path,
    generator: PathBuf,
    leak_check: bool,
) -> CliResult<ExitCode> {
    let descriptors = discover(descriptor_dir).map_err(|err| {
        CliError::new(t!("discover.failed", path = descriptor_dir.display(), error = err))
    })?;
    if descriptors.is_empty() {
        write_stdout_line(&t!("discover.empty", path = descriptor_dir.display()))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    let events = config
        .events
        .open_sink()
        .map_err(|err| CliError::new(t!("config.events_failed", error = err)))?;
    let harness =
        Harness::new(config.launcher(generator, leak_check)).with_event_sink(events);
    let leak_checked = harness.launcher().leak_checked();

    let mut progress_error = None;
    let result = harness
        .run_all(&descriptors, |descriptor| {
            if let Err(err) = write_stdout_line(&running_line(descriptor, leak_checked))
                && progress_error.is_none()
            {
                progress_error = Some(err);
            }
        })
        .await;
    if let Some(err) = progress_error {
        return Err(CliError::new(output_error("stdout", &err)));
    }

    match result {
        Ok(summary) => {
            write_stdout_line(&t!("run.passed", count = summary.cases.len()))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            for line in failure_report(&failure) {
                write_stdout_line(&line)
                    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Applies command-line overrides on top of the loaded config.
fn apply_overrides(
    config: &mut VerifyConfig,
    timeout_ms: Option<u64>,
    event_log: Option<PathBuf>,
) -> CliResult<()> {
    if let Some(timeout_ms) = timeout_ms {
        config.generator.timeout_ms = Some(timeout_ms);
    }
    if let Some(path) = event_log {
        config.events.sink = EventSinkKind::File;
        config.events.path = Some(path);
    }
    config.validate().map_err(|err| CliError::new(t!("config.override_invalid", error = err)))
}

/// Formats the progress line printed before a case starts.
fn running_line(descriptor: &Descriptor, leak_checked: bool) -> String {
    if leak_checked {
        t!("run.case_started_leakcheck", file = descriptor.file_name)
    } else {
        t!("run.case_started", file = descriptor.file_name)
    }
}

/// Formats the console report for a failed case.
fn failure_report(failure: &CaseFailure) -> Vec<String> {
    let mut lines =
        vec![t!("run.case_failed", file = failure.descriptor, error = failure.error)];
    if let Some(text) = &failure.artifact_text {
        lines.push(t!("run.artifact_header", artifact = failure.artifact));
        lines.push(text.trim_end_matches('\n').to_string());
        lines.push(t!("run.artifact_footer"));
    }
    if !failure.output.is_empty() {
        lines.push(t!("run.output_header"));
        lines.push(failure.output.trim_end_matches('\n').to_string());
    }
    lines
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

/// Formats a localized output error message.
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
