// crates/unit-verify-core/src/harness.rs
// ============================================================================
// Module: Test Case Harness
// Description: Per-descriptor orchestration of generator runs and checks.
// Purpose: Drive each case from provisioning through directive evaluation.
// Dependencies: crate::{assertion, descriptor, events, launcher, tokenizer,
//              unitfile}, serde, tempfile, thiserror
// ============================================================================

//! ## Overview
//! A case moves `Pending -> Running -> {Passed, Failed}`. Running a case:
//!
//! 1. provisions a private scratch root with `in/` and `out/` directories;
//! 2. writes the descriptor into `in/`;
//! 3. launches the generator and captures its output;
//! 4. checks the exit status, then the presence of the expected artifact
//!    against the descriptor's `assert-failed` expectation;
//! 5. parses the artifact and evaluates every directive in order.
//!
//! The first problem ends the case, and [`Harness::run_all`] stops the run at
//! the first failed case.
//!
//! ## Invariants
//! - The scratch root is removed on every exit path.
//! - Cases share no state; each owns its output and parsed unit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tempfile::TempDir;
use thiserror::Error;

use crate::assertion::AssertionError;
use crate::assertion::AssertionRegistry;
use crate::assertion::CheckContext;
use crate::descriptor::Descriptor;
use crate::events::NoopEventSink;
use crate::events::RunEvent;
use crate::events::RunEventSink;
use crate::launcher::ExitKind;
use crate::launcher::GeneratorLauncher;
use crate::launcher::LaunchError;
use crate::launcher::LaunchRequest;
use crate::tokenizer::TokenizeError;
use crate::tokenizer::split_words;
use crate::unitfile::ParsedUnit;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Section holding the recorded command invocation.
pub const COMMAND_SECTION: &str = "Service";
/// Key holding the recorded command invocation.
pub const COMMAND_KEY: &str = "ExecStart";
/// Prefix of every per-case scratch root.
const SCRATCH_PREFIX: &str = "unit-verify-";

// ============================================================================
// SECTION: Case Status
// ============================================================================

/// Lifecycle state of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Discovered, not yet started.
    Pending,
    /// Generator launched or checks in progress.
    Running,
    /// Every check passed.
    Passed,
    /// The case failed; terminal.
    Failed,
}

impl CaseStatus {
    /// Returns true when moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running) | (Self::Running, Self::Passed | Self::Failed)
        )
    }

    /// Moves to `next` when the transition is legal and stays put otherwise.
    #[must_use]
    pub const fn advance(self, next: Self) -> Self {
        if self.can_advance_to(next) { next } else { self }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a case fails.
#[derive(Debug, Error)]
pub enum CaseError {
    /// Scratch provisioning or artifact I/O failed.
    #[error("failed to {action}: {source}")]
    Workspace {
        /// What the harness was doing.
        action: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The generator could not be run.
    #[error(transparent)]
    Launch(LaunchError),
    /// The generator ran past its time limit.
    #[error("generator timed out after {} ms", .0.as_millis())]
    ExecutionTimeout(Duration),
    /// The generator itself exited unsuccessfully.
    #[error("Unexpected generator failure ({exit})")]
    UnexpectedProcessFailure {
        /// Classified exit.
        exit: ExitKind,
    },
    /// The leak-check wrapper reported errors.
    #[error("Leak check reported errors (exit code {code})")]
    LeakCheckFailed {
        /// Wrapper exit code.
        code: i32,
    },
    /// The artifact's presence contradicts the descriptor's expectation.
    #[error("{}", artifact_state_message(.artifact, *.present))]
    UnexpectedArtifactState {
        /// Expected artifact name.
        artifact: String,
        /// Whether the artifact was found.
        present: bool,
    },
    /// The recorded command could not be tokenized.
    #[error("malformed ExecStart command: {source}")]
    MalformedInput {
        /// Tokenizer failure.
        #[source]
        source: TokenizeError,
    },
    /// A directive names an unregistered operation.
    #[error("unknown assertion {name}")]
    UnknownAssertion {
        /// Operation name without negation prefix.
        name: String,
    },
    /// A directive evaluated to false.
    #[error("{directive}")]
    AssertionFailed {
        /// Shell-quoted directive line.
        directive: String,
        /// 1-based line number in the descriptor.
        line: usize,
    },
}

impl From<LaunchError> for CaseError {
    fn from(error: LaunchError) -> Self {
        match error {
            LaunchError::TimedOut(limit) => Self::ExecutionTimeout(limit),
            other => Self::Launch(other),
        }
    }
}

impl From<AssertionError> for CaseError {
    fn from(error: AssertionError) -> Self {
        match error {
            AssertionError::Unknown {
                name,
            } => Self::UnknownAssertion {
                name,
            },
        }
    }
}

/// Renders the message for an unexpected artifact state.
fn artifact_state_message(artifact: &str, present: bool) -> String {
    if present {
        "Unexpected success".to_string()
    } else {
        format!("Unexpected failure, can't find {artifact}")
    }
}

/// A failed case with everything needed to diagnose it.
#[derive(Debug, Error)]
#[error("{descriptor}: {error}")]
pub struct CaseFailure {
    /// Descriptor file name.
    pub descriptor: String,
    /// Expected artifact name.
    pub artifact: String,
    /// Failure reason.
    #[source]
    pub error: CaseError,
    /// Combined generator output, empty if the generator never ran.
    pub output: String,
    /// Raw artifact text when it was read.
    pub artifact_text: Option<String>,
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Result of a passed case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    /// Descriptor file name.
    pub descriptor: String,
    /// Artifact name checked for.
    pub artifact: String,
    /// Final status (always `Passed`).
    pub status: CaseStatus,
    /// Number of directives evaluated.
    pub directives_checked: usize,
    /// Wall-clock time for the case.
    pub duration: Duration,
}

/// Result of a run in which every case passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reports in execution order.
    pub cases: Vec<CaseReport>,
}

// ============================================================================
// SECTION: Scratch Area
// ============================================================================

/// Private input/output directories for one case.
struct CaseWorkspace {
    /// Scratch root; removed on drop.
    root: TempDir,
}

impl CaseWorkspace {
    /// Creates a fresh scratch root with empty `in/` and `out/` directories.
    fn provision() -> Result<Self, CaseError> {
        let root = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir().map_err(|source| {
            CaseError::Workspace {
                action: "create scratch directory",
                source,
            }
        })?;
        let workspace = Self {
            root,
        };
        for dir in [workspace.input_dir(), workspace.output_dir()] {
            fs::create_dir(&dir).map_err(|source| CaseError::Workspace {
                action: "create scratch directory",
                source,
            })?;
        }
        Ok(workspace)
    }

    /// Directory the generator reads from.
    fn input_dir(&self) -> PathBuf {
        self.root.path().join("in")
    }

    /// Directory the generator writes to.
    fn output_dir(&self) -> PathBuf {
        self.root.path().join("out")
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Diagnostics gathered while a case runs.
#[derive(Default)]
struct CaseRecord {
    /// Combined generator output.
    output: String,
    /// Artifact text, once read.
    artifact_text: Option<String>,
}

/// Runs descriptors against a generator.
pub struct Harness<L> {
    /// Generator launch backend.
    launcher: L,
    /// Checks available to directives.
    registry: AssertionRegistry,
    /// Destination for lifecycle events.
    events: Arc<dyn RunEventSink>,
}

impl<L: GeneratorLauncher> Harness<L> {
    /// Creates a harness with the built-in checks and no event sink.
    #[must_use]
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            registry: AssertionRegistry::builtin(),
            events: Arc::new(NoopEventSink),
        }
    }

    /// Replaces the assertion registry.
    #[must_use]
    pub fn with_registry(mut self, registry: AssertionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Routes lifecycle events to `events`.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn RunEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the launch backend.
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Returns the assertion registry.
    pub const fn registry(&self) -> &AssertionRegistry {
        &self.registry
    }

    /// Runs every descriptor in order, stopping at the first failure.
    ///
    /// `on_start` is called before each case begins.
    ///
    /// # Errors
    ///
    /// Returns the first [`CaseFailure`].
    pub async fn run_all<F>(
        &self,
        descriptors: &[Descriptor],
        mut on_start: F,
    ) -> Result<RunSummary, CaseFailure>
    where
        F: FnMut(&Descriptor),
    {
        let started = Instant::now();
        self.events.record(
            &RunEvent::new("run_started").with_detail(format!("{} descriptors", descriptors.len())),
        );
        for descriptor in descriptors {
            self.events.record(
                &RunEvent::new("case_pending")
                    .for_case(&descriptor.file_name, &descriptor.artifact_name)
                    .with_status(CaseStatus::Pending),
            );
        }
        let mut summary = RunSummary::default();
        for descriptor in descriptors {
            on_start(descriptor);
            match self.run_case(descriptor).await {
                Ok(report) => summary.cases.push(report),
                Err(failure) => {
                    self.events.record(
                        &RunEvent::new("run_finished")
                            .with_status(CaseStatus::Failed)
                            .with_detail(failure.to_string())
                            .with_duration_ms(started.elapsed().as_millis()),
                    );
                    return Err(failure);
                }
            }
        }
        self.events.record(
            &RunEvent::new("run_finished")
                .with_status(CaseStatus::Passed)
                .with_detail(format!("{} passed", summary.cases.len()))
                .with_duration_ms(started.elapsed().as_millis()),
        );
        Ok(summary)
    }

    /// Runs one descriptor to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`CaseFailure`] describing the first problem found.
    pub async fn run_case(&self, descriptor: &Descriptor) -> Result<CaseReport, CaseFailure> {
        let started = Instant::now();
        let case_event = |name| {
            RunEvent::new(name).for_case(&descriptor.file_name, &descriptor.artifact_name)
        };
        let mut status = CaseStatus::Pending.advance(CaseStatus::Running);
        self.events.record(&case_event("case_started").with_status(status));

        let mut record = CaseRecord::default();
        let outcome = self.execute(descriptor, &mut record).await;
        let duration = started.elapsed();
        match outcome {
            Ok(directives_checked) => {
                status = status.advance(CaseStatus::Passed);
                self.events.record(
                    &case_event("case_finished")
                        .with_status(status)
                        .with_duration_ms(duration.as_millis()),
                );
                Ok(CaseReport {
                    descriptor: descriptor.file_name.clone(),
                    artifact: descriptor.artifact_name.clone(),
                    status,
                    directives_checked,
                    duration,
                })
            }
            Err(error) => {
                status = status.advance(CaseStatus::Failed);
                self.events.record(
                    &case_event("case_finished")
                        .with_status(status)
                        .with_detail(error.to_string())
                        .with_duration_ms(duration.as_millis()),
                );
                Err(CaseFailure {
                    descriptor: descriptor.file_name.clone(),
                    artifact: descriptor.artifact_name.clone(),
                    error,
                    output: record.output,
                    artifact_text: record.artifact_text,
                })
            }
        }
    }

    /// Performs the case steps; returns the number of directives checked.
    async fn execute(
        &self,
        descriptor: &Descriptor,
        record: &mut CaseRecord,
    ) -> Result<usize, CaseError> {
        let workspace = CaseWorkspace::provision()?;
        let input_dir = workspace.input_dir();
        let output_dir = workspace.output_dir();
        fs::write(input_dir.join(&descriptor.file_name), &descriptor.raw_text).map_err(
            |source| CaseError::Workspace {
                action: "write descriptor",
                source,
            },
        )?;

        let execution = self
            .launcher
            .launch(LaunchRequest {
                input_dir: &input_dir,
                output_dir: &output_dir,
            })
            .await?;
        record.output = execution.output;
        match execution.exit {
            ExitKind::Success => {}
            ExitKind::LeakCheckFailure(code) => {
                return Err(CaseError::LeakCheckFailed {
                    code,
                });
            }
            exit @ (ExitKind::GeneratorFailure(_) | ExitKind::Signaled) => {
                return Err(CaseError::UnexpectedProcessFailure {
                    exit,
                });
            }
        }

        let artifact_path = output_dir.join(&descriptor.artifact_name);
        let present = artifact_path.is_file();
        if present == descriptor.expect_failure {
            if present {
                record.artifact_text = fs::read_to_string(&artifact_path).ok();
            }
            return Err(CaseError::UnexpectedArtifactState {
                artifact: descriptor.artifact_name.clone(),
                present,
            });
        }

        let unit = if present { Some(read_artifact(&artifact_path, record)?) } else { None };
        let command = match &unit {
            Some(unit) => command_invocation(unit)?,
            None => Vec::new(),
        };
        let context = CheckContext {
            output: &record.output,
            unit: unit.as_ref(),
            command: &command,
        };
        for directive in &descriptor.directives {
            if !self.registry.evaluate(directive, &context)? {
                return Err(CaseError::AssertionFailed {
                    directive: directive.display_line(),
                    line: directive.line,
                });
            }
        }
        Ok(descriptor.directives.len())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and parses the artifact, keeping its text for diagnostics.
fn read_artifact(path: &Path, record: &mut CaseRecord) -> Result<ParsedUnit, CaseError> {
    let text = fs::read_to_string(path).map_err(|source| CaseError::Workspace {
        action: "read generated artifact",
        source,
    })?;
    let unit = ParsedUnit::from_artifact(&text);
    record.artifact_text = Some(text);
    Ok(unit)
}

/// Tokenizes the recorded command; empty when the unit records none.
///
/// # Errors
///
/// Returns [`CaseError::MalformedInput`] when the command has broken quoting.
pub fn command_invocation(unit: &ParsedUnit) -> Result<Vec<String>, CaseError> {
    unit.first_value(COMMAND_SECTION, COMMAND_KEY)
        .map(split_words)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(|source| CaseError::MalformedInput {
            source,
        })
}
