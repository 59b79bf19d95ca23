// crates/unit-verify-core/src/launcher.rs
// ============================================================================
// Module: Generator Launcher
// Description: Runs the external unit generator as a child process.
// Purpose: Capture exit status and combined output for one test case.
// Dependencies: async-trait, thiserror, tokio
// ============================================================================

//! ## Overview
//! The generator is a black box: it receives its input directory through an
//! environment variable and its output directory as the only argument. It is
//! expected to exit successfully whether or not it accepted the input, so any
//! other exit is classified here for the harness to report.
//!
//! Stdout and stderr share one pipe, so the captured text interleaves the two
//! streams in the order the child wrote them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Child;
use tokio::process::Command;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default environment variable carrying the input directory.
pub const DEFAULT_UNIT_DIRS_ENV: &str = "QUADLET_UNIT_DIRS";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Directories handed to the generator for one case.
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    /// Directory holding the descriptor under test.
    pub input_dir: &'a Path,
    /// Directory the generator writes artifacts into.
    pub output_dir: &'a Path,
}

/// Classified process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Exit code zero.
    Success,
    /// Non-zero exit attributed to the generator.
    GeneratorFailure(i32),
    /// The leak-check wrapper reported errors with its own exit code.
    LeakCheckFailure(i32),
    /// Terminated by a signal without an exit code.
    Signaled,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "exit code 0"),
            Self::GeneratorFailure(code) => write!(f, "exit code {code}"),
            Self::LeakCheckFailure(code) => write!(f, "leak check exit code {code}"),
            Self::Signaled => write!(f, "terminated by signal"),
        }
    }
}

/// Outcome of one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit classification.
    pub exit: ExitKind,
    /// Combined stdout/stderr text.
    pub output: String,
}

/// Errors raised before a generator run produced an exit status.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The process could not be spawned or awaited.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program being launched.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Output capture failed.
    #[error("failed to capture generator output: {0}")]
    Capture(String),
    /// The run exceeded its time limit and was killed.
    #[error("generator did not finish within {} ms", .0.as_millis())]
    TimedOut(Duration),
}

/// Launch seam between the harness and the generator process.
#[async_trait]
pub trait GeneratorLauncher: Send + Sync {
    /// Runs the generator for one case and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the process cannot run to completion.
    async fn launch(&self, request: LaunchRequest<'_>) -> Result<ExecutionResult, LaunchError>;

    /// Returns true when runs are wrapped by a leak checker.
    fn leak_checked(&self) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Leak Check Wrapper
// ============================================================================

/// External tool wrapped around the generator to detect leaks.
///
/// # Invariants
/// - `program` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakCheckWrapper {
    /// Wrapper executable.
    pub program: String,
    /// Wrapper arguments placed before the generator.
    pub args: Vec<String>,
    /// Exit code the wrapper uses to report its own findings.
    pub error_exit_code: i32,
}

impl Default for LeakCheckWrapper {
    fn default() -> Self {
        Self {
            program: "valgrind".to_string(),
            args: vec![
                "--error-exitcode=99".to_string(),
                "--leak-check=full".to_string(),
                "--show-possibly-lost=no".to_string(),
                "--errors-for-leak-kinds=definite".to_string(),
            ],
            error_exit_code: 99,
        }
    }
}

// ============================================================================
// SECTION: Process Launcher
// ============================================================================

/// Launches the generator binary with a scrubbed environment.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    /// Generator executable.
    generator: PathBuf,
    /// Environment variable carrying the input directory.
    unit_dirs_env: String,
    /// Variables copied from the harness environment.
    passthrough_env: Vec<String>,
    /// Optional leak-check wrapper.
    leak_check: Option<LeakCheckWrapper>,
    /// Optional wall-clock limit per run.
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    /// Creates a launcher for `generator` with default settings.
    #[must_use]
    pub fn new(generator: impl Into<PathBuf>) -> Self {
        Self {
            generator: generator.into(),
            unit_dirs_env: DEFAULT_UNIT_DIRS_ENV.to_string(),
            passthrough_env: vec!["PATH".to_string()],
            leak_check: None,
            timeout: None,
        }
    }

    /// Sets the variable that carries the input directory.
    #[must_use]
    pub fn with_unit_dirs_env(mut self, name: impl Into<String>) -> Self {
        self.unit_dirs_env = name.into();
        self
    }

    /// Sets the variables copied from the harness environment.
    #[must_use]
    pub fn with_passthrough_env(mut self, names: Vec<String>) -> Self {
        self.passthrough_env = names;
        self
    }

    /// Wraps every run with a leak checker.
    #[must_use]
    pub fn with_leak_check(mut self, wrapper: Option<LeakCheckWrapper>) -> Self {
        self.leak_check = wrapper;
        self
    }

    /// Limits each run to `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program and arguments for one run.
    fn argv(&self, output_dir: &Path) -> (OsString, Vec<OsString>) {
        let tail = [self.generator.clone().into_os_string(), output_dir.as_os_str().to_owned()];
        match &self.leak_check {
            Some(wrapper) => {
                let mut args: Vec<OsString> = wrapper.args.iter().map(OsString::from).collect();
                args.extend(tail);
                (OsString::from(&wrapper.program), args)
            }
            None => {
                let [program, output] = tail;
                (program, vec![output])
            }
        }
    }

    /// Maps an exit status onto an [`ExitKind`].
    fn classify(&self, status: ExitStatus) -> ExitKind {
        match status.code() {
            Some(0) => ExitKind::Success,
            Some(code)
                if self.leak_check.as_ref().is_some_and(|wrapper| wrapper.error_exit_code == code) =>
            {
                ExitKind::LeakCheckFailure(code)
            }
            Some(code) => ExitKind::GeneratorFailure(code),
            None => ExitKind::Signaled,
        }
    }
}

#[async_trait]
impl GeneratorLauncher for ProcessLauncher {
    async fn launch(&self, request: LaunchRequest<'_>) -> Result<ExecutionResult, LaunchError> {
        let (program, args) = self.argv(request.output_dir);
        let spawn_error = |source| LaunchError::Spawn {
            program: program.to_string_lossy().into_owned(),
            source,
        };

        let (mut reader, writer) = io::pipe().map_err(spawn_error)?;
        let mut command = Command::new(&program);
        command
            .args(&args)
            .env_clear()
            .env(&self.unit_dirs_env, request.input_dir)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(spawn_error)?)
            .stderr(writer)
            .kill_on_drop(true);
        for name in &self.passthrough_env {
            if let Some(value) = std::env::var_os(name) {
                command.env(name, value);
            }
        }
        // The generator leads its own process group so a timeout can reach
        // every process it forked, including ones still holding the pipe.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn().map_err(spawn_error)?;
        let group = child.id();
        // Release the parent's copies of the write end so the reader sees EOF.
        drop(command);

        let collector = tokio::task::spawn_blocking(move || {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).map(|_| bytes)
        });

        let (status, bytes) = match self.timeout {
            Some(limit) => {
                let outcome =
                    tokio::time::timeout(limit, wait_and_collect(&mut child, collector, &program))
                        .await;
                if let Ok(result) = outcome {
                    result?
                } else {
                    terminate(&mut child, group).await;
                    return Err(LaunchError::TimedOut(limit));
                }
            }
            None => wait_and_collect(&mut child, collector, &program).await?,
        };
        Ok(ExecutionResult {
            exit: self.classify(status),
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    fn leak_checked(&self) -> bool {
        self.leak_check.is_some()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Waits for the child to exit and for the shared pipe to reach EOF.
async fn wait_and_collect(
    child: &mut Child,
    collector: JoinHandle<io::Result<Vec<u8>>>,
    program: &OsStr,
) -> Result<(ExitStatus, Vec<u8>), LaunchError> {
    let status = child.wait().await.map_err(|source| LaunchError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    let bytes = collector
        .await
        .map_err(|err| LaunchError::Capture(err.to_string()))?
        .map_err(|err| LaunchError::Capture(err.to_string()))?;
    Ok((status, bytes))
}

/// Kills the generator and, on unix, every process left in its group.
async fn terminate(child: &mut Child, group: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = group {
            let _ = Command::new("kill")
                .args(["-KILL", "--", &format!("-{pgid}")])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
        }
    }
    #[cfg(not(unix))]
    let _ = group;
    let _ = child.kill().await;
}
