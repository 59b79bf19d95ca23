// crates/unit-verify-config/src/config.rs
// ============================================================================
// Module: Unit Verify Configuration
// Description: Configuration loading and validation for the verifier.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: unit-verify-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is optional. When neither an explicit path nor the
//! [`CONFIG_ENV_VAR`] variable names a file, built-in defaults apply and
//! match the behavior of a plain `QUADLET_UNIT_DIRS` generator run. A named
//! file must exist, stay within size and path limits, be UTF-8 and contain
//! only known keys.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use unit_verify_core::FileEventSink;
use unit_verify_core::LeakCheckWrapper;
use unit_verify_core::NoopEventSink;
use unit_verify_core::ProcessLauncher;
use unit_verify_core::RunEventSink;
use unit_verify_core::StderrEventSink;
use unit_verify_core::launcher::DEFAULT_UNIT_DIRS_ENV;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable used to locate the config file.
pub const CONFIG_ENV_VAR: &str = "UNIT_VERIFY_CONFIG";
/// Maximum config file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted generator timeout.
pub const MIN_TIMEOUT_MS: u64 = 1;
/// Largest accepted generator timeout (one hour).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;
/// Default exit code the leak checker reports errors with.
const DEFAULT_LEAK_CHECK_EXIT_CODE: i32 = 99;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level verifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Generator launch settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Leak-check wrapper settings, used when leak checking is requested.
    #[serde(default)]
    pub leak_check: LeakCheckConfig,
    /// Run event destination.
    #[serde(default)]
    pub events: EventsConfig,
}

impl VerifyConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// An explicit `path` wins over [`CONFIG_ENV_VAR`]; with neither, the
    /// defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_path(path, env::var_os(CONFIG_ENV_VAR))? {
            Some(resolved) => Self::load_file(&resolved),
            None => Ok(Self::default()),
        }
    }

    /// Loads and validates the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on parse or validation failure.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
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
        self.generator.validate()?;
        self.leak_check.validate()?;
        self.events.validate()
    }

    /// Builds the process launcher for `generator`.
    #[must_use]
    pub fn launcher(&self, generator: impl Into<PathBuf>, leak_check: bool) -> ProcessLauncher {
        ProcessLauncher::new(generator)
            .with_unit_dirs_env(self.generator.unit_dirs_env.clone())
            .with_passthrough_env(self.generator.passthrough_env.clone())
            .with_leak_check(leak_check.then(|| self.leak_check.wrapper()))
            .with_timeout(self.generator.timeout())
    }
}

/// Generator launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Environment variable carrying the input directory.
    #[serde(default = "default_unit_dirs_env")]
    pub unit_dirs_env: String,
    /// Variables copied from the verifier's own environment.
    #[serde(default = "default_passthrough_env")]
    pub passthrough_env: Vec<String>,
    /// Per-case wall-clock limit; absent means no limit.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            unit_dirs_env: default_unit_dirs_env(),
            passthrough_env: default_passthrough_env(),
            timeout_ms: None,
        }
    }
}

impl GeneratorConfig {
    /// Returns the configured timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validates generator settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_env_name("generator.unit_dirs_env", &self.unit_dirs_env)?;
        for name in &self.passthrough_env {
            validate_env_name("generator.passthrough_env", name)?;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            validate_timeout_ms(timeout_ms)?;
        }
        Ok(())
    }
}

/// Leak-check wrapper settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeakCheckConfig {
    /// Wrapper executable.
    #[serde(default = "default_leak_check_program")]
    pub program: String,
    /// Wrapper arguments placed before the generator.
    #[serde(default = "default_leak_check_args")]
    pub args: Vec<String>,
    /// Exit code the wrapper uses to report findings.
    #[serde(default = "default_leak_check_exit_code")]
    pub error_exit_code: i32,
}

impl Default for LeakCheckConfig {
    fn default() -> Self {
        Self {
            program: default_leak_check_program(),
            args: default_leak_check_args(),
            error_exit_code: DEFAULT_LEAK_CHECK_EXIT_CODE,
        }
    }
}

impl LeakCheckConfig {
    /// Converts the settings into a launcher wrapper.
    #[must_use]
    pub fn wrapper(&self) -> LeakCheckWrapper {
        LeakCheckWrapper {
            program: self.program.clone(),
            args: self.args.clone(),
            error_exit_code: self.error_exit_code,
        }
    }

    /// Validates leak-check settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid("leak_check.program must be non-empty".to_string()));
        }
        if self.error_exit_code == 0 {
            return Err(ConfigError::Invalid(
                "leak_check.error_exit_code must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Destination kind for run events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to [`EventsConfig::path`].
    File,
}

/// Run event settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Log file for the `file` sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Opens the configured sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the event log cannot be opened and
    /// [`ConfigError::Invalid`] when the file sink has no path.
    pub fn open_sink(&self) -> Result<Arc<dyn RunEventSink>, ConfigError> {
        match self.sink {
            EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
            EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
            EventSinkKind::File => {
                let path = self.path.as_deref().ok_or_else(missing_event_path)?;
                let sink = FileEventSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
                Ok(Arc::new(sink))
            }
        }
    }

    /// Validates event settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, None) => Err(missing_event_path()),
            (_, Some(path)) => validate_path_string("events.path", &path.to_string_lossy()),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the CLI or the environment.
fn resolve_path(
    path: Option<&Path>,
    env_value: Option<OsString>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    let Some(env_path) = env_value.filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if env_path.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    Ok(Some(PathBuf::from(env_path)))
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

/// Validates an environment variable name.
fn validate_env_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if name.contains(['=', '\0']) {
        return Err(ConfigError::Invalid(format!("{field} must not contain '=' or NUL")));
    }
    Ok(())
}

/// Validates a generator timeout in milliseconds.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the value is out of range.
pub fn validate_timeout_ms(timeout_ms: u64) -> Result<(), ConfigError> {
    if (MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&timeout_ms) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "generator.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
        )))
    }
}

/// Error for a file sink without a path.
fn missing_event_path() -> ConfigError {
    ConfigError::Invalid("events.path is required when events.sink = \"file\"".to_string())
}

/// Default input directory variable.
fn default_unit_dirs_env() -> String {
    DEFAULT_UNIT_DIRS_ENV.to_string()
}

/// Default pass-through variables.
fn default_passthrough_env() -> Vec<String> {
    vec!["PATH".to_string()]
}

/// Default leak-check program.
fn default_leak_check_program() -> String {
    LeakCheckWrapper::default().program
}

/// Default leak-check arguments.
fn default_leak_check_args() -> Vec<String> {
    LeakCheckWrapper::default().args
}

/// Default leak-check error exit code.
const fn default_leak_check_exit_code() -> i32 {
    DEFAULT_LEAK_CHECK_EXIT_CODE
}

// ============================================================================
// SECTION: Tests
// ============================================================================
