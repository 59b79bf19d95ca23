// crates/unit-verify-core/src/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured events emitted while verifying descriptors.
// Purpose: Record case lifecycle transitions as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Events are plain serializable records handed to a [`RunEventSink`]. The
//! sinks here write JSON lines to stderr or to an append-only file; callers
//! can route events elsewhere by implementing the trait.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::harness::CaseStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One run lifecycle event.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Descriptor file name, for case events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    /// Case status after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    /// Expected artifact name, for case events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Failure detail or summary text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Elapsed time for finished cases and runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl RunEvent {
    /// Creates an event with a consistent timestamp and no payload.
    #[must_use]
    pub fn new(event: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            descriptor: None,
            status: None,
            artifact: None,
            detail: None,
            duration_ms: None,
        }
    }

    /// Attaches the descriptor and artifact names.
    #[must_use]
    pub fn for_case(mut self, descriptor: &str, artifact: &str) -> Self {
        self.descriptor = Some(descriptor.to_string());
        self.artifact = Some(artifact.to_string());
        self
    }

    /// Attaches the case status.
    #[must_use]
    pub const fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches detail text.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches an elapsed duration.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for run events.
pub trait RunEventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &RunEvent);
}

/// Sink that drops every event.
pub struct NoopEventSink;

impl RunEventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}

/// Sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl RunEventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileEventSink {
    /// Opens the event log in append mode, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl RunEventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{payload}");
        }
    }
}
