// crates/unit-verify-core/src/descriptor.rs
// ============================================================================
// Module: Descriptor Loading
// Description: Discovery of input descriptors and extraction of directives.
// Purpose: Build immutable test-case inputs from a descriptor directory.
// Dependencies: crate::tokenizer, thiserror
// ============================================================================

//! ## Overview
//! A descriptor is one generator input file (`*.container` or `*.volume`).
//! Lines beginning with [`DIRECTIVE_MARKER`] declare the assertions that the
//! generated artifact must satisfy. The expected artifact name follows from
//! the descriptor's file name.
//!
//! ## Invariants
//! - Discovery order is lexicographic by file name.
//! - Hidden files (leading `.`) are never descriptors.
//! - A directive line that fails to tokenize rejects the whole descriptor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::tokenizer::TokenizeError;
use crate::tokenizer::join_words;
use crate::tokenizer::split_words;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix marking a directive line inside a descriptor.
pub const DIRECTIVE_MARKER: &str = "##";
/// Extension of every generated artifact.
pub const ARTIFACT_EXTENSION: &str = "service";
/// Operation name that marks a descriptor as expected to be rejected.
pub const EXPECT_FAILURE_OPERATION: &str = "assert-failed";
/// Maximum descriptor size accepted by [`Descriptor::load`].
pub const MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while discovering or loading descriptors.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The file name does not carry a recognized descriptor extension.
    #[error("{file} is not a recognized descriptor")]
    Unrecognized {
        /// Offending file name.
        file: String,
    },
    /// Reading the descriptor directory or file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The descriptor exceeds [`MAX_DESCRIPTOR_BYTES`].
    #[error("{path} is {size} bytes (limit {limit})")]
    TooLarge {
        /// Path of the oversized file.
        path: PathBuf,
        /// Actual size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
    /// The descriptor is not valid UTF-8.
    #[error("{path} is not valid utf-8")]
    NotUtf8 {
        /// Path of the offending file.
        path: PathBuf,
    },
    /// A directive line could not be tokenized.
    #[error("{file}:{line}: malformed directive: {source}")]
    MalformedDirective {
        /// Descriptor file name.
        file: String,
        /// 1-based line number of the directive.
        line: usize,
        /// Tokenizer failure.
        #[source]
        source: TokenizeError,
    },
}

// ============================================================================
// SECTION: Descriptor Kind
// ============================================================================

/// Recognized descriptor categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// `*.container` descriptor; artifact keeps the base name.
    Container,
    /// `*.volume` descriptor; artifact base gains a `-volume` marker.
    Volume,
}

impl DescriptorKind {
    /// Returns the file extension (without the dot) for this kind.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Volume => "volume",
        }
    }

    /// Returns the marker inserted before the artifact extension, if any.
    #[must_use]
    pub const fn artifact_marker(self) -> Option<&'static str> {
        match self {
            Self::Container => None,
            Self::Volume => Some("-volume"),
        }
    }

    /// Names the artifact generated from `file_name`, a descriptor of this kind.
    #[must_use]
    pub fn artifact_name(self, file_name: &str) -> String {
        let suffix = format!(".{}", self.extension());
        let base = file_name.strip_suffix(suffix.as_str()).unwrap_or(file_name);
        format!("{base}{}.{ARTIFACT_EXTENSION}", self.artifact_marker().unwrap_or_default())
    }

    /// Classifies a file name, rejecting hidden files.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.starts_with('.') {
            return None;
        }
        let (_, extension) = name.rsplit_once('.')?;
        [Self::Container, Self::Volume].into_iter().find(|kind| kind.extension() == extension)
    }
}

/// Derives the artifact name the generator writes for `file_name`.
///
/// `web.container` maps to `web.service`, `data.volume` to
/// `data-volume.service`. Unrecognized extensions are replaced by the
/// artifact extension without a marker.
#[must_use]
pub fn artifact_name(file_name: &str) -> String {
    DescriptorKind::from_file_name(file_name).map_or_else(
        || format!("{}.{ARTIFACT_EXTENSION}", split_extension(file_name).0),
        |kind| kind.artifact_name(file_name),
    )
}

/// Splits a file name at its last dot, ignoring a leading dot.
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if index > 0 => (&file_name[.. index], &file_name[index ..]),
        _ => (file_name, ""),
    }
}

// ============================================================================
// SECTION: Directive
// ============================================================================

/// One assertion declared in a descriptor.
///
/// # Invariants
/// - `operation` is non-empty text as written, possibly starting with `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Operation name, including any negation prefix.
    pub operation: String,
    /// Remaining tokens of the directive line.
    pub arguments: Vec<String>,
    /// 1-based line number within the descriptor.
    pub line: usize,
}

impl Directive {
    /// Renders the directive as a shell-quoted line for diagnostics.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut words = Vec::with_capacity(self.arguments.len() + 1);
        words.push(self.operation.as_str());
        words.extend(self.arguments.iter().map(String::as_str));
        join_words(&words)
    }
}

/// Extracts every directive from descriptor text.
///
/// # Errors
///
/// Returns [`DescriptorError::MalformedDirective`] when a directive line
/// fails to tokenize.
pub fn extract_directives(file: &str, text: &str) -> Result<Vec<Directive>, DescriptorError> {
    let mut directives = Vec::new();
    for (index, line) in text.split('\n').enumerate() {
        let Some(body) = line.strip_prefix(DIRECTIVE_MARKER) else {
            continue;
        };
        let mut words = split_words(body)
            .map_err(|source| DescriptorError::MalformedDirective {
                file: file.to_string(),
                line: index + 1,
                source,
            })?
            .into_iter();
        let Some(operation) = words.next() else {
            continue;
        };
        directives.push(Directive {
            operation,
            arguments: words.collect(),
            line: index + 1,
        });
    }
    Ok(directives)
}

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// One input file under test.
///
/// # Invariants
/// - `expect_failure` is true iff a directive is exactly `assert-failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// File name within the descriptor directory.
    pub file_name: String,
    /// Full file contents, written verbatim for the generator.
    pub raw_text: String,
    /// Descriptor category.
    pub kind: DescriptorKind,
    /// Name of the artifact the generator is expected to write.
    pub artifact_name: String,
    /// Directives in discovery order.
    pub directives: Vec<Directive>,
    /// Whether the generator is expected to reject this descriptor.
    pub expect_failure: bool,
}

impl Descriptor {
    /// Builds a descriptor from in-memory text.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] when the name is not a descriptor or a
    /// directive is malformed.
    pub fn from_text(
        file_name: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        let file_name = file_name.into();
        let raw_text = raw_text.into();
        let kind = DescriptorKind::from_file_name(&file_name).ok_or_else(|| {
            DescriptorError::Unrecognized {
                file: file_name.clone(),
            }
        })?;
        let directives = extract_directives(&file_name, &raw_text)?;
        let expect_failure =
            directives.iter().any(|directive| directive.operation == EXPECT_FAILURE_OPERATION);
        Ok(Self {
            artifact_name: kind.artifact_name(&file_name),
            file_name,
            raw_text,
            kind,
            directives,
            expect_failure,
        })
    }

    /// Loads `file_name` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] on I/O failure, oversized or non UTF-8
    /// input, or malformed directives.
    pub fn load(dir: &Path, file_name: &str) -> Result<Self, DescriptorError> {
        let path = dir.join(file_name);
        let io_error = |source| DescriptorError::Io {
            path: path.clone(),
            source,
        };
        let size = fs::metadata(&path).map_err(io_error)?.len();
        if size > MAX_DESCRIPTOR_BYTES {
            return Err(DescriptorError::TooLarge {
                path,
                size,
                limit: MAX_DESCRIPTOR_BYTES,
            });
        }
        let bytes = fs::read(&path).map_err(io_error)?;
        let text = String::from_utf8(bytes).map_err(|_| DescriptorError::NotUtf8 {
            path: path.clone(),
        })?;
        Self::from_text(file_name, text)
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Loads every descriptor in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`DescriptorError`] when the directory cannot be read or any
/// descriptor fails to load.
pub fn discover(dir: &Path) -> Result<Vec<Descriptor>, DescriptorError> {
    let io_error = |source| DescriptorError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if DescriptorKind::from_file_name(&name).is_none() {
            continue;
        }
        if !entry.path().is_file() {
            continue;
        }
        names.push(name);
    }
    names.sort();
    names.iter().map(|name| Descriptor::load(dir, name)).collect()
}
