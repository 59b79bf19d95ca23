// crates/unit-verify-core/src/unitfile.rs
// ============================================================================
// Module: Unit File Parsing
// Description: Canonicalization and section parsing for generated unit files.
// Purpose: Turn generator output into a section/key/ordered-values map.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Generated units use an INI-like syntax: `[Section]` headers, `Key=Value`
//! entries split on the first `=`, `#`/`;` comment lines and trailing
//! backslash continuation. Parsing happens in two passes:
//! [`canonicalize`] removes comments and joins continued lines, then
//! [`ParsedUnit::parse`] collects the entries.
//!
//! ## Invariants
//! - Repeated keys append; nothing is ever overwritten.
//! - Section and key names are kept exactly as written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Section name used for entries that appear before any header.
pub const NO_SECTION: &str = "none";

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Drops comment lines and resolves backslash continuation.
///
/// Every logical entry of the result occupies exactly one line. A
/// continuation at the very end of the text leaves the joined line
/// unterminated.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let mut canonical = String::with_capacity(raw.len());
    for line in raw.split('\n') {
        if line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(continued) = line.strip_suffix('\\') {
            canonical.push_str(continued);
            canonical.push(' ');
        } else {
            canonical.push_str(line);
            canonical.push('\n');
        }
    }
    canonical
}

// ============================================================================
// SECTION: Parsed Unit
// ============================================================================

/// Structured view of a generated unit file.
///
/// # Invariants
/// - Values for a key are stored in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedUnit {
    /// Section name to key name to ordered values.
    sections: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl ParsedUnit {
    /// Parses canonicalized unit text.
    ///
    /// A line starting with `[` switches the current section to the text up
    /// to the first `]` (or the end of the line when there is none). Any
    /// line containing `=`, header lines included, contributes one value.
    #[must_use]
    pub fn parse(canonical: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        let mut section = NO_SECTION.to_string();
        for line in canonical.split('\n') {
            if let Some(header) = line.strip_prefix('[') {
                let end = header.find(']').unwrap_or(header.len());
                section = header[.. end].to_string();
            }
            if let Some((key, value)) = line.split_once('=') {
                sections
                    .entry(section.clone())
                    .or_default()
                    .entry(key.trim().to_string())
                    .or_default()
                    .push(value.trim().to_string());
            }
        }
        Self {
            sections,
        }
    }

    /// Canonicalizes and parses raw artifact text.
    #[must_use]
    pub fn from_artifact(raw: &str) -> Self {
        Self::parse(&canonicalize(raw))
    }

    /// Returns all values recorded for `key` in `section`.
    #[must_use]
    pub fn values(&self, section: &str, key: &str) -> Option<&[String]> {
        self.sections.get(section)?.get(key).map(Vec::as_slice)
    }

    /// Returns the first value recorded for `key` in `section`.
    #[must_use]
    pub fn first_value(&self, section: &str, key: &str) -> Option<&str> {
        self.values(section, key)?.first().map(String::as_str)
    }

    /// Iterates section names in sorted order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Iterates key names of `section` in sorted order.
    pub fn keys<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.sections.get(section).into_iter().flat_map(|keys| keys.keys().map(String::as_str))
    }

    /// Returns true when no entry was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
