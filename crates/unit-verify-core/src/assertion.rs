// crates/unit-verify-core/src/assertion.rs
// ============================================================================
// Module: Assertion Registry
// Description: Named checks evaluated against one executed test case.
// Purpose: Dispatch descriptor directives to boolean check functions.
// Dependencies: crate::{descriptor, sequence, unitfile}, thiserror
// ============================================================================

//! ## Overview
//! Each directive names an operation. The registry maps operation names to
//! plain function pointers; a leading `!` negates the result. Names are
//! resolved once into an [`Assertion`] before evaluation so that negation and
//! unknown names are handled in one place.
//!
//! ## Invariants
//! - Checks are pure functions of their arguments and the [`CheckContext`].
//! - Missing data (no parsed unit, too few arguments) is a non-match, never
//!   an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::descriptor::Directive;
use crate::sequence::find_sublist;
use crate::sequence::matches_suffix;
use crate::unitfile::ParsedUnit;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix that inverts an operation's result.
pub const NEGATION_PREFIX: char = '!';

// ============================================================================
// SECTION: Types
// ============================================================================

/// Case state visible to checks.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Combined stdout/stderr text of the generator.
    pub output: &'a str,
    /// Parsed artifact; absent when the generator was expected to fail.
    pub unit: Option<&'a ParsedUnit>,
    /// Tokenized command invocation from the artifact.
    pub command: &'a [String],
}

/// Signature shared by every registered check.
pub type CheckFn = fn(&[String], &CheckContext<'_>) -> bool;

/// A registered check paired with its name.
#[derive(Debug, Clone, Copy)]
pub struct Check {
    /// Registered operation name.
    pub name: &'static str,
    /// Check implementation.
    pub eval: CheckFn,
}

/// A directive operation resolved against the registry.
#[derive(Debug, Clone, Copy)]
pub enum Assertion {
    /// Passes when the check returns true.
    Positive(Check),
    /// Passes when the check returns false.
    Negated(Check),
}

impl Assertion {
    /// Evaluates the assertion, applying negation.
    #[must_use]
    pub fn evaluate(&self, arguments: &[String], context: &CheckContext<'_>) -> bool {
        match self {
            Self::Positive(check) => (check.eval)(arguments, context),
            Self::Negated(check) => !(check.eval)(arguments, context),
        }
    }

    /// Returns the underlying check.
    #[must_use]
    pub const fn check(&self) -> &Check {
        match self {
            Self::Positive(check) | Self::Negated(check) => check,
        }
    }
}

/// Errors raised while resolving directive operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    /// The operation name is not registered.
    #[error("unknown assertion {name}")]
    Unknown {
        /// Operation name with any negation prefix removed.
        name: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Operation name to check function mapping.
#[derive(Debug, Clone, Default)]
pub struct AssertionRegistry {
    /// Registered checks keyed by operation name.
    checks: BTreeMap<&'static str, CheckFn>,
}

impl AssertionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in checks.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("assert-failed", assert_failed);
        registry.register("assert-stderr-contains", assert_stderr_contains);
        registry.register("assert-key-is", assert_key_is);
        registry.register("assert-podman-args", assert_podman_args);
        registry.register("assert-podman-final-args", assert_podman_final_args);
        registry
    }

    /// Adds or replaces the check registered under `name`.
    pub fn register(&mut self, name: &'static str, eval: CheckFn) {
        self.checks.insert(name, eval);
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Iterates registered operation names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.checks.keys().copied()
    }

    /// Resolves an operation name, honoring the negation prefix.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Unknown`] when the stripped name is not
    /// registered.
    pub fn resolve(&self, operation: &str) -> Result<Assertion, AssertionError> {
        let (negated, name) = match operation.strip_prefix(NEGATION_PREFIX) {
            Some(stripped) => (true, stripped),
            None => (false, operation),
        };
        let (&name, &eval) =
            self.checks.get_key_value(name).ok_or_else(|| AssertionError::Unknown {
                name: name.to_string(),
            })?;
        let check = Check {
            name,
            eval,
        };
        Ok(if negated { Assertion::Negated(check) } else { Assertion::Positive(check) })
    }

    /// Resolves and evaluates one directive.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::Unknown`] for unregistered operations.
    pub fn evaluate(
        &self,
        directive: &Directive,
        context: &CheckContext<'_>,
    ) -> Result<bool, AssertionError> {
        let assertion = self.resolve(&directive.operation)?;
        Ok(assertion.evaluate(&directive.arguments, context))
    }
}

// ============================================================================
// SECTION: Built-in Checks
// ============================================================================

/// Always passes; expected rejection is enforced by the harness.
const fn assert_failed(_arguments: &[String], _context: &CheckContext<'_>) -> bool {
    true
}

/// Passes when the first argument occurs in the generator output.
fn assert_stderr_contains(arguments: &[String], context: &CheckContext<'_>) -> bool {
    arguments.first().is_some_and(|needle| context.output.contains(needle.as_str()))
}

/// Passes when `section key v1 [v2 ...]` equals the parsed values exactly.
fn assert_key_is(arguments: &[String], context: &CheckContext<'_>) -> bool {
    let [section, key, expected @ ..] = arguments else {
        return false;
    };
    if expected.is_empty() {
        return false;
    }
    context
        .unit
        .and_then(|unit| unit.values(section, key))
        .is_some_and(|actual| actual == expected)
}

/// Passes when the arguments occur as a contiguous run of the command.
fn assert_podman_args(arguments: &[String], context: &CheckContext<'_>) -> bool {
    find_sublist(context.command, arguments).is_some()
}

/// Passes when the arguments are the trailing tokens of the command.
fn assert_podman_final_args(arguments: &[String], context: &CheckContext<'_>) -> bool {
    matches_suffix(context.command, arguments)
}
