// crates/unit-verify-cli/src/lib.rs
// ============================================================================
// Module: Unit Verify CLI Library
// Description: Shared helpers for the unit-verify command-line interface.
// Purpose: Provide reusable components (i18n) for the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) routes all console output through it.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;

#[cfg(test)]
mod tests;
