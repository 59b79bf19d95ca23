// crates/unit-verify-config/src/lib.rs
// ============================================================================
// Module: Unit Verify Config Library
// Description: Configuration model and validation for the verifier.
// Purpose: Single source of truth for unit-verify.toml semantics.
// Dependencies: unit-verify-core, serde, toml
// ============================================================================

//! ## Overview
//! `unit-verify-config` defines how the verifier launches the generator, how
//! the optional leak checker wraps it, and where run events go. Loading is
//! strict: unknown keys, oversized files and out-of-range values are
//! rejected.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
