// crates/unit-verify-core/src/lib.rs
// ============================================================================
// Module: Unit Verify Core Library
// Description: Verification engine for unit generator output.
// Purpose: Parse generated unit files and evaluate embedded test directives.
// Dependencies: async-trait, serde, serde_json, tempfile, thiserror, tokio
// ============================================================================

//! ## Overview
//! `unit-verify-core` checks the output of an external unit generator. Each
//! input descriptor carries `##` directives; the harness runs the generator
//! against the descriptor in an isolated scratch area, parses the generated
//! service file and evaluates every directive against it.
//!
//! Layers, leaves first:
//! - [`tokenizer`]: POSIX shell word splitting.
//! - [`unitfile`]: comment/continuation canonicalization and section parsing.
//! - [`sequence`]: sublist and suffix matching over token sequences.
//! - [`descriptor`]: descriptor discovery and directive extraction.
//! - [`assertion`]: the named check registry.
//! - [`launcher`]: generator process execution.
//! - [`harness`]: per-case orchestration and fail-fast runs.
//! - [`events`]: structured run events.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assertion;
pub mod descriptor;
pub mod events;
pub mod harness;
pub mod launcher;
pub mod sequence;
pub mod tokenizer;
pub mod unitfile;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assertion::Assertion;
pub use assertion::AssertionError;
pub use assertion::AssertionRegistry;
pub use assertion::Check;
pub use assertion::CheckContext;
pub use assertion::CheckFn;
pub use descriptor::Descriptor;
pub use descriptor::DescriptorError;
pub use descriptor::DescriptorKind;
pub use descriptor::Directive;
pub use descriptor::discover;
pub use events::FileEventSink;
pub use events::NoopEventSink;
pub use events::RunEvent;
pub use events::RunEventSink;
pub use events::StderrEventSink;
pub use harness::CaseError;
pub use harness::CaseFailure;
pub use harness::CaseReport;
pub use harness::CaseStatus;
pub use harness::Harness;
pub use harness::RunSummary;
pub use launcher::ExecutionResult;
pub use launcher::ExitKind;
pub use launcher::GeneratorLauncher;
pub use launcher::LaunchError;
pub use launcher::LaunchRequest;
pub use launcher::LeakCheckWrapper;
pub use launcher::ProcessLauncher;
pub use sequence::contains_sublist_at;
pub use sequence::find_sublist;
pub use sequence::matches_suffix;
pub use tokenizer::TokenizeError;
pub use tokenizer::join_words;
pub use tokenizer::quote_word;
pub use tokenizer::split_words;
pub use unitfile::ParsedUnit;
pub use unitfile::canonicalize;
