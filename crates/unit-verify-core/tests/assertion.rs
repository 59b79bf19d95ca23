// crates/unit-verify-core/tests/assertion.rs
// ============================================================================
// Module: Assertion Registry Tests
// Description: Built-in checks, negation and unknown operations.
// Purpose: Ensure directives evaluate against output, unit and command.
// ============================================================================

//! Assertion registry tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use unit_verify_core::Assertion;
use unit_verify_core::AssertionError;
use unit_verify_core::AssertionRegistry;
use unit_verify_core::CheckContext;
use unit_verify_core::Descriptor;
use unit_verify_core::ParsedUnit;
use unit_verify_core::harness::command_invocation;

const ARTIFACT: &str = "[Unit]\nDescription=web\n[Service]\nEnvironment=A=1\nEnvironment=B=2\n\
                        ExecStart=/usr/bin/podman run --name=web --rm \"my image\" sleep 10\n";

/// Evaluates every directive of `text` and returns the results in order.
fn evaluate(text: &str, output: &str, unit: Option<&ParsedUnit>) -> Vec<bool> {
    let registry = AssertionRegistry::builtin();
    let command = unit.map(|unit| command_invocation(unit).unwrap()).unwrap_or_default();
    let context = CheckContext {
        output,
        unit,
        command: &command,
    };
    Descriptor::from_text("t.container", text)
        .unwrap()
        .directives
        .iter()
        .map(|directive| registry.evaluate(directive, &context).unwrap())
        .collect()
}

#[test]
fn builtin_registry_names() {
    let registry = AssertionRegistry::builtin();
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec![
            "assert-failed",
            "assert-key-is",
            "assert-podman-args",
            "assert-podman-final-args",
            "assert-stderr-contains",
        ]
    );
    assert!(registry.contains("assert-key-is"));
    assert!(!registry.contains("!assert-key-is"));
}

#[test]
fn key_is_compares_full_value_list() {
    let unit = ParsedUnit::from_artifact(ARTIFACT);
    let results = evaluate(
        "## assert-key-is Service Environment A=1 B=2\n\
         ## assert-key-is Service Environment A=1\n\
         ## assert-key-is Unit Description web\n\
         ## assert-key-is Unit Missing x\n\
         ## assert-key-is Unit Description\n",
        "",
        Some(&unit),
    );
    assert_eq!(results, vec![true, false, true, false, false]);
}

#[test]
fn podman_args_match_contiguous_runs() {
    let unit = ParsedUnit::from_artifact(ARTIFACT);
    let results = evaluate(
        "## assert-podman-args --name=web --rm\n\
         ## assert-podman-args \"my image\" sleep\n\
         ## assert-podman-args --rm --name=web\n\
         ## assert-podman-args\n",
        "",
        Some(&unit),
    );
    assert_eq!(results, vec![true, true, false, false]);
}

#[test]
fn podman_final_args_match_suffix() {
    let unit = ParsedUnit::from_artifact(ARTIFACT);
    let results = evaluate(
        "## assert-podman-final-args sleep 10\n\
         ## assert-podman-final-args sleep\n\
         ## assert-podman-final-args\n",
        "",
        Some(&unit),
    );
    assert_eq!(results, vec![true, false, true]);
}

#[test]
fn stderr_contains_checks_output() {
    let results = evaluate(
        "## assert-stderr-contains \"unsupported key\"\n\
         ## !assert-stderr-contains foo\n\
         ## assert-stderr-contains foo\n\
         ## assert-stderr-contains\n",
        "converting \"t.container\": unsupported key 'Foo'",
        None,
    );
    assert_eq!(results, vec![true, true, false, false]);
}

#[test]
fn checks_without_unit_do_not_match() {
    let results = evaluate(
        "## assert-key-is Service ExecStart x\n## !assert-podman-args run\n## assert-failed\n",
        "",
        None,
    );
    assert_eq!(results, vec![false, true, true]);
}

#[test]
fn negation_resolves_once() {
    let registry = AssertionRegistry::builtin();
    assert!(matches!(registry.resolve("!assert-failed"), Ok(Assertion::Negated(_))));
    let positive = registry.resolve("assert-failed").unwrap();
    assert!(matches!(positive, Assertion::Positive(_)));
    assert_eq!(positive.check().name, "assert-failed");
}

#[test]
fn unknown_operation_is_an_error() {
    let registry = AssertionRegistry::builtin();
    let err = registry.resolve("!assert-bogus").unwrap_err();
    assert_eq!(
        err,
        AssertionError::Unknown {
            name: "assert-bogus".to_string(),
        }
    );
    assert_eq!(err.to_string(), "unknown assertion assert-bogus");
}

#[test]
fn custom_checks_can_be_registered() {
    fn output_is_empty(_arguments: &[String], context: &CheckContext<'_>) -> bool {
        context.output.is_empty()
    }
    let mut registry = AssertionRegistry::new();
    registry.register("assert-quiet", output_is_empty);
    let context = CheckContext {
        output: "",
        unit: None,
        command: &[],
    };
    let descriptor = Descriptor::from_text("q.container", "## assert-quiet\n").unwrap();
    assert!(registry.evaluate(&descriptor.directives[0], &context).unwrap());
    assert!(registry.resolve("assert-failed").is_err());
}

#[test]
fn command_invocation_rejects_broken_quoting() {
    let unit = ParsedUnit::from_artifact("[Service]\nExecStart=/bin/podman run 'oops\n");
    assert!(command_invocation(&unit).is_err());
    let empty = ParsedUnit::from_artifact("[Service]\nType=oneshot\n");
    assert!(command_invocation(&empty).unwrap().is_empty());
}
