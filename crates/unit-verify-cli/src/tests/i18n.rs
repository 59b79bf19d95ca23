// crates/unit-verify-cli/src/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Unit tests for catalog parity and locale parsing.
// Purpose: Ensure CLI localization remains consistent across supported locales.
// Dependencies: unit-verify-cli i18n module
// ============================================================================

//! ## Overview
//! Verifies the CLI message catalogs stay in sync, locale parsing is tolerant,
//! and the report framing lines are identical in every locale.

use std::collections::BTreeSet;

use crate::i18n::Locale;
use crate::i18n::MessageArg;
use crate::i18n::SUPPORTED_LOCALES;
use crate::i18n::catalog_for;
use crate::i18n::translate;

#[test]
fn catalogs_have_matching_keys() {
    assert!(SUPPORTED_LOCALES.contains(&Locale::En), "English must remain the baseline locale");
    let en_keys: BTreeSet<&'static str> = catalog_for(Locale::En).keys().copied().collect();
    for locale in SUPPORTED_LOCALES {
        let locale_keys: BTreeSet<&'static str> = catalog_for(*locale).keys().copied().collect();
        assert_eq!(en_keys, locale_keys, "locale catalogs must stay in parity ({locale:?})");
    }
}

#[test]
fn catalogs_keep_placeholders_in_parity() {
    let en = catalog_for(Locale::En);
    for locale in SUPPORTED_LOCALES {
        for (key, template) in catalog_for(*locale) {
            let english = en.get(key).copied().expect("key exists in English");
            for placeholder in ["{file}", "{error}", "{path}", "{artifact}", "{count}", "{env}"] {
                assert_eq!(
                    english.contains(placeholder),
                    template.contains(placeholder),
                    "placeholder {placeholder} mismatch for {key} ({locale:?})"
                );
            }
        }
    }
}

#[test]
fn artifact_frames_are_not_translated() {
    for key in ["run.artifact_header", "run.artifact_footer"] {
        let en = catalog_for(Locale::En).get(key).copied();
        let ca = catalog_for(Locale::Ca).get(key).copied();
        assert_eq!(en, ca, "{key} must be identical across locales");
    }
}

#[test]
fn locale_parse_accepts_region_tags_and_case() {
    assert_eq!(Locale::parse("en"), Some(Locale::En));
    assert_eq!(Locale::parse("EN"), Some(Locale::En));
    assert_eq!(Locale::parse("en-US"), Some(Locale::En));
    assert_eq!(Locale::parse("en_us"), Some(Locale::En));
    assert_eq!(Locale::parse("ca"), Some(Locale::Ca));
    assert_eq!(Locale::parse("ca-ES"), Some(Locale::Ca));
    assert_eq!(Locale::parse(""), None);
    assert_eq!(Locale::parse("de"), None);
}

#[test]
fn locale_labels_round_trip() {
    for locale in SUPPORTED_LOCALES {
        assert_eq!(Locale::parse(locale.as_str()), Some(*locale));
    }
}

#[test]
fn catalan_translation_differs_for_known_key() {
    let en = catalog_for(Locale::En).get("run.case_started").copied().expect("en key exists");
    let ca = catalog_for(Locale::Ca).get("run.case_started").copied().expect("ca key exists");
    assert_ne!(en, ca, "expected Catalan translation to differ from English");
}

#[test]
fn translate_substitutes_placeholders() {
    let output = translate(
        "run.case_failed",
        vec![MessageArg::new("file", "web.container"), MessageArg::new("error", "boom")],
    );
    assert!(output.contains("web.container"));
    assert!(output.contains("boom"));
}
