// crates/unit-verify-core/src/tokenizer.rs
// ============================================================================
// Module: Shell Word Tokenizer
// Description: POSIX shell-style word splitting and quoting.
// Purpose: Split directive lines and recorded command strings into tokens.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Splits text into words using POSIX shell quoting rules: single quotes are
//! literal, double quotes honor a small set of backslash escapes, and an
//! unquoted backslash escapes the next character. `#` is an ordinary
//! character; no comment stripping happens here.
//!
//! ## Invariants
//! - Splitting is pure and deterministic.
//! - Unterminated quotes and trailing escapes fail; they never recover.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Malformed input encountered while splitting words.
///
/// # Invariants
/// - `position` is the byte offset of the offending quote or backslash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    /// A quoted span was opened and never closed.
    #[error("unterminated {quote} quote starting at byte {position}")]
    UnterminatedQuote {
        /// The opening quote character.
        quote: char,
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Input ended right after an unquoted backslash.
    #[error("no character to escape after backslash at byte {position}")]
    DanglingEscape {
        /// Byte offset of the backslash.
        position: usize,
    },
}

// ============================================================================
// SECTION: Splitting
// ============================================================================

/// Splits `input` into words following POSIX shell quoting rules.
///
/// # Errors
///
/// Returns [`TokenizeError`] on an unterminated quote or a trailing backslash.
pub fn split_words(input: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.char_indices();

    while let Some((position, ch)) = chars.next() {
        match ch {
            ' ' | '\t' | '\n' | '\r' => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '\'')) => break,
                        Some((_, quoted)) => current.push(quoted),
                        None => {
                            return Err(TokenizeError::UnterminatedQuote {
                                quote: '\'',
                                position,
                            });
                        }
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, '\n')) => {}
                            Some((_, escaped @ ('"' | '\\' | '$' | '`'))) => current.push(escaped),
                            Some((_, other)) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => {
                                return Err(TokenizeError::UnterminatedQuote {
                                    quote: '"',
                                    position,
                                });
                            }
                        },
                        Some((_, quoted)) => current.push(quoted),
                        None => {
                            return Err(TokenizeError::UnterminatedQuote {
                                quote: '"',
                                position,
                            });
                        }
                    }
                }
            }
            '\\' => match chars.next() {
                // Line continuation.
                Some((_, '\n')) => {}
                Some((_, escaped)) => {
                    in_word = true;
                    current.push(escaped);
                }
                None => return Err(TokenizeError::DanglingEscape { position }),
            },
            other => {
                in_word = true;
                current.push(other);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

// ============================================================================
// SECTION: Quoting
// ============================================================================

/// Returns true when `ch` never needs quoting in a shell word.
const fn is_shell_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-')
}

/// Quotes a single word so that [`split_words`] yields it back unchanged.
#[must_use]
pub fn quote_word(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if word.chars().all(is_shell_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

/// Joins words into one shell-safe command string.
#[must_use]
pub fn join_words<S: AsRef<str>>(words: &[S]) -> String {
    words.iter().map(|word| quote_word(word.as_ref())).collect::<Vec<_>>().join(" ")
}
