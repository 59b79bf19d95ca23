// crates/unit-verify-core/src/sequence.rs
// ============================================================================
// Module: Sequence Matching
// Description: Positional sublist and suffix checks over token sequences.
// Purpose: Inspect generated command lines for required argument runs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Pure helpers over slices. Element types only need `PartialEq` across the
//! two sides, so owned tokens can be matched against borrowed needles.
//!
//! An empty needle is never "found" by [`find_sublist`]; assertions would
//! otherwise pass vacuously.

/// Returns true when `needle` fits in `haystack` at `start` and every
/// element matches positionally.
#[must_use]
pub fn contains_sublist_at<A, B>(haystack: &[A], start: usize, needle: &[B]) -> bool
where
    A: PartialEq<B>,
{
    let Some(window) = haystack.get(start ..) else {
        return false;
    };
    if needle.len() > window.len() {
        return false;
    }
    window.iter().zip(needle).all(|(have, want)| have == want)
}

/// Returns the first offset at which `needle` occurs in `haystack`.
///
/// An empty needle is reported as not found.
#[must_use]
pub fn find_sublist<A, B>(haystack: &[A], needle: &[B]) -> Option<usize>
where
    A: PartialEq<B>,
{
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0 ..= haystack.len() - needle.len()).find(|&start| contains_sublist_at(haystack, start, needle))
}

/// Returns true when `needle` equals the trailing elements of `haystack`.
#[must_use]
pub fn matches_suffix<A, B>(haystack: &[A], needle: &[B]) -> bool
where
    A: PartialEq<B>,
{
    haystack
        .len()
        .checked_sub(needle.len())
        .is_some_and(|start| contains_sublist_at(haystack, start, needle))
}
