//! Phone number normalization.
//!
//! Address-book entries and message history format the same number in
//! different ways (`+1 (555) 123-4567` vs `15551234567`). Both sides are
//! reduced to a comparable key before matching.

/// Characters dropped from a number before comparison.
const STRIPPED: [char; 5] = ['+', '(', ')', ' ', '-'];

/// Canonicalize a phone number to a comparable key.
///
/// Only formatting characters are removed; there is no length or
/// country-code validation. Total: empty input yields an empty key.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| !STRIPPED.contains(c)).collect()
}
