//! String similarity scoring for fuzzy candidate filtering.
//!
//! A normalized edit-distance ratio: case-insensitive, ignores leading and
//! trailing whitespace, deterministic. Strings identical after normalization
//! score exactly 1.0; either side empty scores 0.0.

/// Score two strings for closeness, in `[0, 1]`.
pub fn score(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}
