// src/similarity.rs
//! "Same story?" heuristic for titles. Deliberately permissive: a skipped
//! repost is cheaper than a duplicate.

use std::collections::HashSet;

/// Minimum whitespace tokens both titles need before token overlap is tried.
pub const MIN_TOKENS_FOR_OVERLAP: usize = 4;
/// Overlap ratio that must be exceeded (strictly) to call titles similar.
pub const OVERLAP_THRESHOLD: f64 = 0.7;

/// Callers lower-case both titles first.
pub fn is_similar_title(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }

    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();
    if words_a.len() < MIN_TOKENS_FOR_OVERLAP || words_b.len() < MIN_TOKENS_FOR_OVERLAP {
        return false;
    }

    let seen: HashSet<&str> = words_a
        .iter()
        .copied()
        .filter(|w| is_significant(w))
        .collect();
    let common = words_b
        .iter()
        .filter(|w| is_significant(w) && seen.contains(*w))
        .count();

    let min_words = words_a.len().min(words_b.len());
    (common as f64 / min_words as f64) > OVERLAP_THRESHOLD
}

// Short words ("a", "of", "to") carry no signal.
fn is_significant(word: &str) -> bool {
    word.chars().count() > 2
}
