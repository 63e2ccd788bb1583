//! String similarity used by the deduplicator.
//!
//! The score is the sequence-matcher ratio `2 * matched / (len(a) + len(b))`,
//! where `matched` is the total size of the matching blocks `difflib` finds.
//! Both inputs are case-folded first.

use difflib::sequencematcher::SequenceMatcher;

/// Similarity of two strings in `[0, 1]`; `1.0` means identical after case folding.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // difflib's own ratio() is f32; summing the blocks keeps threshold checks exact
    let mut matcher = SequenceMatcher::new(&a, &b);
    let matched: usize = matcher.get_matching_blocks().iter().map(|m| m.size).sum();
    2.0 * matched as f64 / total as f64
}
