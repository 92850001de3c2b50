//! Concept-set similarity

use std::collections::HashSet;

/// Jaccard similarity of two concept sequences treated as sets.
///
/// Returns `|A ∩ B| / |A ∪ B|`, or 0.0 when both sets are empty.
pub fn jaccard<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let set_b: HashSet<&str> = b.iter().map(AsRef::as_ref).collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.len() + set_b.len() - intersection;

    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
