//! Ingredient set similarity (Jaccard)

use std::collections::HashSet;

/// Jaccard similarity `|A∩B| / |A∪B|` over two sets.
///
/// Two empty sets agree vacuously (1.0). Note that ingredient comparison does
/// NOT use the vacuous case: [`ingredient_similarity`] reports 0.0 when either
/// side has nothing to compare.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Normalize one ingredient entry for comparison
fn normalize(entry: &str) -> String {
    entry.trim().to_lowercase()
}

/// Similarity between two ingredient lists.
///
/// Entries are normalized (trim, lowercase) and empty entries dropped before
/// set construction. An empty set on either side means there is no evidence of
/// overlap, so the result is 0.0, never the vacuous-agreement 1.0.
pub fn ingredient_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<String> = a
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();
    let set_b: HashSet<String> = b
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();

    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    jaccard(&set_a, &set_b)
}
