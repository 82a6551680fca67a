//! Duplicate confidence combinator
//!
//! Merges title similarity and ingredient similarity into one weighted score
//! and a human-readable explanation, and applies the decision thresholds.
//! Title dominates the weighting: it is the stronger discriminative signal and
//! is always present when ingredients are not.

use uuid::Uuid;

/// Weight of title similarity in the combined confidence
pub const TITLE_WEIGHT: f64 = 0.7;
/// Weight of ingredient similarity in the combined confidence
pub const INGREDIENT_WEIGHT: f64 = 0.3;
/// Minimum confidence worth recording as a candidate match
pub const MATCH_FLOOR: f64 = 0.5;
/// Confidence at or above which a note is marked duplicate
pub const DUPLICATE_THRESHOLD: f64 = 0.90;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Combined confidence: `round2(title*0.7 + ingredient*0.3)`
pub fn combine(title_similarity: f64, ingredient_similarity: f64) -> f64 {
    round2(title_similarity * TITLE_WEIGHT + ingredient_similarity * INGREDIENT_WEIGHT)
}

/// Explanation string embedding both component percentages
pub fn match_reason(title_similarity: f64, ingredient_similarity: f64) -> String {
    format!(
        "Title similarity: {:.1}%, Ingredient similarity: {:.1}%",
        title_similarity * 100.0,
        ingredient_similarity * 100.0
    )
}

/// One scored comparison against an existing note.
///
/// Transient: lives only for the duration of one duplicate check.
#[derive(Debug, Clone)]
pub struct CandidateMatch {
    pub note_id: Uuid,
    pub title: String,
    /// Combined confidence, rounded to 2 decimals, in [0, 1]
    pub confidence: f64,
    pub match_reason: String,
}

/// Score one candidate; matches below [`MATCH_FLOOR`] are discarded, not
/// returned, even for diagnostics.
pub fn score_candidate(
    note_id: Uuid,
    title: &str,
    title_similarity: f64,
    ingredient_similarity: f64,
) -> Option<CandidateMatch> {
    let confidence = combine(title_similarity, ingredient_similarity);
    if confidence < MATCH_FLOOR {
        return None;
    }
    Some(CandidateMatch {
        note_id,
        title: title.to_string(),
        confidence,
        match_reason: match_reason(title_similarity, ingredient_similarity),
    })
}

/// Outcome of one duplicate check over all candidates
#[derive(Debug, Clone)]
pub struct DuplicateDecision {
    /// True iff the best confidence clears [`DUPLICATE_THRESHOLD`]
    pub is_duplicate: bool,
    /// All recorded matches, sorted descending by confidence (stable, so ties
    /// keep arrival order and the best match is always `matches[0]`)
    pub matches: Vec<CandidateMatch>,
    /// Highest confidence seen, 0.0 when no matches were recorded
    pub best_confidence: f64,
}

/// Sort matches and derive the duplicate decision
pub fn decide(mut matches: Vec<CandidateMatch>) -> DuplicateDecision {
    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let best_confidence = matches.first().map(|m| m.confidence).unwrap_or(0.0);
    DuplicateDecision {
        is_duplicate: best_confidence >= DUPLICATE_THRESHOLD,
        matches,
        best_confidence,
    }
}
