//! Title fingerprinting (SimHash)
//!
//! Reduces "is this title like that title" to a fixed-width bit comparison:
//! the store narrows candidates with a cheap Hamming-distance query before any
//! per-pair scoring runs.
//!
//! Fingerprints travel as bit strings (64 chars of '0'/'1'). The empty string
//! is the "no fingerprint" sentinel for empty/whitespace-only titles and must
//! never be scored; comparisons involving it report `INCOMPARABLE_DISTANCE`.

/// Fingerprint width in bits
pub const FINGERPRINT_BITS: usize = 64;

/// Sentinel distance for incomparable fingerprints (empty or mismatched
/// length). Callers must branch on this before using the value arithmetically.
pub const INCOMPARABLE_DISTANCE: u32 = u32::MAX;

/// Default threshold for [`are_similar`]
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Tokens carrying no signal for title comparison
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "with", "for", "on", "my", "our", "best",
    "easy", "quick", "simple", "homemade", "recipe",
];

/// Compute the SimHash fingerprint of a title.
///
/// Normalizes (trim, lowercase) first; an empty normalized input yields the
/// empty-string sentinel. Pure function: the same input always produces the
/// same bit string.
pub fn fingerprint(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return String::new();
    }

    let mut weights = [0i32; FINGERPRINT_BITS];
    for raw_token in normalized.split_whitespace() {
        let token = raw_token.trim_matches(|c: char| !c.is_alphanumeric());
        if token.is_empty() || STOP_WORDS.contains(&token) {
            continue;
        }
        let hash = fnv1a_64(token.as_bytes());
        for (bit, weight) in weights.iter_mut().enumerate() {
            if (hash >> bit) & 1 == 1 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    }

    weights
        .iter()
        .map(|w| if *w > 0 { '1' } else { '0' })
        .collect()
}

/// FNV-1a 64-bit hash
fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Count of differing bit positions between two fingerprints.
///
/// Empty input or a length mismatch returns [`INCOMPARABLE_DISTANCE`] rather
/// than panicking: an absent fingerprint is "least similar", not an error.
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return INCOMPARABLE_DISTANCE;
    }
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() as u32
}

/// Similarity in [0, 1]: `1 - distance/width`.
///
/// Two empty fingerprints agree by absence (1.0); production flow filters
/// empty fingerprints before ever comparing, so that branch is a test-only
/// edge, not a shortcut for untitled notes.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let distance = hamming_distance(a, b);
    if distance == INCOMPARABLE_DISTANCE {
        return 0.0;
    }
    1.0 - f64::from(distance) / a.len() as f64
}

/// Whether two fingerprints clear the similarity threshold
pub fn are_similar(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) >= threshold
}
