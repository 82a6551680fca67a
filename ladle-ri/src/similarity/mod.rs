//! Similarity engines for duplicate detection
//!
//! Pure, synchronous leaves: title fingerprinting (SimHash + Hamming
//! distance), ingredient set similarity (Jaccard), and the weighted
//! confidence combinator. None of these touch the store.

pub mod confidence;
pub mod fingerprint;
pub mod ingredients;
