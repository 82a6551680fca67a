//! Duplicate-check stage
//!
//! Compares the imported note against existing notes with a close title
//! fingerprint. Title similarity (SimHash/Hamming) and ingredient similarity
//! (Jaccard) combine into one confidence score; at high confidence the note is
//! marked duplicate on the note record, out-of-band of the pipeline payload.
//!
//! This stage performs no internal retry and never suppresses a store error:
//! failures are logged once with context and re-thrown for the runner's
//! policy.

use async_trait::async_trait;
use ladle_common::events::StageContext;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{
    ActionContext, ImportAction, ImportPayload, StageCompletion, StageDeps, StageError, StageOutput,
};
use crate::similarity::confidence::{decide, score_candidate, CandidateMatch, DuplicateDecision};
use crate::similarity::fingerprint::{fingerprint, similarity};
use crate::similarity::ingredients::ingredient_similarity;
use crate::store::{DuplicateVerdict, NoteStore, NoteWithLines};

/// Candidate search window: notes within this Hamming distance of the current
/// title fingerprint
pub const MAX_CANDIDATE_DISTANCE: u32 = 3;

/// Human-readable reason persisted with the duplicate marking, built from the
/// top match
fn duplicate_reason(best: &CandidateMatch) -> String {
    format!(
        "Appears to be a duplicate of \"{}\" ({:.1}% match). {}",
        best.title,
        best.confidence * 100.0,
        best.match_reason
    )
}

pub struct DuplicateCheckStage;

impl DuplicateCheckStage {
    pub fn new() -> Self {
        Self
    }

    /// Completion report for every "nothing was marked" path
    fn no_duplicates() -> StageCompletion {
        StageCompletion::with_metadata(
            "Verified no duplicates!",
            serde_json::json!({ "duplicateCount": 0 }),
        )
    }

    async fn check(
        &self,
        note_id: Uuid,
        store: &dyn NoteStore,
    ) -> Result<StageCompletion, StageError> {
        // Load the current note with its parsed lines
        let current = store
            .note_with_lines(note_id)
            .await?
            .ok_or_else(|| StageError::NotFound(format!("Note with ID {} not found", note_id)))?;

        // Title gate: untitled notes are never duplicate-check targets.
        // Terminal success, not an error.
        let title = match current.note.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                info!(note_id = %note_id, "Note has no title; skipping duplicate check");
                return Ok(Self::no_duplicates());
            }
        };

        // Refresh the stored fingerprint if stale
        let current_fingerprint = fingerprint(&title);
        if current_fingerprint.is_empty() {
            // Only reachable if the title gate were bypassed; never query the
            // store with the empty sentinel
            warn!(note_id = %note_id, "Title produced empty fingerprint; reporting no duplicates");
            return Ok(Self::no_duplicates());
        }
        if current.note.title_fingerprint.as_deref() != Some(current_fingerprint.as_str()) {
            store
                .update_title_fingerprint(note_id, &current_fingerprint)
                .await?;
        }

        // Candidate search within the Hamming window, excluding ourselves
        let candidates = store
            .notes_with_similar_titles(&current_fingerprint, MAX_CANDIDATE_DISTANCE, note_id)
            .await?;

        let mut matches: Vec<CandidateMatch> = Vec::new();
        for candidate in candidates {
            // Candidates without a usable fingerprint or title are skipped,
            // not scored
            let candidate_fingerprint = match candidate.title_fingerprint.as_deref() {
                Some(fp) if !fp.is_empty() => fp,
                _ => {
                    info!(note_id = %candidate.id, "Candidate has no fingerprint; skipping");
                    continue;
                }
            };
            let candidate_title = match candidate.title.as_deref().map(str::trim) {
                Some(t) if !t.is_empty() => t,
                _ => {
                    info!(note_id = %candidate.id, "Candidate has no title; skipping");
                    continue;
                }
            };

            let title_similarity = similarity(&current_fingerprint, candidate_fingerprint);
            let ingredient_sim = self
                .candidate_ingredient_similarity(&current, candidate.id, store)
                .await?;

            if let Some(m) =
                score_candidate(candidate.id, candidate_title, title_similarity, ingredient_sim)
            {
                matches.push(m);
            }
        }

        let decision = decide(matches);
        self.apply_decision(note_id, decision, store).await
    }

    /// Ingredient similarity against one candidate, fetched via a second store
    /// lookup.
    ///
    /// Missing or one-sided ingredient data never proxies as a match: the
    /// similarity function is not even called unless both notes have parsed
    /// lines.
    async fn candidate_ingredient_similarity(
        &self,
        current: &NoteWithLines,
        candidate_id: Uuid,
        store: &dyn NoteStore,
    ) -> Result<f64, StageError> {
        let Some(candidate) = store.note_with_lines(candidate_id).await? else {
            info!(note_id = %candidate_id, "Candidate ingredients unavailable; forcing 0.0");
            return Ok(0.0);
        };

        if current.ingredients.is_empty() || candidate.ingredients.is_empty() {
            return Ok(0.0);
        }

        Ok(ingredient_similarity(
            &current.ingredient_references(),
            &candidate.ingredient_references(),
        ))
    }

    async fn apply_decision(
        &self,
        note_id: Uuid,
        decision: DuplicateDecision,
        store: &dyn NoteStore,
    ) -> Result<StageCompletion, StageError> {
        if decision.is_duplicate {
            // Stable sort guarantees the justifying match is first
            let best = &decision.matches[0];
            let reason = duplicate_reason(best);
            let verdict = DuplicateVerdict {
                existing_notes: decision
                    .matches
                    .iter()
                    .map(|m| (m.note_id, m.title.clone()))
                    .collect(),
                duplicate_reason: reason,
                confidence: best.confidence,
            };
            let duplicate_count = verdict.existing_notes.len();
            store.mark_note_as_duplicate(note_id, verdict).await?;
            info!(
                note_id = %note_id,
                confidence = best.confidence,
                candidates = duplicate_count,
                "Duplicate note identified"
            );
            Ok(StageCompletion::with_metadata(
                "Duplicate note identified!",
                serde_json::json!({ "duplicateCount": duplicate_count }),
            ))
        } else if !decision.matches.is_empty() {
            info!(
                note_id = %note_id,
                best_confidence = decision.best_confidence,
                candidates = decision.matches.len(),
                "Potential duplicates found, confidence too low; keeping as non-duplicate"
            );
            Ok(Self::no_duplicates())
        } else {
            info!(note_id = %note_id, "No duplicates found");
            Ok(Self::no_duplicates())
        }
    }
}

impl Default for DuplicateCheckStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportAction for DuplicateCheckStage {
    fn name(&self) -> &'static str {
        "duplicate-check"
    }

    fn context(&self) -> StageContext {
        StageContext::CheckDuplicates
    }

    fn start_message(&self) -> &'static str {
        "Checking for duplicate notes..."
    }

    fn validate_input(&self, payload: &ImportPayload) -> Result<(), StageError> {
        if payload.note_id.is_none() {
            return Err(StageError::Validation(
                "Note ID is required for duplicate checking".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        payload: ImportPayload,
        deps: &StageDeps,
        _ctx: &ActionContext,
    ) -> Result<StageOutput, StageError> {
        let note_id = payload.note_id.ok_or_else(|| {
            StageError::Validation("Note ID is required for duplicate checking".to_string())
        })?;

        // One diagnostic line per failure, then re-throw unmodified; the
        // runner's retry policy governs recovery
        let completion = self
            .check(note_id, deps.store.as_ref())
            .await
            .map_err(|err| {
                error!(note_id = %note_id, error = %err, "Duplicate check failed");
                err
            })?;

        // Duplicate detection annotates the note record out-of-band; the
        // payload passes through unchanged on every branch
        Ok(StageOutput {
            payload,
            completion,
        })
    }
}
