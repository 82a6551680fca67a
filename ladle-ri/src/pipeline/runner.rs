//! Stage runner
//!
//! Sequences the pipeline stages for one job: validates input, emits
//! start/completion/failure status events, and applies the retry policy to
//! retryable stage errors. Stage order is fixed and totally ordered within a
//! job; no stage begins before the previous stage's `execute` resolves.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ladle_common::events::StageContext;
use tracing::{error, info, warn};

use crate::pipeline::{ActionContext, ImportAction, ImportPayload, StageDeps, StageError};
use crate::queue::{ImportJob, QUEUE_NAME};

/// Retry policy for retryable stage errors (the queue configuration surface)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds
    pub backoff_ms: u64,
    /// Upper bound on the backoff delay
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(cfg: &ladle_common::config::ImportConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            backoff_ms: cfg.backoff_ms,
            max_backoff_ms: cfg.max_backoff_ms,
        }
    }

    /// Exponential backoff: `backoff_ms * 2^(attempt-1)`, capped at
    /// `max_backoff_ms`. `attempt` is the 1-based attempt that just failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self
            .backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Terminal failure of one job, attributed to the stage that failed
#[derive(Debug)]
pub struct JobFailure {
    pub stage: StageContext,
    pub stage_name: &'static str,
    pub note_id: Option<uuid::Uuid>,
    pub error: StageError,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} failed: {}", self.stage_name, self.error)
    }
}

/// Sequences stages for one job and advances the payload through the pipeline
pub struct StageRunner {
    stages: Vec<Arc<dyn ImportAction>>,
    deps: StageDeps,
    policy: RetryPolicy,
}

impl StageRunner {
    pub fn new(stages: Vec<Arc<dyn ImportAction>>, deps: StageDeps, policy: RetryPolicy) -> Self {
        Self {
            stages,
            deps,
            policy,
        }
    }

    /// Run every stage in order for one job.
    ///
    /// Returns the final payload, or the first terminal stage failure. The
    /// caller owns terminal reporting (completion/failure events, payload
    /// logging and drop).
    pub async fn run_job(&self, job: &ImportJob) -> Result<ImportPayload, JobFailure> {
        let mut payload = ImportPayload::from_job(job);

        for stage in &self.stages {
            payload = self.run_stage(stage.as_ref(), payload).await?;
        }

        Ok(payload)
    }

    async fn run_stage(
        &self,
        stage: &dyn ImportAction,
        payload: ImportPayload,
    ) -> Result<ImportPayload, JobFailure> {
        let import_id = payload.import_id;
        let context = stage.context();

        // Validation failures are poison pills: fail immediately, never invoke
        // execute, never consume a retry, no start event.
        if let Err(err) = stage.validate_input(&payload) {
            warn!(
                stage = stage.name(),
                import_id = %import_id,
                error = %err,
                "Stage input validation failed"
            );
            if let Some(broadcaster) = &self.deps.broadcaster {
                broadcaster.stage_failed(import_id, context, &err.to_string(), payload.note_id);
            }
            return Err(JobFailure {
                stage: context,
                stage_name: stage.name(),
                note_id: payload.note_id,
                error: err,
            });
        }

        let mut attempt: u32 = 1;
        loop {
            if let Some(broadcaster) = &self.deps.broadcaster {
                broadcaster.stage_started(
                    import_id,
                    context,
                    stage.start_message(),
                    payload.note_id,
                );
            }

            let ctx = ActionContext {
                job_id: import_id,
                queue: QUEUE_NAME,
                attempt,
                started_at: Utc::now(),
            };

            match stage.execute(payload.clone(), &self.deps, &ctx).await {
                Ok(output) => {
                    info!(
                        stage = stage.name(),
                        import_id = %import_id,
                        attempt,
                        "Stage completed: {}",
                        output.completion.message
                    );
                    if let Some(broadcaster) = &self.deps.broadcaster {
                        broadcaster.stage_completed(
                            import_id,
                            context,
                            &output.completion,
                            output.payload.note_id,
                        );
                    }
                    return Ok(output.payload);
                }
                Err(err) if err.is_retryable() && attempt <= self.policy.max_retries => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        stage = stage.name(),
                        import_id = %import_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Stage attempt failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        stage = stage.name(),
                        import_id = %import_id,
                        attempt,
                        error = %err,
                        "Stage failed terminally"
                    );
                    if let Some(broadcaster) = &self.deps.broadcaster {
                        broadcaster.stage_failed(
                            import_id,
                            context,
                            &err.to_string(),
                            payload.note_id,
                        );
                    }
                    return Err(JobFailure {
                        stage: context,
                        stage_name: stage.name(),
                        note_id: payload.note_id,
                        error: err,
                    });
                }
            }
        }
    }
}
