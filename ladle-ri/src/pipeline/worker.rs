//! Import worker pool
//!
//! `concurrency` workers pop jobs from the queue and run them through the
//! stage runner. Stages are sequential within a job; distinct jobs run
//! concurrently across workers. Each job attempt is bounded by the job-level
//! timeout; an attempt that exceeds it abandons the in-flight work and is
//! reported as failed.

use std::sync::Arc;
use std::time::Duration;

use ladle_common::config::ImportConfig;
use ladle_common::events::StageContext;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broadcast::StatusBroadcaster;
use crate::pipeline::runner::StageRunner;
use crate::queue::{ImportJob, JobQueue};

/// Handle to the running worker pool
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawn `config.concurrency` workers consuming from `queue`
    pub fn spawn(
        queue: Arc<dyn JobQueue>,
        runner: Arc<StageRunner>,
        broadcaster: StatusBroadcaster,
        config: &ImportConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let job_timeout = Duration::from_millis(config.job_timeout_ms);
        let mut handles = Vec::with_capacity(config.concurrency);

        for worker_id in 0..config.concurrency {
            let queue = queue.clone();
            let runner = runner.clone();
            let broadcaster = broadcaster.clone();
            let shutdown = shutdown.clone();

            handles.push(tokio::spawn(async move {
                info!(worker_id, "Import worker started");
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            info!(worker_id, "Import worker shutting down");
                            break;
                        }
                        job = queue.pop() => {
                            match job {
                                Some(job) => {
                                    process_job(worker_id, &runner, &broadcaster, job, job_timeout)
                                        .await;
                                }
                                None => {
                                    info!(worker_id, "Import queue closed; worker exiting");
                                    break;
                                }
                            }
                        }
                    }
                }
            }));
        }

        Self { handles, shutdown }
    }

    /// Signal shutdown and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// Run one job to a terminal state and report it.
///
/// The payload is logged and then dropped here; nothing outside this function
/// retains it.
async fn process_job(
    worker_id: usize,
    runner: &StageRunner,
    broadcaster: &StatusBroadcaster,
    job: ImportJob,
    job_timeout: Duration,
) {
    let import_id = job.import_id;
    let started = std::time::Instant::now();
    info!(worker_id, import_id = %import_id, "Processing import job");

    match tokio::time::timeout(job_timeout, runner.run_job(&job)).await {
        Ok(Ok(payload)) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            info!(
                worker_id,
                import_id = %import_id,
                note_id = ?payload.note_id,
                duration_ms,
                "Import completed"
            );
            broadcaster.import_completed(import_id, payload.note_id, duration_ms);
        }
        Ok(Err(failure)) => {
            error!(
                worker_id,
                import_id = %import_id,
                stage = failure.stage_name,
                error = %failure.error,
                "Import failed"
            );
            broadcaster.import_failed(
                import_id,
                failure.note_id,
                failure.stage,
                &failure.error.to_string(),
            );
        }
        Err(_elapsed) => {
            warn!(
                worker_id,
                import_id = %import_id,
                timeout_ms = job_timeout.as_millis() as u64,
                "Import job timed out"
            );
            // The in-flight stage is unknown once the future is dropped;
            // attribute the timeout to the pipeline entry stage
            broadcaster.import_failed(
                import_id,
                None,
                StageContext::CleanDocument,
                &format!("Import timed out after {} ms", job_timeout.as_millis()),
            );
        }
    }
}
