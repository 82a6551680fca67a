//! Job queue boundary
//!
//! The queue transport itself (persistence, acknowledgment, broker semantics)
//! is an external collaborator; the pipeline only needs push/pop. The
//! in-process [`MemoryQueue`] backs the service binary and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ladle_common::{Error, Result};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Queue name carried in action contexts and logs
pub const QUEUE_NAME: &str = "recipe-import";

/// One queued import: a submitted document plus its source metadata
#[derive(Debug, Clone)]
pub struct ImportJob {
    pub import_id: Uuid,
    pub html: String,
    pub source_url: Option<String>,
    pub image_urls: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(html: String, source_url: Option<String>, image_urls: Vec<String>) -> Self {
        Self {
            import_id: Uuid::new_v4(),
            html,
            source_url,
            image_urls,
            submitted_at: Utc::now(),
        }
    }
}

/// Transport boundary the worker pool consumes from
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job for processing
    async fn push(&self, job: ImportJob) -> Result<()>;

    /// Dequeue the next job; `None` means the queue is closed and workers
    /// should exit
    async fn pop(&self) -> Option<ImportJob>;

    fn name(&self) -> &'static str {
        QUEUE_NAME
    }
}

/// In-process queue over a tokio mpsc channel.
///
/// Multiple workers pop concurrently; the receiver sits behind an async mutex
/// so exactly one worker takes each job.
pub struct MemoryQueue {
    tx: mpsc::Sender<ImportJob>,
    rx: tokio::sync::Mutex<mpsc::Receiver<ImportJob>>,
}

impl MemoryQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn push(&self, job: ImportJob) -> Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Internal("Import queue is closed".to_string()))
    }

    async fn pop(&self) -> Option<ImportJob> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let queue = MemoryQueue::new(8);
        let a = ImportJob::new("<p>a</p>".into(), None, Vec::new());
        let b = ImportJob::new("<p>b</p>".into(), None, Vec::new());
        let a_id = a.import_id;
        let b_id = b.import_id;

        queue.push(a).await.unwrap();
        queue.push(b).await.unwrap();

        assert_eq!(queue.pop().await.unwrap().import_id, a_id);
        assert_eq!(queue.pop().await.unwrap().import_id, b_id);
    }

    #[tokio::test]
    async fn test_each_job_delivered_once() {
        let queue = std::sync::Arc::new(MemoryQueue::new(32));
        for _ in 0..10 {
            queue
                .push(ImportJob::new("<p>x</p>".into(), None, Vec::new()))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                while let Ok(Some(job)) =
                    tokio::time::timeout(std::time::Duration::from_millis(50), queue.pop()).await
                {
                    seen.push(job.import_id);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 10, "every job delivered exactly once");
    }
}
