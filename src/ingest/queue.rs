//! Background ingestion queue: submit-and-acknowledge.
//!
//! Uploads are acknowledged as soon as they are accepted onto a bounded
//! channel; a single worker task drains the channel through
//! `IngestService::ingest` outside any request lifecycle.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::IngestService;

/// A queued ingestion job.
#[derive(Debug, Clone)]
pub struct IngestJob {
    /// Stored file to ingest.
    pub path: PathBuf,
    /// Uploading user.
    pub user_id: i64,
}

/// Acknowledgment returned by `submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitAck {
    /// The job was accepted and will run in the background.
    Accepted,
    /// The queue is full or the worker is gone; the job was dropped.
    Rejected,
}

/// Handle for submitting ingestion jobs to the background worker.
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<IngestJob>,
}

impl IngestQueue {
    /// Start the worker task and return the submission handle.
    pub fn start(service: Arc<IngestService>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<IngestJob>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                info!(path = %job.path.display(), user_id = job.user_id, "Ingestion job started");
                service.ingest(&job.path).await;
            }
            info!("Ingestion worker stopped");
        });

        (Self { tx }, worker)
    }

    /// Submit a job. Never blocks: a full queue rejects the job instead of
    /// stalling the caller.
    pub fn submit(&self, job: IngestJob) -> SubmitAck {
        match self.tx.try_send(job) {
            Ok(()) => SubmitAck::Accepted,
            Err(e) => {
                warn!(error = %e, "Ingestion job rejected");
                SubmitAck::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use tempfile::tempdir;

    fn test_service(dir: &std::path::Path) -> Arc<IngestService> {
        let config = IngestConfig {
            upload_dir: dir.to_path_buf(),
            ..IngestConfig::default()
        };
        Arc::new(IngestService::new(config, None, None))
    }

    #[tokio::test]
    async fn test_submit_and_drain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        tokio::fs::write(&path, "hello").await.unwrap();

        let (queue, worker) = IngestQueue::start(test_service(dir.path()), 4);
        let ack = queue.submit(IngestJob { path, user_id: 1 });
        assert_eq!(ack, SubmitAck::Accepted);

        drop(queue);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let dir = tempdir().unwrap();
        // No worker attached: the channel fills and further submits fail.
        let (tx, _rx) = mpsc::channel::<IngestJob>(1);
        let queue = IngestQueue { tx };

        let job = IngestJob {
            path: dir.path().join("a.txt"),
            user_id: 1,
        };
        assert_eq!(queue.submit(job.clone()), SubmitAck::Accepted);
        assert_eq!(queue.submit(job), SubmitAck::Rejected);
    }

    #[tokio::test]
    async fn test_submit_after_worker_gone_rejects() {
        let dir = tempdir().unwrap();
        let (queue, worker) = IngestQueue::start(test_service(dir.path()), 4);

        worker.abort();
        let _ = worker.await;

        let ack = queue.submit(IngestJob {
            path: dir.path().join("b.txt"),
            user_id: 2,
        });
        assert_eq!(ack, SubmitAck::Rejected);
    }
}
