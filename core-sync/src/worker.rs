//! Worker pool
//!
//! A fixed number of workers, each claiming and finishing one job at a time.
//! A job that outlives its timeout is abandoned and failed; a job that fails
//! is moved to the failure queue untouched for an operator to inspect. Each
//! job runs in its own task, so a panicking job fails alone and its worker
//! keeps polling.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::job::Job;
use crate::orchestrator::{IndexingOrchestrator, JobOutcome};
use crate::queue::JobQueue;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct WorkerPool {
    orchestrator: Arc<IndexingOrchestrator>,
    queue: Arc<dyn JobQueue>,
    workers: usize,
    poll_interval: Duration,
}

impl WorkerPool {
    pub fn new(orchestrator: Arc<IndexingOrchestrator>, queue: Arc<dyn JobQueue>, workers: usize) -> Self {
        Self {
            orchestrator,
            queue,
            workers: workers.max(1),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// How long an idle worker waits before polling again
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run all workers until `shutdown` is cancelled.
    ///
    /// A job in progress when shutdown is requested is finished first.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(workers = self.workers, "Starting worker pool");
        let mut tasks = JoinSet::new();
        for worker_id in 0..self.workers {
            let worker = Worker {
                id: worker_id,
                orchestrator: self.orchestrator.clone(),
                queue: self.queue.clone(),
                poll_interval: self.poll_interval,
            };
            tasks.spawn(worker.run(shutdown.clone()));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task panicked");
            }
        }
        info!("Worker pool stopped");
    }

    /// Claim and run a single job; returns false when the queue was empty
    pub async fn run_once(&self) -> bool {
        let worker = Worker {
            id: 0,
            orchestrator: self.orchestrator.clone(),
            queue: self.queue.clone(),
            poll_interval: self.poll_interval,
        };
        worker.run_next().await
    }
}

struct Worker {
    id: usize,
    orchestrator: Arc<IndexingOrchestrator>,
    queue: Arc<dyn JobQueue>,
    poll_interval: Duration,
}

impl Worker {
    async fn run(self, shutdown: CancellationToken) {
        debug!(worker = self.id, "Worker started");
        while !shutdown.is_cancelled() {
            if self.run_next().await {
                continue;
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        debug!(worker = self.id, "Worker stopped");
    }

    async fn run_next(&self) -> bool {
        let job = match self.queue.dequeue().await {
            Ok(Some(job)) => job,
            Ok(None) => return false,
            Err(e) => {
                error!(worker = self.id, error = %e, "Failed to dequeue job");
                return false;
            }
        };
        self.execute(job).await;
        true
    }

    async fn execute(&self, job: Job) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let task_job = job.clone();
        let mut task = tokio::spawn(async move { orchestrator.process(&task_job).await });

        let result = match tokio::time::timeout(job.timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(worker = self.id, job_id = %job.id, error = %e, "Job task panicked");
                Err(SyncError::Panicked(e.to_string()))
            }
            Err(_) => {
                task.abort();
                Err(SyncError::Timeout(job.timeout))
            }
        };

        let recorded = match result {
            Ok(outcome) => {
                if let JobOutcome::Indexed { follow_ups } = outcome {
                    debug!(job_id = %job.id, follow_ups, "Follow-up jobs enqueued");
                }
                self.queue.mark_complete(job.id).await
            }
            Err(e) => {
                let message = format!("{} {} error: {}", job.pid, job.action, e);
                self.queue.mark_failed(job.id, &message).await
            }
        };

        if let Err(e) = recorded {
            warn!(worker = self.id, job_id = %job.id, error = %e, "Failed to record job result");
        }
    }
}
