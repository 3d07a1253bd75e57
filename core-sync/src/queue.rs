//! # Job Queue
//!
//! Persistent three-tier priority queue plus a failure queue, shared by every
//! worker process through one SQLite database.
//!
//! ## Features
//!
//! - **Strict priority**: high drains before medium, medium before low
//! - **FIFO within a tier**: ordered by insertion sequence
//! - **Atomic dequeue**: a job is claimed by exactly one worker
//! - **Duplicate suppression**: one waiting job per (identifier, action); a
//!   duplicate merges into the waiting job, raising its tier and turning on
//!   cascading when the newcomer asks for either
//! - **Failure queue**: failed jobs keep their error text until an operator
//!   requeues or removes them
//!
//! Completed jobs are deleted.
//!
//! ## Usage
//!
//! ```ignore
//! let queue = SqliteJobQueue::new(pool).await?;
//! queue.enqueue(Job::new("bdr:123", JobAction::Add)).await?;
//!
//! while let Some(job) = queue.dequeue().await? {
//!     match process(&job).await {
//!         Ok(_) => queue.mark_complete(job.id).await?,
//!         Err(e) => queue.mark_failed(job.id, &e.to_string()).await?,
//!     }
//! }
//! ```

use async_trait::async_trait;
use core_storage::ObjectId;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::job::{Job, JobAction, JobId, Priority};

const STATUS_QUEUED: &str = "queued";
const STATUS_STARTED: &str = "started";
const STATUS_FAILED: &str = "failed";

const JOB_COLUMNS: &str =
    "id, pid, action, priority, timeout_ms, cascades, enqueued_at, error";

/// Queue operations the orchestrator and workers rely on
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to the tail of its tier.
    ///
    /// When a job for the same identifier and action is already waiting,
    /// nothing is added and the waiting job's ID is returned. The waiting
    /// job keeps the higher of the two tiers and cascades if either does.
    async fn enqueue(&self, job: Job) -> Result<JobId>;

    /// Claim the oldest job of the highest non-empty tier
    async fn dequeue(&self) -> Result<Option<Job>>;

    /// Remove a finished job
    async fn mark_complete(&self, id: JobId) -> Result<()>;

    /// Move a claimed job to the failure queue
    async fn mark_failed(&self, id: JobId, error: &str) -> Result<()>;
}

/// Waiting, running and failed job counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub started: u64,
    pub failed: u64,
}

impl QueueStats {
    /// Waiting jobs in one tier
    pub fn waiting(&self, tier: Priority) -> u64 {
        match tier {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }

    /// Check if no job is waiting or running
    pub fn is_idle(&self) -> bool {
        self.high + self.medium + self.low + self.started == 0
    }
}

/// SQLite implementation of the job queue
pub struct SqliteJobQueue {
    pool: SqlitePool,
}

impl SqliteJobQueue {
    /// Open the queue, creating its table if needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let queue = Self { pool };
        queue.initialize().await?;
        Ok(queue)
    }

    /// Create the job table and its indexes
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_jobs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                pid TEXT NOT NULL,
                action TEXT NOT NULL,
                priority INTEGER NOT NULL,
                timeout_ms INTEGER NOT NULL,
                cascades INTEGER NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                enqueued_at INTEGER NOT NULL,
                started_at INTEGER,
                failed_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_index_jobs_status_priority
            ON index_jobs(status, priority DESC, seq ASC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        // One waiting job per (pid, action)
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_index_jobs_waiting
            ON index_jobs(pid, action) WHERE status = 'queued'
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find a job in any state
    pub async fn find_by_id(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM index_jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    /// Waiting jobs of one tier in dequeue order
    pub async fn waiting(&self, tier: Priority) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM index_jobs WHERE status = ? AND priority = ? ORDER BY seq ASC",
            JOB_COLUMNS
        ))
        .bind(STATUS_QUEUED)
        .bind(tier.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// Jobs in the failure queue, oldest failure first
    pub async fn failed_jobs(&self) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM index_jobs WHERE status = ? ORDER BY failed_at ASC, seq ASC",
            JOB_COLUMNS
        ))
        .bind(STATUS_FAILED)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    /// Return a failed job to the tail of its original tier.
    ///
    /// Returns false when an identical job was already waiting; the failed
    /// copy is merged into it in that case.
    pub async fn requeue(&self, id: JobId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM index_jobs WHERE id = ? AND status = ?",
            JOB_COLUMNS
        ))
        .bind(id.as_str())
        .bind(STATUS_FAILED)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(SyncError::JobNotFound {
                job_id: id.to_string(),
            });
        };
        let mut job = job_from_row(&row)?;
        job.error = None;

        sqlx::query("DELETE FROM index_jobs WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        let inserted = upsert_waiting(&mut *tx, &job).await? == job.id;

        tx.commit().await?;

        info!(
            job_id = %id,
            pid = %job.pid,
            action = %job.action,
            tier = %job.priority,
            duplicate = !inserted,
            "Requeued failed job"
        );
        Ok(inserted)
    }

    /// Requeue every failed job; returns how many went back on a tier
    pub async fn requeue_all(&self) -> Result<u64> {
        let mut requeued = 0;
        for job in self.failed_jobs().await? {
            if self.requeue(job.id).await? {
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    /// Discard a failed job
    pub async fn remove_failed(&self, id: JobId) -> Result<()> {
        let result = sqlx::query("DELETE FROM index_jobs WHERE id = ? AND status = ?")
            .bind(id.as_str())
            .bind(STATUS_FAILED)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: id.to_string(),
            });
        }
        info!(job_id = %id, "Removed failed job");
        Ok(())
    }

    /// Drop every waiting job of a tier; returns the number removed
    pub async fn empty(&self, tier: Priority) -> Result<u64> {
        let result = sqlx::query("DELETE FROM index_jobs WHERE status = ? AND priority = ?")
            .bind(STATUS_QUEUED)
            .bind(tier.as_i32())
            .execute(&self.pool)
            .await?;

        info!(tier = %tier, removed = result.rows_affected(), "Emptied queue tier");
        Ok(result.rows_affected())
    }

    /// Fail started jobs whose deadline passed without completion.
    ///
    /// A worker process that dies mid-job leaves its claim behind; this moves
    /// such claims to the failure queue so an operator can requeue them.
    pub async fn fail_abandoned(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE index_jobs
            SET status = ?, error = 'abandoned by worker', failed_at = ?
            WHERE status = ? AND started_at + timeout_ms / 1000 < ?
            "#,
        )
        .bind(STATUS_FAILED)
        .bind(now)
        .bind(STATUS_STARTED)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            warn!(count = result.rows_affected(), "Failed abandoned jobs");
        }
        Ok(result.rows_affected())
    }

    /// Waiting counts per tier plus started and failed totals
    pub async fn stats(&self) -> Result<QueueStats> {
        let rows = sqlx::query(
            "SELECT status, priority, COUNT(*) AS total FROM index_jobs GROUP BY status, priority",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = QueueStats::default();
        for row in rows {
            let status: String = row.get("status");
            let total = row.get::<i64, _>("total") as u64;
            match status.as_str() {
                STATUS_QUEUED => match Priority::from_i32(row.get("priority"))? {
                    Priority::High => stats.high += total,
                    Priority::Medium => stats.medium += total,
                    Priority::Low => stats.low += total,
                },
                STATUS_STARTED => stats.started += total,
                STATUS_FAILED => stats.failed += total,
                other => return Err(SyncError::CorruptQueue(format!("unknown job status {}", other))),
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, job: Job) -> Result<JobId> {
        let id = upsert_waiting(&self.pool, &job).await?;

        if id == job.id {
            info!(
                job_id = %job.id,
                pid = %job.pid,
                action = %job.action,
                tier = %job.priority,
                "Enqueued job"
            );
        } else {
            debug!(
                pid = %job.pid,
                action = %job.action,
                existing = %id,
                "Job already waiting, merged into it"
            );
        }
        Ok(id)
    }

    async fn dequeue(&self) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE index_jobs SET status = ?, started_at = ?
            WHERE seq = (
                SELECT seq FROM index_jobs
                WHERE status = ?
                ORDER BY priority DESC, seq ASC
                LIMIT 1
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(STATUS_STARTED)
        .bind(chrono::Utc::now().timestamp())
        .bind(STATUS_QUEUED)
        .fetch_optional(&self.pool)
        .await?;

        let job = row.as_ref().map(job_from_row).transpose()?;
        if let Some(job) = &job {
            debug!(
                job_id = %job.id,
                pid = %job.pid,
                action = %job.action,
                tier = %job.priority,
                "Dequeued job"
            );
        }
        Ok(job)
    }

    async fn mark_complete(&self, id: JobId) -> Result<()> {
        let result = sqlx::query("DELETE FROM index_jobs WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: id.to_string(),
            });
        }
        debug!(job_id = %id, "Job completed");
        Ok(())
    }

    async fn mark_failed(&self, id: JobId, error: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE index_jobs SET status = ?, error = ?, failed_at = ? WHERE id = ?",
        )
        .bind(STATUS_FAILED)
        .bind(error)
        .bind(chrono::Utc::now().timestamp())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: id.to_string(),
            });
        }
        warn!(job_id = %id, error = %error, "Job moved to failure queue");
        Ok(())
    }
}

/// Insert a waiting job, or merge it into the identical one already waiting.
///
/// One statement, so concurrent enqueuers cannot slip between the conflict
/// and the lookup. Returns the ID of the job now waiting.
async fn upsert_waiting<'c, E>(executor: E, job: &Job) -> Result<JobId>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    let id: String = sqlx::query_scalar(
        r#"
        INSERT INTO index_jobs (
            id, pid, action, priority, timeout_ms, cascades, status, enqueued_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(pid, action) WHERE status = 'queued' DO UPDATE SET
            priority = max(priority, excluded.priority),
            cascades = max(cascades, excluded.cascades)
        RETURNING id
        "#,
    )
    .bind(job.id.as_str())
    .bind(job.pid.as_str())
    .bind(job.action.as_str())
    .bind(job.priority.as_i32())
    .bind(job.timeout.as_millis() as i64)
    .bind(job.cascade)
    .bind(STATUS_QUEUED)
    .bind(job.enqueued_at)
    .fetch_one(executor)
    .await?;

    JobId::from_string(&id)
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    Ok(Job {
        id: JobId::from_string(&row.get::<String, _>("id"))?,
        pid: ObjectId::new(row.get::<String, _>("pid")),
        action: row.get::<String, _>("action").parse::<JobAction>()?,
        priority: Priority::from_i32(row.get("priority"))?,
        timeout: Duration::from_millis(row.get::<i64, _>("timeout_ms").max(0) as u64),
        cascade: row.get("cascades"),
        enqueued_at: row.get("enqueued_at"),
        error: row.get("error"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_metadata::db::create_test_pool;

    async fn queue() -> SqliteJobQueue {
        SqliteJobQueue::new(create_test_pool().await.unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_queue_dequeues_nothing() {
        let queue = queue().await;
        assert!(queue.dequeue().await.unwrap().is_none());
        assert!(queue.stats().await.unwrap().is_idle());
    }

    #[tokio::test]
    async fn test_strict_priority_then_fifo() {
        let queue = queue().await;
        queue.enqueue(Job::new("bdr:low", JobAction::Batch)).await.unwrap();
        queue.enqueue(Job::new("bdr:medium-1", JobAction::Zip)).await.unwrap();
        queue.enqueue(Job::new("bdr:high-1", JobAction::Add)).await.unwrap();
        queue.enqueue(Job::new("bdr:medium-2", JobAction::ImageParent)).await.unwrap();
        queue.enqueue(Job::new("bdr:high-2", JobAction::Update)).await.unwrap();

        let mut order = Vec::new();
        while let Some(job) = queue.dequeue().await.unwrap() {
            order.push(job.pid.to_string());
        }
        assert_eq!(
            order,
            vec!["bdr:high-1", "bdr:high-2", "bdr:medium-1", "bdr:medium-2", "bdr:low"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_waiting_job_is_suppressed() {
        let queue = queue().await;
        let first = queue.enqueue(Job::new("bdr:1", JobAction::Update)).await.unwrap();
        let second = queue.enqueue(Job::new("bdr:1", JobAction::Update)).await.unwrap();
        let other_action = queue.enqueue(Job::new("bdr:1", JobAction::Zip)).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other_action);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.high, 1);
        assert_eq!(stats.medium, 1);
    }

    #[tokio::test]
    async fn test_duplicate_turns_on_cascade_of_waiting_job() {
        let queue = queue().await;
        let first = queue
            .enqueue(Job::new("bdr:1", JobAction::Update).without_cascade())
            .await
            .unwrap();
        let second = queue.enqueue(Job::new("bdr:1", JobAction::Update)).await.unwrap();
        assert_eq!(first, second);

        // a later non-cascading copy does not turn it back off
        queue
            .enqueue(Job::new("bdr:1", JobAction::Update).without_cascade())
            .await
            .unwrap();

        let waiting = queue.find_by_id(first).await.unwrap().unwrap();
        assert!(waiting.cascade);
        assert_eq!(queue.stats().await.unwrap().high, 1);
    }

    #[tokio::test]
    async fn test_duplicate_raises_tier_of_waiting_job() {
        let queue = queue().await;
        let first = queue
            .enqueue(Job::new("bdr:1", JobAction::Add).with_priority(Priority::Low))
            .await
            .unwrap();
        queue.enqueue(Job::new("bdr:other", JobAction::Add)).await.unwrap();
        assert_eq!(queue.stats().await.unwrap().low, 1);

        let second = queue.enqueue(Job::new("bdr:1", JobAction::Add)).await.unwrap();
        assert_eq!(first, second);

        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.low, 0);
        assert_eq!(stats.high, 2);

        // a lower-tier copy leaves it where it is
        queue
            .enqueue(Job::new("bdr:1", JobAction::Add).with_priority(Priority::Low))
            .await
            .unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(job.id, first);
        assert_eq!(job.priority, Priority::High);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicates_share_one_waiting_job() {
        let dir = tempfile::tempdir().unwrap();
        let pool = core_metadata::db::create_pool(core_metadata::db::DatabaseConfig::new(
            dir.path().join("queue.db"),
        ))
        .await
        .unwrap();
        let queue = std::sync::Arc::new(SqliteJobQueue::new(pool).await.unwrap());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let queue = queue.clone();
            tasks.spawn(async move { queue.enqueue(Job::new("bdr:1", JobAction::Add)).await });
        }

        let mut ids = Vec::new();
        while let Some(result) = tasks.join_next().await {
            ids.push(result.unwrap().unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(queue.stats().await.unwrap().high, 1);
    }

    #[tokio::test]
    async fn test_running_job_does_not_block_new_enqueue() {
        let queue = queue().await;
        let first = queue.enqueue(Job::new("bdr:1", JobAction::Add)).await.unwrap();
        queue.dequeue().await.unwrap().unwrap();
        let second = queue.enqueue(Job::new("bdr:1", JobAction::Add)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_completed_job_is_deleted() {
        let queue = queue().await;
        let id = queue.enqueue(Job::new("bdr:1", JobAction::Add)).await.unwrap();
        let job = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(queue.stats().await.unwrap().started, 1);

        queue.mark_complete(id).await.unwrap();
        assert!(queue.find_by_id(id).await.unwrap().is_none());
        assert!(matches!(
            queue.mark_complete(id).await,
            Err(SyncError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_job_requeues_to_tail_of_original_tier() {
        let queue = queue().await;
        let failing = queue
            .enqueue(Job::new("bdr:1", JobAction::Add).with_priority(Priority::Medium))
            .await
            .unwrap();
        queue.dequeue().await.unwrap().unwrap();
        queue.mark_failed(failing, "storage unavailable").await.unwrap();

        let failed = queue.failed_jobs().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("storage unavailable"));
        assert_eq!(failed[0].priority, Priority::Medium);

        queue.enqueue(Job::new("bdr:2", JobAction::Zip)).await.unwrap();
        assert!(queue.requeue(failing).await.unwrap());

        let waiting = queue.waiting(Priority::Medium).await.unwrap();
        let pids: Vec<_> = waiting.iter().map(|j| j.pid.to_string()).collect();
        assert_eq!(pids, vec!["bdr:2", "bdr:1"]);
        assert_eq!(waiting[1].id, failing);
        assert!(waiting[1].error.is_none());
        assert_eq!(queue.stats().await.unwrap().failed, 0);
    }

    #[tokio::test]
    async fn test_requeue_onto_waiting_duplicate_merges_failed_copy() {
        let queue = queue().await;
        let failing = queue.enqueue(Job::new("bdr:1", JobAction::Add)).await.unwrap();
        queue.dequeue().await.unwrap().unwrap();
        queue.mark_failed(failing, "boom").await.unwrap();
        let waiting = queue
            .enqueue(Job::new("bdr:1", JobAction::Add).with_priority(Priority::Low))
            .await
            .unwrap();

        assert!(!queue.requeue(failing).await.unwrap());
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.high, 1);
        assert_eq!(stats.low, 0);
        assert_eq!(stats.failed, 0);
        assert!(queue.find_by_id(waiting).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_requeue_all_and_remove() {
        let queue = queue().await;
        for pid in ["bdr:1", "bdr:2", "bdr:3"] {
            let id = queue.enqueue(Job::new(pid, JobAction::Add)).await.unwrap();
            queue.dequeue().await.unwrap().unwrap();
            queue.mark_failed(id, "boom").await.unwrap();
        }

        let discarded = queue.failed_jobs().await.unwrap()[0].id;
        queue.remove_failed(discarded).await.unwrap();
        assert!(queue.remove_failed(discarded).await.is_err());

        assert_eq!(queue.requeue_all().await.unwrap(), 2);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.high, 2);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_requeue_unknown_job_fails() {
        let queue = queue().await;
        assert!(matches!(
            queue.requeue(JobId::new()).await,
            Err(SyncError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_tier_leaves_others() {
        let queue = queue().await;
        queue.enqueue(Job::new("bdr:1", JobAction::Batch)).await.unwrap();
        queue.enqueue(Job::new("bdr:2", JobAction::Batch)).await.unwrap();
        queue.enqueue(Job::new("bdr:3", JobAction::Zip)).await.unwrap();

        assert_eq!(queue.empty(Priority::Low).await.unwrap(), 2);
        let stats = queue.stats().await.unwrap();
        assert_eq!(stats.waiting(Priority::Low), 0);
        assert_eq!(stats.waiting(Priority::Medium), 1);
    }

    #[tokio::test]
    async fn test_abandoned_job_moves_to_failure_queue() {
        let queue = queue().await;
        let id = queue
            .enqueue(Job::new("bdr:1", JobAction::Add).with_timeout(Duration::ZERO))
            .await
            .unwrap();
        queue.dequeue().await.unwrap().unwrap();
        sqlx::query("UPDATE index_jobs SET started_at = started_at - 10")
            .execute(&queue.pool)
            .await
            .unwrap();

        assert_eq!(queue.fail_abandoned().await.unwrap(), 1);
        let failed = queue.failed_jobs().await.unwrap();
        assert_eq!(failed[0].id, id);
        assert_eq!(failed[0].error.as_deref(), Some("abandoned by worker"));
    }

    #[tokio::test]
    async fn test_job_fields_survive_storage() {
        let queue = queue().await;
        let job = Job::new("bdr:1", JobAction::Update)
            .with_timeout(Duration::from_secs(60))
            .without_cascade();
        queue.enqueue(job.clone()).await.unwrap();

        let stored = queue.dequeue().await.unwrap().unwrap();
        assert_eq!(stored, job);
    }
}
