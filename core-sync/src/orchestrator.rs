//! # Indexing Orchestrator
//!
//! Performs one job action per call:
//!
//! ```text
//! delete        → remove document
//! image_parent  → two-flag patch, no storage access
//! zip           → resolve → snapshot → archive listing patch (if stale)
//! add/update/   → resolve → build → post full document
//!   batch           ├─ dependents (not batch, cascading jobs only)
//!                   ├─ zip job when an archive stream is active
//!                   └─ image_parent job for an image child's parent
//! ```
//!
//! Objects that are missing or tombstoned in storage are removed from the
//! index by add, update and batch. Failures are logged and returned; the
//! caller moves the job to the failure queue. Nothing is retried here.

use core_metadata::zip_indexer::ZIP_STREAM;
use core_metadata::{AtomicPatch, DocumentAssembler, UpdateCommand, ZipIndexer};
use core_storage::{ObjectId, StorageError, StorageResolver};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::job::{Job, JobAction, DEFAULT_JOB_TIMEOUT};
use crate::queue::JobQueue;
use crate::solr::SearchIndex;

pub const IMAGE_PARENT_FIELD: &str = "image_parent_bsi";
pub const IIIF_RESOURCE_FIELD: &str = "iiif_resource_bsi";

/// What a processed job did to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The document was removed
    Deleted,
    /// A full document was written and follow-up jobs enqueued
    Indexed { follow_ups: usize },
    /// An atomic patch was written
    Patched,
    /// Nothing needed writing
    Skipped,
}

/// Collaborators shared by every job a worker runs
#[derive(Clone)]
pub struct IndexingContext {
    pub resolver: Arc<StorageResolver>,
    pub assembler: Arc<DocumentAssembler>,
    pub zip_indexer: Arc<ZipIndexer>,
    pub index: Arc<dyn SearchIndex>,
    pub queue: Arc<dyn JobQueue>,
}

pub struct IndexingOrchestrator {
    context: IndexingContext,
    job_timeout: Duration,
}

impl IndexingOrchestrator {
    pub fn new(context: IndexingContext) -> Self {
        Self {
            context,
            job_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }

    /// Timeout given to follow-up jobs
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn context(&self) -> &IndexingContext {
        &self.context
    }

    /// Run one job to completion
    #[instrument(skip(self, job), fields(job_id = %job.id, pid = %job.pid, action = %job.action))]
    pub async fn process(&self, job: &Job) -> Result<JobOutcome> {
        info!("Processing job");
        let result = match job.action {
            JobAction::Delete => self.delete(&job.pid, job.action).await,
            JobAction::ImageParent => self.index_image_parent(&job.pid).await,
            JobAction::Zip => self.index_zip(&job.pid).await,
            JobAction::Add | JobAction::Update | JobAction::Batch => self.index_object(job).await,
        };

        match &result {
            Ok(outcome) => info!(outcome = ?outcome, "Job finished"),
            Err(e) => error!(error = %e, "Job failed"),
        }
        result
    }

    async fn delete(&self, pid: &ObjectId, action: JobAction) -> Result<JobOutcome> {
        info!(pid = %pid, "Deleting from search index");
        self.context
            .index
            .post(&UpdateCommand::Delete(pid.clone()), action)
            .await?;
        Ok(JobOutcome::Deleted)
    }

    async fn index_image_parent(&self, pid: &ObjectId) -> Result<JobOutcome> {
        let patch = AtomicPatch::new(pid.clone())
            .set(IMAGE_PARENT_FIELD, true)
            .set(IIIF_RESOURCE_FIELD, true);
        self.context
            .index
            .post(&UpdateCommand::Patch(patch), JobAction::ImageParent)
            .await?;
        Ok(JobOutcome::Patched)
    }

    async fn index_zip(&self, pid: &ObjectId) -> Result<JobOutcome> {
        let object = match self.context.resolver.resolve(pid).await {
            Ok(object) => object,
            Err(StorageError::NotFound { .. }) => return self.delete(pid, JobAction::Zip).await,
            // removal is owned by the add/update path
            Err(StorageError::Deleted { .. }) => return Ok(JobOutcome::Skipped),
            Err(e) => return Err(e.into()),
        };

        let snapshot = self.context.index.snapshot(pid).await?;
        match self.context.zip_indexer.maybe_reindex(&object, &snapshot).await {
            Some(patch) => {
                self.context
                    .index
                    .post(&UpdateCommand::Patch(patch), JobAction::Zip)
                    .await?;
                Ok(JobOutcome::Patched)
            }
            None => Ok(JobOutcome::Skipped),
        }
    }

    async fn index_object(&self, job: &Job) -> Result<JobOutcome> {
        let object = match self.context.resolver.resolve(&job.pid).await {
            Ok(object) => object,
            Err(e) if e.is_missing_object() => {
                info!(reason = %e, "Object gone from storage");
                return self.delete(&job.pid, job.action).await;
            }
            Err(e) => return Err(e.into()),
        };

        let relationships = self.context.resolver.relationships(&object).await?;
        let document = self
            .context
            .assembler
            .build(&object, relationships.as_ref())
            .await?;
        self.context
            .index
            .post(&UpdateCommand::Add(document), job.action)
            .await?;

        let mut follow_ups = Vec::new();
        if job.cascade && job.action != JobAction::Batch {
            follow_ups.extend(self.dependent_jobs(job).await);
        }
        if object.is_active(ZIP_STREAM) {
            follow_ups.push(self.follow_up(job.pid.clone(), JobAction::Zip));
        }
        if let Some(parent) = relationships.as_ref().and_then(|r| r.image_parent()) {
            follow_ups.push(self.follow_up(parent.clone(), JobAction::ImageParent));
        }

        let count = follow_ups.len();
        for follow_up in follow_ups {
            self.context.queue.enqueue(follow_up).await?;
        }
        Ok(JobOutcome::Indexed { follow_ups: count })
    }

    /// Same-action jobs for dependents; they never cascade further
    async fn dependent_jobs(&self, job: &Job) -> Vec<Job> {
        match self.context.index.dependents(&job.pid).await {
            Ok(dependents) => dependents
                .into_iter()
                .map(|pid| {
                    self.follow_up(pid, job.action)
                        .with_priority(job.priority)
                        .without_cascade()
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Dependents lookup failed, not cascading");
                Vec::new()
            }
        }
    }

    fn follow_up(&self, pid: ObjectId, action: JobAction) -> Job {
        Job::new(pid, action).with_timeout(self.job_timeout)
    }
}
