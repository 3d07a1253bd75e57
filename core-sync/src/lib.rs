//! # Indexing Jobs & Orchestration
//!
//! Keeps the search index in step with repository storage.
//!
//! ## Overview
//!
//! This module manages indexing work end to end:
//! - Queuing jobs into high, medium and low tiers plus a failure queue
//! - Running each job through the orchestrator state machine
//! - Writing documents and patches to the search engine
//! - Running a fixed pool of workers with per-job timeouts
//!
//! ## Components
//!
//! - **Jobs** (`job`): `Job`, `JobAction` and tier selection
//! - **Queue** (`queue`): SQLite-backed `JobQueue` with operator operations
//! - **Search index** (`solr`): `SearchIndex` and the `SolrClient`
//! - **Orchestrator** (`orchestrator`): `IndexingOrchestrator`
//! - **Workers** (`worker`): `WorkerPool`

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod queue;
pub mod solr;
pub mod worker;

pub use error::{Result, SyncError};
pub use job::{Job, JobAction, JobId, Priority, DEFAULT_JOB_TIMEOUT};
pub use orchestrator::{IndexingContext, IndexingOrchestrator, JobOutcome};
pub use queue::{JobQueue, QueueStats, SqliteJobQueue};
pub use solr::{SearchIndex, SolrClient};
pub use worker::WorkerPool;
