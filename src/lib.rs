//! Repository indexer façade and bootstrap helpers.
//!
//! This crate wires the desktop bridge implementations (HTTP, shared cache,
//! clock) into the storage, metadata and sync crates and hands back an
//! [`IndexerService`] ready to run workers or serve queue operations.
//!
//! ```rust,ignore
//! let config = IndexerConfig::from_env()?;
//! let deps = IndexerDependencies::desktop(&config).await?;
//! let service = IndexerService::bootstrap(config, deps, ExtractorSet::new()).await?;
//! service.worker_pool().run(shutdown).await;
//! ```

pub mod error;

pub use error::{IndexerError, Result};

pub use bridge_traits;
pub use core_metadata;
pub use core_runtime;
pub use core_storage;
pub use core_sync;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bridge_desktop::{ReqwestHttpClient, SqliteCacheStore};
use bridge_traits::{CacheStore, Clock, HttpClient, SystemClock};
use core_metadata::db::{create_pool, DatabaseConfig};
use core_metadata::{
    DisplayIdentities, DocumentAssembler, ExtractorSet, HttpCollectionLookup, NoOverrides,
    ResourceTypeOverrides, SqliteInvalidDateReporter, SqliteResourceTypes, ZipIndexer,
};
use core_runtime::IndexerConfig;
use core_storage::{
    BackendSelector, InheritanceResolver, LegacyHttpBackend, OcflBackend, StorageResolver,
    VersionedCache,
};
use core_sync::{
    IndexingContext, IndexingOrchestrator, Job, JobAction, JobId, JobQueue, Priority, SolrClient,
    SqliteJobQueue, WorkerPool,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Aggregated handle to the bridge dependencies the indexer requires.
pub struct IndexerDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub cache: Arc<dyn CacheStore>,
    pub clock: Arc<dyn Clock>,
}

impl IndexerDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            http_client,
            cache,
            clock,
        }
    }

    /// reqwest client and the SQLite cache shared by all worker processes.
    pub async fn desktop(config: &IndexerConfig) -> Result<Self> {
        let http_client = ReqwestHttpClient::with_timeout(config.http_timeout)?;
        let cache = SqliteCacheStore::new(config.cache_db_path.clone()).await?;
        Ok(Self::new(
            Arc::new(http_client),
            Arc::new(cache),
            Arc::new(SystemClock),
        ))
    }
}

/// Open the job queue database, creating the queue table if needed.
pub async fn open_queue(path: &Path) -> Result<SqliteJobQueue> {
    let pool = create_pool(DatabaseConfig::new(path)).await?;
    Ok(SqliteJobQueue::new(pool).await?)
}

/// Failed-job count above which operator enqueueing stops
pub const DEFAULT_MAX_FAILED: u64 = 50;

/// Identifiers an operator wants indexed in one run
#[derive(Debug, Clone)]
pub struct EnqueueBatch {
    pub pids: Vec<String>,
    pub action: JobAction,
    /// Requested tier; bulk runs default to low
    pub priority: Option<Priority>,
    /// Stop once the failure queue holds more than this many jobs
    pub max_failed: u64,
}

impl EnqueueBatch {
    pub fn new(pids: Vec<String>, action: JobAction) -> Self {
        Self {
            pids,
            action,
            priority: None,
            max_failed: DEFAULT_MAX_FAILED,
        }
    }

    /// Default to the low tier unless a tier was requested
    pub fn bulk(mut self) -> Self {
        self.priority.get_or_insert(Priority::Low);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_failed(mut self, max_failed: u64) -> Self {
        self.max_failed = max_failed;
        self
    }
}

/// Enqueue a batch, reporting each job as it lands.
///
/// Checks the failure queue before every job and gives up with
/// [`IndexerError::FailureQueueFull`] once it exceeds the batch limit.
/// Jobs enqueued before that stay queued.
pub async fn enqueue_batch<F>(
    queue: &SqliteJobQueue,
    batch: &EnqueueBatch,
    mut on_enqueued: F,
) -> Result<usize>
where
    F: FnMut(&str, JobId, Priority),
{
    let mut enqueued = 0;
    for pid in &batch.pids {
        let failed = queue.stats().await?.failed;
        if failed > batch.max_failed {
            warn!(failed, limit = batch.max_failed, enqueued, "Stopping enqueue run");
            return Err(IndexerError::FailureQueueFull {
                failed,
                limit: batch.max_failed,
            });
        }

        let mut job = Job::new(pid.as_str(), batch.action);
        if let Some(priority) = batch.priority {
            job = job.with_priority(priority);
        }
        let tier = job.priority;
        let id = queue.enqueue(job).await?;
        on_enqueued(pid, id, tier);
        enqueued += 1;
    }
    Ok(enqueued)
}

/// Sweep expired shared-cache entries now and then every `interval` until
/// `shutdown` fires. Sweep failures are logged and retried next tick.
pub async fn purge_cache_periodically(
    cache: Arc<dyn CacheStore>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match cache.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Purged expired cache entries"),
                Err(e) => warn!(error = %e, "Cache purge failed"),
            },
        }
    }
}

/// Fully wired indexer.
pub struct IndexerService {
    config: IndexerConfig,
    cache: Arc<dyn CacheStore>,
    queue: Arc<SqliteJobQueue>,
    orchestrator: Arc<IndexingOrchestrator>,
}

impl IndexerService {
    /// Build every component from the configuration.
    ///
    /// `extractors` supplies the per-schema rule sets; streams without an
    /// extractor contribute no fields.
    pub async fn bootstrap(
        config: IndexerConfig,
        deps: IndexerDependencies,
        extractors: ExtractorSet,
    ) -> Result<Self> {
        config.validate()?;

        let queue_pool = create_pool(DatabaseConfig::new(&config.queue_db_path)).await?;
        let queue = Arc::new(SqliteJobQueue::new(queue_pool.clone()).await?);
        let reporter = Arc::new(SqliteInvalidDateReporter::new(queue_pool));
        reporter.initialize().await?;

        let overrides: Arc<dyn ResourceTypeOverrides> = match &config.resource_types_db_path {
            Some(path) => {
                let table = SqliteResourceTypes::new(create_pool(DatabaseConfig::new(path)).await?);
                table.initialize().await?;
                Arc::new(table)
            }
            None => Arc::new(NoOverrides),
        };

        let legacy = LegacyHttpBackend::new(
            deps.http_client.clone(),
            config.storage_service_root.clone(),
            config.storage_service_param.clone(),
        );
        let resolver = Arc::new(StorageResolver::new(
            BackendSelector::with_legacy(OcflBackend::new(config.ocfl_root.clone()), legacy),
            VersionedCache::new(deps.cache.clone()),
        ));
        let inheritance = Arc::new(InheritanceResolver::new(resolver.clone()));

        let collections = Arc::new(HttpCollectionLookup::new(
            deps.http_client.clone(),
            deps.cache.clone(),
            config.collection_url.clone(),
            config.collection_url_param.clone(),
        ));
        let assembler = DocumentAssembler::new(
            inheritance,
            extractors,
            collections,
            overrides,
            reporter,
        )
        .with_display_identities(DisplayIdentities {
            public: config.display_public.clone(),
            institution: config.display_institution.clone(),
        });

        let zip_indexer = ZipIndexer::new(resolver.clone(), deps.clock.clone(), config.temp_dir.clone());
        let index = Arc::new(SolrClient::new(
            deps.http_client.clone(),
            config.solr_root.clone(),
            config.commit_within,
            config.commit_within_add,
        ));

        let orchestrator = IndexingOrchestrator::new(IndexingContext {
            resolver,
            assembler: Arc::new(assembler),
            zip_indexer: Arc::new(zip_indexer),
            index,
            queue: queue.clone(),
        })
        .with_job_timeout(config.job_timeout);

        info!(
            solr = %config.solr_root,
            ocfl_root = %config.ocfl_root.display(),
            queue_db = %config.queue_db_path.display(),
            "Indexer initialized"
        );

        Ok(Self {
            config,
            cache: deps.cache,
            queue,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn queue(&self) -> Arc<SqliteJobQueue> {
        Arc::clone(&self.queue)
    }

    pub fn orchestrator(&self) -> Arc<IndexingOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Background sweep of the shared cache, paced by the configuration.
    pub fn spawn_cache_purge(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(purge_cache_periodically(
            Arc::clone(&self.cache),
            self.config.cache_purge_interval,
            shutdown,
        ))
    }

    /// Worker pool sized and paced by the configuration.
    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::new(self.orchestrator(), self.queue(), self.config.workers)
            .with_poll_interval(self.config.poll_interval)
    }
}
