//! # Indexer Configuration Module
//!
//! Provides configuration management for the indexing workers.
//!
//! ## Overview
//!
//! [`IndexerConfig`] holds every endpoint, path and tuning knob the workers
//! need. It is built either incrementally through [`IndexerConfigBuilder`] or
//! from process environment variables, and is validated fail-fast so a
//! misconfigured worker refuses to start instead of failing every job.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::IndexerConfig;
//!
//! let config = IndexerConfig::builder()
//!     .solr_root("http://localhost:8983/solr/repository/")
//!     .storage_service_root("https://repository.example.edu/api/storage/")
//!     .ocfl_root("/data/ocfl")
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `SOLR_ROOT` | search engine root URL | required |
//! | `COMMIT_WITHIN` / `COMMIT_WITHIN_ADD` | commit delay in ms | 60000 / 1000 |
//! | `STORAGE_SERVICE_ROOT` / `STORAGE_SERVICE_PARAM` | legacy listing service | required / empty |
//! | `COLLECTION_URL` / `COLLECTION_URL_PARAM` | collection hierarchy service | required / empty |
//! | `OCFL_ROOT` | local inventory root | required |
//! | `CACHE_DB` / `QUEUE_DB` | SQLite files | `cache.db` / `queue.db` |
//! | `RESOURCE_TYPES_DB` | override table | unset |
//! | `TEMP_DIR` | archive download directory | system temp |
//! | `DISPLAY_PUBLIC` / `DISPLAY_INSTITUTION` | rights identities | required |
//! | `WORKERS` | worker count | 5 |
//! | `JOB_TIMEOUT_SECS` | per-job timeout | 2880 |
//! | `POLL_INTERVAL_MS` | idle queue poll | 500 |
//! | `HTTP_TIMEOUT_SECS` | outbound request timeout | 30 |
//! | `CACHE_PURGE_SECS` | expired cache entry sweep | 600 |

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default per-job timeout (48 minutes)
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(2880);

/// Default sweep interval for expired cache entries
pub const DEFAULT_CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// Configuration for the indexing workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Search engine core root, always ending in `/`
    pub solr_root: String,

    /// Commit delay for non-structural updates (patches)
    pub commit_within: Duration,

    /// Commit delay for document adds and deletes
    pub commit_within_add: Duration,

    /// Legacy storage listing service root, always ending in `/`
    pub storage_service_root: String,

    /// Query string appended to every storage service request
    pub storage_service_param: String,

    /// Collection hierarchy service root, always ending in `/`
    pub collection_url: String,

    /// Query string appended to every collection service request
    pub collection_url_param: String,

    /// Root of the local content-addressable object store
    pub ocfl_root: PathBuf,

    /// Shared cache database
    pub cache_db_path: PathBuf,

    /// Job queue database (also holds the invalid-date log)
    pub queue_db_path: PathBuf,

    /// Operator-maintained resource-type override table
    pub resource_types_db_path: Option<PathBuf>,

    /// Scratch directory for archive downloads
    pub temp_dir: PathBuf,

    /// Rights identity granting public display
    pub display_public: String,

    /// Rights identity granting institution-only display
    pub display_institution: String,

    /// Number of concurrent workers
    pub workers: usize,

    /// Timeout applied to each job
    pub job_timeout: Duration,

    /// Sleep between polls of an empty queue
    pub poll_interval: Duration,

    /// Timeout applied to outbound HTTP requests
    pub http_timeout: Duration,

    /// Interval between sweeps of expired shared-cache entries
    pub cache_purge_interval: Duration,
}

impl IndexerConfig {
    /// Creates a new builder for constructing an `IndexerConfig`.
    pub fn builder() -> IndexerConfigBuilder {
        IndexerConfigBuilder::default()
    }

    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Unset and empty variables are treated alike.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = IndexerConfig::builder();

        if let Some(value) = get("SOLR_ROOT") {
            builder = builder.solr_root(value);
        }
        if let Some(ms) = parse_var::<u64>(&get, "COMMIT_WITHIN")? {
            builder = builder.commit_within(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64>(&get, "COMMIT_WITHIN_ADD")? {
            builder = builder.commit_within_add(Duration::from_millis(ms));
        }
        if let Some(value) = get("STORAGE_SERVICE_ROOT") {
            builder = builder.storage_service_root(value);
        }
        if let Some(value) = get("STORAGE_SERVICE_PARAM") {
            builder = builder.storage_service_param(value);
        }
        if let Some(value) = get("COLLECTION_URL") {
            builder = builder.collection_url(value);
        }
        if let Some(value) = get("COLLECTION_URL_PARAM") {
            builder = builder.collection_url_param(value);
        }
        if let Some(value) = get("OCFL_ROOT") {
            builder = builder.ocfl_root(value);
        }
        if let Some(value) = get("CACHE_DB") {
            builder = builder.cache_db_path(value);
        }
        if let Some(value) = get("QUEUE_DB") {
            builder = builder.queue_db_path(value);
        }
        if let Some(value) = get("RESOURCE_TYPES_DB") {
            builder = builder.resource_types_db_path(value);
        }
        if let Some(value) = get("TEMP_DIR") {
            builder = builder.temp_dir(value);
        }
        if let Some(value) = get("DISPLAY_PUBLIC") {
            builder = builder.display_public(value);
        }
        if let Some(value) = get("DISPLAY_INSTITUTION") {
            builder = builder.display_institution(value);
        }
        if let Some(workers) = parse_var::<usize>(&get, "WORKERS")? {
            builder = builder.workers(workers);
        }
        if let Some(secs) = parse_var::<u64>(&get, "JOB_TIMEOUT_SECS")? {
            builder = builder.job_timeout(Duration::from_secs(secs));
        }
        if let Some(ms) = parse_var::<u64>(&get, "POLL_INTERVAL_MS")? {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = parse_var::<u64>(&get, "HTTP_TIMEOUT_SECS")? {
            builder = builder.http_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>(&get, "CACHE_PURGE_SECS")? {
            builder = builder.cache_purge_interval(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        require_url("SOLR_ROOT", &self.solr_root)?;
        require_url("STORAGE_SERVICE_ROOT", &self.storage_service_root)?;
        require_url("COLLECTION_URL", &self.collection_url)?;

        if self.ocfl_root.as_os_str().is_empty() {
            return Err(Error::Config("OCFL_ROOT cannot be empty".to_string()));
        }

        if self.display_public.trim().is_empty() || self.display_institution.trim().is_empty() {
            return Err(Error::Config(
                "DISPLAY_PUBLIC and DISPLAY_INSTITUTION must both be set".to_string(),
            ));
        }

        if self.display_public == self.display_institution {
            return Err(Error::Config(
                "DISPLAY_PUBLIC and DISPLAY_INSTITUTION must differ".to_string(),
            ));
        }

        if self.workers == 0 {
            return Err(Error::Config(
                "Worker count must be greater than 0".to_string(),
            ));
        }

        if self.job_timeout.is_zero() {
            return Err(Error::Config(
                "Job timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.cache_purge_interval.is_zero() {
            return Err(Error::Config(
                "Cache purge interval must be greater than 0 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{} is not valid ({}): {}", key, raw, e)))
        })
        .transpose()
}

fn require_url(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} is required", name)));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(Error::Config(format!(
            "{} must be an http(s) URL, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Roots are concatenated with path segments, so they always end in `/`.
fn with_trailing_slash(mut url: String) -> String {
    if !url.is_empty() && !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// Builder for constructing [`IndexerConfig`] instances.
#[derive(Debug, Default)]
pub struct IndexerConfigBuilder {
    solr_root: Option<String>,
    commit_within: Option<Duration>,
    commit_within_add: Option<Duration>,
    storage_service_root: Option<String>,
    storage_service_param: Option<String>,
    collection_url: Option<String>,
    collection_url_param: Option<String>,
    ocfl_root: Option<PathBuf>,
    cache_db_path: Option<PathBuf>,
    queue_db_path: Option<PathBuf>,
    resource_types_db_path: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    display_public: Option<String>,
    display_institution: Option<String>,
    workers: Option<usize>,
    job_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    http_timeout: Option<Duration>,
    cache_purge_interval: Option<Duration>,
}

impl IndexerConfigBuilder {
    pub fn solr_root(mut self, url: impl Into<String>) -> Self {
        self.solr_root = Some(url.into());
        self
    }

    pub fn commit_within(mut self, delay: Duration) -> Self {
        self.commit_within = Some(delay);
        self
    }

    pub fn commit_within_add(mut self, delay: Duration) -> Self {
        self.commit_within_add = Some(delay);
        self
    }

    pub fn storage_service_root(mut self, url: impl Into<String>) -> Self {
        self.storage_service_root = Some(url.into());
        self
    }

    pub fn storage_service_param(mut self, param: impl Into<String>) -> Self {
        self.storage_service_param = Some(param.into());
        self
    }

    pub fn collection_url(mut self, url: impl Into<String>) -> Self {
        self.collection_url = Some(url.into());
        self
    }

    pub fn collection_url_param(mut self, param: impl Into<String>) -> Self {
        self.collection_url_param = Some(param.into());
        self
    }

    pub fn ocfl_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ocfl_root = Some(path.into());
        self
    }

    pub fn cache_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_db_path = Some(path.into());
        self
    }

    pub fn queue_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.queue_db_path = Some(path.into());
        self
    }

    pub fn resource_types_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.resource_types_db_path = Some(path.into());
        self
    }

    pub fn temp_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.temp_dir = Some(path.into());
        self
    }

    pub fn display_public(mut self, identity: impl Into<String>) -> Self {
        self.display_public = Some(identity.into());
        self
    }

    pub fn display_institution(mut self, identity: impl Into<String>) -> Self {
        self.display_institution = Some(identity.into());
        self
    }

    /// Sets the worker count.
    ///
    /// Default: 5
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the per-job timeout.
    ///
    /// Default: 2880 seconds
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets how often expired shared-cache entries are swept.
    ///
    /// Default: 10 minutes
    pub fn cache_purge_interval(mut self, interval: Duration) -> Self {
        self.cache_purge_interval = Some(interval);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<IndexerConfig> {
        let config = IndexerConfig {
            solr_root: with_trailing_slash(self.solr_root.unwrap_or_default()),
            commit_within: self.commit_within.unwrap_or(Duration::from_secs(60)),
            commit_within_add: self.commit_within_add.unwrap_or(Duration::from_secs(1)),
            storage_service_root: with_trailing_slash(
                self.storage_service_root.unwrap_or_default(),
            ),
            storage_service_param: self.storage_service_param.unwrap_or_default(),
            collection_url: with_trailing_slash(self.collection_url.unwrap_or_default()),
            collection_url_param: self.collection_url_param.unwrap_or_default(),
            ocfl_root: self.ocfl_root.unwrap_or_default(),
            cache_db_path: self
                .cache_db_path
                .unwrap_or_else(|| PathBuf::from("cache.db")),
            queue_db_path: self
                .queue_db_path
                .unwrap_or_else(|| PathBuf::from("queue.db")),
            resource_types_db_path: self.resource_types_db_path,
            temp_dir: self.temp_dir.unwrap_or_else(std::env::temp_dir),
            display_public: self.display_public.unwrap_or_default(),
            display_institution: self.display_institution.unwrap_or_default(),
            workers: self.workers.unwrap_or(5),
            job_timeout: self.job_timeout.unwrap_or(DEFAULT_JOB_TIMEOUT),
            poll_interval: self.poll_interval.unwrap_or(Duration::from_millis(500)),
            http_timeout: self.http_timeout.unwrap_or(Duration::from_secs(30)),
            cache_purge_interval: self
                .cache_purge_interval
                .unwrap_or(DEFAULT_CACHE_PURGE_INTERVAL),
        };

        config.validate()?;
        Ok(config)
    }
}
