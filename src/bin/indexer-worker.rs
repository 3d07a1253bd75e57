//! Indexing worker host
//!
//! Reads configuration from the environment, fails abandoned jobs left by a
//! previous run, then runs the worker pool until interrupted. Expired shared
//! cache entries are swept at startup and on an interval alongside.

use anyhow::Context;
use core_metadata::ExtractorSet;
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::IndexerConfig;
use repo_indexer::{IndexerDependencies, IndexerService};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::from_env()?).context("initializing logging")?;

    let config = IndexerConfig::from_env().context("loading configuration")?;
    let deps = IndexerDependencies::desktop(&config)
        .await
        .context("creating bridge dependencies")?;
    let service = IndexerService::bootstrap(config, deps, ExtractorSet::new())
        .await
        .context("bootstrapping indexer")?;

    let abandoned = service.queue().fail_abandoned().await?;
    if abandoned > 0 {
        warn!(count = abandoned, "Jobs from a previous run moved to the failure queue");
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested, finishing running jobs");
            signal.cancel();
        }
    });

    let purge = service.spawn_cache_purge(shutdown.clone());
    service.worker_pool().run(shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = purge.await {
        warn!(error = %e, "Cache purge task ended abnormally");
    }
    Ok(())
}
