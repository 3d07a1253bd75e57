//! Operator tool for the job queue
//!
//! Enqueue identifiers, inspect the failure queue and requeue or discard
//! failed jobs, and count or empty tiers. Enqueueing more than one
//! identifier lands in the low tier unless a tier is requested, and stops
//! once the failure queue grows past `--max-failed`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use core_sync::{JobAction, JobId, Priority};
use repo_indexer::{enqueue_batch, open_queue, EnqueueBatch, DEFAULT_MAX_FAILED};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Job queue database
    #[arg(long, env = "QUEUE_DB")]
    queue_db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue one job per identifier
    Enqueue {
        /// Identifiers; read one per line from --file when omitted
        pids: Vec<String>,
        #[arg(short, long, default_value = "add")]
        action: String,
        /// Requested tier; can lower but never raise the default
        #[arg(short, long)]
        priority: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Stop when the failure queue holds more than this many jobs
        #[arg(long, default_value_t = DEFAULT_MAX_FAILED)]
        max_failed: u64,
    },
    /// List failed jobs with their errors
    Failed,
    /// Return failed jobs to their original tier
    Requeue {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Discard a failed job
    Remove { id: String },
    /// Show waiting, running and failed counts
    Counts,
    /// Drop every waiting job of a tier
    Empty { tier: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let queue = open_queue(&cli.queue_db)
        .await
        .with_context(|| format!("opening queue {}", cli.queue_db.display()))?;

    match cli.command {
        Commands::Enqueue {
            pids,
            action,
            priority,
            file,
            max_failed,
        } => {
            let action: JobAction = action.parse()?;
            let priority = priority.map(|p| p.parse::<Priority>()).transpose()?;
            let from_file = file.is_some();
            let pids: Vec<String> = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => pids,
            };
            let bulk = from_file || pids.len() > 1;

            let mut batch = EnqueueBatch::new(pids, action).with_max_failed(max_failed);
            if let Some(priority) = priority {
                batch = batch.with_priority(priority);
            }
            if bulk {
                batch = batch.bulk();
            }

            enqueue_batch(&queue, &batch, |pid, id, tier| {
                println!("{} {} {} -> {}", id, pid, action, tier);
            })
            .await?;
        }
        Commands::Failed => {
            let failed = queue.failed_jobs().await?;
            println!("Total failed jobs: {}", failed.len());
            for job in failed {
                println!();
                println!("ID: {}", job.id);
                println!("Origin: {}", job.priority);
                println!("Job: {} {}", job.action, job.pid);
                println!("Error: {}", job.error.unwrap_or_default());
            }
        }
        Commands::Requeue { id, all } => {
            if all {
                println!("Requeued {} jobs", queue.requeue_all().await?);
            } else {
                let id = id.context("a job id or --all is required")?;
                if queue.requeue(JobId::from_string(&id)?).await? {
                    println!("Requeued {}", id);
                } else {
                    println!("{} was already waiting; failed copy merged into it", id);
                }
            }
        }
        Commands::Remove { id } => {
            queue.remove_failed(JobId::from_string(&id)?).await?;
            println!("Removed {}", id);
        }
        Commands::Counts => {
            let stats = queue.stats().await?;
            for tier in Priority::ALL {
                println!("{}: {}", tier, stats.waiting(tier));
            }
            println!("started: {}", stats.started);
            println!("failed: {}", stats.failed);
        }
        Commands::Empty { tier } => {
            let tier: Priority = tier.parse()?;
            println!("Removed {} jobs from {}", queue.empty(tier).await?, tier);
        }
    }
    Ok(())
}
