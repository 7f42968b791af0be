// crates/simon-cli/src/commands/worker.rs
//! `simon worker` — run and inspect the background worker.

use anyhow::Result;
use clap::Subcommand;
use simon_core::settings::Settings;
use simon_worker::{JobContext, Worker};
use std::time::Duration;

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Run the worker in the foreground (Ctrl+C to stop)
    Start {
        /// Poll interval in seconds when the queue is empty
        #[arg(long, default_value_t = 2.0)]
        interval: f64,
    },
    /// Process pending jobs once, then exit
    Once {
        /// Maximum number of jobs to process
        #[arg(long, default_value_t = 20)]
        max_jobs: usize,
    },
    /// Show job queue statistics
    Status,
}

pub async fn run(command: WorkerCommand, settings: Settings) -> Result<()> {
    match command {
        WorkerCommand::Start { interval } => {
            let db = super::open_database(&settings).await?;
            let worker = Worker::new(
                JobContext::new(db, settings),
                Duration::from_secs_f64(interval),
            );
            worker.install_signal_handlers();
            println!("Starting context worker (Ctrl+C to stop)");
            worker.run().await?;
            Ok(())
        }
        WorkerCommand::Once { max_jobs } => {
            let db = super::open_database(&settings).await?;
            let worker = Worker::new(JobContext::new(db, settings), Duration::from_secs(2));
            let processed = worker.process_pending_jobs(max_jobs).await?;
            println!("Processed {processed} jobs");
            Ok(())
        }
        WorkerCommand::Status => {
            let db = super::open_database(&settings).await?;
            let stats = db.job_stats().await?;
            if stats.is_empty() {
                println!("No jobs in queue.");
            } else {
                println!("Job Queue:");
                for (status, count) in stats {
                    println!("  {status}: {count}");
                }
            }
            Ok(())
        }
    }
}
