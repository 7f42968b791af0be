// crates/simon-worker/src/lib.rs
//! Background worker: claims pipeline jobs from the durable queue and
//! dispatches them to handlers.
//!
//! One worker per host is the normal deployment; multiple workers (or hosts
//! sharing a database) are safe because claiming is atomic. Shutdown is
//! graceful: the in-flight job finishes, then the loop exits.

pub mod handlers;

pub use handlers::JobContext;

use simon_db::{DbError, Job, JobKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("recording failed: {0}")]
    Recording(String),
}

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Lease duration for claimed jobs; expiry is the recovery path for a dead
/// or hung worker.
const LEASE_SECONDS: i64 = 300;

/// The claim/dispatch/complete loop over all six job kinds.
pub struct Worker {
    ctx: JobContext,
    poll_interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(ctx: JobContext, poll_interval: Duration) -> Self {
        Self {
            ctx,
            poll_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between jobs; exposed so the binary can wire signals.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Install SIGINT/SIGTERM handlers that request a graceful stop.
    pub fn install_signal_handlers(&self) {
        let flag = self.shutdown_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Worker shutdown signal received");
                flag.store(true, Ordering::SeqCst);
            }
        });

        #[cfg(unix)]
        {
            let flag = self.shutdown_flag();
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    info!("Worker shutdown signal received");
                    flag.store(true, Ordering::SeqCst);
                }
            });
        }
    }

    /// Main worker loop — claims and processes jobs until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Context worker started (poll interval: {:.1}s)",
            self.poll_interval.as_secs_f64()
        );

        let mut consecutive_empty: u64 = 0;

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.tick(&mut consecutive_empty).await {
                error!("Worker error: {}", e);
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        info!("Context worker stopped");
        Ok(())
    }

    async fn tick(&self, consecutive_empty: &mut u64) -> WorkerResult<()> {
        self.ctx.db.expire_stale_leases().await?;

        match self
            .ctx
            .db
            .claim_job(Some(&JobKind::ALL), LEASE_SECONDS)
            .await?
        {
            Some(job) => {
                *consecutive_empty = 0;
                self.run_one(job).await?;
            }
            None => {
                *consecutive_empty += 1;
                if *consecutive_empty % 30 == 0 {
                    debug!("No jobs for {} cycles", consecutive_empty);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Ok(())
    }

    /// Process up to `max_jobs` pending jobs, then return. For one-shot
    /// drains and embedding in other cycles.
    pub async fn process_pending_jobs(&self, max_jobs: usize) -> WorkerResult<usize> {
        self.ctx.db.expire_stale_leases().await?;

        let mut processed = 0usize;
        for _ in 0..max_jobs {
            let Some(job) = self
                .ctx
                .db
                .claim_job(Some(&JobKind::ALL), LEASE_SECONDS)
                .await?
            else {
                break;
            };
            if self.run_one(job).await? {
                processed += 1;
            }
        }

        Ok(processed)
    }

    /// Dispatch one claimed job; completion and failure both land back in
    /// the queue. Returns whether the job succeeded.
    async fn run_one(&self, job: Job) -> WorkerResult<bool> {
        let job_id = job.id.clone();
        let kind = job.kind;

        match handlers::dispatch_job(&self.ctx, &job).await {
            Ok(()) => {
                self.ctx.db.complete_job(&job_id).await?;
                info!("Completed job {} ({})", job_id, kind.as_str());
                Ok(true)
            }
            Err(e) => {
                error!("Job {} ({}) failed: {}", job_id, kind.as_str(), e);
                self.ctx.db.fail_job(&job_id, &e.to_string()).await?;
                Ok(false)
            }
        }
    }
}
