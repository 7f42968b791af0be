// crates/simon-db/src/jobs.rs
//! Durable job queue with lease-based locking.
//!
//! Jobs are claimed with a single conditional UPDATE of a subselect; SQLite
//! serializes writers, so the re-check of `status` inside the UPDATE guards
//! against a racing claim between the subselect and the write. Each claim
//! takes a lease (`locked_until`); expired leases are swept back to `retry`
//! without touching the attempt count.

use crate::{now, Database, DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Closed set of pipeline job kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    SessionProcess,
    TurnSummary,
    EntityExtract,
    ArtifactExtract,
    SessionSummary,
    SkillExtract,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::SessionProcess,
        JobKind::TurnSummary,
        JobKind::EntityExtract,
        JobKind::ArtifactExtract,
        JobKind::SessionSummary,
        JobKind::SkillExtract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionProcess => "session_process",
            Self::TurnSummary => "turn_summary",
            Self::EntityExtract => "entity_extract",
            Self::ArtifactExtract => "artifact_extract",
            Self::SessionSummary => "session_summary",
            Self::SkillExtract => "skill_extract",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "session_process" => Some(Self::SessionProcess),
            "turn_summary" => Some(Self::TurnSummary),
            "entity_extract" => Some(Self::EntityExtract),
            "artifact_extract" => Some(Self::ArtifactExtract),
            "session_summary" => Some(Self::SessionSummary),
            "skill_extract" => Some(Self::SkillExtract),
            _ => None,
        }
    }
}

/// Job lifecycle states. `done` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Retry,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Retry => "retry",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "processing" => Some(Self::Processing),
            "retry" => Some(Self::Retry),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Payload for `session_process` jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionJobPayload {
    pub session_id: String,
    pub transcript_path: String,
    #[serde(default)]
    pub workspace_path: String,
}

/// Payload for the per-turn jobs (`turn_summary`, `entity_extract`,
/// `artifact_extract`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnJobPayload {
    pub turn_id: String,
}

/// Payload for `session_summary` and `skill_extract` jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRefPayload {
    pub session_id: String,
}

/// A queued unit of pipeline work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub dedupe_key: Option<String>,
    pub priority: i64,
    pub attempts: i64,
    pub max_attempts: i64,
    pub status: JobStatus,
    pub locked_until: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// Deserialize the payload into the shape this job's kind carries.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> DbResult<T> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| DbError::Decode(format!("job {} payload: {}", self.id, e)))
    }
}

#[derive(Debug)]
struct JobRow {
    id: String,
    kind: String,
    payload: String,
    dedupe_key: Option<String>,
    priority: i64,
    attempts: i64,
    max_attempts: i64,
    status: String,
    locked_until: Option<i64>,
    error_message: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
            dedupe_key: row.try_get("dedupe_key")?,
            priority: row.try_get("priority")?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            status: row.try_get("status")?,
            locked_until: row.try_get("locked_until")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<JobRow> for Job {
    type Error = DbError;

    fn try_from(row: JobRow) -> DbResult<Job> {
        let kind = JobKind::parse(&row.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown job kind '{}'", row.kind)))?;
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| DbError::Decode(format!("unknown job status '{}'", row.status)))?;
        let payload = serde_json::from_str(&row.payload)
            .map_err(|e| DbError::Decode(format!("job {} payload: {}", row.id, e)))?;

        Ok(Job {
            id: row.id,
            kind,
            payload,
            dedupe_key: row.dedupe_key,
            priority: row.priority,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            status,
            locked_until: row.locked_until,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const JOB_COLUMNS: &str = "id, kind, payload, dedupe_key, priority, attempts, max_attempts, status, locked_until, error_message, created_at, updated_at";

/// An enqueue request: kind + payload plus optional dedup and scheduling knobs.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub kind: JobKind,
    pub payload: serde_json::Value,
    pub dedupe_key: Option<String>,
    pub priority: i64,
    pub max_attempts: i64,
}

impl EnqueueRequest {
    pub fn new(kind: JobKind, payload: impl Serialize) -> Self {
        Self {
            kind,
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
            dedupe_key: None,
            priority: 10,
            max_attempts: 10,
        }
    }

    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_attempts(mut self, max_attempts: i64) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl Database {
    /// Enqueue a job, deduplicating by `dedupe_key` if provided.
    ///
    /// Returns the created job, or None when a row with the same dedupe key
    /// already exists (a dedup conflict is not an error).
    pub async fn enqueue_job(&self, request: EnqueueRequest) -> DbResult<Option<Job>> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now();
        let payload = serde_json::to_string(&request.payload)
            .map_err(|e| DbError::Decode(format!("payload serialize: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO focus_jobs
                (id, kind, payload, dedupe_key, priority, attempts, max_attempts, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 'queued', ?7, ?7)
            ON CONFLICT(dedupe_key) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(request.kind.as_str())
        .bind(&payload)
        .bind(&request.dedupe_key)
        .bind(request.priority)
        .bind(request.max_attempts)
        .bind(ts)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            debug!("Job deduplicated: {:?}", request.dedupe_key);
            return Ok(None);
        }

        self.get_job(&id).await
    }

    /// Claim the next available job using lease-based locking.
    ///
    /// Candidates are `queued`/`retry` rows whose lease is absent or expired,
    /// best-first by priority then creation time. The claimed row moves to
    /// `processing` with `attempts + 1` and a fresh lease.
    pub async fn claim_job(
        &self,
        kinds: Option<&[JobKind]>,
        lease_seconds: i64,
    ) -> DbResult<Option<Job>> {
        let ts = now();

        let kind_filter = match kinds {
            Some(kinds) if !kinds.is_empty() => {
                let names: Vec<String> = kinds
                    .iter()
                    .map(|k| format!("'{}'", k.as_str()))
                    .collect();
                format!("AND kind IN ({})", names.join(", "))
            }
            _ => String::new(),
        };

        let sql = format!(
            r#"
            UPDATE focus_jobs
            SET status = 'processing',
                locked_until = ?1 + ?2,
                attempts = attempts + 1,
                updated_at = ?1
            WHERE id = (
                SELECT id FROM focus_jobs
                WHERE status IN ('queued', 'retry')
                  AND (locked_until IS NULL OR locked_until < ?1)
                  {kind_filter}
                ORDER BY priority ASC, created_at ASC
                LIMIT 1
            )
            AND status IN ('queued', 'retry')
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(ts)
            .bind(lease_seconds)
            .fetch_optional(self.pool())
            .await?;

        row.map(Job::try_from).transpose()
    }

    /// Mark a job as done.
    pub async fn complete_job(&self, job_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE focus_jobs SET status = 'done', updated_at = ?1 WHERE id = ?2")
            .bind(now())
            .bind(job_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Mark a job as failed, or schedule a retry with exponential backoff.
    ///
    /// Backoff is `min(2^attempts * 30s, 3600s)`; attempts were already
    /// incremented when the job was claimed.
    pub async fn fail_job(&self, job_id: &str, error_message: &str) -> DbResult<()> {
        let Some(job) = self.get_job(job_id).await? else {
            warn!("Cannot fail job {}: not found", job_id);
            return Ok(());
        };

        let ts = now();

        if job.attempts < job.max_attempts {
            let backoff_seconds = (1i64 << job.attempts.clamp(0, 30)).saturating_mul(30).min(3600);
            sqlx::query(
                r#"
                UPDATE focus_jobs
                SET status = 'retry', error_message = ?1, locked_until = ?2, updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(error_message)
            .bind(ts + backoff_seconds)
            .bind(ts)
            .bind(job_id)
            .execute(self.pool())
            .await?;
            info!(
                "Job {} retry #{} in {}s: {}",
                job_id, job.attempts, backoff_seconds, error_message
            );
        } else {
            sqlx::query(
                "UPDATE focus_jobs SET status = 'failed', error_message = ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(error_message)
            .bind(ts)
            .bind(job_id)
            .execute(self.pool())
            .await?;
            warn!(
                "Job {} permanently failed after {} attempts: {}",
                job_id, job.attempts, error_message
            );
        }

        Ok(())
    }

    /// Reset `processing` jobs whose lease has expired back to `retry`.
    ///
    /// Returns the number of leases reset. Attempts are not incremented; the
    /// claim that took the lease already counted.
    pub async fn expire_stale_leases(&self) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE focus_jobs
            SET status = 'retry', locked_until = NULL, updated_at = ?1
            WHERE status = 'processing' AND locked_until < ?1
            "#,
        )
        .bind(now())
        .execute(self.pool())
        .await?;

        let count = result.rows_affected();
        if count > 0 {
            info!("Expired {} stale job leases", count);
        }
        Ok(count)
    }

    /// Job counts grouped by status.
    pub async fn job_stats(&self) -> DbResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM focus_jobs GROUP BY status")
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().collect())
    }

    /// Fetch one job by id.
    pub async fn get_job(&self, job_id: &str) -> DbResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM focus_jobs WHERE id = ?1");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(job_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Job::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> Database {
        Database::new_in_memory().await.unwrap()
    }

    fn turn_payload(turn_id: &str) -> TurnJobPayload {
        TurnJobPayload {
            turn_id: turn_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_claim() {
        let db = db().await;

        let job = db
            .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("t1")).priority(15))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.priority, 15);

        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.locked_until.unwrap() > now());

        let payload: TurnJobPayload = claimed.payload_as().unwrap();
        assert_eq!(payload.turn_id, "t1");
    }

    #[tokio::test]
    async fn test_dedupe_key_second_enqueue_returns_none() {
        let db = db().await;

        let first = db
            .enqueue_job(
                EnqueueRequest::new(JobKind::TurnSummary, turn_payload("t1"))
                    .dedupe_key("turn_summary:t1"),
            )
            .await
            .unwrap();
        assert!(first.is_some());

        let second = db
            .enqueue_job(
                EnqueueRequest::new(JobKind::TurnSummary, turn_payload("t1"))
                    .dedupe_key("turn_summary:t1"),
            )
            .await
            .unwrap();
        assert!(second.is_none());

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM focus_jobs")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_dedupe_includes_terminal_rows() {
        let db = db().await;

        let job = db
            .enqueue_job(
                EnqueueRequest::new(JobKind::SessionSummary, SessionRefPayload {
                    session_id: "s1".into(),
                })
                .dedupe_key("session_summary:s1"),
            )
            .await
            .unwrap()
            .unwrap();
        db.claim_job(None, 300).await.unwrap().unwrap();
        db.complete_job(&job.id).await.unwrap();

        // A done row still holds the dedupe key
        let again = db
            .enqueue_job(
                EnqueueRequest::new(JobKind::SessionSummary, SessionRefPayload {
                    session_id: "s1".into(),
                })
                .dedupe_key("session_summary:s1"),
            )
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_jobs_without_dedupe_key_always_insert() {
        let db = db().await;
        for _ in 0..3 {
            let job = db
                .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("t1")))
                .await
                .unwrap();
            assert!(job.is_some());
        }
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM focus_jobs")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 3);
    }

    #[tokio::test]
    async fn test_claim_orders_by_priority_then_age() {
        let db = db().await;

        let low = db
            .enqueue_job(EnqueueRequest::new(JobKind::SkillExtract, turn_payload("a")).priority(30))
            .await
            .unwrap()
            .unwrap();
        let high = db
            .enqueue_job(
                EnqueueRequest::new(JobKind::SessionProcess, turn_payload("b")).priority(5),
            )
            .await
            .unwrap()
            .unwrap();
        let mid = db
            .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("c")).priority(15))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(db.claim_job(None, 300).await.unwrap().unwrap().id, high.id);
        assert_eq!(db.claim_job(None, 300).await.unwrap().unwrap().id, mid.id);
        assert_eq!(db.claim_job(None, 300).await.unwrap().unwrap().id, low.id);
        assert!(db.claim_job(None, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_same_priority_oldest_first() {
        let db = db().await;

        let first = db
            .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")))
            .await
            .unwrap()
            .unwrap();
        let second = db
            .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("b")))
            .await
            .unwrap()
            .unwrap();
        // Force distinct creation times (second-resolution timestamps)
        sqlx::query("UPDATE focus_jobs SET created_at = created_at - 10 WHERE id = ?1")
            .bind(&first.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(db.claim_job(None, 300).await.unwrap().unwrap().id, first.id);
        assert_eq!(db.claim_job(None, 300).await.unwrap().unwrap().id, second.id);
    }

    #[tokio::test]
    async fn test_claim_filters_by_kind() {
        let db = db().await;

        db.enqueue_job(EnqueueRequest::new(JobKind::SessionProcess, turn_payload("a")))
            .await
            .unwrap();
        let summary = db
            .enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("b")))
            .await
            .unwrap()
            .unwrap();

        let claimed = db
            .claim_job(Some(&[JobKind::TurnSummary]), 300)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, summary.id);

        assert!(db
            .claim_job(Some(&[JobKind::TurnSummary]), 300)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_claimed_job_not_reclaimable_until_lease_expires() {
        let db = db().await;

        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")))
            .await
            .unwrap();
        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();

        // Lease held: nothing to claim
        assert!(db.claim_job(None, 300).await.unwrap().is_none());

        // Simulate lease expiry
        sqlx::query("UPDATE focus_jobs SET locked_until = ?1 WHERE id = ?2")
            .bind(now() - 1)
            .bind(&claimed.id)
            .execute(db.pool())
            .await
            .unwrap();
        db.expire_stale_leases().await.unwrap();

        let reclaimed = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, claimed.id);
        // Claim increments attempts; expiry does not
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn test_complete_job_terminal() {
        let db = db().await;
        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")))
            .await
            .unwrap();
        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();
        db.complete_job(&claimed.id).await.unwrap();

        let job = db.get_job(&claimed.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(db.claim_job(None, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_schedules_retry_with_backoff() {
        let db = db().await;
        db.enqueue_job(
            EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")).max_attempts(3),
        )
        .await
        .unwrap();

        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(claimed.attempts, 1);
        db.fail_job(&claimed.id, "boom").await.unwrap();

        let job = db.get_job(&claimed.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Retry);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        // attempts = 1 → backoff 60s
        let delta = job.locked_until.unwrap() - now();
        assert!((58..=62).contains(&delta), "backoff was {delta}s");

        // Backoff pending: not claimable yet
        assert!(db.claim_job(None, 300).await.unwrap().is_none());

        // After backoff elapses the same job comes back
        sqlx::query("UPDATE focus_jobs SET locked_until = ?1 WHERE id = ?2")
            .bind(now() - 1)
            .bind(&claimed.id)
            .execute(db.pool())
            .await
            .unwrap();
        let reclaimed = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(reclaimed.id, claimed.id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn test_backoff_caps_at_one_hour() {
        let db = db().await;
        db.enqueue_job(
            EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")).max_attempts(20),
        )
        .await
        .unwrap();
        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();

        sqlx::query("UPDATE focus_jobs SET attempts = 10 WHERE id = ?1")
            .bind(&claimed.id)
            .execute(db.pool())
            .await
            .unwrap();
        db.fail_job(&claimed.id, "still broken").await.unwrap();

        let job = db.get_job(&claimed.id).await.unwrap().unwrap();
        let delta = job.locked_until.unwrap() - now();
        assert!((3598..=3602).contains(&delta), "backoff was {delta}s");
    }

    #[tokio::test]
    async fn test_fail_at_max_attempts_is_permanent() {
        let db = db().await;
        db.enqueue_job(
            EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")).max_attempts(1),
        )
        .await
        .unwrap();
        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();
        db.fail_job(&claimed.id, "fatal").await.unwrap();

        let job = db.get_job(&claimed.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(db.claim_job(None, 300).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_missing_job_is_noop() {
        let db = db().await;
        db.fail_job("no-such-id", "whatever").await.unwrap();
    }

    #[tokio::test]
    async fn test_expire_stale_leases_sweeps_only_expired() {
        let db = db().await;

        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")))
            .await
            .unwrap();
        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("b")))
            .await
            .unwrap();
        let expired = db.claim_job(None, 300).await.unwrap().unwrap();
        let held = db.claim_job(None, 300).await.unwrap().unwrap();

        sqlx::query("UPDATE focus_jobs SET locked_until = ?1 WHERE id = ?2")
            .bind(now() - 10)
            .bind(&expired.id)
            .execute(db.pool())
            .await
            .unwrap();

        let swept = db.expire_stale_leases().await.unwrap();
        assert_eq!(swept, 1);

        let job = db.get_job(&expired.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Retry);
        assert!(job.locked_until.is_none());

        let still_held = db.get_job(&held.id).await.unwrap().unwrap();
        assert_eq!(still_held.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_job_stats() {
        let db = db().await;
        assert!(db.job_stats().await.unwrap().is_empty());

        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("a")))
            .await
            .unwrap();
        db.enqueue_job(EnqueueRequest::new(JobKind::TurnSummary, turn_payload("b")))
            .await
            .unwrap();
        let claimed = db.claim_job(None, 300).await.unwrap().unwrap();
        db.complete_job(&claimed.id).await.unwrap();

        let stats = db.job_stats().await.unwrap();
        assert_eq!(stats.get("queued"), Some(&1));
        assert_eq!(stats.get("done"), Some(&1));
    }

    #[tokio::test]
    async fn test_concurrent_claims_never_share_a_job() {
        let db = db().await;
        for i in 0..8 {
            db.enqueue_job(EnqueueRequest::new(
                JobKind::TurnSummary,
                turn_payload(&format!("t{i}")),
            ))
            .await
            .unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(job) = db.claim_job(None, 300).await.unwrap() {
                    claimed.push(job.id);
                }
                claimed
            }));
        }

        let mut all: Vec<String> = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, all.len(), "a job was claimed twice");
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in JobKind::ALL {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("nope"), None);
    }
}
