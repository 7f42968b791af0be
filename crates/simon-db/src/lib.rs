// crates/simon-db/src/lib.rs
// SQLite persistence for simon: job queue, recorded sessions, context queries.

pub mod jobs;
mod migrations;
pub mod queries;
pub mod recorder;
pub mod retriever;

pub use jobs::{
    EnqueueRequest, Job, JobKind, JobStatus, SessionJobPayload, SessionRefPayload, TurnJobPayload,
};
pub use queries::domain::{CommitmentRow, PersonRow, ProjectSummary, SprintRow, TaskRow};
pub use queries::sessions::{
    AgentSessionRow, AgentTurnContentRow, AgentTurnRow, ContextStats, NewTurn,
};
pub use queries::skills::{NewSkillRecord, SkillRecordRow};
pub use recorder::{enqueue_session_recording, record_session, RecordOutcome};
pub use retriever::ContextRetriever;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Failed to determine database directory")]
    NoDataDir,

    #[error("Failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),

    #[error("Unexpected row data: {0}")]
    Decode(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Current time as Unix seconds; all persisted timestamps use this form.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            db_path: path.to_owned(),
        };
        db.run_migrations().await?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// `shared_cache(true)` makes all pool connections see the same
    /// in-memory database; without it each connection gets its own.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let db = Self {
            pool,
            db_path: PathBuf::new(),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open the database at the default location: `~/.local/share/simon/simon.db`.
    pub async fn open_default() -> DbResult<Self> {
        let path = simon_core::paths::default_db_path().ok_or(DbError::NoDataDir)?;
        Self::new(&path).await
    }

    /// Run all inline migrations.
    ///
    /// A `_migrations` table tracks applied versions so non-idempotent
    /// statements only execute once.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        let row: (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM _migrations")
            .fetch_one(&self.pool)
            .await?;
        let current_version = row.0 as usize;

        for (i, migration) in migrations::MIGRATIONS.iter().enumerate() {
            let version = i + 1; // 1-based
            if version > current_version {
                sqlx::query(migration).execute(&self.pool).await?;
                sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
                    .bind(version as i64)
                    .execute(&self.pool)
                    .await?;
            }
        }

        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path to the database file (empty for in-memory databases).
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Seed helpers for the read-only domain tables. Production code never
    //! writes these; their real writers live outside this system.

    use super::Database;

    pub async fn seed_project(db: &Database, id: &str, slug: &str, name: &str, status: &str) {
        sqlx::query("INSERT INTO projects (id, name, slug, status) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(name)
            .bind(slug)
            .bind(status)
            .execute(db.pool())
            .await
            .unwrap();
    }

    pub async fn seed_person(
        db: &Database,
        id: &str,
        name: &str,
        email: Option<&str>,
        organization: Option<&str>,
        relationship: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO people (id, name, email, organization, relationship) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(organization)
        .bind(relationship)
        .execute(db.pool())
        .await
        .unwrap();
    }

    pub async fn seed_task(
        db: &Database,
        id: &str,
        project_id: &str,
        title: &str,
        status: &str,
        priority: &str,
        due_date: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, status, priority, due_date) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id)
        .bind(project_id)
        .bind(title)
        .bind(status)
        .bind(priority)
        .bind(due_date)
        .execute(db.pool())
        .await
        .unwrap();
    }

    pub async fn seed_commitment(
        db: &Database,
        id: &str,
        project_id: Option<&str>,
        person_id: Option<&str>,
        direction: &str,
        description: &str,
        deadline: Option<&str>,
        status: &str,
    ) {
        sqlx::query(
            "INSERT INTO commitments (id, project_id, person_id, direction, description, deadline, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id)
        .bind(project_id)
        .bind(person_id)
        .bind(direction)
        .bind(description)
        .bind(deadline)
        .bind(status)
        .execute(db.pool())
        .await
        .unwrap();
    }

    pub async fn seed_sprint(
        db: &Database,
        id: &str,
        name: &str,
        project_id: Option<&str>,
        ends_at: i64,
        is_active: bool,
    ) {
        sqlx::query(
            "INSERT INTO sprints (id, name, project_id, starts_at, ends_at, is_active) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id)
        .bind(name)
        .bind(project_id)
        .bind(ends_at - 7 * 86400)
        .bind(ends_at)
        .bind(is_active)
        .execute(db.pool())
        .await
        .unwrap();
    }
}
