//! End-to-end pipeline tests: Stop-hook enqueue → worker drain → recorded,
//! summarized, extracted session.

use simon_core::settings::Settings;
use simon_db::{enqueue_session_recording, Database, JobKind, JobStatus};
use simon_worker::{JobContext, Worker};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_transcript(turns: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..turns {
        writeln!(
            file,
            r#"{{"type":"user","timestamp":"2026-01-27T10:{i:02}:00Z","message":{{"role":"user","content":"short q{i}"}}}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"type":"assistant","timestamp":"2026-01-27T10:{i:02}:30Z","message":{{"role":"assistant","model":"claude-haiku-4-5","content":[{{"type":"text","text":"answer {i}"}},{{"type":"tool_use","name":"Read","input":{{"file_path":"src/lib.rs"}}}}]}}}}"#
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn worker_for(db: &Database) -> Worker {
    let ctx = JobContext::new(db.clone(), Settings::default())
        .with_llm(None)
        .with_project_state(None)
        .with_personal_skills_dir(None);
    Worker::new(ctx, Duration::from_millis(50))
}

async fn job_counts(db: &Database, kind: JobKind) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM focus_jobs WHERE kind = ?1")
        .bind(kind.as_str())
        .fetch_one(db.pool())
        .await
        .unwrap();
    row.0
}

#[tokio::test]
async fn test_session_process_fans_out_per_turn_jobs() {
    let db = Database::new_in_memory().await.unwrap();
    let file = write_transcript(2);
    let path = file.path().to_string_lossy().to_string();

    assert!(enqueue_session_recording(&db, "ext-1", &path, "/work/apollo")
        .await
        .unwrap());

    let worker = worker_for(&db);
    // Process exactly the session_process job
    let processed = worker.process_pending_jobs(1).await.unwrap();
    assert_eq!(processed, 1);

    assert_eq!(job_counts(&db, JobKind::TurnSummary).await, 2);
    assert_eq!(job_counts(&db, JobKind::EntityExtract).await, 2);
    assert_eq!(job_counts(&db, JobKind::ArtifactExtract).await, 2);
    assert_eq!(job_counts(&db, JobKind::SessionSummary).await, 1);
    assert_eq!(job_counts(&db, JobKind::SkillExtract).await, 0);
}

#[tokio::test]
async fn test_rerun_of_session_process_enqueues_nothing_new() {
    let db = Database::new_in_memory().await.unwrap();
    let file = write_transcript(2);
    let path = file.path().to_string_lossy().to_string();

    enqueue_session_recording(&db, "ext-1", &path, "").await.unwrap();
    let worker = worker_for(&db);
    worker.process_pending_jobs(1).await.unwrap();

    let total_before: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM focus_jobs")
        .fetch_one(db.pool())
        .await
        .unwrap();

    // Same transcript size is deduped at the queue; force a second run by
    // enqueueing without the recorder's size-keyed dedup
    sqlx::query(
        r#"INSERT INTO focus_jobs (id, kind, payload, priority, attempts, max_attempts, status, created_at, updated_at)
           VALUES ('manual', 'session_process', ?1, 5, 0, 10, 'queued', 0, 0)"#,
    )
    .bind(
        serde_json::json!({
            "session_id": "ext-1",
            "transcript_path": path,
            "workspace_path": ""
        })
        .to_string(),
    )
    .execute(db.pool())
    .await
    .unwrap();

    worker.process_pending_jobs(1).await.unwrap();

    let total_after: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM focus_jobs")
        .fetch_one(db.pool())
        .await
        .unwrap();
    // Only the manual job itself was added; zero new turns → zero fan-out
    assert_eq!(total_after.0, total_before.0 + 1);
}

#[tokio::test]
async fn test_full_drain_summarizes_and_extracts() {
    let db = Database::new_in_memory().await.unwrap();
    let file = write_transcript(2);
    let path = file.path().to_string_lossy().to_string();

    enqueue_session_recording(&db, "ext-1", &path, "/work/apollo")
        .await
        .unwrap();

    let worker = worker_for(&db);
    let processed = worker.process_pending_jobs(20).await.unwrap();
    // session_process + 2 turn_summary + 2 entity_extract + 2 artifact_extract
    // + session_summary + skill_extract
    assert_eq!(processed, 9);

    let session = db.get_agent_session("ext-1").await.unwrap().unwrap();
    assert!(session.is_processed);
    assert_eq!(session.turn_count, 2);
    assert_eq!(session.session_summary.as_deref(), Some("short q0; short q1"));

    let turns = db.turns_for_session(&session.id).await.unwrap();
    for turn in &turns {
        // Short messages are summarized without an LLM
        assert!(turn.assistant_summary.is_some());
        let content = db.get_turn_content(&turn.id).await.unwrap().unwrap();
        assert_eq!(content.files_touched_vec(), vec!["src/lib.rs"]);
        assert_eq!(content.tool_call_count, 1);
    }

    // Every job reached a terminal state, none failed
    let stats = db.job_stats().await.unwrap();
    assert_eq!(stats.get("done"), Some(&9));
    assert_eq!(stats.get("failed"), None);
    assert_eq!(stats.get("queued"), None);
}

#[tokio::test]
async fn test_jobs_drain_in_priority_order() {
    let db = Database::new_in_memory().await.unwrap();
    let file = write_transcript(1);
    let path = file.path().to_string_lossy().to_string();

    enqueue_session_recording(&db, "ext-1", &path, "").await.unwrap();
    let worker = worker_for(&db);
    worker.process_pending_jobs(1).await.unwrap();

    // Next claims follow priority: turn_summary(15) < artifact_extract(18)
    // < entity_extract(20) < session_summary(25)
    let order: Vec<JobKind> = {
        let mut kinds = Vec::new();
        while let Some(job) = db.claim_job(None, 300).await.unwrap() {
            kinds.push(job.kind);
            db.complete_job(&job.id).await.unwrap();
        }
        kinds
    };
    assert_eq!(
        order,
        vec![
            JobKind::TurnSummary,
            JobKind::ArtifactExtract,
            JobKind::EntityExtract,
            JobKind::SessionSummary,
        ]
    );
}

#[tokio::test]
async fn test_missing_transcript_fails_job_for_retry() {
    let db = Database::new_in_memory().await.unwrap();

    enqueue_session_recording(&db, "ext-1", "/no/such/transcript.jsonl", "")
        .await
        .unwrap();

    let worker = worker_for(&db);
    let processed = worker.process_pending_jobs(5).await.unwrap();
    assert_eq!(processed, 0);

    let job: (String, String) =
        sqlx::query_as("SELECT status, error_message FROM focus_jobs LIMIT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(job.0, JobStatus::Retry.as_str());
    assert!(job.1.contains("file_not_found"));
}

#[tokio::test]
async fn test_session_linked_to_matching_project() {
    let db = Database::new_in_memory().await.unwrap();
    sqlx::query("INSERT INTO projects (id, name, slug, status) VALUES ('p1', 'Apollo', 'apollo', 'active')")
        .execute(db.pool())
        .await
        .unwrap();

    let file = write_transcript(1);
    let path = file.path().to_string_lossy().to_string();
    enqueue_session_recording(&db, "ext-1", &path, "/home/u/apollo")
        .await
        .unwrap();

    let worker = worker_for(&db);
    worker.process_pending_jobs(1).await.unwrap();

    let session = db.get_agent_session("ext-1").await.unwrap().unwrap();
    assert_eq!(session.project_id.as_deref(), Some("p1"));
}
