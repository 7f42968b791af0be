// crates/simon-db/src/recorder.rs
//! Session recording — persists parsed transcripts, idempotently.
//!
//! `record_session` does the heavy work inside the worker;
//! `enqueue_session_recording` is the Stop-hook fast path and is limited to
//! one stat call plus one enqueue round-trip.

use crate::jobs::{EnqueueRequest, JobKind, SessionJobPayload};
use crate::queries::sessions::NewTurn;
use crate::{Database, DbResult};
use simon_core::error::ParseError;
use simon_core::parser::{parse_session_into_turns, parse_timestamp};
use std::path::Path;
use tracing::{info, warn};

/// Result of one recording pass over a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub session_id: String,
    pub turns_recorded: usize,
    pub turns_skipped: usize,
    pub error: Option<String>,
}

impl RecordOutcome {
    fn empty(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            turns_recorded: 0,
            turns_skipped: 0,
            error: None,
        }
    }
}

/// Parse a transcript and store its turns, deduplicating by content hash.
///
/// A missing transcript yields `error = "file_not_found"` rather than an Err;
/// the session_process handler turns that into a retryable job failure.
pub async fn record_session(
    db: &Database,
    session_id: &str,
    transcript_path: &str,
    workspace_path: &str,
) -> DbResult<RecordOutcome> {
    let turns = match parse_session_into_turns(Path::new(transcript_path)).await {
        Ok(turns) => turns,
        Err(ParseError::NotFound { .. }) => {
            warn!("Transcript not found: {}", transcript_path);
            return Ok(RecordOutcome {
                error: Some("file_not_found".to_string()),
                ..RecordOutcome::empty(session_id)
            });
        }
        Err(e) => {
            return Ok(RecordOutcome {
                error: Some(format!("read_failed: {e}")),
                ..RecordOutcome::empty(session_id)
            });
        }
    };

    if turns.is_empty() {
        return Ok(RecordOutcome::empty(session_id));
    }

    // Get or create the session; preload existing turn hashes in one query.
    let (agent_session, existing_hashes) = match db.get_agent_session(session_id).await? {
        Some(session) => {
            let hashes = db.existing_turn_hashes(&session.id).await?;
            (session, hashes)
        }
        None => {
            let session = db
                .create_agent_session(session_id, transcript_path, workspace_path)
                .await?;
            (session, Default::default())
        }
    };

    let mut turns_recorded = 0usize;
    let mut turns_skipped = 0usize;

    for turn in &turns {
        if existing_hashes.contains(&turn.content_hash) {
            turns_skipped += 1;
            continue;
        }

        db.insert_turn(NewTurn {
            session_id: agent_session.id.clone(),
            turn_number: turn.turn_number as i64,
            user_message: turn.user_message.clone(),
            assistant_text: turn.assistant_text.clone(),
            turn_title: None,
            content_hash: turn.content_hash.clone(),
            model_name: turn.model_name.clone(),
            tool_names: turn.tool_names.clone(),
            started_at: turn.started_at.as_deref().and_then(parse_timestamp),
            ended_at: turn.ended_at.as_deref().and_then(parse_timestamp),
            raw_jsonl: turn.raw_jsonl.clone(),
        })
        .await?;
        turns_recorded += 1;
    }

    let timestamps: Vec<i64> = turns
        .iter()
        .filter_map(|t| t.started_at.as_deref().and_then(parse_timestamp))
        .collect();

    db.update_session_after_recording(
        &agent_session.id,
        timestamps.iter().min().copied(),
        timestamps.iter().max().copied(),
        existing_hashes.len() as i64 + turns_recorded as i64,
        transcript_path,
    )
    .await?;

    info!(
        "Recorded session {}: {} new turns, {} skipped",
        session_id.chars().take(12).collect::<String>(),
        turns_recorded,
        turns_skipped,
    );

    Ok(RecordOutcome {
        session_id: session_id.to_string(),
        turns_recorded,
        turns_skipped,
        error: None,
    })
}

/// Fast path for the Stop hook: enqueue a `session_process` job.
///
/// The transcript's file size goes into the dedupe key so each growth of the
/// transcript is a distinct job; the recorder dedups turns by content hash,
/// so re-processing the same file is safe. Returns true iff newly enqueued.
pub async fn enqueue_session_recording(
    db: &Database,
    session_id: &str,
    transcript_path: &str,
    workspace_path: &str,
) -> DbResult<bool> {
    let file_size = std::fs::metadata(transcript_path)
        .map(|m| m.len())
        .unwrap_or_else(|e| {
            warn!("Cannot stat transcript {}: {}", transcript_path, e);
            0
        });

    let job = db
        .enqueue_job(
            EnqueueRequest::new(
                JobKind::SessionProcess,
                SessionJobPayload {
                    session_id: session_id.to_string(),
                    transcript_path: transcript_path.to_string(),
                    workspace_path: workspace_path.to_string(),
                },
            )
            .dedupe_key(format!("session_process:{}:{}", session_id, file_size))
            .priority(5),
        )
        .await?;

    Ok(job.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobStatus;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn transcript(turn_count: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..turn_count {
            writeln!(
                file,
                r#"{{"type":"user","timestamp":"2026-01-27T10:{:02}:00Z","message":{{"role":"user","content":"question {i}"}}}}"#,
                i
            )
            .unwrap();
            writeln!(
                file,
                r#"{{"type":"assistant","timestamp":"2026-01-27T10:{:02}:30Z","message":{{"role":"assistant","model":"claude-haiku-4-5","content":[{{"type":"text","text":"answer {i}"}}]}}}}"#,
                i
            )
            .unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_record_then_rerecord_is_idempotent() {
        let db = Database::new_in_memory().await.unwrap();
        let file = transcript(3);
        let path = file.path().to_string_lossy().to_string();

        let first = record_session(&db, "ext-1", &path, "/work/apollo")
            .await
            .unwrap();
        assert_eq!(first.turns_recorded, 3);
        assert_eq!(first.turns_skipped, 0);
        assert!(first.error.is_none());

        let second = record_session(&db, "ext-1", &path, "/work/apollo")
            .await
            .unwrap();
        assert_eq!(second.turns_recorded, 0);
        assert_eq!(second.turns_skipped, 3);

        let session = db.get_agent_session("ext-1").await.unwrap().unwrap();
        assert_eq!(session.turn_count, 3);
        let turns = db.turns_for_session(&session.id).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].user_message.as_deref(), Some("question 0"));
    }

    #[tokio::test]
    async fn test_transcript_growth_records_only_new_turns() {
        let db = Database::new_in_memory().await.unwrap();
        let mut file = transcript(2);
        let path = file.path().to_string_lossy().to_string();

        record_session(&db, "ext-1", &path, "").await.unwrap();

        writeln!(
            file,
            r#"{{"type":"user","timestamp":"2026-01-27T11:00:00Z","message":{{"role":"user","content":"a third question"}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let outcome = record_session(&db, "ext-1", &path, "").await.unwrap();
        assert_eq!(outcome.turns_recorded, 1);
        assert_eq!(outcome.turns_skipped, 2);

        let session = db.get_agent_session("ext-1").await.unwrap().unwrap();
        assert_eq!(session.turn_count, 3);
    }

    #[tokio::test]
    async fn test_session_timestamps_set_from_turns() {
        let db = Database::new_in_memory().await.unwrap();
        let file = transcript(2);
        let path = file.path().to_string_lossy().to_string();

        record_session(&db, "ext-1", &path, "").await.unwrap();
        let session = db.get_agent_session("ext-1").await.unwrap().unwrap();

        let started = parse_timestamp("2026-01-27T10:00:00Z").unwrap();
        let last = parse_timestamp("2026-01-27T10:01:00Z").unwrap();
        assert_eq!(session.started_at, Some(started));
        assert_eq!(session.last_activity_at, Some(last));
    }

    #[tokio::test]
    async fn test_missing_file_reports_error_not_err() {
        let db = Database::new_in_memory().await.unwrap();
        let outcome = record_session(&db, "ext-1", "/no/such/file.jsonl", "")
            .await
            .unwrap();
        assert_eq!(outcome.error.as_deref(), Some("file_not_found"));
        assert_eq!(outcome.turns_recorded, 0);
        assert!(db.get_agent_session("ext-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_transcript_records_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();

        let outcome = record_session(&db, "ext-1", &path, "").await.unwrap();
        assert_eq!(outcome.turns_recorded, 0);
        assert!(outcome.error.is_none());
        assert!(db.get_agent_session("ext-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_enqueue_session_recording_dedups_by_file_size() {
        let db = Database::new_in_memory().await.unwrap();
        let file = transcript(1);
        let path = file.path().to_string_lossy().to_string();

        assert!(enqueue_session_recording(&db, "ext-1", &path, "/work")
            .await
            .unwrap());
        // Same file size → duplicate
        assert!(!enqueue_session_recording(&db, "ext-1", &path, "/work")
            .await
            .unwrap());

        let job = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(job.kind, JobKind::SessionProcess);
        assert_eq!(job.priority, 5);
        assert_eq!(job.status, JobStatus::Processing);
        let payload: SessionJobPayload = job.payload_as().unwrap();
        assert_eq!(payload.session_id, "ext-1");
        assert_eq!(payload.workspace_path, "/work");
    }

    #[tokio::test]
    async fn test_enqueue_after_growth_is_new_job() {
        let db = Database::new_in_memory().await.unwrap();
        let mut file = transcript(1);
        let path = file.path().to_string_lossy().to_string();

        assert!(enqueue_session_recording(&db, "ext-1", &path, "")
            .await
            .unwrap());

        writeln!(file, r#"{{"type":"user","message":{{"role":"user","content":"more"}}}}"#).unwrap();
        file.flush().unwrap();

        assert!(enqueue_session_recording(&db, "ext-1", &path, "")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_enqueue_missing_file_uses_zero_size() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(enqueue_session_recording(&db, "ext-1", "/no/such.jsonl", "")
            .await
            .unwrap());
        let job = db.claim_job(None, 300).await.unwrap().unwrap();
        assert_eq!(
            job.dedupe_key.as_deref(),
            Some("session_process:ext-1:0")
        );
    }
}
