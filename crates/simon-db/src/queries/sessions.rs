// crates/simon-db/src/queries/sessions.rs
// Agent session / turn CRUD used by the recorder and pipeline handlers.

use crate::{now, Database, DbResult};
use sqlx::Row;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AgentSessionRow {
    pub id: String,
    pub session_id: String,
    pub transcript_path: String,
    pub workspace_path: String,
    pub project_id: Option<String>,
    pub session_title: Option<String>,
    pub session_summary: Option<String>,
    pub started_at: Option<i64>,
    pub last_activity_at: Option<i64>,
    pub turn_count: i64,
    pub is_processed: bool,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for AgentSessionRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            transcript_path: row.try_get("transcript_path")?,
            workspace_path: row.try_get("workspace_path")?,
            project_id: row.try_get("project_id")?,
            session_title: row.try_get("session_title")?,
            session_summary: row.try_get("session_summary")?,
            started_at: row.try_get("started_at")?,
            last_activity_at: row.try_get("last_activity_at")?,
            turn_count: row.try_get("turn_count")?,
            is_processed: row.try_get("is_processed")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AgentTurnRow {
    pub id: String,
    pub session_id: String,
    pub turn_number: i64,
    pub user_message: Option<String>,
    pub assistant_summary: Option<String>,
    pub turn_title: Option<String>,
    pub content_hash: String,
    pub model_name: Option<String>,
    pub tool_names: String,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
}

impl AgentTurnRow {
    /// Tool names are stored as a JSON array in TEXT.
    pub fn tool_names_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.tool_names).unwrap_or_default()
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for AgentTurnRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            turn_number: row.try_get("turn_number")?,
            user_message: row.try_get("user_message")?,
            assistant_summary: row.try_get("assistant_summary")?,
            turn_title: row.try_get("turn_title")?,
            content_hash: row.try_get("content_hash")?,
            model_name: row.try_get("model_name")?,
            tool_names: row.try_get("tool_names")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AgentTurnContentRow {
    pub turn_id: String,
    pub raw_jsonl: String,
    pub assistant_text: Option<String>,
    pub content_size: i64,
    pub files_touched: Option<String>,
    pub commands_run: Option<String>,
    pub errors_encountered: Option<String>,
    pub tool_call_count: i64,
}

impl AgentTurnContentRow {
    pub fn files_touched_vec(&self) -> Vec<String> {
        self.files_touched
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn commands_run_vec(&self) -> Vec<String> {
        self.commands_run
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn errors_encountered_vec(&self) -> Vec<String> {
        self.errors_encountered
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for AgentTurnContentRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            turn_id: row.try_get("turn_id")?,
            raw_jsonl: row.try_get("raw_jsonl")?,
            assistant_text: row.try_get("assistant_text")?,
            content_size: row.try_get("content_size")?,
            files_touched: row.try_get("files_touched")?,
            commands_run: row.try_get("commands_run")?,
            errors_encountered: row.try_get("errors_encountered")?,
            tool_call_count: row.try_get("tool_call_count")?,
        })
    }
}

/// A turn to insert, produced from a `ParsedTurn` by the recorder.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub session_id: String,
    pub turn_number: i64,
    pub user_message: String,
    pub assistant_text: String,
    pub turn_title: Option<String>,
    pub content_hash: String,
    pub model_name: Option<String>,
    pub tool_names: Vec<String>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub raw_jsonl: String,
}

const SESSION_COLUMNS: &str = "id, session_id, transcript_path, workspace_path, project_id, session_title, session_summary, started_at, last_activity_at, turn_count, is_processed";
const TURN_COLUMNS: &str = "id, session_id, turn_number, user_message, assistant_summary, turn_title, content_hash, model_name, tool_names, started_at, ended_at";
const CONTENT_COLUMNS: &str = "turn_id, raw_jsonl, assistant_text, content_size, files_touched, commands_run, errors_encountered, tool_call_count";

impl Database {
    pub async fn get_agent_session(&self, session_id: &str) -> DbResult<Option<AgentSessionRow>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM agent_sessions WHERE session_id = ?1");
        Ok(sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_optional(self.pool())
            .await?)
    }

    /// Create a session row for an external session id.
    pub async fn create_agent_session(
        &self,
        session_id: &str,
        transcript_path: &str,
        workspace_path: &str,
    ) -> DbResult<AgentSessionRow> {
        let id = uuid::Uuid::new_v4().to_string();
        let ts = now();
        sqlx::query(
            r#"
            INSERT INTO agent_sessions (id, session_id, transcript_path, workspace_path, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(session_id)
        .bind(transcript_path)
        .bind(workspace_path)
        .bind(ts)
        .execute(self.pool())
        .await?;

        self.get_agent_session(session_id).await?.ok_or_else(|| {
            crate::DbError::Decode(format!("session {} vanished after insert", session_id))
        })
    }

    /// All content hashes already recorded for a session, in one query.
    pub async fn existing_turn_hashes(&self, agent_session_id: &str) -> DbResult<HashSet<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT content_hash FROM agent_turns WHERE session_id = ?1")
                .bind(agent_session_id)
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(|(h,)| h).collect())
    }

    /// Insert a turn plus its content row; returns the new turn id.
    pub async fn insert_turn(&self, turn: NewTurn) -> DbResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let tool_names =
            serde_json::to_string(&turn.tool_names).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            r#"
            INSERT INTO agent_turns
                (id, session_id, turn_number, user_message, turn_title, content_hash, model_name, tool_names, started_at, ended_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&id)
        .bind(&turn.session_id)
        .bind(turn.turn_number)
        .bind(&turn.user_message)
        .bind(&turn.turn_title)
        .bind(&turn.content_hash)
        .bind(&turn.model_name)
        .bind(&tool_names)
        .bind(turn.started_at)
        .bind(turn.ended_at)
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO agent_turn_content (turn_id, raw_jsonl, assistant_text, content_size)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&id)
        .bind(&turn.raw_jsonl)
        .bind(&turn.assistant_text)
        .bind(turn.raw_jsonl.len() as i64)
        .execute(self.pool())
        .await?;

        Ok(id)
    }

    /// Session metadata update after a recording pass. `started_at` is only
    /// set when not already present; `last_activity_at` always moves forward.
    pub async fn update_session_after_recording(
        &self,
        agent_session_id: &str,
        started_at: Option<i64>,
        last_activity_at: Option<i64>,
        turn_count: i64,
        transcript_path: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE agent_sessions
            SET started_at = COALESCE(started_at, ?1),
                last_activity_at = COALESCE(?2, last_activity_at),
                turn_count = ?3,
                transcript_path = ?4,
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(started_at)
        .bind(last_activity_at)
        .bind(turn_count)
        .bind(transcript_path)
        .bind(now())
        .bind(agent_session_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Link a session to a project unless it already has one.
    pub async fn link_session_to_project(
        &self,
        agent_session_id: &str,
        project_id: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE agent_sessions SET project_id = ?1, updated_at = ?2 WHERE id = ?3 AND project_id IS NULL",
        )
        .bind(project_id)
        .bind(now())
        .bind(agent_session_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_session_summary(
        &self,
        agent_session_id: &str,
        title: &str,
        summary: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE agent_sessions
            SET session_title = ?1, session_summary = ?2, is_processed = 1, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(title)
        .bind(summary)
        .bind(now())
        .bind(agent_session_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_turn(&self, turn_id: &str) -> DbResult<Option<AgentTurnRow>> {
        let sql = format!("SELECT {TURN_COLUMNS} FROM agent_turns WHERE id = ?1");
        Ok(sqlx::query_as(&sql)
            .bind(turn_id)
            .fetch_optional(self.pool())
            .await?)
    }

    pub async fn get_turn_content(&self, turn_id: &str) -> DbResult<Option<AgentTurnContentRow>> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM agent_turn_content WHERE turn_id = ?1");
        Ok(sqlx::query_as(&sql)
            .bind(turn_id)
            .fetch_optional(self.pool())
            .await?)
    }

    /// All turns for a session in turn order.
    pub async fn turns_for_session(&self, agent_session_id: &str) -> DbResult<Vec<AgentTurnRow>> {
        let sql = format!(
            "SELECT {TURN_COLUMNS} FROM agent_turns WHERE session_id = ?1 ORDER BY turn_number ASC"
        );
        Ok(sqlx::query_as(&sql)
            .bind(agent_session_id)
            .fetch_all(self.pool())
            .await?)
    }

    /// Turns still lacking an assistant summary, in turn order.
    pub async fn turns_lacking_summary(
        &self,
        agent_session_id: &str,
    ) -> DbResult<Vec<AgentTurnRow>> {
        let sql = format!(
            "SELECT {TURN_COLUMNS} FROM agent_turns WHERE session_id = ?1 AND assistant_summary IS NULL ORDER BY turn_number ASC"
        );
        Ok(sqlx::query_as(&sql)
            .bind(agent_session_id)
            .fetch_all(self.pool())
            .await?)
    }

    pub async fn set_turn_summary(
        &self,
        turn_id: &str,
        title: &str,
        summary: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE agent_turns SET turn_title = ?1, assistant_summary = ?2 WHERE id = ?3")
            .bind(title)
            .bind(summary)
            .bind(turn_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Write the artifact summary columns onto a turn's content row.
    pub async fn update_turn_content_artifacts(
        &self,
        turn_id: &str,
        files_touched: Option<&[String]>,
        commands_run: Option<&[String]>,
        errors_encountered: Option<&[String]>,
        tool_call_count: i64,
    ) -> DbResult<()> {
        let encode = |v: Option<&[String]>| {
            v.filter(|v| !v.is_empty())
                .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string()))
        };

        sqlx::query(
            r#"
            UPDATE agent_turn_content
            SET files_touched = COALESCE(?1, files_touched),
                commands_run = COALESCE(?2, commands_run),
                errors_encountered = COALESCE(?3, errors_encountered),
                tool_call_count = ?4
            WHERE turn_id = ?5
            "#,
        )
        .bind(encode(files_touched))
        .bind(encode(commands_run))
        .bind(encode(errors_encountered))
        .bind(tool_call_count)
        .bind(turn_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn insert_turn_entity(
        &self,
        turn_id: &str,
        entity_type: &str,
        entity_id: &str,
        entity_name: &str,
        confidence: f64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_turn_entities (turn_id, entity_type, entity_id, entity_name, confidence)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(turn_id)
        .bind(entity_type)
        .bind(entity_id)
        .bind(entity_name)
        .bind(confidence)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn insert_turn_artifact(
        &self,
        turn_id: &str,
        artifact_type: &str,
        artifact_value: &str,
        artifact_metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> DbResult<()> {
        let metadata =
            serde_json::to_string(artifact_metadata).unwrap_or_else(|_| "{}".to_string());
        sqlx::query(
            r#"
            INSERT INTO agent_turn_artifacts (turn_id, artifact_type, artifact_value, artifact_metadata)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(turn_id)
        .bind(artifact_type)
        .bind(artifact_value)
        .bind(&metadata)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn count_turn_entities(&self, turn_id: &str) -> DbResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM agent_turn_entities WHERE turn_id = ?1")
                .bind(turn_id)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }

    /// Counters for `context stats`.
    pub async fn context_stats(&self) -> DbResult<ContextStats> {
        let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agent_sessions")
            .fetch_one(self.pool())
            .await?;
        let processed: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM agent_sessions WHERE is_processed = 1")
                .fetch_one(self.pool())
                .await?;
        let turns: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agent_turns")
            .fetch_one(self.pool())
            .await?;
        let summarized: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM agent_turns WHERE assistant_summary IS NOT NULL")
                .fetch_one(self.pool())
                .await?;
        let entities: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agent_turn_entities")
            .fetch_one(self.pool())
            .await?;

        Ok(ContextStats {
            total_sessions: sessions.0,
            processed_sessions: processed.0,
            total_turns: turns.0,
            summarized_turns: summarized.0,
            entity_links: entities.0,
        })
    }
}

/// Recording statistics for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub total_sessions: i64,
    pub processed_sessions: i64,
    pub total_turns: i64,
    pub summarized_turns: i64,
    pub entity_links: i64,
}
