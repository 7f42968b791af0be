// crates/simon-db/src/retriever.rs
//! Context retrieval — gathers ranked context blocks for a classification.
//!
//! Every source is an explicit query against the recorded sessions or the
//! read-only domain tables; skill matching is disk-only. The retriever never
//! calls an LLM and runs entirely inside the UserPromptSubmit hook budget.

use crate::queries::sessions::AgentTurnRow;
use crate::{now, Database, DbResult};
use simon_core::classifier::PromptClassification;
use simon_core::skillset;
use simon_core::types::{ContextBlock, QueryType, SourceType};
use std::path::{Path, PathBuf};

const TURN_LIMIT: i64 = 5;
const GLOBAL_TURN_LIMIT: i64 = 3;
const TASK_LIMIT: i64 = 5;
const COMMITMENT_LIMIT: i64 = 3;
const ERROR_LIMIT: i64 = 3;
const SPRINT_LIMIT: i64 = 3;
const FILE_TURN_LIMIT: i64 = 3;
const MAX_FILE_PATHS: usize = 5;
const MAX_PEOPLE: usize = 3;
const MAX_SKILLS: usize = 3;

/// Retrieves relevant context from the database and skill directories.
pub struct ContextRetriever<'a> {
    db: &'a Database,
    personal_skills_dir: Option<PathBuf>,
    project_skills_dir: Option<PathBuf>,
}

impl<'a> ContextRetriever<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            personal_skills_dir: simon_core::paths::personal_skills_dir(),
            project_skills_dir: None,
        }
    }

    /// Override skill directories (tests point these at tempdirs).
    pub fn with_skills_dirs(
        mut self,
        personal: Option<PathBuf>,
        project: Option<PathBuf>,
    ) -> Self {
        self.personal_skills_dir = personal;
        self.project_skills_dir = project;
        self
    }

    /// Gather context blocks for a classification. The token budget is
    /// enforced downstream by the formatter; `_max_tokens` is part of the
    /// call contract for future trimming.
    pub async fn retrieve(
        &self,
        classification: &PromptClassification,
        _max_tokens: usize,
    ) -> DbResult<Vec<ContextBlock>> {
        let mut blocks: Vec<ContextBlock> = Vec::new();

        if classification.confidence < 0.1 {
            return Ok(blocks);
        }

        // Resolve project ids from matched slugs, else the workspace slug
        let project_ids: Vec<String> = if !classification.project_slugs.is_empty() {
            self.db
                .project_ids_by_slugs(&classification.project_slugs)
                .await?
        } else if let Some(workspace) = &classification.workspace_project {
            self.db
                .project_ids_by_slugs(std::slice::from_ref(workspace))
                .await?
        } else {
            Vec::new()
        };

        for project_id in &project_ids {
            blocks.extend(self.recent_turns_for_project(project_id).await?);
            blocks.extend(self.active_tasks(project_id).await?);
            blocks.extend(self.open_commitments(Some(project_id)).await?);
        }

        if let Some(workspace) = &classification.workspace_project {
            // Workspace matching supplements project-matched turns
            blocks.extend(self.recent_turns_for_workspace(workspace).await?);
        }

        if project_ids.is_empty() && classification.workspace_project.is_none() {
            blocks.extend(self.recent_turns_global().await?);
        }

        if !classification.person_names.is_empty() {
            blocks.extend(self.person_context(&classification.person_names).await?);
        }

        if !classification.file_paths.is_empty() {
            blocks.extend(self.turns_by_file(&classification.file_paths).await?);
        }

        if classification.query_type == QueryType::Code {
            for project_id in &project_ids {
                blocks.extend(self.recent_error_turns(project_id).await?);
            }
        }

        if project_ids.is_empty() {
            blocks.extend(self.open_commitments(None).await?);
        }
        blocks.extend(self.active_sprints().await?);

        blocks.extend(self.relevant_skills(classification));

        // Deduplicate by source_id, first occurrence wins
        let mut seen = std::collections::HashSet::new();
        blocks.retain(|b| seen.insert(b.source_id.clone()));

        blocks.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(blocks)
    }

    async fn recent_turns_for_project(&self, project_id: &str) -> DbResult<Vec<ContextBlock>> {
        let turns: Vec<AgentTurnRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.session_id, t.turn_number, t.user_message, t.assistant_summary,
                   t.turn_title, t.content_hash, t.model_name, t.tool_names, t.started_at, t.ended_at
            FROM agent_turns t
            JOIN agent_sessions s ON t.session_id = s.id
            WHERE s.project_id = ?1
            ORDER BY t.started_at IS NULL, t.started_at DESC
            LIMIT ?2
            "#,
        )
        .bind(project_id)
        .bind(TURN_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(turns.iter().map(turn_block).collect())
    }

    async fn recent_turns_for_workspace(&self, workspace: &str) -> DbResult<Vec<ContextBlock>> {
        let turns: Vec<AgentTurnRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.session_id, t.turn_number, t.user_message, t.assistant_summary,
                   t.turn_title, t.content_hash, t.model_name, t.tool_names, t.started_at, t.ended_at
            FROM agent_turns t
            JOIN agent_sessions s ON t.session_id = s.id
            WHERE lower(s.workspace_path) LIKE '%' || lower(?1) || '%'
            ORDER BY t.started_at IS NULL, t.started_at DESC
            LIMIT ?2
            "#,
        )
        .bind(workspace)
        .bind(TURN_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(turns.iter().map(turn_block).collect())
    }

    async fn recent_turns_global(&self) -> DbResult<Vec<ContextBlock>> {
        let turns: Vec<AgentTurnRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.session_id, t.turn_number, t.user_message, t.assistant_summary,
                   t.turn_title, t.content_hash, t.model_name, t.tool_names, t.started_at, t.ended_at
            FROM agent_turns t
            ORDER BY t.started_at IS NULL, t.started_at DESC
            LIMIT ?1
            "#,
        )
        .bind(GLOBAL_TURN_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(turns.iter().map(turn_block).collect())
    }

    async fn active_tasks(&self, project_id: &str) -> DbResult<Vec<ContextBlock>> {
        let tasks = self
            .db
            .active_tasks_for_project(project_id, TASK_LIMIT)
            .await?;

        Ok(tasks
            .into_iter()
            .map(|task| {
                let due = task
                    .due_date
                    .as_deref()
                    .map(|d| format!(" (due {d})"))
                    .unwrap_or_default();
                ContextBlock {
                    source_type: SourceType::Task,
                    source_id: task.id,
                    title: task.title.clone(),
                    content: format!("[{}] {}{} | {}", task.status, task.title, due, task.priority),
                    relevance_score: if task.status == "in_progress" { 0.6 } else { 0.4 },
                    timestamp: None,
                }
            })
            .collect())
    }

    async fn open_commitments(&self, project_id: Option<&str>) -> DbResult<Vec<ContextBlock>> {
        let commitments = self.db.open_commitments(project_id, COMMITMENT_LIMIT).await?;

        Ok(commitments
            .into_iter()
            .map(|c| {
                let person = c.person_name.unwrap_or_else(|| "unknown".to_string());
                let direction = if c.direction == "from_me" {
                    "from me to"
                } else {
                    "from"
                };
                let deadline = c
                    .deadline
                    .as_deref()
                    .map(|d| format!(" by {d}"))
                    .unwrap_or_default();
                ContextBlock {
                    source_type: SourceType::Commitment,
                    source_id: c.id,
                    title: truncate_chars(&c.description, 60),
                    content: format!(
                        "Commitment {} {}: {}{}",
                        direction, person, c.description, deadline
                    ),
                    relevance_score: 0.5,
                    timestamp: None,
                }
            })
            .collect())
    }

    async fn person_context(&self, person_names: &[String]) -> DbResult<Vec<ContextBlock>> {
        let mut blocks = Vec::new();

        for name in person_names.iter().take(MAX_PEOPLE) {
            let Some(person) = self.db.person_by_name_like(name).await? else {
                continue;
            };

            let mut parts = vec![person.name.clone()];
            if let Some(org) = &person.organization {
                parts.push(format!("({org})"));
            }
            if let Some(rel) = &person.relationship {
                parts.push(format!("[{rel}]"));
            }

            blocks.push(ContextBlock {
                source_type: SourceType::Person,
                source_id: person.id,
                title: person.name,
                content: parts.join(" "),
                relevance_score: 0.5,
                timestamp: None,
            });
        }

        Ok(blocks)
    }

    /// Prior turns that touched a mentioned file. `files_touched` is only
    /// populated once artifact extraction has run for a turn.
    async fn turns_by_file(&self, file_paths: &[String]) -> DbResult<Vec<ContextBlock>> {
        let mut blocks = Vec::new();

        for path in file_paths.iter().take(MAX_FILE_PATHS) {
            let turns: Vec<AgentTurnRow> = sqlx::query_as(
                r#"
                SELECT t.id, t.session_id, t.turn_number, t.user_message, t.assistant_summary,
                       t.turn_title, t.content_hash, t.model_name, t.tool_names, t.started_at, t.ended_at
                FROM agent_turns t
                JOIN agent_turn_content ct ON ct.turn_id = t.id
                WHERE ct.files_touched IS NOT NULL AND instr(ct.files_touched, ?1) > 0
                ORDER BY t.started_at IS NULL, t.started_at DESC
                LIMIT ?2
                "#,
            )
            .bind(path)
            .bind(FILE_TURN_LIMIT)
            .fetch_all(self.db.pool())
            .await?;

            for turn in turns {
                let summary = turn
                    .assistant_summary
                    .clone()
                    .or_else(|| turn.user_message.clone())
                    .unwrap_or_default();
                let basename = Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.clone());

                blocks.push(ContextBlock {
                    source_type: SourceType::FileContext,
                    source_id: format!("file:{}:{}", turn.id, path),
                    title: format!("File: {basename}"),
                    content: truncate_chars(
                        format!("Previously touched {path}: {summary}").trim(),
                        200,
                    ),
                    relevance_score: 0.65,
                    timestamp: turn.started_at,
                });
            }
        }

        Ok(blocks)
    }

    async fn recent_error_turns(&self, project_id: &str) -> DbResult<Vec<ContextBlock>> {
        let turns: Vec<AgentTurnRow> = sqlx::query_as(
            r#"
            SELECT t.id, t.session_id, t.turn_number, t.user_message, t.assistant_summary,
                   t.turn_title, t.content_hash, t.model_name, t.tool_names, t.started_at, t.ended_at
            FROM agent_turns t
            JOIN agent_turn_content ct ON ct.turn_id = t.id
            JOIN agent_sessions s ON t.session_id = s.id
            WHERE ct.errors_encountered IS NOT NULL AND s.project_id = ?1
            ORDER BY t.started_at IS NULL, t.started_at DESC
            LIMIT ?2
            "#,
        )
        .bind(project_id)
        .bind(ERROR_LIMIT)
        .fetch_all(self.db.pool())
        .await?;

        Ok(turns
            .into_iter()
            .map(|turn| {
                let title = turn
                    .turn_title
                    .clone()
                    .unwrap_or_else(|| "Error encountered".to_string());
                let age = relative_time(turn.started_at);
                let user_message = turn.user_message.clone().unwrap_or_default();

                ContextBlock {
                    source_type: SourceType::Error,
                    source_id: format!("error:{}", turn.id),
                    title: format!("{title} ({age})"),
                    content: truncate_chars(
                        format!("Errors in previous session: {user_message}").trim(),
                        200,
                    ),
                    relevance_score: 0.55,
                    timestamp: turn.started_at,
                }
            })
            .collect())
    }

    async fn active_sprints(&self) -> DbResult<Vec<ContextBlock>> {
        let ts = now();
        let sprints = self.db.active_sprints(ts, SPRINT_LIMIT).await?;

        Ok(sprints
            .into_iter()
            .map(|sprint| {
                let days_left = sprint
                    .ends_at
                    .map(|ends| (ends - ts).max(0) / 86400)
                    .unwrap_or(0);
                let project = sprint
                    .project_name
                    .unwrap_or_else(|| "no project".to_string());
                ContextBlock {
                    source_type: SourceType::Sprint,
                    source_id: sprint.id,
                    title: sprint.name.clone(),
                    content: format!("Sprint: {} ({}, {}d left)", sprint.name, project, days_left),
                    relevance_score: 0.3,
                    timestamp: sprint.ends_at,
                }
            })
            .collect())
    }

    fn relevant_skills(&self, classification: &PromptClassification) -> Vec<ContextBlock> {
        let project_dir = self.project_skills_dir.clone().or_else(|| {
            classification
                .workspace_project
                .as_deref()
                .map(|ws| simon_core::paths::project_skills_dir(Path::new(ws)))
        });

        skillset::relevant_skill_blocks(
            classification,
            self.personal_skills_dir.as_deref(),
            project_dir.as_deref(),
            MAX_SKILLS,
        )
    }
}

fn turn_block(turn: &AgentTurnRow) -> ContextBlock {
    let user_message = turn.user_message.as_deref().unwrap_or("");
    let title = turn
        .turn_title
        .clone()
        .unwrap_or_else(|| truncate_chars(user_message, 60));
    let content = turn
        .assistant_summary
        .clone()
        .unwrap_or_else(|| truncate_chars(user_message, 150));
    let age = relative_time(turn.started_at);

    ContextBlock {
        source_type: SourceType::Conversation,
        source_id: turn.id.clone(),
        title: format!("{title} ({age})"),
        content,
        relevance_score: 0.7,
        timestamp: turn.started_at,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Human-readable age for a Unix timestamp.
fn relative_time(ts: Option<i64>) -> String {
    let Some(ts) = ts else {
        return "unknown time".to_string();
    };

    let seconds = (now() - ts).max(0);
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{}d ago", seconds / 86400)
    } else {
        format!("{}w ago", seconds / 604800)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::NewTurn;
    use crate::test_support::*;
    use simon_core::types::QueryType;

    fn classification(
        slugs: &[&str],
        workspace: Option<&str>,
        confidence: f64,
    ) -> PromptClassification {
        PromptClassification {
            project_slugs: slugs.iter().map(|s| s.to_string()).collect(),
            workspace_project: workspace.map(String::from),
            confidence,
            ..Default::default()
        }
    }

    async fn seed_session_with_turn(
        db: &Database,
        ext_id: &str,
        workspace: &str,
        project_id: Option<&str>,
        started_at: i64,
    ) -> (String, String) {
        let session = db
            .create_agent_session(ext_id, "/tmp/t.jsonl", workspace)
            .await
            .unwrap();
        if let Some(pid) = project_id {
            db.link_session_to_project(&session.id, pid).await.unwrap();
        }
        let turn_id = db
            .insert_turn(NewTurn {
                session_id: session.id.clone(),
                turn_number: 0,
                user_message: format!("question in {ext_id}"),
                assistant_text: "the answer".into(),
                turn_title: Some(format!("Turn of {ext_id}")),
                content_hash: format!("hash-{ext_id}"),
                model_name: None,
                tool_names: vec![],
                started_at: Some(started_at),
                ended_at: Some(started_at + 60),
                raw_jsonl: "{}".into(),
            })
            .await
            .unwrap();
        db.set_turn_summary(&turn_id, &format!("Turn of {ext_id}"), "did the thing")
            .await
            .unwrap();
        (session.id, turn_id)
    }

    #[tokio::test]
    async fn test_low_confidence_returns_nothing() {
        let db = Database::new_in_memory().await.unwrap();
        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);

        let c = classification(&["apollo"], None, 0.05);
        assert!(retriever.retrieve(&c, 1500).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confidence_exactly_point_one_retrieves() {
        let db = Database::new_in_memory().await.unwrap();
        seed_session_with_turn(&db, "ext-1", "/w", None, now() - 100).await;
        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);

        // No project, no workspace → global fallback turns
        let c = classification(&[], None, 0.1);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(!blocks.is_empty());
        assert_eq!(blocks[0].source_type, SourceType::Conversation);
    }

    #[tokio::test]
    async fn test_project_sources_gathered() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_task(&db, "t1", "p1", "ship release", "in_progress", "high", None).await;
        seed_commitment(&db, "c1", Some("p1"), None, "from_me", "send changelog", None, "open").await;
        seed_session_with_turn(&db, "ext-1", "/work/apollo", Some("p1"), now() - 3600).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let c = classification(&["apollo"], None, 0.8);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let types: Vec<SourceType> = blocks.iter().map(|b| b.source_type).collect();
        assert!(types.contains(&SourceType::Conversation));
        assert!(types.contains(&SourceType::Task));
        assert!(types.contains(&SourceType::Commitment));

        // Sorted by relevance descending
        for pair in blocks.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
    }

    #[tokio::test]
    async fn test_task_scores_by_status() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_task(&db, "t1", "p1", "wip", "in_progress", "high", None).await;
        seed_task(&db, "t2", "p1", "later", "backlog", "low", None).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let c = classification(&["apollo"], None, 0.8);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let wip = blocks.iter().find(|b| b.source_id == "t1").unwrap();
        let later = blocks.iter().find(|b| b.source_id == "t2").unwrap();
        assert_eq!(wip.relevance_score, 0.6);
        assert_eq!(later.relevance_score, 0.4);
        assert!(wip.content.starts_with("[in_progress] wip"));
    }

    #[tokio::test]
    async fn test_workspace_turns_without_project() {
        let db = Database::new_in_memory().await.unwrap();
        seed_session_with_turn(&db, "ext-1", "/home/u/apollo", None, now() - 100).await;
        seed_session_with_turn(&db, "ext-2", "/home/u/other", None, now() - 100).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let c = classification(&[], Some("apollo"), 0.5);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let conv: Vec<_> = blocks
            .iter()
            .filter(|b| b.source_type == SourceType::Conversation)
            .collect();
        assert_eq!(conv.len(), 1);
        assert!(conv[0].content.contains("did the thing"));
    }

    #[tokio::test]
    async fn test_global_fallback_only_when_nothing_matched() {
        let db = Database::new_in_memory().await.unwrap();
        seed_session_with_turn(&db, "ext-1", "/somewhere", None, now() - 100).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);

        // Workspace set (even unmatched) suppresses the global fallback
        let c = classification(&[], Some("nomatch"), 0.5);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(blocks
            .iter()
            .all(|b| b.source_type != SourceType::Conversation));

        let c = classification(&[], None, 0.3);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(blocks
            .iter()
            .any(|b| b.source_type == SourceType::Conversation));
    }

    #[tokio::test]
    async fn test_person_context() {
        let db = Database::new_in_memory().await.unwrap();
        seed_person(&db, "h1", "Alice Nguyen", None, Some("Acme"), Some("colleague")).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let mut c = classification(&[], None, 0.7);
        c.person_names = vec!["Alice Nguyen".into()];
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let person = blocks
            .iter()
            .find(|b| b.source_type == SourceType::Person)
            .unwrap();
        assert_eq!(person.content, "Alice Nguyen (Acme) [colleague]");
        assert_eq!(person.relevance_score, 0.5);
    }

    #[tokio::test]
    async fn test_turns_by_file_requires_extracted_artifacts() {
        let db = Database::new_in_memory().await.unwrap();
        let (_, turn_id) =
            seed_session_with_turn(&db, "ext-1", "/w", None, now() - 100).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let mut c = classification(&[], None, 0.3);
        c.file_paths = vec!["src/auth.rs".into()];

        // Before artifact extraction: files_touched is NULL, no file blocks
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(blocks
            .iter()
            .all(|b| b.source_type != SourceType::FileContext));

        db.update_turn_content_artifacts(
            &turn_id,
            Some(&["src/auth.rs".to_string()]),
            None,
            None,
            1,
        )
        .await
        .unwrap();

        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        let file_block = blocks
            .iter()
            .find(|b| b.source_type == SourceType::FileContext)
            .unwrap();
        assert_eq!(file_block.title, "File: auth.rs");
        assert!(file_block.content.starts_with("Previously touched src/auth.rs"));
        assert_eq!(file_block.relevance_score, 0.65);
    }

    #[tokio::test]
    async fn test_error_turns_only_for_code_queries_with_project() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        let (_, turn_id) =
            seed_session_with_turn(&db, "ext-1", "/w", Some("p1"), now() - 100).await;
        db.update_turn_content_artifacts(
            &turn_id,
            None,
            None,
            Some(&["error: it broke".to_string()]),
            1,
        )
        .await
        .unwrap();

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);

        let mut c = classification(&["apollo"], None, 0.8);
        c.query_type = QueryType::Code;
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(blocks.iter().any(|b| b.source_type == SourceType::Error));

        c.query_type = QueryType::General;
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();
        assert!(blocks.iter().all(|b| b.source_type != SourceType::Error));
    }

    #[tokio::test]
    async fn test_sprint_blocks() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        seed_sprint(&db, "s1", "Sprint 9", Some("p1"), now() + 3 * 86400, true).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let c = classification(&[], None, 0.3);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let sprint = blocks
            .iter()
            .find(|b| b.source_type == SourceType::Sprint)
            .unwrap();
        assert!(sprint.content.starts_with("Sprint: Sprint 9 (Apollo,"));
        assert_eq!(sprint.relevance_score, 0.3);
    }

    #[tokio::test]
    async fn test_blocks_unique_by_source_id() {
        let db = Database::new_in_memory().await.unwrap();
        seed_project(&db, "p1", "apollo", "Apollo", "active").await;
        // Turn reachable via both the project and the workspace source
        seed_session_with_turn(&db, "ext-1", "/home/u/apollo", Some("p1"), now() - 100).await;

        let retriever = ContextRetriever::new(&db).with_skills_dirs(None, None);
        let c = classification(&["apollo"], Some("apollo"), 0.8);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let mut ids: Vec<&str> = blocks.iter().map(|b| b.source_id.as_str()).collect();
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[tokio::test]
    async fn test_skill_blocks_from_disk() {
        let db = Database::new_in_memory().await.unwrap();
        let skills = tempfile::TempDir::new().unwrap();
        let skill_dir = skills.path().join("apollo-deploy");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(
            skill_dir.join("SKILL.md"),
            "---\nname: apollo-deploy\ndescription: Deploy apollo\n---\n\nSteps\n",
        )
        .unwrap();

        let retriever = ContextRetriever::new(&db)
            .with_skills_dirs(Some(skills.path().to_path_buf()), None);
        let c = classification(&["apollo"], None, 0.8);
        let blocks = retriever.retrieve(&c, 1500).await.unwrap();

        let skill = blocks
            .iter()
            .find(|b| b.source_type == SourceType::Skill)
            .unwrap();
        assert_eq!(skill.source_id, "skill:apollo-deploy");
        assert!(skill.relevance_score <= 0.85);
    }

    #[test]
    fn test_relative_time_buckets() {
        assert_eq!(relative_time(None), "unknown time");
        assert_eq!(relative_time(Some(now() - 10)), "just now");
        assert_eq!(relative_time(Some(now() - 120)), "2m ago");
        assert_eq!(relative_time(Some(now() - 7200)), "2h ago");
        assert_eq!(relative_time(Some(now() - 2 * 86400)), "2d ago");
        assert_eq!(relative_time(Some(now() - 2 * 604800)), "2w ago");
    }
}
