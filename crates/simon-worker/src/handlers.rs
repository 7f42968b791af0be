// crates/simon-worker/src/handlers.rs
//! The six pipeline job handlers.
//!
//! `session_process` is the fan-out point: it records turns, links the
//! session to a project, and enqueues the per-turn jobs plus one
//! `session_summary`. Summarization handlers are best-effort around the LLM
//! capability; anything unrecoverable raises so queue retry takes over.

use crate::{WorkerError, WorkerResult};
use simon_core::classifier::word_match;
use simon_core::llm::{self, CompletionRequest, LlmProvider};
use simon_core::project_state::ProjectStateStore;
use simon_core::settings::Settings;
use simon_core::{artifacts, paths};
use simon_db::{
    recorder, Database, EnqueueRequest, Job, JobKind, NewSkillRecord, SessionJobPayload,
    SessionRefPayload, TurnJobPayload,
};
use simon_skills::{analyzer, generator, installer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const TURN_SUMMARY_SYSTEM: &str = "Generate a short title (5-10 words) and a 1-sentence summary of what the user asked/discussed. Return as: TITLE: <title>\nSUMMARY: <summary>";

/// Everything a handler needs: database, settings, and the optional LLM
/// capability. Injected rather than global so tests can swap pieces.
pub struct JobContext {
    pub db: Database,
    pub settings: Settings,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub project_state: Option<ProjectStateStore>,
    pub personal_skills_dir: Option<PathBuf>,
}

impl JobContext {
    pub fn new(db: Database, settings: Settings) -> Self {
        let llm = llm::provider_from_settings(&settings);
        Self {
            db,
            settings,
            llm,
            project_state: ProjectStateStore::default_location(),
            personal_skills_dir: paths::personal_skills_dir(),
        }
    }

    pub fn with_llm(mut self, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        self.llm = llm;
        self
    }

    pub fn with_project_state(mut self, state: Option<ProjectStateStore>) -> Self {
        self.project_state = state;
        self
    }

    pub fn with_personal_skills_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.personal_skills_dir = dir;
        self
    }
}

/// Route a claimed job to its handler.
pub async fn dispatch_job(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    match job.kind {
        JobKind::SessionProcess => handle_session_process(ctx, job).await,
        JobKind::TurnSummary => handle_turn_summary(ctx, job).await,
        JobKind::EntityExtract => handle_entity_extract(ctx, job).await,
        JobKind::ArtifactExtract => handle_artifact_extract(ctx, job).await,
        JobKind::SessionSummary => handle_session_summary(ctx, job).await,
        JobKind::SkillExtract => handle_skill_extract(ctx, job).await,
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Parse and store a transcript, then fan out the per-turn pipeline.
async fn handle_session_process(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: SessionJobPayload = job.payload_as()?;

    let outcome = recorder::record_session(
        &ctx.db,
        &payload.session_id,
        &payload.transcript_path,
        &payload.workspace_path,
    )
    .await?;

    if let Some(error) = outcome.error {
        return Err(WorkerError::Recording(error));
    }

    if !payload.workspace_path.is_empty() {
        link_session_to_project(ctx, &payload.session_id, &payload.workspace_path).await?;
    }

    if outcome.turns_recorded > 0 {
        if let Some(session) = ctx.db.get_agent_session(&payload.session_id).await? {
            for turn in ctx.db.turns_lacking_summary(&session.id).await? {
                let turn_payload = TurnJobPayload {
                    turn_id: turn.id.clone(),
                };
                ctx.db
                    .enqueue_job(
                        EnqueueRequest::new(JobKind::TurnSummary, &turn_payload)
                            .dedupe_key(format!("turn_summary:{}", turn.id))
                            .priority(15),
                    )
                    .await?;
                ctx.db
                    .enqueue_job(
                        EnqueueRequest::new(JobKind::EntityExtract, &turn_payload)
                            .dedupe_key(format!("entity_extract:{}", turn.id))
                            .priority(20),
                    )
                    .await?;
                ctx.db
                    .enqueue_job(
                        EnqueueRequest::new(JobKind::ArtifactExtract, &turn_payload)
                            .dedupe_key(format!("artifact_extract:{}", turn.id))
                            .priority(18),
                    )
                    .await?;
            }

            // Session summary runs after the turn fan-out under normal load
            ctx.db
                .enqueue_job(
                    EnqueueRequest::new(
                        JobKind::SessionSummary,
                        SessionRefPayload {
                            session_id: payload.session_id.clone(),
                        },
                    )
                    .dedupe_key(format!("session_summary:{}", payload.session_id))
                    .priority(25),
                )
                .await?;
        }
    }

    info!(
        "Session job done: {} ({} recorded, {} skipped)",
        truncate_chars(&payload.session_id, 12),
        outcome.turns_recorded,
        outcome.turns_skipped,
    );

    Ok(())
}

/// Link a session to a project by explicit selection or workspace basename.
async fn link_session_to_project(
    ctx: &JobContext,
    session_id: &str,
    workspace_path: &str,
) -> WorkerResult<()> {
    let dir_name = Path::new(workspace_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if dir_name.is_empty() {
        return Ok(());
    }

    let explicit = ctx
        .project_state
        .as_ref()
        .and_then(|state| state.active_project(Some(workspace_path)));
    let search_slug = explicit.unwrap_or(dir_name);

    let Some(project) = ctx.db.find_active_project_by_slug(&search_slug).await? else {
        return Ok(());
    };

    if let Some(session) = ctx.db.get_agent_session(session_id).await? {
        if ctx.db.link_session_to_project(&session.id, &project.id).await? {
            info!(
                "Linked session {} to project {}",
                truncate_chars(session_id, 12),
                project.slug
            );
        }
    }

    Ok(())
}

/// Title + one-line summary for a turn. Short messages skip the LLM; LLM
/// failures fall back to truncation. Never raises past this point.
async fn handle_turn_summary(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: TurnJobPayload = job.payload_as()?;

    let Some(turn) = ctx.db.get_turn(&payload.turn_id).await? else {
        warn!("Turn {} not found, skipping summary", payload.turn_id);
        return Ok(());
    };

    if turn.assistant_summary.is_some() {
        return Ok(());
    }

    let full_message = turn.user_message.as_deref().unwrap_or("");
    let user_msg = truncate_chars(full_message, 200);

    if user_msg.chars().count() < 50 {
        let title = if user_msg.is_empty() {
            "Short exchange".to_string()
        } else {
            truncate_chars(&user_msg, 80)
        };
        ctx.db.set_turn_summary(&turn.id, &title, &user_msg).await?;
        return Ok(());
    }

    let (title, summary) = match summarize_turn(ctx, full_message).await {
        Ok(parts) => parts,
        Err(e) => {
            debug!("LLM summary failed, using truncation: {}", e);
            (truncate_chars(&user_msg, 80), truncate_chars(&user_msg, 200))
        }
    };

    ctx.db.set_turn_summary(&turn.id, &title, &summary).await?;
    Ok(())
}

/// Ask the LLM for `TITLE:` / `SUMMARY:` lines over the first 1000 chars.
async fn summarize_turn(ctx: &JobContext, user_message: &str) -> Result<(String, String), String> {
    let provider = ctx.llm.as_ref().ok_or("No Anthropic API key")?;

    let text = provider
        .complete(CompletionRequest {
            system: TURN_SUMMARY_SYSTEM.to_string(),
            prompt: truncate_chars(user_message, 1000),
            model: ctx.settings.context.turn_summary_model.clone(),
            max_tokens: 200,
        })
        .await
        .map_err(|e| e.to_string())?;

    let mut title = String::new();
    let mut summary = String::new();
    for line in text.trim().lines() {
        if let Some(rest) = line.strip_prefix("TITLE:") {
            title = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("SUMMARY:") {
            summary = rest.trim().to_string();
        }
    }

    if title.is_empty() {
        title = truncate_chars(user_message, 80);
    }
    if summary.is_empty() {
        summary = truncate_chars(user_message, 200);
    }

    Ok((title, summary))
}

/// Keyword entity matching over a turn's text. Duplicate evidence within a
/// turn is allowed.
async fn handle_entity_extract(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: TurnJobPayload = job.payload_as()?;

    let Some(turn) = ctx.db.get_turn(&payload.turn_id).await? else {
        return Ok(());
    };
    let content = ctx.db.get_turn_content(&turn.id).await?;

    let mut text_parts: Vec<&str> = Vec::new();
    if let Some(message) = turn.user_message.as_deref() {
        text_parts.push(message);
    }
    if let Some(assistant) = content.as_ref().and_then(|c| c.assistant_text.as_deref()) {
        text_parts.push(assistant);
    }
    let full_text = text_parts.join("\n").to_lowercase();

    if full_text.trim().is_empty() {
        return Ok(());
    }

    for project in ctx.db.list_active_projects().await? {
        if word_match(&project.slug.to_lowercase(), &full_text) {
            ctx.db
                .insert_turn_entity(&turn.id, "project", &project.id, &project.name, 0.9)
                .await?;
        } else if !project.name.is_empty() && word_match(&project.name.to_lowercase(), &full_text) {
            ctx.db
                .insert_turn_entity(&turn.id, "project", &project.id, &project.name, 0.7)
                .await?;
        }
    }

    for person in ctx.db.list_people().await? {
        if person.name.chars().count() > 2 && word_match(&person.name.to_lowercase(), &full_text) {
            ctx.db
                .insert_turn_entity(&turn.id, "person", &person.id, &person.name, 0.8)
                .await?;
        }
    }

    Ok(())
}

/// Run the artifact extractor over a turn's raw JSONL and persist results.
async fn handle_artifact_extract(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: TurnJobPayload = job.payload_as()?;

    let Some(content) = ctx.db.get_turn_content(&payload.turn_id).await? else {
        return Ok(());
    };
    if content.raw_jsonl.is_empty() {
        return Ok(());
    }

    let extracted = artifacts::extract_artifacts(&content.raw_jsonl);

    for artifact in &extracted.artifacts {
        ctx.db
            .insert_turn_artifact(
                &payload.turn_id,
                artifact.artifact_type.as_str(),
                &artifact.artifact_value,
                &artifact.metadata,
            )
            .await?;
    }

    let files_touched = extracted.files_touched();
    ctx.db
        .update_turn_content_artifacts(
            &payload.turn_id,
            Some(&files_touched),
            Some(&extracted.commands_run),
            Some(&extracted.errors_encountered),
            extracted.tool_call_count as i64,
        )
        .await?;

    info!(
        "Artifacts extracted for turn {}: {} artifacts, {} files, {} commands, {} errors",
        payload.turn_id,
        extracted.artifacts.len(),
        files_touched.len(),
        extracted.commands_run.len(),
        extracted.errors_encountered.len(),
    );

    Ok(())
}

/// Aggregate turn titles into the session title/summary and hand off to
/// skill extraction.
async fn handle_session_summary(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: SessionRefPayload = job.payload_as()?;

    let Some(session) = ctx.db.get_agent_session(&payload.session_id).await? else {
        return Ok(());
    };

    let turns = ctx.db.turns_for_session(&session.id).await?;
    let parts: Vec<String> = turns
        .iter()
        .filter_map(|turn| {
            turn.turn_title
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    turn.user_message
                        .as_deref()
                        .filter(|m| !m.is_empty())
                        .map(|m| truncate_chars(m, 80))
                })
        })
        .collect();

    if parts.is_empty() {
        return Ok(());
    }

    let title = truncate_chars(&parts[0], 100);
    let summary = truncate_chars(&parts.join("; "), 500);
    ctx.db.set_session_summary(&session.id, &title, &summary).await?;

    info!(
        "Session summary generated: {}",
        truncate_chars(&payload.session_id, 12)
    );

    ctx.db
        .enqueue_job(
            EnqueueRequest::new(
                JobKind::SkillExtract,
                SessionRefPayload {
                    session_id: payload.session_id.clone(),
                },
            )
            .dedupe_key(format!("skill_extract:{}", payload.session_id))
            .priority(30),
        )
        .await?;

    Ok(())
}

/// Auto-generate a skill from a qualifying session. Non-qualifying sessions
/// and generation/installation failures all complete the job with no side
/// effect — there is nothing to retry.
async fn handle_skill_extract(ctx: &JobContext, job: &Job) -> WorkerResult<()> {
    let payload: SessionRefPayload = job.payload_as()?;

    let Some(session) = ctx.db.get_agent_session(&payload.session_id).await? else {
        return Ok(());
    };

    let Some(candidate) = analyzer::analyze_session_for_skill(&ctx.db, &ctx.settings, &session).await?
    else {
        debug!(
            "Session {} did not qualify for skill",
            truncate_chars(&payload.session_id, 12)
        );
        return Ok(());
    };

    let Some(provider) = ctx.llm.as_ref() else {
        debug!("No LLM provider configured, skipping skill generation");
        return Ok(());
    };

    let Some(skill) = generator::generate_skill_md(
        provider.as_ref(),
        &ctx.settings.skills.skill_generation_model,
        &candidate.description,
        &candidate.context,
        "auto",
    )
    .await
    else {
        debug!(
            "Skill generation failed for session {}",
            truncate_chars(&payload.session_id, 12)
        );
        return Ok(());
    };

    let (skills_dir, scope) = if ctx.settings.skills.default_scope == "project"
        && !session.workspace_path.is_empty()
    {
        (
            Some(paths::project_skills_dir(Path::new(&session.workspace_path))),
            "project",
        )
    } else {
        (ctx.personal_skills_dir.clone(), "personal")
    };

    let Some(skills_dir) = skills_dir else {
        debug!("No skills directory available, skipping install");
        return Ok(());
    };

    let path = match installer::install_skill(&skills_dir, &skill.name, &skill.full_content, false)
    {
        Ok(path) => path,
        Err(e) => {
            debug!(
                "Skipped skill for session {}: {}",
                truncate_chars(&payload.session_id, 12),
                e
            );
            return Ok(());
        }
    };

    info!(
        "Auto-generated skill '{}' from session {} -> {}",
        skill.name,
        truncate_chars(&payload.session_id, 12),
        path.display()
    );

    ctx.db
        .insert_skill_record(NewSkillRecord {
            name: skill.name.clone(),
            description: skill.description.clone(),
            source: "auto".to_string(),
            source_session_id: Some(payload.session_id.clone()),
            installed_path: Some(path.display().to_string()),
            scope: scope.to_string(),
            quality_score: Some(candidate.quality_score),
            skill_content_hash: Some(analyzer::description_hash(&skill.description)),
        })
        .await?;

    Ok(())
}
