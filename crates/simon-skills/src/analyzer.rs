// crates/simon-skills/src/analyzer.rs
//! Session quality analysis for auto-generating skills.
//!
//! Decides whether a completed session represents a repeatable pattern worth
//! turning into a skill: a bounded quality score plus hard gates (daily cap,
//! threshold, duplicate description hash).

use crate::generator::SkillContext;
use chrono::Utc;
use simon_core::parser::compute_content_hash;
use simon_core::settings::Settings;
use simon_db::{AgentSessionRow, Database, DbResult};
use std::collections::HashSet;
use tracing::debug;

/// A session that may become a skill.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillCandidate {
    pub session_id: String,
    pub quality_score: f64,
    pub description: String,
    pub context: SkillContext,
    pub workspace_path: String,
}

/// Score session quality from 0.0 to 1.0. Higher means a better skill
/// candidate.
pub fn score_session_quality(
    turn_count: usize,
    error_count: usize,
    files_touched: &[String],
    tools_used: &[String],
    has_summary: bool,
) -> f64 {
    let mut score = 0.0;

    if turn_count >= 3 {
        score += (turn_count as f64 / 12.0).min(0.25);
    }

    if turn_count > 0 {
        let error_rate = error_count as f64 / turn_count as f64;
        if error_rate < 0.3 {
            score += 0.25 * (1.0 - error_rate);
        }
    }

    let file_count = files_touched.iter().collect::<HashSet<_>>().len();
    if file_count >= 2 {
        score += (file_count as f64 / 10.0).min(0.2);
    }

    let unique_tools = tools_used.iter().collect::<HashSet<_>>().len();
    if unique_tools >= 2 {
        score += (unique_tools as f64 / 8.0).min(0.15);
    }

    if has_summary {
        score += 0.15;
    }

    score.min(1.0)
}

/// MD5 over the lowercased, space-normalized description; the dedup identity
/// of an auto-generated skill.
pub fn description_hash(description: &str) -> String {
    let normalized = description
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    compute_content_hash(&normalized)
}

fn start_of_today() -> i64 {
    Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

/// Collect the repeatable pattern of a session: files, commands, and tools
/// unioned across turns, plus the session summary.
pub async fn extract_skill_context(
    db: &Database,
    agent_session: &AgentSessionRow,
) -> DbResult<SkillContext> {
    let mut files_touched = Vec::new();
    let mut commands_run = Vec::new();
    let mut tools_used = Vec::new();

    for turn in db.turns_for_session(&agent_session.id).await? {
        tools_used.extend(turn.tool_names_vec());
        if let Some(content) = db.get_turn_content(&turn.id).await? {
            files_touched.extend(content.files_touched_vec());
            commands_run.extend(content.commands_run_vec());
        }
    }

    Ok(SkillContext {
        workspace_path: agent_session.workspace_path.clone(),
        project_slug: None,
        files_touched: dedup_preserving_order(files_touched),
        commands_run: dedup_preserving_order(commands_run),
        tools_used: dedup_preserving_order(tools_used),
        conventions: String::new(),
        session_summary: agent_session.session_summary.clone().unwrap_or_default(),
    })
}

/// Analyze a completed session against the qualification gates.
///
/// Returns a candidate only when every gate passes: auto-generation enabled,
/// session processed with a summary, daily cap not reached, quality at or
/// above the threshold, and no active duplicate.
pub async fn analyze_session_for_skill(
    db: &Database,
    settings: &Settings,
    agent_session: &AgentSessionRow,
) -> DbResult<Option<SkillCandidate>> {
    if !settings.skills.auto_generate {
        return Ok(None);
    }

    if !agent_session.is_processed || agent_session.session_summary.is_none() {
        debug!(
            "Session {} not fully processed, skipping",
            agent_session.session_id
        );
        return Ok(None);
    }

    let today_count = db.count_auto_skills_since(start_of_today()).await?;
    if today_count >= settings.skills.max_auto_skills_per_day {
        debug!("Daily skill limit reached ({}), skipping", today_count);
        return Ok(None);
    }

    // Gather turn data for scoring
    let turns = db.turns_for_session(&agent_session.id).await?;
    let mut files_touched = Vec::new();
    let mut tools_used = Vec::new();
    let mut error_count = 0usize;

    for turn in &turns {
        tools_used.extend(turn.tool_names_vec());
        if let Some(content) = db.get_turn_content(&turn.id).await? {
            files_touched.extend(content.files_touched_vec());
            error_count += content.errors_encountered_vec().len();
        }
    }

    let quality = score_session_quality(
        turns.len(),
        error_count,
        &files_touched,
        &tools_used,
        agent_session.session_summary.is_some(),
    );

    if quality < settings.skills.min_quality_score {
        debug!(
            "Session {} quality {:.2} below threshold {:.2}",
            agent_session.session_id, quality, settings.skills.min_quality_score
        );
        return Ok(None);
    }

    let description = agent_session.session_summary.clone().unwrap_or_default();
    if db
        .has_active_skill_with_hash(&description_hash(&description))
        .await?
    {
        debug!(
            "Similar skill already exists for session {}",
            agent_session.session_id
        );
        return Ok(None);
    }

    let context = extract_skill_context(db, agent_session).await?;

    Ok(Some(SkillCandidate {
        session_id: agent_session.session_id.clone(),
        quality_score: quality,
        description,
        context,
        workspace_path: agent_session.workspace_path.clone(),
    }))
}
