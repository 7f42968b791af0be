// crates/simon-skills/src/generator.rs
//! SKILL.md generation from a description and session context.
//!
//! The LLM returns JSON fields (name, description, body, allowed_tools);
//! everything is validated and rendered locally. Generation is best-effort:
//! any failure returns None and the caller moves on.

use crate::installer::SkillError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use simon_core::llm::{CompletionRequest, LlmProvider};
use std::sync::LazyLock;
use tracing::{info, warn};

static NAME_INVALID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").unwrap());
static NAME_DASH_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

const SKILL_GENERATION_SYSTEM: &str = r#"You generate Claude Code skills (SKILL.md files) following the Agent Skills standard.

Given a description of what the skill should do and context about the project/task,
generate a skill with:

1. A short name (lowercase-with-hyphens, max 64 chars)
2. A description (1-2 sentences explaining what it does and when to use it)
3. Step-by-step markdown instructions for Claude to follow

Your output MUST be valid JSON with these fields:
- name: string (lowercase, hyphens only, max 64 chars)
- description: string (1-2 sentences, max 200 chars)
- body: string (markdown instructions, specific and actionable)
- allowed_tools: list of strings (Claude Code tools this skill needs, e.g. ["Read", "Write", "Bash", "Grep", "Glob"])

Keep instructions concise and specific. Reference file paths, commands, and patterns
from the context when available. Focus on the repeatable workflow, not one-time setup."#;

/// Context handed to the generator: what the session actually did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillContext {
    pub workspace_path: String,
    pub project_slug: Option<String>,
    pub files_touched: Vec<String>,
    pub commands_run: Vec<String>,
    pub tools_used: Vec<String>,
    pub conventions: String,
    pub session_summary: String,
}

/// A generated skill ready for installation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSkill {
    pub name: String,
    pub description: String,
    pub body: String,
    pub full_content: String,
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    allowed_tools: Vec<String>,
}

/// Normalize a skill name per the Agent Skills spec: lowercase, hyphens only,
/// runs collapsed, trimmed, max 64 chars.
pub fn validate_skill_name(name: &str) -> Result<String, SkillError> {
    let normalized = name.to_lowercase();
    let normalized = NAME_INVALID_RE.replace_all(normalized.trim(), "-");
    let normalized = NAME_DASH_RUN_RE.replace_all(&normalized, "-");
    let mut normalized = normalized.trim_matches('-').to_string();

    if normalized.is_empty() {
        return Err(SkillError::InvalidName(name.to_string()));
    }

    if normalized.len() > 64 {
        normalized.truncate(64);
        normalized = normalized.trim_end_matches('-').to_string();
    }

    Ok(normalized)
}

/// Render a complete SKILL.md with YAML front-matter.
pub fn render_skill_md(
    name: &str,
    description: &str,
    body: &str,
    allowed_tools: Option<&[String]>,
    disable_model_invocation: bool,
) -> String {
    let mut lines = vec!["---".to_string()];
    lines.push(format!("name: {name}"));
    lines.push(format!("description: {description}"));

    if let Some(tools) = allowed_tools.filter(|t| !t.is_empty()) {
        lines.push(format!("allowed-tools: {}", tools.join(", ")));
    }
    if disable_model_invocation {
        lines.push("disable-model-invocation: true".to_string());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(body.trim().to_string());
    lines.push(String::new());

    lines.join("\n")
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn build_generation_prompt(description: &str, context: &SkillContext) -> String {
    let mut parts = vec![format!("Generate a Claude Code skill for:\n{description}")];

    if !context.workspace_path.is_empty() {
        parts.push(format!("\nWorkspace: {}", context.workspace_path));
    }
    if !context.session_summary.is_empty() {
        parts.push(format!(
            "\nSession summary:\n{}",
            truncate_chars(&context.session_summary, 2000)
        ));
    }
    if !context.files_touched.is_empty() {
        let files: Vec<&str> = context.files_touched.iter().take(20).map(String::as_str).collect();
        parts.push(format!("\nFiles involved: {}", files.join(", ")));
    }
    if !context.commands_run.is_empty() {
        let commands: Vec<&str> = context.commands_run.iter().take(10).map(String::as_str).collect();
        parts.push(format!("\nCommands used: {}", commands.join(", ")));
    }
    if !context.tools_used.is_empty() {
        let tools: Vec<&str> = context.tools_used.iter().take(10).map(String::as_str).collect();
        parts.push(format!("\nTools used: {}", tools.join(", ")));
    }
    if !context.conventions.is_empty() {
        parts.push(format!(
            "\nProject conventions:\n{}",
            truncate_chars(&context.conventions, 1000)
        ));
    }

    parts.push("\nReturn JSON with: name, description, body, allowed_tools".to_string());
    parts.join("\n")
}

/// Strip markdown code fences, then parse the generation JSON.
fn parse_generation_response(raw_text: &str) -> Result<GenerationResponse, serde_json::Error> {
    let text = raw_text.trim();
    let text = if text.starts_with("```") {
        let mut lines: Vec<&str> = text.lines().collect();
        lines.remove(0);
        if lines.last().map(|l| l.trim() == "```").unwrap_or(false) {
            lines.pop();
        }
        lines.join("\n")
    } else {
        text.to_string()
    };

    serde_json::from_str(&text)
}

/// Generate a SKILL.md from a description and context.
///
/// Returns None on any failure (no provider response, unparseable JSON,
/// empty body, invalid name) — skill generation never propagates errors.
pub async fn generate_skill_md(
    provider: &dyn LlmProvider,
    model: &str,
    description: &str,
    context: &SkillContext,
    source: &str,
) -> Option<GeneratedSkill> {
    let request = CompletionRequest {
        system: SKILL_GENERATION_SYSTEM.to_string(),
        prompt: build_generation_prompt(description, context),
        model: model.to_string(),
        max_tokens: 2000,
    };

    let raw_text = match provider.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Skill generation request failed: {}", e);
            return None;
        }
    };

    let parsed = match parse_generation_response(&raw_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Failed to parse skill generation response: {}", e);
            return None;
        }
    };

    let name = match validate_skill_name(&parsed.name) {
        Ok(name) => name,
        Err(e) => {
            warn!("Generated skill name unusable: {}", e);
            return None;
        }
    };

    if parsed.body.is_empty() {
        warn!("LLM returned empty skill body");
        return None;
    }

    let skill_description = if parsed.description.is_empty() {
        truncate_chars(description, 200)
    } else {
        truncate_chars(&parsed.description, 200)
    };

    let full_content = render_skill_md(
        &name,
        &skill_description,
        &parsed.body,
        Some(&parsed.allowed_tools),
        false,
    );

    info!("Generated skill '{}'", name);

    Some(GeneratedSkill {
        name,
        description: skill_description,
        body: parsed.body,
        full_content,
        source: source.to_string(),
    })
}
