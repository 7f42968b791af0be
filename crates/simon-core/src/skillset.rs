// crates/simon-core/src/skillset.rs
//! Installed-skill discovery and prompt relevance matching.
//!
//! Scans skill directories for `SKILL.md` files, parses their YAML
//! front-matter, and scores them against a prompt classification by keyword
//! overlap. Pure disk I/O and string matching; any read failure degrades to
//! "no skills".

use crate::classifier::PromptClassification;
use crate::types::{ContextBlock, QueryType, SourceType};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NAME_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\-\s]+").unwrap());
static DESC_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,.\-_]+").unwrap());
static BODY_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,.\-_:;()]+").unwrap());
static STEM_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\-.]+").unwrap());

/// Where an installed skill lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillScope {
    Personal,
    Project,
}

impl SkillScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Project => "project",
        }
    }
}

/// An installed skill on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledSkill {
    pub name: String,
    pub description: String,
    /// Path to the SKILL.md file.
    pub path: PathBuf,
    pub scope: SkillScope,
    pub source: Option<String>,
}

/// Parse the YAML front-matter of a SKILL.md into key/value pairs.
///
/// Only flat `key: value` lines are recognized, which is all the skill
/// format uses.
pub fn parse_frontmatter(content: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    if !content.starts_with("---") {
        return fields;
    }

    for line in content.lines().skip(1) {
        if line.trim() == "---" {
            return fields;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    // Unterminated front-matter
    BTreeMap::new()
}

/// The instruction body after the front-matter block.
pub fn skill_body(content: &str) -> &str {
    let mut parts = content.splitn(3, "---");
    parts.next();
    parts.next();
    match parts.next() {
        Some(body) => body.trim(),
        None => content.trim(),
    }
}

/// List skills installed under the given personal and project directories.
///
/// Each skill is a directory containing a SKILL.md. Unreadable entries are
/// skipped.
pub fn list_installed_skills(
    personal_dir: Option<&Path>,
    project_dir: Option<&Path>,
) -> Vec<InstalledSkill> {
    let mut skills = Vec::new();

    let scan_dirs = [
        (SkillScope::Personal, personal_dir),
        (SkillScope::Project, project_dir),
    ];

    for (scope, dir) in scan_dirs {
        let Some(dir) = dir else { continue };
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for entry in paths {
            let skill_md = entry.join("SKILL.md");
            if !entry.is_dir() || !skill_md.is_file() {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&skill_md) else {
                continue;
            };
            let fm = parse_frontmatter(&content);

            skills.push(InstalledSkill {
                name: fm.get("name").cloned().unwrap_or_else(|| {
                    entry
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                }),
                description: fm.get("description").cloned().unwrap_or_default(),
                path: skill_md,
                scope,
                source: fm.get("source").cloned(),
            });
        }
    }

    skills
}

/// Keyword bag for a classification: project-slug, person-name, workspace,
/// query-type, and file-stem tokens, all lowercased, tokens ≤2 chars dropped.
pub fn prompt_keywords(classification: &PromptClassification) -> HashSet<String> {
    let mut words = HashSet::new();

    for slug in &classification.project_slugs {
        words.extend(slug.to_lowercase().split('-').map(String::from));
    }
    for name in &classification.person_names {
        words.extend(name.to_lowercase().split_whitespace().map(String::from));
    }
    if let Some(workspace) = &classification.workspace_project {
        words.extend(workspace.to_lowercase().split('-').map(String::from));
    }
    if classification.query_type != QueryType::General {
        words.insert(classification.query_type.as_str().to_string());
    }
    for path in &classification.file_paths {
        if let Some(stem) = Path::new(path).file_stem() {
            words.extend(
                STEM_SPLIT_RE
                    .split(&stem.to_string_lossy().to_lowercase())
                    .map(String::from),
            );
        }
    }

    words.retain(|w| w.chars().count() > 2);
    words
}

/// Score how relevant a skill is to the prompt keyword bag.
///
/// Returns `(score in [0, 1], body text)`. Zero when there is no overlap.
pub fn score_skill_relevance(
    skill: &InstalledSkill,
    prompt_words: &HashSet<String>,
) -> (f64, String) {
    let body = std::fs::read_to_string(&skill.path).unwrap_or_default();

    let mut skill_words: HashSet<String> = HashSet::new();
    skill_words.extend(
        NAME_SPLIT_RE
            .split(&skill.name.to_lowercase())
            .map(String::from),
    );
    skill_words.extend(
        DESC_SPLIT_RE
            .split(&skill.description.to_lowercase())
            .map(String::from),
    );

    if !body.is_empty() {
        let body_text = skill_body(&body).to_lowercase();
        skill_words.extend(
            BODY_SPLIT_RE
                .split(&body_text)
                .take(200)
                .filter(|w| w.chars().count() > 2)
                .map(String::from),
        );
    }

    skill_words.retain(|w| w.chars().count() > 2);
    if skill_words.is_empty() {
        return (0.0, body);
    }

    let overlap = prompt_words.intersection(&skill_words).count();
    if overlap == 0 {
        return (0.0, body);
    }

    let coverage = overlap as f64 / prompt_words.len() as f64;
    let name_parts: HashSet<String> = NAME_SPLIT_RE
        .split(&skill.name.to_lowercase())
        .map(String::from)
        .collect();
    let name_bonus = if prompt_words.intersection(&name_parts).next().is_some() {
        0.3
    } else {
        0.0
    };

    ((coverage + name_bonus).min(1.0), body)
}

/// Match installed skills against a classification, returning up to
/// `max_skills` context blocks, best first.
pub fn relevant_skill_blocks(
    classification: &PromptClassification,
    personal_dir: Option<&Path>,
    project_dir: Option<&Path>,
    max_skills: usize,
) -> Vec<ContextBlock> {
    let skills = list_installed_skills(personal_dir, project_dir);
    if skills.is_empty() {
        return Vec::new();
    }

    let prompt_words = prompt_keywords(classification);
    if prompt_words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f64, InstalledSkill, String)> = skills
        .into_iter()
        .filter_map(|skill| {
            let (score, body) = score_skill_relevance(&skill, &prompt_words);
            (score > 0.0).then_some((score, skill, body))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(max_skills)
        .map(|(score, skill, body)| ContextBlock {
            source_type: SourceType::Skill,
            source_id: format!("skill:{}", skill.name),
            title: format!("Skill: {}", skill.name),
            content: format_skill_content(&skill, &body),
            relevance_score: (0.5 + score * 0.35).min(0.85),
            timestamp: None,
        })
        .collect()
}

/// Description, truncated body, and a pointer to the full instructions.
fn format_skill_content(skill: &InstalledSkill, raw_content: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !skill.description.is_empty() {
        parts.push(skill.description.clone());
    }

    if !raw_content.is_empty() {
        let body = skill_body(raw_content);
        let body = if body.chars().count() > 300 {
            format!("{}...", body.chars().take(297).collect::<String>())
        } else {
            body.to_string()
        };
        parts.push(body);
    }

    parts.push(format!("(full instructions: {})", skill.path.display()));
    parts.join(" | ")
}
