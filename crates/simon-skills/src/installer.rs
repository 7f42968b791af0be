// crates/simon-skills/src/installer.rs
//! Skill installation — write SKILL.md files to disk and manage them.

use regex::Regex;
use simon_core::skillset::{parse_frontmatter, skill_body};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::info;

static VALID_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap());

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Cannot normalize skill name: {0:?}")]
    InvalidName(String),

    #[error("Invalid skill content: {0}")]
    Validation(String),

    #[error("Skill '{name}' already exists at {path}. Use --force to overwrite.")]
    AlreadyExists { name: String, path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SkillError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Validate SKILL.md content against the Agent Skills format.
///
/// Returns a list of problems; empty means valid.
pub fn validate_skill_content(content: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if content.trim().is_empty() {
        errors.push("Skill content is empty".to_string());
        return errors;
    }

    if !content.starts_with("---") {
        errors.push("Missing YAML frontmatter (must start with ---)".to_string());
        return errors;
    }

    let fm = parse_frontmatter(content);

    if let Some(name) = fm.get("name") {
        if !VALID_NAME_RE.is_match(name) {
            errors.push(format!(
                "Invalid skill name '{name}': must be lowercase alphanumeric + hyphens"
            ));
        }
        if name.len() > 64 {
            errors.push(format!("Skill name too long ({} > 64 chars)", name.len()));
        }
    }

    if fm.get("description").map(String::as_str).unwrap_or("").is_empty() {
        errors.push("Missing or empty 'description' field in frontmatter".to_string());
    }

    if skill_body(content).is_empty() {
        errors.push("Missing instruction body after frontmatter".to_string());
    }

    errors
}

/// Install a skill under `skills_dir/{name}/SKILL.md`.
///
/// Refuses to overwrite an existing skill unless `force` is set; validates
/// the content first.
pub fn install_skill(
    skills_dir: &Path,
    name: &str,
    content: &str,
    force: bool,
) -> Result<PathBuf, SkillError> {
    let errors = validate_skill_content(content);
    if !errors.is_empty() {
        return Err(SkillError::Validation(errors.join("; ")));
    }

    let skill_dir = skills_dir.join(name);
    if skill_dir.exists() && !force {
        return Err(SkillError::AlreadyExists {
            name: name.to_string(),
            path: skill_dir,
        });
    }

    std::fs::create_dir_all(&skill_dir).map_err(|e| SkillError::io(&skill_dir, e))?;
    let skill_path = skill_dir.join("SKILL.md");
    std::fs::write(&skill_path, content).map_err(|e| SkillError::io(&skill_path, e))?;

    info!("Installed skill '{}' at {}", name, skill_path.display());
    Ok(skill_path)
}

/// Remove an installed skill. Returns true if the skill existed.
pub fn uninstall_skill(skills_dir: &Path, name: &str) -> Result<bool, SkillError> {
    let skill_dir = skills_dir.join(name);
    if !skill_dir.exists() {
        return Ok(false);
    }

    std::fs::remove_dir_all(&skill_dir).map_err(|e| SkillError::io(&skill_dir, e))?;
    info!("Uninstalled skill '{}' from {}", name, skill_dir.display());
    Ok(true)
}
