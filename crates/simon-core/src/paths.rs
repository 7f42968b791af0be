// crates/simon-core/src/paths.rs
//! Centralized path functions for all simon storage locations.
//!
//! Single source of truth — eliminates ad-hoc `dirs::home_dir().join(...)`
//! scattered across crates.

use std::path::PathBuf;

/// Config root: `~/.config/simon/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".config").join("simon"))
}

/// Config file: `~/.config/simon/config.toml`.
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Active-project state file: `~/.config/simon/active_project.json`.
pub fn project_state_file() -> Option<PathBuf> {
    config_dir().map(|d| d.join("active_project.json"))
}

/// SQLite database file: `~/.local/share/simon/simon.db`.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".local").join("share").join("simon").join("simon.db"))
}

/// Claude Code transcript root: `~/.claude/projects/`.
pub fn claude_sessions_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".claude").join("projects"))
}

/// Claude Code settings file: `~/.claude/settings.json`.
pub fn claude_settings_file() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".claude").join("settings.json"))
}

/// Personal skills directory: `~/.claude/skills/`.
pub fn personal_skills_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|d| d.join(".claude").join("skills"))
}

/// Project-scoped skills directory under a workspace root.
pub fn project_skills_dir(workspace: &std::path::Path) -> PathBuf {
    workspace.join(".claude").join("skills")
}
