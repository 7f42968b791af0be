// crates/simon-core/src/settings.rs
//! Layered configuration: TOML file at `~/.config/simon/config.toml` with
//! environment-variable overrides by convention. A missing file yields
//! defaults; a malformed file is an error (silent misconfiguration of the
//! worker is worse than failing fast).

use crate::error::SettingsError;
use crate::paths;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// SQLite database location: a plain path or a `sqlite:` URL.
    /// Empty means the default location.
    pub db_url: String,
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            db_url: String::new(),
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "claude-haiku-4-5-20251001".into(),
        }
    }
}

/// Settings for context recording and retrieval.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub enabled: bool,
    pub retrieval_enabled: bool,
    pub recording_enabled: bool,
    pub retrieval_timeout_ms: u64,
    pub recording_timeout_ms: u64,
    pub max_context_tokens: usize,
    pub turn_summary_model: String,
    pub session_summary_model: String,
    pub worker_poll_interval: f64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            retrieval_enabled: true,
            recording_enabled: true,
            retrieval_timeout_ms: 2000,
            recording_timeout_ms: 200,
            max_context_tokens: 1500,
            turn_summary_model: "claude-haiku-4-5-20251001".into(),
            session_summary_model: "claude-haiku-4-5-20251001".into(),
            worker_poll_interval: 2.0,
        }
    }
}

/// Settings for the skills system.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SkillSettings {
    pub auto_generate: bool,
    pub min_quality_score: f64,
    pub default_scope: String,
    pub max_auto_skills_per_day: i64,
    pub skill_generation_model: String,
    pub github_token: String,
}

impl Default for SkillSettings {
    fn default() -> Self {
        Self {
            auto_generate: true,
            min_quality_score: 0.6,
            default_scope: "personal".into(),
            max_auto_skills_per_day: 3,
            skill_generation_model: "claude-haiku-4-5-20251001".into(),
            github_token: String::new(),
        }
    }
}

/// Top-level settings assembled from config sections.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub anthropic: AnthropicSettings,
    pub context: ContextSettings,
    pub skills: SkillSettings,
}

impl Settings {
    /// Load from the default config location with env overrides applied.
    pub fn load() -> Result<Self, SettingsError> {
        let path = paths::config_file().ok_or(SettingsError::HomeDirNotFound)?;
        let mut settings = Self::load_from(&path)?;
        settings.overlay_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_owned(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Apply environment overrides through the given lookup. Separated from
    /// process env so tests can inject a map.
    pub fn overlay_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic.api_key = v;
        }
        if let Some(v) = lookup("ANTHROPIC_MODEL") {
            self.anthropic.model = v;
        }
        if let Some(v) = lookup("SIMON_DB_URL") {
            self.general.db_url = v;
        }
        if let Some(v) = lookup("SIMON_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(v) = lookup("GITHUB_TOKEN") {
            self.skills.github_token = v;
        }
    }

    /// Resolve the configured database file path.
    pub fn db_path(&self) -> Result<PathBuf, SettingsError> {
        let url = self.general.db_url.trim();
        if url.is_empty() {
            return paths::default_db_path().ok_or(SettingsError::HomeDirNotFound);
        }

        let raw = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")).unwrap_or(url);
        if let Some(rest) = raw.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or(SettingsError::HomeDirNotFound)?;
            return Ok(home.join(rest));
        }
        Ok(PathBuf::from(raw))
    }
}
