// crates/simon-core/src/project_state.rs
//! Active-project selection state — a single local JSON file, no database.
//!
//! Read by the classifier and the session-linking handler to know which
//! project the user has explicitly focused; written by the CLI. Writes are
//! atomic (temp file + rename) and reads tolerate a racing writer by
//! treating any parse failure as empty state.

use crate::error::ProjectStateError;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// On-disk shape of `~/.config/simon/active_project.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStateFile {
    #[serde(default)]
    pub global: Option<String>,
    #[serde(default)]
    pub workspaces: BTreeMap<String, String>,
}

/// Handle to the active-project state file.
#[derive(Debug, Clone)]
pub struct ProjectStateStore {
    path: PathBuf,
}

impl ProjectStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location, if a home directory exists.
    pub fn default_location() -> Option<Self> {
        paths::project_state_file().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> ProjectStateFile {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return ProjectStateFile::default();
        };
        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to parse project state {:?}: {}", self.path, e);
                ProjectStateFile::default()
            }
        }
    }

    fn write(&self, state: &ProjectStateFile) -> Result<(), ProjectStateError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProjectStateError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        }

        let tmp = self.path.with_extension("tmp");
        let body = format!("{}\n", serde_json::to_string_pretty(state)?);
        let result = std::fs::write(&tmp, body).and_then(|_| std::fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(ProjectStateError::Io {
                path: self.path.clone(),
                source: e,
            });
        }
        Ok(())
    }

    /// Active project slug: per-workspace override first, then global.
    pub fn active_project(&self, workspace: Option<&str>) -> Option<String> {
        let state = self.read();
        if let Some(ws) = workspace {
            if let Some(slug) = state.workspaces.get(ws) {
                return Some(slug.clone());
            }
        }
        state.global
    }

    /// Set the active project, globally or for one workspace.
    pub fn set_active_project(
        &self,
        slug: &str,
        workspace: Option<&str>,
    ) -> Result<(), ProjectStateError> {
        let mut state = self.read();
        match workspace {
            Some(ws) => {
                state.workspaces.insert(ws.to_string(), slug.to_string());
            }
            None => state.global = Some(slug.to_string()),
        }
        self.write(&state)
    }

    /// Clear the active project, globally or for one workspace.
    pub fn clear_active_project(&self, workspace: Option<&str>) -> Result<(), ProjectStateError> {
        let mut state = self.read();
        match workspace {
            Some(ws) => {
                state.workspaces.remove(ws);
            }
            None => state.global = None,
        }
        self.write(&state)
    }

    /// The full state, for display.
    pub fn snapshot(&self) -> ProjectStateFile {
        self.read()
    }
}
