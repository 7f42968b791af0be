// crates/simon-core/src/classifier.rs
//! Fast keyword/regex prompt classifier for context retrieval.
//!
//! Entities are preloaded from the database (by simon-db) and handed in as
//! plain lists; classification itself is pure regex and string matching and
//! completes in well under 10ms. No LLM calls anywhere on this path.

use crate::artifacts::extract_file_paths_from_text;
use crate::project_state::ProjectStateStore;
use crate::types::{PersonRef, ProjectRef, QueryType};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

static CODE_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\b(bug|fix|error|refactor|test|function|class|module|import|file|code|implement|build|compile|lint|deploy)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static EMAIL_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\b(email|reply|send|draft|inbox|gmail|message|forward)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static TASK_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\b(task|todo|priority|deadline|sprint|kanban|backlog|assign|commit|milestone)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static META_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"\b(focus|vault|sync|config|setup|hook|daemon|worker)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Result of classifying a user prompt for context retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptClassification {
    pub project_slugs: Vec<String>,
    pub person_names: Vec<String>,
    pub query_type: QueryType,
    pub workspace_project: Option<String>,
    pub explicit_project: Option<String>,
    pub file_paths: Vec<String>,
    pub confidence: f64,
}

/// Keyword/regex classifier over preloaded entity lists.
pub struct PromptClassifier {
    projects: Vec<ProjectRef>,
    people: Vec<PersonRef>,
    state: Option<ProjectStateStore>,
}

impl PromptClassifier {
    /// Build from preloaded entities, consulting the default project-state
    /// location for explicit project selection.
    pub fn new(projects: Vec<ProjectRef>, people: Vec<PersonRef>) -> Self {
        Self {
            projects,
            people,
            state: ProjectStateStore::default_location(),
        }
    }

    /// Override the project-state store (tests point this at a tempdir).
    pub fn with_project_state(mut self, state: ProjectStateStore) -> Self {
        self.state = Some(state);
        self
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    /// Classify a prompt. Pure string/regex matching.
    pub fn classify(&self, prompt: &str, cwd: Option<&str>) -> PromptClassification {
        let mut result = PromptClassification::default();

        if prompt.chars().filter(|c| !c.is_whitespace()).count() < 3 {
            return result;
        }

        let prompt_lower = prompt.to_lowercase();

        // 0. Explicit project selection from the state file
        if let Some(state) = &self.state {
            if let Some(explicit) = state.active_project(cwd) {
                result.project_slugs.push(explicit.clone());
                result.explicit_project = Some(explicit);
            }
        }

        // 1. Workspace project from cwd basename
        if let Some(cwd) = cwd {
            let dir_name = Path::new(cwd)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase());
            if let Some(name) = dir_name.filter(|n| !n.is_empty()) {
                result.workspace_project = Some(name);
            }
        }

        // 2. Project slug / display-name matching
        for project in &self.projects {
            let slug_hit = word_match(&project.slug, &prompt_lower);
            let name_hit = !slug_hit
                && !project.name.is_empty()
                && word_match(&project.name.to_lowercase(), &prompt_lower);
            if (slug_hit || name_hit) && !result.project_slugs.contains(&project.slug) {
                result.project_slugs.push(project.slug.clone());
            }
        }

        // 3. Person matching
        for person in &self.people {
            if person.name.chars().count() > 2
                && word_match(&person.name.to_lowercase(), &prompt_lower)
                && !result.person_names.contains(&person.name)
            {
                result.person_names.push(person.name.clone());
            }
        }

        // 4. Query type
        result.query_type = detect_query_type(prompt);

        // 5. File paths mentioned in the prompt
        result.file_paths = extract_file_paths_from_text(prompt);

        // 6. Confidence
        result.confidence = compute_confidence(&result);

        result
    }
}

/// Word-bounded containment check, shared with entity extraction.
///
/// Boundary anchors are added only where the pattern edge is alphanumeric;
/// on regex build failure, falls back to substring containment.
pub fn word_match(pattern: &str, text: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    let escaped = regex::escape(pattern);
    let prefix = if pattern.chars().next().map(|c| c.is_alphanumeric()).unwrap_or(false) {
        r"\b"
    } else {
        ""
    };
    let suffix = if pattern.chars().last().map(|c| c.is_alphanumeric()).unwrap_or(false) {
        r"\b"
    } else {
        ""
    };

    match Regex::new(&format!("{}{}{}", prefix, escaped, suffix)) {
        Ok(re) => re.is_match(text),
        Err(_) => text.contains(pattern),
    }
}

/// First-matching category wins; everything else is general.
fn detect_query_type(prompt: &str) -> QueryType {
    if CODE_PATTERNS.is_match(prompt) {
        QueryType::Code
    } else if EMAIL_PATTERNS.is_match(prompt) {
        QueryType::Email
    } else if TASK_PATTERNS.is_match(prompt) {
        QueryType::Task
    } else if META_PATTERNS.is_match(prompt) {
        QueryType::Meta
    } else {
        QueryType::General
    }
}

/// Confidence is the maximum applicable floor for the matched signals.
fn compute_confidence(classification: &PromptClassification) -> f64 {
    let mut score: f64 = 0.0;

    if classification.explicit_project.is_some() {
        score = score.max(0.9);
    }
    if !classification.project_slugs.is_empty() {
        score = score.max(0.8);
    }
    if !classification.person_names.is_empty() {
        score = score.max(0.7);
    }
    if classification.workspace_project.is_some() && score < 0.5 {
        score = 0.5;
    }
    if classification.query_type != QueryType::General && score < 0.3 {
        score = 0.3;
    }
    if score == 0.0 {
        score = 0.1;
    }

    score
}
