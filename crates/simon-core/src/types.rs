// crates/simon-core/src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One user message plus the contiguous assistant records that followed it,
/// as produced by the transcript parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTurn {
    /// 0-based index in user-message order.
    pub turn_number: usize,
    pub user_message: String,
    pub assistant_text: String,
    /// Tool names used across the turn, deduplicated in first-seen order.
    pub tool_names: Vec<String>,
    /// First non-empty model name seen in the turn.
    pub model_name: Option<String>,
    /// Raw ISO-8601 timestamps as captured from the transcript.
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    /// The verbatim transcript lines of this turn, newline-joined.
    pub raw_jsonl: String,
    /// MD5 hex digest of `raw_jsonl`; the turn's dedup identity.
    pub content_hash: String,
}

/// Kind of artifact extracted from a turn's raw JSONL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    FileRead,
    FileWrite,
    FileEdit,
    Command,
    Error,
    ToolCall,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::FileEdit => "file_edit",
            Self::Command => "command",
            Self::Error => "error",
            Self::ToolCall => "tool_call",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file_read" => Some(Self::FileRead),
            "file_write" => Some(Self::FileWrite),
            "file_edit" => Some(Self::FileEdit),
            "command" => Some(Self::Command),
            "error" => Some(Self::Error),
            "tool_call" => Some(Self::ToolCall),
            _ => None,
        }
    }
}

/// A single artifact extracted from a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_type: ArtifactType,
    /// The primary value: file path, command string, error message, tool name.
    pub artifact_value: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Everything extracted from a single turn's raw JSONL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnArtifacts {
    pub artifacts: Vec<Artifact>,
    pub files_read: Vec<String>,
    pub files_written: Vec<String>,
    pub files_edited: Vec<String>,
    pub commands_run: Vec<String>,
    pub errors_encountered: Vec<String>,
    pub tool_call_count: usize,
}

impl TurnArtifacts {
    /// All unique files touched (read, written, edited), first-seen order.
    pub fn files_touched(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for f in self
            .files_read
            .iter()
            .chain(&self.files_written)
            .chain(&self.files_edited)
        {
            if seen.insert(f.clone()) {
                result.push(f.clone());
            }
        }
        result
    }
}

/// Detected intent of a user prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Code,
    Email,
    Task,
    Meta,
    #[default]
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Email => "email",
            Self::Task => "task",
            Self::Meta => "meta",
            Self::General => "general",
        }
    }
}

/// Where a context block came from. Determines its label in formatted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Conversation,
    Task,
    Email,
    Commitment,
    Person,
    Sprint,
    FileContext,
    Error,
    Skill,
}

impl SourceType {
    /// Fixed label used by the context formatter.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Conversation => "Conv",
            Self::Task => "Task",
            Self::Email => "Email",
            Self::Commitment => "Commitment",
            Self::Person => "Person",
            Self::Sprint => "Sprint",
            Self::FileContext => "File",
            Self::Error => "Error",
            Self::Skill => "Skill",
        }
    }
}

/// A single block of context assembled by the retriever, ready to be packed
/// into the token budget by the formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBlock {
    pub source_type: SourceType,
    /// Dedup identity: the first block with a given source_id wins.
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub relevance_score: f64,
    /// Unix seconds, when the underlying record has one.
    pub timestamp: Option<i64>,
}

impl ContextBlock {
    pub fn token_estimate(&self) -> usize {
        estimate_tokens(&self.content)
    }
}

/// Rough token estimate: character count / 4, minimum 1.
pub fn estimate_tokens(text: &str) -> usize {
    std::cmp::max(1, text.len() / 4)
}

/// A known project as preloaded for classification: (slug, display name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub slug: String,
    pub name: String,
}

/// A known person as preloaded for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRef {
    pub name: String,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_touched_dedups_preserving_order() {
        let artifacts = TurnArtifacts {
            files_read: vec!["a.rs".into(), "b.rs".into()],
            files_written: vec!["c.rs".into(), "a.rs".into()],
            files_edited: vec!["b.rs".into(), "d.rs".into()],
            ..Default::default()
        };
        assert_eq!(artifacts.files_touched(), vec!["a.rs", "b.rs", "c.rs", "d.rs"]);
    }

    #[test]
    fn test_artifact_type_round_trip() {
        for t in [
            ArtifactType::FileRead,
            ArtifactType::FileWrite,
            ArtifactType::FileEdit,
            ArtifactType::Command,
            ArtifactType::Error,
            ArtifactType::ToolCall,
        ] {
            assert_eq!(ArtifactType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ArtifactType::parse("bogus"), None);
    }

    #[test]
    fn test_token_estimate_floor() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
    }

    #[test]
    fn test_source_type_labels() {
        assert_eq!(SourceType::Conversation.label(), "Conv");
        assert_eq!(SourceType::FileContext.label(), "File");
        assert_eq!(SourceType::Skill.label(), "Skill");
    }
}
