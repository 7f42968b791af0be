// crates/simon-core/src/artifacts.rs
//! Artifact extraction — pure functions over a turn's raw JSONL.
//!
//! Walks `tool_use` and `tool_result` content blocks to collect files,
//! commands, errors, and generic tool calls. No database, no LLM.

use crate::types::{Artifact, ArtifactType, TurnArtifacts};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static ABSOLUTE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    // A leading non-word char (or start of text) guards against matching the
    // tail of URLs and identifiers.
    Regex::new(r"(^|[^\w])(/[\w./-]+\.\w+)").unwrap()
});

static RELATIVE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^\w])((?:src|tests|lib|app|pkg)/[\w./-]+\.\w+)").unwrap()
});

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn metadata(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Extract all artifacts from a turn's raw JSONL content.
///
/// Malformed lines and non-block content are skipped silently; an empty
/// input yields an empty `TurnArtifacts`.
pub fn extract_artifacts(raw_jsonl: &str) -> TurnArtifacts {
    let mut result = TurnArtifacts::default();

    if raw_jsonl.is_empty() {
        return result;
    }

    for line in raw_jsonl.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Ok(obj) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };

        let Some(content) = obj
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_array())
        else {
            continue;
        };

        for block in content {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("tool_use") => process_tool_use(block, &mut result),
                Some("tool_result") => process_tool_result(block, &mut result),
                _ => {}
            }
        }
    }

    result
}

fn process_tool_use(block: &serde_json::Value, result: &mut TurnArtifacts) {
    let tool_name = block.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let empty = serde_json::Map::new();
    let input = block
        .get("input")
        .and_then(|i| i.as_object())
        .unwrap_or(&empty);

    result.tool_call_count += 1;

    let str_input = |key: &str| -> String {
        input
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };

    match tool_name {
        "Read" => {
            let path = str_input("file_path");
            if !path.is_empty() {
                result.files_read.push(path.clone());
                result.artifacts.push(Artifact {
                    artifact_type: ArtifactType::FileRead,
                    artifact_value: path,
                    metadata: metadata(&[("tool", tool_name.into())]),
                });
            }
        }
        "Glob" | "Grep" => {
            let pattern = str_input("pattern");
            let path = str_input("path");
            let value = if pattern.is_empty() { path.clone() } else { pattern.clone() };
            result.artifacts.push(Artifact {
                artifact_type: ArtifactType::FileRead,
                artifact_value: value,
                metadata: metadata(&[
                    ("tool", tool_name.into()),
                    ("pattern", pattern.into()),
                    ("path", path.into()),
                ]),
            });
        }
        "Write" => {
            let path = str_input("file_path");
            if !path.is_empty() {
                result.files_written.push(path.clone());
                result.artifacts.push(Artifact {
                    artifact_type: ArtifactType::FileWrite,
                    artifact_value: path,
                    metadata: metadata(&[("tool", tool_name.into())]),
                });
            }
        }
        "Edit" | "NotebookEdit" => {
            let mut path = str_input("file_path");
            if path.is_empty() {
                path = str_input("notebook_path");
            }
            if !path.is_empty() {
                result.files_edited.push(path.clone());
                let old_string = truncate_chars(&str_input("old_string"), 100);
                result.artifacts.push(Artifact {
                    artifact_type: ArtifactType::FileEdit,
                    artifact_value: path,
                    metadata: metadata(&[
                        ("tool", tool_name.into()),
                        ("old_string", old_string.into()),
                    ]),
                });
            }
        }
        "Bash" => {
            let command = str_input("command");
            if !command.is_empty() {
                let truncated = truncate_chars(&command, 500);
                result.commands_run.push(truncated.clone());
                result.artifacts.push(Artifact {
                    artifact_type: ArtifactType::Command,
                    artifact_value: truncated,
                    metadata: metadata(&[("tool", tool_name.into())]),
                });
            }
        }
        "Task" => {
            let prompt = truncate_chars(&str_input("prompt"), 200);
            result.artifacts.push(Artifact {
                artifact_type: ArtifactType::ToolCall,
                artifact_value: format!("Task: {}", prompt),
                metadata: metadata(&[
                    ("tool", tool_name.into()),
                    ("subagent_type", str_input("subagent_type").into()),
                ]),
            });
        }
        _ => {
            let input_keys: Vec<serde_json::Value> = input
                .keys()
                .take(10)
                .map(|k| serde_json::Value::String(k.clone()))
                .collect();
            result.artifacts.push(Artifact {
                artifact_type: ArtifactType::ToolCall,
                artifact_value: tool_name.to_string(),
                metadata: metadata(&[
                    ("tool", tool_name.into()),
                    ("input_keys", serde_json::Value::Array(input_keys)),
                ]),
            });
        }
    }
}

fn process_tool_result(block: &serde_json::Value, result: &mut TurnArtifacts) {
    if block.get("is_error").and_then(|v| v.as_bool()) != Some(true) {
        return;
    }

    let content = match block.get("content") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => return,
    };

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return;
    }

    let error_msg = truncate_chars(trimmed, 500);
    result.errors_encountered.push(error_msg.clone());
    result.artifacts.push(Artifact {
        artifact_type: ArtifactType::Error,
        artifact_value: error_msg,
        metadata: serde_json::Map::new(),
    });
}

/// Extract file-path-shaped strings from free text (prompts, messages).
///
/// Matches absolute paths with an extension and relative paths rooted in a
/// conventional source prefix. Returns unique paths longer than 3 chars,
/// first-seen order.
pub fn extract_file_paths_from_text(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for re in [&*ABSOLUTE_PATH_RE, &*RELATIVE_PATH_RE] {
        for caps in re.captures_iter(text) {
            let path = caps[2].trim().to_string();
            if path.len() > 3 && seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    paths
}
