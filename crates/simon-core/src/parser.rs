// crates/simon-core/src/parser.rs
//! Async JSONL parser for Claude Code transcripts.
//!
//! Groups a line-oriented session log into turns: one user message plus the
//! contiguous assistant records that followed it. Malformed lines are skipped
//! (logged at debug level), sidechain and meta records are dropped, and each
//! finalized turn carries an MD5 content hash over its raw lines for dedup.

use crate::error::ParseError;
use crate::types::ParsedTurn;
use chrono::DateTime;
use md5::{Digest, Md5};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Compute the MD5 hex digest used for turn and skill dedup.
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse an ISO-8601 timestamp into Unix seconds, returning None on failure.
pub fn parse_timestamp(ts: &str) -> Option<i64> {
    if ts.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(ts).ok().map(|dt| dt.timestamp())
}

/// A transcript record kept after filtering, before turn grouping.
struct KeptRecord {
    role: String,
    text: String,
    timestamp: String,
    model: String,
    tool_names: Vec<String>,
    raw_line: String,
}

/// A turn under construction.
struct OpenTurn {
    user_message: String,
    assistant_texts: Vec<String>,
    tool_names: Vec<String>,
    model_name: Option<String>,
    started_at: String,
    ended_at: String,
    raw_lines: Vec<String>,
}

impl OpenTurn {
    fn finalize(self, index: usize) -> ParsedTurn {
        let raw_jsonl = self.raw_lines.join("\n");
        let content_hash = compute_content_hash(&raw_jsonl);
        ParsedTurn {
            turn_number: index,
            user_message: self.user_message,
            assistant_text: self.assistant_texts.join("\n"),
            tool_names: self.tool_names,
            model_name: self.model_name,
            started_at: (!self.started_at.is_empty()).then_some(self.started_at),
            ended_at: (!self.ended_at.is_empty()).then_some(self.ended_at),
            raw_jsonl,
            content_hash,
        }
    }
}

/// Parse a Claude Code JSONL transcript into structured turns.
///
/// Parsing rules:
/// - Empty and malformed lines are skipped.
/// - Only `user` / `assistant` records without `isSidechain` / `isMeta` count.
/// - Records whose text starts with a command-prefix tag are dropped.
/// - A user record opens a new turn (finalizing a prior turn that has a user
///   message); assistant records append text, tool names, and timestamps.
///
/// # Errors
/// - `ParseError::NotFound` if the file doesn't exist
/// - `ParseError::PermissionDenied` / `ParseError::Io` for other read failures
pub async fn parse_session_into_turns(file_path: &Path) -> Result<Vec<ParsedTurn>, ParseError> {
    let file = File::open(file_path)
        .await
        .map_err(|e| ParseError::io(file_path, e))?;

    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut messages: Vec<KeptRecord> = Vec::new();
    let mut line_number: usize = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| ParseError::io(file_path, e))?
    {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(
                    "Skipping malformed JSON at line {} in {:?}: {}",
                    line_number, file_path, e
                );
                continue;
            }
        };

        let entry_type = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
        if entry_type != "user" && entry_type != "assistant" {
            continue;
        }

        if value.get("isSidechain").and_then(|v| v.as_bool()) == Some(true)
            || value.get("isMeta").and_then(|v| v.as_bool()) == Some(true)
        {
            continue;
        }

        let Some(message) = value.get("message").filter(|m| m.is_object()) else {
            continue;
        };

        let role = message
            .get("role")
            .and_then(|r| r.as_str())
            .unwrap_or("")
            .to_string();
        let content = message.get("content");
        let text = extract_text_content(content);

        // Slash-command records are synthetic, not conversation
        let trimmed = text.trim();
        if trimmed.starts_with("<command-name>") || trimmed.starts_with("<local-command") {
            continue;
        }

        messages.push(KeptRecord {
            role,
            text,
            timestamp: value
                .get("timestamp")
                .and_then(|t| t.as_str())
                .unwrap_or("")
                .to_string(),
            model: message
                .get("model")
                .and_then(|m| m.as_str())
                .unwrap_or("")
                .to_string(),
            tool_names: extract_tool_names(content),
            raw_line: line.to_string(),
        });
    }

    // Group into turns: user opens, assistants append
    let mut turns: Vec<ParsedTurn> = Vec::new();
    let mut current: Option<OpenTurn> = None;

    for msg in messages {
        if msg.role == "user" {
            if let Some(turn) = current.take() {
                if !turn.user_message.is_empty() {
                    let index = turns.len();
                    turns.push(turn.finalize(index));
                }
            }
            current = Some(OpenTurn {
                user_message: msg.text,
                assistant_texts: Vec::new(),
                tool_names: Vec::new(),
                model_name: None,
                started_at: msg.timestamp.clone(),
                ended_at: msg.timestamp,
                raw_lines: vec![msg.raw_line],
            });
        } else if msg.role == "assistant" {
            if let Some(turn) = current.as_mut() {
                if !msg.text.is_empty() {
                    turn.assistant_texts.push(msg.text);
                }
                for tool in msg.tool_names {
                    if !turn.tool_names.contains(&tool) {
                        turn.tool_names.push(tool);
                    }
                }
                if turn.model_name.is_none() && !msg.model.is_empty() {
                    turn.model_name = Some(msg.model);
                }
                if !msg.timestamp.is_empty() {
                    turn.ended_at = msg.timestamp;
                }
                turn.raw_lines.push(msg.raw_line);
            }
        }
    }

    if let Some(turn) = current.take() {
        if !turn.user_message.is_empty() {
            let index = turns.len();
            turns.push(turn.finalize(index));
        }
    }

    Ok(turns)
}

/// Extract plain text from a message content field.
///
/// Content is either a string (user prompts) or a list of blocks; only
/// `text` blocks contribute, newline-joined.
fn extract_text_content(content: Option<&serde_json::Value>) -> String {
    match content {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(blocks)) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Extract unique tool names from content blocks, first-seen order.
fn extract_tool_names(content: Option<&serde_json::Value>) -> Vec<String> {
    let Some(serde_json::Value::Array(blocks)) = content else {
        return Vec::new();
    };

    let mut tools: Vec<String> = Vec::new();
    for block in blocks {
        if block.get("type").and_then(|t| t.as_str()) == Some("tool_use") {
            if let Some(name) = block.get("name").and_then(|n| n.as_str()) {
                if !name.is_empty() && !tools.iter().any(|t| t == name) {
                    tools.push(name.to_string());
                }
            }
        }
    }
    tools
}
