// crates/simon-cli/src/commands/record.rs
//! `simon record` — the Stop hook entry point and batch back-fill.

use anyhow::Result;
use clap::Args;
use simon_core::settings::Settings;
use simon_db::recorder;
use tracing::{debug, error};

#[derive(Args)]
pub struct RecordArgs {
    /// Read stdin JSON (Claude Code hook mode)
    #[arg(long)]
    pub hook: bool,

    /// Scan and record all transcripts under ~/.claude/projects
    #[arg(long)]
    pub all: bool,
}

pub async fn run(args: RecordArgs, settings: Settings) -> Result<()> {
    if args.hook {
        hook_record(settings).await;
        Ok(())
    } else if args.all {
        record_all(settings).await
    } else {
        println!("Usage: simon record --hook (for Claude Code) or --all (scan all sessions)");
        Ok(())
    }
}

/// Fast path for the Stop hook: one stat and one enqueue, then exit 0
/// no matter what happened.
async fn hook_record(settings: Settings) {
    let Some(input) = super::read_hook_input() else {
        return;
    };

    let session_id = input.get("session_id").and_then(|v| v.as_str()).unwrap_or("");
    let transcript_path = input
        .get("transcript_path")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let cwd = input.get("cwd").and_then(|v| v.as_str()).unwrap_or("");

    if session_id.is_empty() || transcript_path.is_empty() {
        return;
    }

    if !settings.context.enabled || !settings.context.recording_enabled {
        return;
    }

    match super::open_database(&settings).await {
        Ok(db) => {
            if let Err(e) =
                recorder::enqueue_session_recording(&db, session_id, transcript_path, cwd).await
            {
                error!("Failed to enqueue recording: {}", e);
            }
        }
        Err(e) => debug!("Cannot open database from hook: {}", e),
    }
}

/// Scan every transcript on disk and record each inline.
async fn record_all(settings: Settings) -> Result<()> {
    let Some(base_dir) = simon_core::paths::claude_sessions_dir() else {
        println!("No home directory found.");
        return Ok(());
    };
    if !base_dir.exists() {
        println!("No sessions directory: {}", base_dir.display());
        return Ok(());
    }

    let db = super::open_database(&settings).await?;

    let mut transcript_files = Vec::new();
    for project_entry in std::fs::read_dir(&base_dir)? {
        let project_path = project_entry?.path();
        if !project_path.is_dir() {
            continue;
        }
        let mut files: Vec<_> = std::fs::read_dir(&project_path)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "jsonl").unwrap_or(false))
            .collect();
        files.sort();
        transcript_files.extend(files);
    }

    if transcript_files.is_empty() {
        println!("No session files found.");
        return Ok(());
    }

    println!("Found {} session files", transcript_files.len());

    let mut recorded = 0usize;
    let mut skipped = 0usize;
    let mut errors = 0usize;

    for transcript in &transcript_files {
        let session_id = transcript
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let workspace_path = transcript
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        match recorder::record_session(
            &db,
            &session_id,
            &transcript.to_string_lossy(),
            &workspace_path,
        )
        .await
        {
            Ok(outcome) if outcome.error.is_some() => errors += 1,
            Ok(outcome) if outcome.turns_recorded > 0 => recorded += 1,
            Ok(_) => skipped += 1,
            Err(e) => {
                error!("Failed to record {}: {}", session_id, e);
                errors += 1;
            }
        }
    }

    println!("\nRecording complete!");
    println!("  Recorded: {recorded}");
    println!("  Skipped:  {skipped}");
    if errors > 0 {
        println!("  Errors:   {errors}");
    }

    Ok(())
}
