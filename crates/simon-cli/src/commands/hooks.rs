// crates/simon-cli/src/commands/hooks.rs
//! `simon hooks` — install the hook entry points into Claude Code's
//! settings.json. Non-destructive: hooks from other tools are preserved.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum HooksCommand {
    /// Install simon hooks into Claude Code settings.json
    Install {
        /// Replace existing simon hooks
        #[arg(long)]
        force: bool,
    },
    /// Remove simon hooks from settings.json
    Uninstall,
    /// Show which simon hooks are installed
    Status,
}

const HOOK_EVENTS: [&str; 2] = ["UserPromptSubmit", "Stop"];

fn settings_path() -> Result<PathBuf> {
    simon_core::paths::claude_settings_file().ok_or_else(|| anyhow!("No home directory found"))
}

fn simon_binary() -> String {
    std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "simon".to_string())
}

/// Wrap a subcommand so a missing or broken binary never blocks Claude Code.
fn build_hook_command(subcommand: &str) -> String {
    format!("bash -c '{} {} 2>/dev/null || true'", simon_binary(), subcommand)
}

fn simon_hook_entries() -> Vec<(&'static str, Value)> {
    vec![
        (
            "UserPromptSubmit",
            json!({
                "hooks": [{
                    "type": "command",
                    "command": build_hook_command("retrieve --hook"),
                    "timeout": 5,
                }]
            }),
        ),
        (
            "Stop",
            json!({
                "hooks": [{
                    "type": "command",
                    "command": build_hook_command("record --hook"),
                    "timeout": 10,
                }]
            }),
        ),
    ]
}

fn read_settings(path: &Path) -> Value {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_else(|| json!({}))
}

/// Atomic write: temp file then rename.
fn write_settings(path: &Path, settings: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let body = format!("{}\n", serde_json::to_string_pretty(settings)?);
    if let Err(e) = std::fs::write(&tmp, body).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// A hook command is ours if it invokes the simon binary's hook subcommands.
fn is_simon_command(command: &str) -> bool {
    command.contains("simon ")
        || (command.contains("simon") && (command.contains("record") || command.contains("retrieve")))
}

fn has_simon_hook(entries: &[Value]) -> bool {
    entries.iter().any(|entry| {
        entry
            .get("hooks")
            .and_then(|h| h.as_array())
            .map(|hooks| {
                hooks.iter().any(|hook| {
                    hook.get("command")
                        .and_then(|c| c.as_str())
                        .map(is_simon_command)
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    })
}

fn remove_simon_hooks(entries: &[Value]) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| {
            let hooks: Vec<Value> = entry
                .get("hooks")
                .and_then(|h| h.as_array())
                .map(|hooks| {
                    hooks
                        .iter()
                        .filter(|hook| {
                            !hook
                                .get("command")
                                .and_then(|c| c.as_str())
                                .map(is_simon_command)
                                .unwrap_or(false)
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            if hooks.is_empty() {
                None
            } else {
                let mut entry = entry.clone();
                entry["hooks"] = Value::Array(hooks);
                Some(entry)
            }
        })
        .collect()
}

pub fn run(command: HooksCommand) -> Result<()> {
    match command {
        HooksCommand::Install { force } => install(force),
        HooksCommand::Uninstall => uninstall(),
        HooksCommand::Status => status(),
    }
}

fn install(force: bool) -> Result<()> {
    let path = settings_path()?;
    let mut settings = read_settings(&path);
    if !settings.is_object() {
        settings = json!({});
    }
    if settings.get("hooks").map(|h| !h.is_object()).unwrap_or(true) {
        settings["hooks"] = json!({});
    }

    let mut installed = 0usize;
    let mut skipped = 0usize;

    for (event_name, simon_entry) in simon_hook_entries() {
        let mut existing: Vec<Value> = settings["hooks"]
            .get(event_name)
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        if has_simon_hook(&existing) {
            if force {
                existing = remove_simon_hooks(&existing);
                println!("  Replacing {event_name} hook");
            } else {
                println!("  Skipping {event_name} (already installed, use --force to replace)");
                skipped += 1;
                continue;
            }
        }

        existing.push(simon_entry);
        settings["hooks"][event_name] = Value::Array(existing);
        installed += 1;
        println!("  Installed {event_name} hook");
    }

    write_settings(&path, &settings)?;

    print!("\nHooks installed: {installed}");
    if skipped > 0 {
        print!(" (skipped: {skipped})");
    }
    println!("\n  Settings: {}", path.display());
    Ok(())
}

fn uninstall() -> Result<()> {
    let path = settings_path()?;
    let mut settings = read_settings(&path);

    let Some(hooks) = settings.get("hooks").and_then(|h| h.as_object()).cloned() else {
        println!("No simon hooks found to remove.");
        return Ok(());
    };

    let mut removed = 0usize;
    let mut new_hooks = serde_json::Map::new();

    for (event_name, entries) in hooks {
        let entries: Vec<Value> = entries.as_array().cloned().unwrap_or_default();
        if has_simon_hook(&entries) {
            removed += 1;
            println!("  Removed {event_name} hook");
            let remaining = remove_simon_hooks(&entries);
            if !remaining.is_empty() {
                new_hooks.insert(event_name, Value::Array(remaining));
            }
        } else {
            new_hooks.insert(event_name, Value::Array(entries));
        }
    }

    settings["hooks"] = Value::Object(new_hooks);
    write_settings(&path, &settings)?;

    if removed > 0 {
        println!("\nRemoved {removed} simon hooks");
    } else {
        println!("No simon hooks found to remove.");
    }
    Ok(())
}

fn status() -> Result<()> {
    let path = settings_path()?;
    if !path.exists() {
        println!("No settings.json found at {}", path.display());
        println!("Run 'simon hooks install' to set up hooks.");
        return Ok(());
    }

    let settings = read_settings(&path);
    println!("\nSimon Hook Status  ({})\n", path.display());

    for event_name in HOOK_EVENTS {
        let entries: Vec<Value> = settings
            .get("hooks")
            .and_then(|h| h.get(event_name))
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();
        if has_simon_hook(&entries) {
            println!("  installed      {event_name}");
        } else {
            println!("  not installed  {event_name}");
        }
    }
    Ok(())
}
