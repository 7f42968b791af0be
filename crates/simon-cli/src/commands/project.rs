// crates/simon-cli/src/commands/project.rs
//! `simon project` — explicit active-project selection.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use simon_core::ProjectStateStore;

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Set the active project, globally or for the current workspace
    Set {
        slug: String,
        /// Apply only to the current working directory
        #[arg(long)]
        workspace: bool,
    },
    /// Clear the active project selection
    Clear {
        /// Clear only the current workspace override
        #[arg(long)]
        workspace: bool,
    },
    /// Show the active project state
    Show,
}

fn store() -> Result<ProjectStateStore> {
    ProjectStateStore::default_location().ok_or_else(|| anyhow!("No home directory found"))
}

fn current_workspace() -> Result<String> {
    Ok(std::env::current_dir()?.display().to_string())
}

pub fn run(command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Set { slug, workspace } => {
            let store = store()?;
            let ws = workspace.then(current_workspace).transpose()?;
            store.set_active_project(&slug, ws.as_deref())?;
            match ws {
                Some(ws) => println!("Active project set: {slug} (workspace {ws})"),
                None => println!("Active project set: {slug} (global)"),
            }
            Ok(())
        }
        ProjectCommand::Clear { workspace } => {
            let store = store()?;
            let ws = workspace.then(current_workspace).transpose()?;
            store.clear_active_project(ws.as_deref())?;
            println!("Active project cleared.");
            Ok(())
        }
        ProjectCommand::Show => {
            let store = store()?;
            let state = store.snapshot();
            println!(
                "Global: {}",
                state.global.as_deref().unwrap_or("(none)")
            );
            if state.workspaces.is_empty() {
                println!("Workspace overrides: (none)");
            } else {
                println!("Workspace overrides:");
                for (workspace, slug) in &state.workspaces {
                    println!("  {workspace} -> {slug}");
                }
            }
            Ok(())
        }
    }
}
