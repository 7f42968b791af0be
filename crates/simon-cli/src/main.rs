// crates/simon-cli/src/main.rs
//! simon — context injection and session memory for Claude Code.
//!
//! The `record --hook` and `retrieve --hook` subcommands are the two hook
//! entry points; everything else is management and debugging surface.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use simon_core::settings::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "simon",
    about = "Context injection and session memory for Claude Code",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record Claude Code conversations
    Record(commands::record::RecordArgs),
    /// Retrieve context for a prompt
    Retrieve(commands::retrieve::RetrieveArgs),
    /// Background worker management
    Worker {
        #[command(subcommand)]
        command: commands::worker::WorkerCommand,
    },
    /// Query and debug the context system
    Context {
        #[command(subcommand)]
        command: commands::context::ContextCommand,
    },
    /// Manage Claude Code skills
    Skill {
        #[command(subcommand)]
        command: commands::skill::SkillCommand,
    },
    /// Install/manage Claude Code hooks
    Hooks {
        #[command(subcommand)]
        command: commands::hooks::HooksCommand,
    },
    /// Select the active project
    Project {
        #[command(subcommand)]
        command: commands::project::ProjectCommand,
    },
}

fn init_tracing(settings: &Settings) {
    // Hook stdout is the protocol channel; all logging goes to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.general.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            // Hooks must never fail on a broken config; fall back loudly.
            eprintln!("warning: {e}; using default settings");
            Settings::default()
        }
    };
    init_tracing(&settings);

    match cli.command {
        Command::Record(args) => commands::record::run(args, settings).await,
        Command::Retrieve(args) => commands::retrieve::run(args, settings).await,
        Command::Worker { command } => commands::worker::run(command, settings).await,
        Command::Context { command } => commands::context::run(command, settings).await,
        Command::Skill { command } => commands::skill::run(command, settings).await,
        Command::Hooks { command } => commands::hooks::run(command),
        Command::Project { command } => commands::project::run(command),
    }
}
