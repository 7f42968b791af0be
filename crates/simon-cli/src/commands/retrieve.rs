// crates/simon-cli/src/commands/retrieve.rs
//! `simon retrieve` — the UserPromptSubmit hook entry point and manual testing mode.

use anyhow::Result;
use clap::Args;
use simon_core::formatter::format_context_blocks;
use simon_core::settings::Settings;
use simon_core::PromptClassifier;
use simon_db::{ContextRetriever, Database};
use tracing::debug;

#[derive(Args)]
pub struct RetrieveArgs {
    /// Read stdin JSON (Claude Code hook mode)
    #[arg(long)]
    pub hook: bool,

    /// Manual query for testing
    #[arg(long, short)]
    pub query: Option<String>,

    /// Simulate a working directory
    #[arg(long)]
    pub cwd: Option<String>,

    /// Token budget
    #[arg(long = "tokens", default_value_t = 1500)]
    pub max_tokens: usize,
}

pub async fn run(args: RetrieveArgs, settings: Settings) -> Result<()> {
    if args.hook {
        hook_retrieve(settings).await;
        Ok(())
    } else if let Some(query) = args.query {
        manual_retrieve(&query, args.cwd.as_deref(), args.max_tokens, settings).await
    } else {
        println!("Usage: simon retrieve --hook (for Claude Code) or --query (for testing)");
        Ok(())
    }
}

/// The whole classify → retrieve → format chain with the hook contract:
/// exit 0 unconditionally, emit JSON only when there is context to inject.
async fn hook_retrieve(settings: Settings) {
    let Some(input) = super::read_hook_input() else {
        return;
    };

    let prompt = input.get("prompt").and_then(|v| v.as_str()).unwrap_or("");
    let cwd = input.get("cwd").and_then(|v| v.as_str()).unwrap_or("");

    if prompt.is_empty() {
        return;
    }

    if !settings.context.enabled || !settings.context.retrieval_enabled {
        return;
    }

    let context_text = match build_context(prompt, Some(cwd).filter(|c| !c.is_empty()), &settings)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            debug!("Retrieval failed inside hook: {}", e);
            return;
        }
    };

    if context_text.is_empty() {
        return;
    }

    let output = serde_json::json!({
        "hookSpecificOutput": {
            "hookEventName": "UserPromptSubmit",
            "additionalContext": context_text,
        }
    });
    println!("{output}");
}

async fn build_context(
    prompt: &str,
    cwd: Option<&str>,
    settings: &Settings,
) -> Result<String> {
    let db = super::open_database(settings).await?;
    let classifier = load_classifier(&db).await?;

    let classification = classifier.classify(prompt, cwd);
    if classification.confidence < 0.1 {
        return Ok(String::new());
    }

    let max_tokens = settings.context.max_context_tokens;
    let retriever = ContextRetriever::new(&db);
    let blocks = retriever.retrieve(&classification, max_tokens).await?;

    Ok(format_context_blocks(&blocks, max_tokens))
}

pub async fn load_classifier(db: &Database) -> Result<PromptClassifier> {
    let projects = db.list_active_project_refs().await?;
    let people = db.list_person_refs().await?;
    debug!(
        "Classifier loaded {} projects, {} people",
        projects.len(),
        people.len()
    );
    Ok(PromptClassifier::new(projects, people))
}

/// Manual mode: show the classification, the blocks, and the final text.
async fn manual_retrieve(
    query: &str,
    cwd: Option<&str>,
    max_tokens: usize,
    settings: Settings,
) -> Result<()> {
    let db = super::open_database(&settings).await?;
    let classifier = load_classifier(&db).await?;
    let classification = classifier.classify(query, cwd);

    println!("\nClassification:");
    println!("  Projects:   {:?}", classification.project_slugs);
    println!("  People:     {:?}", classification.person_names);
    println!("  Type:       {}", classification.query_type.as_str());
    println!(
        "  Workspace:  {}",
        classification.workspace_project.as_deref().unwrap_or("(none)")
    );
    println!("  Confidence: {:.0}%", classification.confidence * 100.0);

    if classification.confidence < 0.1 {
        println!("\nConfidence too low, no context would be injected.");
        return Ok(());
    }

    let retriever = ContextRetriever::new(&db);
    let blocks = retriever.retrieve(&classification, max_tokens).await?;

    println!("\nRetrieved {} context blocks:", blocks.len());
    for block in &blocks {
        println!(
            "  [{}] {} (score: {:.2})",
            block.source_type.label(),
            block.title,
            block.relevance_score
        );
    }

    let formatted = format_context_blocks(&blocks, max_tokens);
    if formatted.is_empty() {
        println!("\nNo context to inject.");
    } else {
        println!(
            "\nFormatted output ({} chars, ~{} tokens):\n",
            formatted.len(),
            formatted.len() / 4
        );
        println!("{formatted}");
    }

    Ok(())
}
