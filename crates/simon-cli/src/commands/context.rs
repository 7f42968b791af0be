// crates/simon-cli/src/commands/context.rs
//! `simon context` — inspect classification and recording state.

use anyhow::Result;
use clap::Subcommand;
use simon_core::formatter::format_context_blocks;
use simon_core::settings::Settings;
use simon_db::ContextRetriever;

#[derive(Subcommand)]
pub enum ContextCommand {
    /// Preview the context that would be injected for a query
    Query {
        query: String,
        /// Simulate a working directory
        #[arg(long)]
        cwd: Option<String>,
        /// Token budget
        #[arg(long = "tokens", default_value_t = 1500)]
        max_tokens: usize,
    },
    /// Show current project detection state
    Show,
    /// Show recording statistics
    Stats,
}

pub async fn run(command: ContextCommand, settings: Settings) -> Result<()> {
    match command {
        ContextCommand::Query {
            query,
            cwd,
            max_tokens,
        } => {
            let db = super::open_database(&settings).await?;
            let classifier = super::retrieve::load_classifier(&db).await?;
            let classification = classifier.classify(&query, cwd.as_deref());

            println!("\nClassification:");
            println!("  Projects:   {:?}", classification.project_slugs);
            println!("  People:     {:?}", classification.person_names);
            println!("  Type:       {}", classification.query_type.as_str());
            println!(
                "  Workspace:  {}",
                classification.workspace_project.as_deref().unwrap_or("(none)")
            );
            println!("  Confidence: {:.0}%", classification.confidence * 100.0);

            let retriever = ContextRetriever::new(&db);
            let blocks = retriever.retrieve(&classification, max_tokens).await?;
            let formatted = format_context_blocks(&blocks, max_tokens);

            if formatted.is_empty() {
                println!("\nNo context to inject.");
            } else {
                println!(
                    "\nWould inject ({} chars, ~{} tokens):\n",
                    formatted.len(),
                    formatted.len() / 4
                );
                println!("{formatted}");
            }
            Ok(())
        }
        ContextCommand::Show => {
            let db = super::open_database(&settings).await?;
            let classifier = super::retrieve::load_classifier(&db).await?;
            let cwd = std::env::current_dir()?;
            let classification = classifier.classify("", cwd.to_str());

            println!("\nContext State:");
            println!("  CWD:               {}", cwd.display());
            println!(
                "  Workspace project: {}",
                classification
                    .workspace_project
                    .as_deref()
                    .unwrap_or("(none detected)")
            );
            println!("  Known projects:    {}", classifier.project_count());
            println!("  Known people:      {}", classifier.person_count());
            Ok(())
        }
        ContextCommand::Stats => {
            let db = super::open_database(&settings).await?;
            let stats = db.context_stats().await?;
            let job_stats = db.job_stats().await?;

            println!("\nContext System Stats\n");
            println!("  Sessions (total):     {}", stats.total_sessions);
            println!("  Sessions (processed): {}", stats.processed_sessions);
            println!("  Turns (total):        {}", stats.total_turns);
            println!("  Turns (summarized):   {}", stats.summarized_turns);
            println!("  Entity links:         {}", stats.entity_links);

            if job_stats.is_empty() {
                println!("\nNo jobs in queue.");
            } else {
                println!("\nJob Queue:");
                for (status, count) in job_stats {
                    println!("  {status}: {count}");
                }
            }
            Ok(())
        }
    }
}
