// crates/simon-cli/src/commands/skill.rs
//! `simon skill` — create, list, and show Claude Code skills.

use anyhow::{anyhow, Result};
use clap::Subcommand;
use simon_core::settings::Settings;
use simon_core::skillset;
use simon_core::{llm, paths};
use simon_skills::{generator, installer};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum SkillCommand {
    /// Generate a new skill from a description
    Create {
        /// What the skill should do
        description: String,
        /// personal or project
        #[arg(long, short, default_value = "personal")]
        scope: String,
        /// Override the generated skill name
        #[arg(long, short)]
        name: Option<String>,
    },
    /// List installed skills
    List,
    /// Show the contents of an installed skill
    Show { name: String },
}

fn skills_dirs() -> (Option<PathBuf>, PathBuf) {
    let project = std::env::current_dir()
        .map(|cwd| paths::project_skills_dir(&cwd))
        .unwrap_or_else(|_| PathBuf::from(".claude/skills"));
    (paths::personal_skills_dir(), project)
}

pub async fn run(command: SkillCommand, settings: Settings) -> Result<()> {
    match command {
        SkillCommand::Create {
            description,
            scope,
            name,
        } => create(&description, &scope, name.as_deref(), settings).await,
        SkillCommand::List => {
            let (personal, project) = skills_dirs();
            let skills = skillset::list_installed_skills(personal.as_deref(), Some(&project));
            if skills.is_empty() {
                println!("No skills installed.");
                return Ok(());
            }

            println!("Installed Skills:");
            for skill in skills {
                println!(
                    "  {:<30} {:<10} {}",
                    skill.name,
                    skill.scope.as_str(),
                    skill.description
                );
            }
            Ok(())
        }
        SkillCommand::Show { name } => {
            let (personal, project) = skills_dirs();
            let skills = skillset::list_installed_skills(personal.as_deref(), Some(&project));
            let Some(skill) = skills.into_iter().find(|s| s.name == name) else {
                println!("Skill '{name}' not found.");
                return Ok(());
            };
            println!("{}", std::fs::read_to_string(&skill.path)?);
            Ok(())
        }
    }
}

async fn create(
    description: &str,
    scope: &str,
    name_override: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let Some(provider) = llm::provider_from_settings(&settings) else {
        return Err(anyhow!(
            "No Anthropic API key configured; set ANTHROPIC_API_KEY or [anthropic].api_key"
        ));
    };

    println!("Generating skill: {description}");

    let cwd = std::env::current_dir()?;
    let mut context = generator::SkillContext {
        workspace_path: cwd.display().to_string(),
        ..Default::default()
    };

    // Project conventions, when the workspace documents them
    let claude_md = cwd.join("CLAUDE.md");
    if let Ok(conventions) = std::fs::read_to_string(&claude_md) {
        context.conventions = conventions.chars().take(1000).collect();
    }

    let mut skill = generator::generate_skill_md(
        provider.as_ref(),
        &settings.skills.skill_generation_model,
        description,
        &context,
        "manual",
    )
    .await
    .ok_or_else(|| anyhow!("Failed to generate skill. Check API key and logs."))?;

    if let Some(name) = name_override {
        skill.name = generator::validate_skill_name(name)?;
        skill.full_content =
            generator::render_skill_md(&skill.name, &skill.description, &skill.body, None, false);
    }

    let skills_dir = if scope == "project" {
        paths::project_skills_dir(Path::new(&context.workspace_path))
    } else {
        paths::personal_skills_dir().ok_or_else(|| anyhow!("No home directory found"))?
    };

    let path = installer::install_skill(&skills_dir, &skill.name, &skill.full_content, false)?;
    println!("Skill '{}' created at {}", skill.name, path.display());
    Ok(())
}
