// crates/simon-skills/src/lib.rs
//! Skill subsystem: decide whether a recorded session is worth turning into
//! a reusable SKILL.md, generate the file via the LLM capability, and
//! install it to disk.

pub mod analyzer;
pub mod generator;
pub mod installer;

pub use analyzer::{analyze_session_for_skill, description_hash, score_session_quality, SkillCandidate};
pub use generator::{
    generate_skill_md, render_skill_md, validate_skill_name, GeneratedSkill, SkillContext,
};
pub use installer::{install_skill, uninstall_skill, validate_skill_content, SkillError};
