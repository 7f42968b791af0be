// crates/simon-cli/src/commands/mod.rs
pub mod context;
pub mod hooks;
pub mod project;
pub mod record;
pub mod retrieve;
pub mod skill;
pub mod worker;

use simon_core::settings::Settings;
use simon_db::{Database, DbResult};

/// Open the configured database.
pub async fn open_database(settings: &Settings) -> DbResult<Database> {
    match settings.db_path() {
        Ok(path) => Database::new(&path).await,
        Err(_) => Database::open_default().await,
    }
}

/// Read one JSON object from stdin, as Claude Code hooks deliver it.
pub fn read_hook_input() -> Option<serde_json::Value> {
    use std::io::Read;
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw).ok()?;
    serde_json::from_str(&raw).ok()
}
