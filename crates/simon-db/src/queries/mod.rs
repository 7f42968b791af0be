// crates/simon-db/src/queries/mod.rs
// Query methods on Database, grouped by table family.

pub mod domain;
pub mod sessions;
pub mod skills;
