/// Inline SQL migrations for the simon database schema.
///
/// Simple inline migrations rather than sqlx migration files — the schema is
/// small and self-contained. The domain tables (projects, people, tasks,
/// commitments, sprints) are created here so a fresh database is complete,
/// but this system only ever reads them.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: durable job queue
    r#"
CREATE TABLE IF NOT EXISTS focus_jobs (
    id            TEXT PRIMARY KEY,
    kind          TEXT NOT NULL,
    payload       TEXT NOT NULL DEFAULT '{}',
    dedupe_key    TEXT UNIQUE,
    priority      INTEGER NOT NULL DEFAULT 10,
    attempts      INTEGER NOT NULL DEFAULT 0,
    max_attempts  INTEGER NOT NULL DEFAULT 10,
    status        TEXT NOT NULL DEFAULT 'queued'
                  CHECK (status IN ('queued','processing','retry','done','failed')),
    locked_until  INTEGER,
    error_message TEXT,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);
"#,
    // Migration 2: job queue indexes
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_ready ON focus_jobs(priority, created_at) WHERE status IN ('queued','retry');"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_kind ON focus_jobs(kind);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_locked ON focus_jobs(locked_until) WHERE status = 'processing';"#,
    // Migration 3: recorded agent sessions
    r#"
CREATE TABLE IF NOT EXISTS agent_sessions (
    id               TEXT PRIMARY KEY,
    session_id       TEXT NOT NULL UNIQUE,
    transcript_path  TEXT NOT NULL DEFAULT '',
    workspace_path   TEXT NOT NULL DEFAULT '',
    project_id       TEXT,
    session_title    TEXT,
    session_summary  TEXT,
    started_at       INTEGER,
    last_activity_at INTEGER,
    turn_count       INTEGER NOT NULL DEFAULT 0,
    is_processed     INTEGER NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL,
    updated_at       INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_sessions_workspace ON agent_sessions(workspace_path);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_sessions_project ON agent_sessions(project_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_sessions_unprocessed ON agent_sessions(is_processed) WHERE is_processed = 0;"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_sessions_activity ON agent_sessions(last_activity_at);"#,
    // Migration 4: turns + verbatim content
    r#"
CREATE TABLE IF NOT EXISTS agent_turns (
    id                TEXT PRIMARY KEY,
    session_id        TEXT NOT NULL REFERENCES agent_sessions(id) ON DELETE CASCADE,
    turn_number       INTEGER NOT NULL,
    user_message      TEXT,
    assistant_summary TEXT,
    turn_title        TEXT,
    content_hash      TEXT NOT NULL,
    model_name        TEXT,
    tool_names        TEXT NOT NULL DEFAULT '[]',
    started_at        INTEGER,
    ended_at          INTEGER,
    UNIQUE (session_id, turn_number)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_turns_session ON agent_turns(session_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_turns_hash ON agent_turns(content_hash);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_agent_turns_started ON agent_turns(started_at);"#,
    r#"
CREATE TABLE IF NOT EXISTS agent_turn_content (
    turn_id            TEXT PRIMARY KEY REFERENCES agent_turns(id) ON DELETE CASCADE,
    raw_jsonl          TEXT NOT NULL DEFAULT '',
    assistant_text     TEXT,
    content_size       INTEGER NOT NULL DEFAULT 0,
    files_touched      TEXT,
    commands_run       TEXT,
    errors_encountered TEXT,
    tool_call_count    INTEGER NOT NULL DEFAULT 0
);
"#,
    // Migration 5: per-turn entity links + extracted artifacts
    r#"
CREATE TABLE IF NOT EXISTS agent_turn_entities (
    id          INTEGER PRIMARY KEY,
    turn_id     TEXT NOT NULL REFERENCES agent_turns(id) ON DELETE CASCADE,
    entity_type TEXT NOT NULL CHECK (entity_type IN ('project','person')),
    entity_id   TEXT NOT NULL,
    entity_name TEXT NOT NULL,
    confidence  REAL NOT NULL DEFAULT 0
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_turn_entities_turn ON agent_turn_entities(turn_id);"#,
    r#"
CREATE TABLE IF NOT EXISTS agent_turn_artifacts (
    id                INTEGER PRIMARY KEY,
    turn_id           TEXT NOT NULL REFERENCES agent_turns(id) ON DELETE CASCADE,
    artifact_type     TEXT NOT NULL
                      CHECK (artifact_type IN ('file_read','file_write','file_edit','command','error','tool_call')),
    artifact_value    TEXT NOT NULL,
    artifact_metadata TEXT NOT NULL DEFAULT '{}'
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_turn_artifacts_turn ON agent_turn_artifacts(turn_id);"#,
    // Migration 6: installed-skill records for dedup tracking
    r#"
CREATE TABLE IF NOT EXISTS generated_skills (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    source             TEXT NOT NULL DEFAULT 'manual' CHECK (source IN ('auto','manual','registry')),
    source_session_id  TEXT,
    installed_path     TEXT,
    scope              TEXT NOT NULL DEFAULT 'personal' CHECK (scope IN ('personal','project')),
    quality_score      REAL,
    skill_content_hash TEXT,
    is_active          INTEGER NOT NULL DEFAULT 1,
    created_at         INTEGER NOT NULL
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_generated_skills_hash ON generated_skills(skill_content_hash);"#,
    // Migration 7: read-only domain tables (owned by the wider system)
    r#"
CREATE TABLE IF NOT EXISTS projects (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    status      TEXT NOT NULL DEFAULT 'active',
    description TEXT
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS people (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    email        TEXT,
    organization TEXT,
    relationship TEXT
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS tasks (
    id         TEXT PRIMARY KEY,
    project_id TEXT,
    title      TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'backlog',
    priority   TEXT NOT NULL DEFAULT 'normal',
    due_date   TEXT
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS commitments (
    id          TEXT PRIMARY KEY,
    person_id   TEXT,
    project_id  TEXT,
    direction   TEXT NOT NULL,
    description TEXT NOT NULL,
    deadline    TEXT,
    status      TEXT NOT NULL DEFAULT 'open'
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS sprints (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    project_id TEXT,
    starts_at  INTEGER,
    ends_at    INTEGER,
    is_active  INTEGER NOT NULL DEFAULT 1
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_commitments_status ON commitments(status);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sprints_active ON sprints(is_active) WHERE is_active = 1;"#,
];
