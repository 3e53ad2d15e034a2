//! SQL DDL for the history table.
//!
//! Defines `history` (one row per analysis record) with secondary indexes on
//! timestamp, context type, and prompt name, plus a `schema_meta` table. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// Version of the table layout and of the persisted table image.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY,
    text TEXT NOT NULL,
    explanation TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    timestamp_display TEXT NOT NULL,
    prompt_name TEXT,
    source_info TEXT,
    page_url TEXT,
    page_title TEXT,
    context_type TEXT NOT NULL DEFAULT 'text' CHECK(context_type IN ('text','page','image')),
    image_data TEXT
);

CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_history_context_type ON history(context_type);
CREATE INDEX IF NOT EXISTS idx_history_prompt_name ON history(prompt_name);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}
