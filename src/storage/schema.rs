//! Database schema for the SQLite backends

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Pending work, in insertion order per crawl
CREATE TABLE IF NOT EXISTS queue_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id TEXT NOT NULL,
    entry TEXT NOT NULL,
    queued_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_entries_crawl ON queue_entries(crawl_id, id);

-- Dedup keys already admitted per crawl
CREATE TABLE IF NOT EXISTS history_keys (
    crawl_id TEXT NOT NULL,
    key TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    PRIMARY KEY (crawl_id, key)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
