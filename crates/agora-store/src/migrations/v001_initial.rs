//! v001 -- Initial schema creation.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS table_snapshots (
    name     TEXT PRIMARY KEY NOT NULL,   -- in-memory table name
    rows     TEXT NOT NULL,               -- JSON array of rows
    saved_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
