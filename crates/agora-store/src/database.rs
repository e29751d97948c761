//! Snapshot persistence.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. Each in-memory table is
//! stored as a single JSON document keyed by the table name.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening snapshot database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Open a throwaway database that lives as long as the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Replace the stored snapshot for `table`.
    pub fn save_snapshot(&self, table: &str, rows_json: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO table_snapshots (name, rows, saved_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET rows = excluded.rows, saved_at = excluded.saved_at",
            params![table, rows_json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fetch the stored snapshot for `table`, if one was ever saved.
    pub fn load_snapshot(&self, table: &str) -> Result<Option<String>> {
        let rows = self
            .conn
            .query_row(
                "SELECT rows FROM table_snapshots WHERE name = ?1",
                params![table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rows)
    }
}
