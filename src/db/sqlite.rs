use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{HistoryEntry, HistoryStore, NewEntry};

const COLUMNS: &str = "id, username, question, answer, document_name, bookmarked, created_at";

/// History persisted in a single SQLite file.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Cannot open history database {}", path.display()))?;
        log::debug!("Opened history database {}", path.display());
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> anyhow::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT,
                question      TEXT NOT NULL,
                answer        TEXT NOT NULL,
                document_name TEXT,
                bookmarked    INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            )",
            (),
        )?;
        Ok(Self { conn })
    }

    fn from_row(row: &Row) -> rusqlite::Result<HistoryEntry> {
        Ok(HistoryEntry {
            id: row.get("id")?,
            owner: row.get("username")?,
            question: row.get("question")?,
            answer: row.get("answer")?,
            document_name: row.get("document_name")?,
            bookmarked: row.get("bookmarked")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl HistoryStore for SqliteHistory {
    fn append(&mut self, entry: NewEntry) -> anyhow::Result<HistoryEntry> {
        let sql = format!(
            "INSERT INTO history (username, question, answer, document_name, bookmarked, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5) RETURNING {}",
            COLUMNS
        );
        let saved = self.conn.query_row(
            &sql,
            params![entry.owner, entry.question, entry.answer, entry.document_name, Utc::now()],
            Self::from_row,
        )?;
        Ok(saved)
    }

    fn list(&self, owner: Option<&str>) -> anyhow::Result<Vec<HistoryEntry>> {
        let sql = format!(
            "SELECT {} FROM history WHERE ?1 IS NULL OR username = ?1 ORDER BY id DESC",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], Self::from_row)?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn toggle_bookmark(&mut self, id: i64, owner: Option<&str>) -> anyhow::Result<bool> {
        self.conn
            .query_row(
                "UPDATE history SET bookmarked = NOT bookmarked
                 WHERE id = ?1 AND (?2 IS NULL OR username = ?2)
                 RETURNING bookmarked",
                params![id, owner],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow::anyhow!("No history entry with id {}", id))
    }
}
