use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryHistory;
pub use sqlite::SqliteHistory;

use crate::Config;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub owner: Option<String>,
    pub question: String,
    pub answer: String,
    pub document_name: Option<String>,
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
}

/// The fields supplied when an answer is recorded.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub owner: Option<String>,
    pub question: String,
    pub answer: String,
    pub document_name: Option<String>,
}

pub trait HistoryStore {
    /// Records an answer; new entries start unbookmarked.
    fn append(&mut self, entry: NewEntry) -> anyhow::Result<HistoryEntry>;

    /// Entries visible to `owner`, most recent first. `None` sees every entry.
    fn list(&self, owner: Option<&str>) -> anyhow::Result<Vec<HistoryEntry>>;

    /// Flips the bookmark flag of entry `id` and returns the new value.
    fn toggle_bookmark(&mut self, id: i64, owner: Option<&str>) -> anyhow::Result<bool>;
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    Memory,
    Sqlite,
}

pub fn open_store(config: &Config) -> anyhow::Result<Box<dyn HistoryStore>> {
    Ok(match config.history_backend {
        HistoryBackend::Memory => Box::new(MemoryHistory::default()),
        HistoryBackend::Sqlite => Box::new(SqliteHistory::open(&config.history_db)?),
    })
}

/// JSON array of `entries` in the order they were recorded.
pub fn export_json(entries: &[HistoryEntry]) -> anyhow::Result<String> {
    let mut ordered: Vec<&HistoryEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.id);
    Ok(serde_json::to_string_pretty(&ordered)?)
}
