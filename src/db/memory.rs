use chrono::Utc;

use super::{HistoryEntry, HistoryStore, NewEntry};

/// History kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, entry: NewEntry) -> anyhow::Result<HistoryEntry> {
        let entry = HistoryEntry {
            id: self.entries.len() as i64 + 1,
            owner: entry.owner,
            question: entry.question,
            answer: entry.answer,
            document_name: entry.document_name,
            bookmarked: false,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn list(&self, owner: Option<&str>) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(self.entries
            .iter()
            .rev()
            .filter(|entry| owner.is_none() || entry.owner.as_deref() == owner)
            .cloned()
            .collect())
    }

    fn toggle_bookmark(&mut self, id: i64, owner: Option<&str>) -> anyhow::Result<bool> {
        let entry = self.entries
            .iter_mut()
            .find(|entry| entry.id == id && (owner.is_none() || entry.owner.as_deref() == owner))
            .ok_or_else(|| anyhow::anyhow!("No history entry with id {}", id))?;
        entry.bookmarked = !entry.bookmarked;
        Ok(entry.bookmarked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(owner: Option<&str>, question: &str) -> NewEntry {
        NewEntry {
            owner: owner.map(str::to_string),
            question: question.to_string(),
            answer: "a".to_string(),
            document_name: None,
        }
    }

    #[test]
    fn test_most_recent_first() -> anyhow::Result<()> {
        let mut store = MemoryHistory::default();
        store.append(entry(None, "one"))?;
        store.append(entry(None, "two"))?;
        let questions: Vec<String> = store.list(None)?.into_iter().map(|e| e.question).collect();
        assert_eq!(questions, vec!["two", "one"]);
        Ok(())
    }

    #[test]
    fn test_toggle_twice_restores() -> anyhow::Result<()> {
        let mut store = MemoryHistory::default();
        let added = store.append(entry(None, "q"))?;
        assert!(!added.bookmarked);
        assert!(store.toggle_bookmark(added.id, None)?);
        assert!(!store.toggle_bookmark(added.id, None)?);
        assert!(!store.list(None)?[0].bookmarked);
        Ok(())
    }

    #[test]
    fn test_owner_scoping() -> anyhow::Result<()> {
        let mut store = MemoryHistory::default();
        let mine = store.append(entry(Some("jsmith"), "mine"))?;
        store.append(entry(Some("rbriggs"), "theirs"))?;
        let listed = store.list(Some("jsmith"))?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].question, "mine");
        assert_eq!(store.list(None)?.len(), 2);
        assert!(store.toggle_bookmark(mine.id, Some("rbriggs")).is_err());
        assert!(store.toggle_bookmark(mine.id, Some("jsmith"))?);
        Ok(())
    }

    #[test]
    fn test_unknown_id() {
        let mut store = MemoryHistory::default();
        assert!(store.toggle_bookmark(42, None).is_err());
    }
}
