use std::io::Write;
use std::path::Path;

use crate::db::{export_json, open_store, HistoryEntry};
use crate::Config;

use super::{account::current_user, write, HistoryCommand};

pub fn handle_history_command(config: &Config, cmd: HistoryCommand) -> anyhow::Result<()> {
    let owner = current_user(config)?;
    let mut store = open_store(config)?;

    match cmd {
        HistoryCommand::List { starred } => {
            let entries = store.list(owner.as_deref())?;
            print_entries(&mut std::io::stdout(), &entries, starred)
        }
        HistoryCommand::Star { id } => {
            let starred = store.toggle_bookmark(id, owner.as_deref())?;
            println!("{} #{}", if starred { "Starred" } else { "Unstarred" }, id);
            Ok(())
        }
        HistoryCommand::Export { path } => {
            let entries = store.list(owner.as_deref())?;
            export(&entries, &path)
        }
    }
}

pub fn print_entries<W: Write>(out: &mut W, entries: &[HistoryEntry], starred_only: bool) -> anyhow::Result<()> {
    let shown: Vec<&HistoryEntry> = entries
        .iter()
        .filter(|entry| !starred_only || entry.bookmarked)
        .collect();
    if shown.is_empty() {
        writeln!(out, "No history yet.")?;
        return Ok(());
    }
    for entry in shown {
        let star = if entry.bookmarked { "★" } else { "☆" };
        write!(out, "{} #{} [{}]", star, entry.id, entry.created_at.format("%Y-%m-%d %H:%M"))?;
        if let Some(document) = &entry.document_name {
            write!(out, " {}", document)?;
        }
        writeln!(out)?;
        writeln!(out, "Q: {}", entry.question)?;
        writeln!(out, "A: {}\n", entry.answer)?;
    }
    Ok(())
}

/// Writes Excel when the path ends in `.xlsx`, JSON otherwise.
pub fn export(entries: &[HistoryEntry], path: &Path) -> anyhow::Result<()> {
    let is_xlsx = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        write::export_to_excel(entries, path)?;
    } else {
        std::fs::write(path, export_json(entries)?)?;
    }
    log::info!("Exported {} entries to {}", entries.len(), path.display());
    println!("Exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::db::{HistoryStore, MemoryHistory, NewEntry};

    use super::*;

    fn entries() -> anyhow::Result<Vec<HistoryEntry>> {
        let mut store = MemoryHistory::default();
        for question in ["first", "second"] {
            store.append(NewEntry {
                owner: None,
                question: question.to_string(),
                answer: format!("answer to {}", question),
                document_name: Some("doc.txt".to_string()),
            })?;
        }
        store.toggle_bookmark(1, None)?;
        store.list(None)
    }

    #[test]
    fn test_print_starred_only() -> anyhow::Result<()> {
        let mut out = Vec::new();
        print_entries(&mut out, &entries()?, true)?;
        let text = String::from_utf8(out)?;
        assert!(text.contains("Q: first"));
        assert!(!text.contains("Q: second"));
        assert!(text.starts_with("★ #1"));
        Ok(())
    }

    #[test]
    fn test_print_empty() -> anyhow::Result<()> {
        let mut out = Vec::new();
        print_entries(&mut out, &[], false)?;
        assert_eq!(String::from_utf8(out)?, "No history yet.\n");
        Ok(())
    }

    #[test]
    fn test_export_json_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.json");
        let entries = entries()?;
        export(&entries, &path)?;
        let exported: Vec<HistoryEntry> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(exported.len(), 2);
        assert!(entries.iter().all(|e| exported.contains(e)));
        Ok(())
    }

    #[test]
    fn test_export_xlsx_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.XLSX");
        export(&entries()?, &path)?;
        let text = crate::document::xlsx::extract(&std::fs::read(&path)?)?;
        assert!(text.contains("first"));
        assert!(text.contains("answer to second"));
        Ok(())
    }
}
