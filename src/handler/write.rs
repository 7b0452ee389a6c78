use rust_xlsxwriter::{Workbook, Format, FormatAlign};
use crate::db::HistoryEntry;
use std::path::Path;

/// Excel refuses longer cell strings.
const MAX_CELL_CHARS: usize = 32_767;

fn cell_text<'a>(text: &'a str, id: i64, column: &str) -> &'a str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => {
            log::warn!("Entry {} {} truncated to {} characters for Excel", id, column, MAX_CELL_CHARS);
            &text[..end]
        }
        None => text,
    }
}

pub fn export_to_excel(entries: &[HistoryEntry], path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();

    let worksheet = workbook.add_worksheet();

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center);

    let headers = ["ID", "Question", "Answer", "Document", "Starred", "Created"];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0u32, col as u16, *header, &header_format)?;
    }

    let mut ordered: Vec<&HistoryEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.id);

    for (i, entry) in ordered.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, entry.id as f64)?;
        worksheet.write_string(row, 1, cell_text(&entry.question, entry.id, "question"))?;
        worksheet.write_string(row, 2, cell_text(&entry.answer, entry.id, "answer"))?;
        worksheet.write_string(row, 3, entry.document_name.as_deref().unwrap_or(""))?;
        worksheet.write_boolean(row, 4, entry.bookmarked)?;
        worksheet.write_string(row, 5, &entry.created_at.to_rfc3339())?;
    }

    worksheet.autofit();

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_cell_text_limit() {
        let long = "é".repeat(MAX_CELL_CHARS + 10);
        assert_eq!(cell_text(&long, 1, "answer").chars().count(), MAX_CELL_CHARS);
        assert_eq!(cell_text("short", 1, "answer"), "short");
    }

    #[test]
    fn test_long_answer_does_not_abort_export() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("history.xlsx");
        let entry = HistoryEntry {
            id: 1,
            owner: None,
            question: "summarise".to_string(),
            answer: "a".repeat(40_000),
            document_name: None,
            bookmarked: false,
            created_at: Utc::now(),
        };
        export_to_excel(&[entry], &path)?;

        let text = crate::document::xlsx::extract(&std::fs::read(&path)?)?;
        assert!(text.contains(&"a".repeat(MAX_CELL_CHARS)));
        assert!(!text.contains(&"a".repeat(MAX_CELL_CHARS + 1)));
        Ok(())
    }
}
