use std::io::Cursor;
use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line per row, cells joined by a single space, sheets in workbook order.
///
/// Rows and columns count from A1, so a sheet whose first value sits in B2
/// still starts with an empty line and a blank first cell.
pub fn extract(bytes: &[u8]) -> Result<String> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .context("Failed to open workbook")?;

    let mut text = String::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)
            .with_context(|| format!("Failed to read worksheet {}", name))?;
        let Some((first_row, first_col)) = range.start() else {
            continue;
        };
        for _ in 0..first_row {
            text.push('\n');
        }
        for row in range.rows() {
            let cells: Vec<String> = std::iter::repeat(String::new())
                .take(first_col as usize)
                .chain(row.iter().map(cell_text))
                .collect();
            text.push_str(&cells.join(" "));
            text.push('\n');
        }
    }
    Ok(text)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(value) => value
            .as_datetime()
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}
