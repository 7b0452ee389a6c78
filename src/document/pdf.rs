use anyhow::{Context, Result};

/// Page texts concatenated in page order. Pages without text contribute "".
pub fn extract(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .context("Failed to parse PDF")?;
    log::debug!("PDF has {} pages", pages.len());
    Ok(pages.concat())
}
