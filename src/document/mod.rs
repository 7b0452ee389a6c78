pub mod pdf;
pub mod docx;
pub mod xlsx;
pub mod pptx;

use std::path::Path;
use anyhow::{Context, Result};

/// Extensions accepted as uploads.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx", "xlsx", "pptx"];

/// A document handed in by the user: its file name and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self::new(name, bytes))
    }

    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Extracts plain text from `bytes` according to `extension`.
///
/// `Ok(None)` means the format is not supported. Parser failures on a
/// supported format are returned as errors.
pub fn extract_text(bytes: &[u8], extension: &str) -> Result<Option<String>> {
    let content = match extension.to_lowercase().as_str() {
        "txt" | "md" => String::from_utf8(bytes.to_vec())
            .context("Text file is not valid UTF-8")?,
        "pdf" => pdf::extract(bytes)?,
        "docx" => docx::extract(bytes)?,
        "xlsx" => xlsx::extract(bytes)?,
        "pptx" => pptx::extract(bytes)?,
        other => {
            log::warn!("Unsupported document type: {:?}", other);
            return Ok(None);
        }
    };
    log::debug!("Extracted {} characters from .{} document", content.chars().count(), extension);
    Ok(Some(content))
}

/// Extracts text from an upload, treating unsupported or blank results alike.
pub fn extract_upload(upload: &Upload) -> Result<Option<String>> {
    Ok(extract_text(&upload.bytes, &upload.extension())?
        .filter(|text| !text.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_verbatim() -> anyhow::Result<()> {
        assert_eq!(extract_text(b"hello", "txt")?, Some("hello".to_string()));
        assert_eq!(extract_text("# 見出し\n本文".as_bytes(), "md")?, Some("# 見出し\n本文".to_string()));
        Ok(())
    }

    #[test]
    fn test_extension_is_case_insensitive() -> anyhow::Result<()> {
        assert_eq!(extract_text(b"hello", "TXT")?, Some("hello".to_string()));
        Ok(())
    }

    #[test]
    fn test_unsupported_extension() -> anyhow::Result<()> {
        assert_eq!(extract_text(b"binary", "exe")?, None);
        assert_eq!(extract_text(b"hello", "")?, None);
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_text_is_error() {
        assert!(extract_text(&[0xff, 0xfe, 0x00], "txt").is_err());
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(Upload::new("Report.PDF", vec![]).extension(), "pdf");
        assert_eq!(Upload::new("notes", vec![]).extension(), "");
        assert_eq!(Upload::new("archive.tar.gz", vec![]).extension(), "gz");
    }

    #[test]
    fn test_blank_upload_is_treated_as_failure() -> anyhow::Result<()> {
        assert_eq!(extract_upload(&Upload::new("blank.txt", b"  \n\t".to_vec()))?, None);
        assert_eq!(extract_upload(&Upload::new("image.png", vec![1, 2, 3]))?, None);
        assert_eq!(
            extract_upload(&Upload::new("a.md", b"text".to_vec()))?,
            Some("text".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_upload_from_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello")?;
        let upload = Upload::from_path(&path)?;
        assert_eq!(upload.name, "notes.txt");
        assert_eq!(upload.bytes, b"hello");
        Ok(())
    }
}
