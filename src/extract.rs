//! Plain-text extraction for the file formats the loader accepts.
//!
//! `.txt` and `.md` files are decoded as UTF-8 (invalid sequences replaced),
//! `.pdf` files go through `pdf-extract`. Extraction never panics; a failure
//! is returned so the loader can log it and skip the file.

use std::path::Path;

/// Format of a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" => Some(FileKind::Text),
            "pdf" => Some(FileKind::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFile(String),
    Io(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFile(name) => write!(f, "unsupported file type: {}", name),
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Read `path` and return its text.
pub fn extract_file(path: &Path) -> Result<String, ExtractError> {
    let kind = FileKind::from_path(path)
        .ok_or_else(|| ExtractError::UnsupportedFile(path.display().to_string()))?;
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Io(e.to_string()))?;
    extract_text(&bytes, kind)
}

/// Extract text from in-memory bytes of a known kind.
pub fn extract_text(bytes: &[u8], kind: FileKind) -> Result<String, ExtractError> {
    match kind {
        FileKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        FileKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
    }
}
