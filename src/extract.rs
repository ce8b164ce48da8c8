//! File text extraction
//!
//! Plain-text formats are read directly. Binary document formats are the
//! job of an external extractor plugged in through `TextExtractor`.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Extensions read as text (compared case-insensitively)
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("Failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns a document file into plain text
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Reads plain-text and markdown files
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub fn supports(path: &Path) -> bool {
        extension_of(path)
            .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let extension = extension_of(path).unwrap_or_default();
        if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ExtractError::UnsupportedFormat { extension });
        }

        let bytes = std::fs::read(path).map_err(|source| ExtractError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read {} byte(s) from {}", bytes.len(), path.display());

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
