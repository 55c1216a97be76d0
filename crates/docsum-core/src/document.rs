//! Plain-text document loading
//!
//! Format-specific extraction (PDF, office formats, markup) is left to
//! external tools; this loader accepts UTF-8 text only.

use crate::errors::DocsumError;
use std::path::Path;
use tokio::fs;

const UTF8_BOM: char = '\u{feff}';

/// Reads a UTF-8 text document, normalising line endings to `\n`.
pub async fn load<P: AsRef<Path>>(path: P) -> Result<String, DocsumError> {
    let path = path.as_ref();

    let bytes = fs::read(path).await.map_err(|e| {
        DocsumError::DocumentError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let text = String::from_utf8(bytes).map_err(|e| {
        DocsumError::DocumentError(format!(
            "{} is not valid UTF-8 text (invalid byte at offset {})",
            path.display(),
            e.utf8_error().valid_up_to()
        ))
    })?;

    log::debug!("Loaded {} ({} bytes)", path.display(), text.len());
    Ok(normalize(&text))
}

fn normalize(text: &str) -> String {
    text.strip_prefix(UTF8_BOM)
        .unwrap_or(text)
        .replace("\r\n", "\n")
}
