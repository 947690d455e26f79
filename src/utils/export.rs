use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const WORD_EXPORT_EXTENSION: &str = "doc";

/// File-system-safe name for an exported manuscript. Separators and other
/// characters that upset common filesystems become underscores.
pub fn export_file_name(title: &str, extension: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim();
    let base = if trimmed.is_empty() { "untitled" } else { trimmed };
    format!("{}.{}", base, extension)
}

/// Writes the manuscript bytes untouched to `<dir>/<title>.doc` and returns
/// the path. Word processors open plain text under this extension.
pub async fn export_word(dir: &Path, title: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create export folder {:?}", dir))?;
    let path = dir.join(export_file_name(title, WORD_EXPORT_EXTENSION));
    fs::write(&path, content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
