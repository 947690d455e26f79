use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;
    async fn exists(&self, path: &str) -> Result<bool>;
}

// --- Native Implementation ---

pub struct NativeStorage;

impl NativeStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for NativeStorage {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path))
    }

    // Writes go through a sibling temp file and a rename so a crash or an
    // aborted task never leaves a half-written file at the final path.
    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = format!("{}.tmp", path);
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move {} into place", tmp))?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parents_and_roundtrips() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("nested/dir/file.json");
        let path_str = path.to_str().unwrap();

        let storage = NativeStorage::new();
        assert!(!storage.exists(path_str).await?);

        storage.write(path_str, b"{\"a\":1}").await?;
        assert!(storage.exists(path_str).await?);
        assert_eq!(storage.read(path_str).await?, b"{\"a\":1}");

        Ok(())
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_temp_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("file.json");
        let path_str = path.to_str().unwrap();

        let storage = NativeStorage::new();
        storage.write(path_str, b"first").await?;
        storage.write(path_str, b"second").await?;
        assert_eq!(storage.read(path_str).await?, b"second");

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())?
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1, "temp file should not linger: {:?}", entries);

        Ok(())
    }
}
