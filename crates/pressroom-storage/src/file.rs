//! Local file storage for uploaded media

use async_trait::async_trait;
use pressroom_common::config::StorageConfig;
use pressroom_common::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// File storage trait
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store bytes under a relative key and return the key
    async fn store(&self, key: &str, data: &[u8]) -> Result<String>;
}

/// Local filesystem storage rooted at `storage.path`
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        Self::from_path(&config.path)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .map_err(|e| Error::Storage(format!("Failed to create storage directory: {}", e)))?;

        info!(path = %path.display(), "Initialized local file storage");

        Ok(Self {
            base_path: path.to_path_buf(),
        })
    }

    /// Resolve a key below the base path. Only plain relative components
    /// are accepted.
    fn full_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty() || key.contains('\\') {
            return Err(Error::Storage(format!("Invalid storage key: {:?}", key)));
        }

        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::ParentDir => {
                    return Err(Error::Storage(
                        "Path traversal detected: '..' is not allowed".to_string(),
                    ))
                }
                _ => {
                    return Err(Error::Storage(
                        "Absolute paths are not allowed".to_string(),
                    ))
                }
            }
        }

        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn store(&self, key: &str, data: &[u8]) -> Result<String> {
        let full_path = self.full_path(key)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create file: {}", e)))?;

        file.write_all(data)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| Error::Storage(format!("Failed to write file: {}", e)))?;

        debug!(key = %key, size = data.len(), "Stored file");

        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::from_path(temp_dir.path()).unwrap();

        let data = b"\x89PNG fake";
        let key = storage.store("images/a_1.png", data).await.unwrap();
        assert_eq!(key, "images/a_1.png");

        let written = std::fs::read(temp_dir.path().join("images/a_1.png")).unwrap();
        assert_eq!(written, data);
    }

    #[tokio::test]
    async fn test_path_traversal_prevention() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::from_path(temp_dir.path()).unwrap();

        assert!(storage.store("../../../etc/passwd", b"evil").await.is_err());
        assert!(storage.store("images/../../secret", b"evil").await.is_err());
        assert!(storage.store("/etc/passwd", b"evil").await.is_err());
        assert!(storage.store("", b"empty").await.is_err());

        assert!(storage.store("images/ok.jpg", b"ok").await.is_ok());
    }
}
