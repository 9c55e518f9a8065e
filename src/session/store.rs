use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::TaxopsError;

/// Persists the bearer credential between runs.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, TaxopsError>;
    async fn save(&self, token: &str) -> Result<(), TaxopsError>;
    async fn clear(&self) -> Result<(), TaxopsError>;
}

/// Token kept in a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, TaxopsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim();
                Ok(if token.is_empty() { None } else { Some(token.to_string()) })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, token: &str) -> Result<(), TaxopsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, token).await?;
        debug!(path = %self.path.display(), "Token persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<(), TaxopsError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Token removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, used for demo sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(Some(token.into())) }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, TaxopsError> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &str) -> Result<(), TaxopsError> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), TaxopsError> {
        *self.token.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("token"));
        assert!(store.load().await.unwrap().is_none());

        store.save("tok-123").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("tok-123"));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        // Clearing twice is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_blank_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        tokio::fs::write(&path, "  \n").await.unwrap();
        assert!(FileTokenStore::new(path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryTokenStore::with_token("abc");
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc"));
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
