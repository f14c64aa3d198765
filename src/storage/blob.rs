//! Binary storage for uploaded files. Documents keep only the key; bytes live here.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous content.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Remove the blob. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    async fn download(&self, key: &str) -> Result<Vec<u8>>;

    /// Whether a blob is stored under `key`. Fails when the store cannot be reached.
    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Blobs stored as files below a root directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty() || relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(anyhow!("Invalid blob key: {}", key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", key))?;
        debug!(key, "blob uploaded");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "blob removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Failed to remove blob {}", key)),
        }
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob {}", key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to stat blob {}", key))
    }
}

/// In-memory store used by tests. Keys registered with [`MemoryBlobStore::fail_on`]
/// make every operation on them fail.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_on(&self, key: impl Into<String>) {
        self.failing.write().await.insert(key.into());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }

    async fn check(&self, key: &str) -> Result<()> {
        if self.failing.read().await.contains(key) {
            return Err(anyhow!("Blob store unavailable for {}", key));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.check(key).await?;
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check(key).await?;
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        self.check(key).await?;
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("Blob not found: {}", key))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check(key).await?;
        Ok(self.contains(key).await)
    }
}
