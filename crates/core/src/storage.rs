//! Blob store contract and the local-directory implementation.
//!
//! Blobs are addressed by hierarchical string keys (`infer/<uid>.wav`). The
//! store hands out local paths: `put` returns a path the caller writes to and
//! then [`finalize`](BlobStore::finalize)s, `get` returns a path to read.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Local path to write the blob for `key` to. Parent directories exist
    /// when this returns.
    async fn put(&self, key: &str) -> Result<PathBuf, BlobError>;

    /// Signal that the blob written at the path from [`put`](Self::put) is
    /// complete.
    async fn finalize(&self, key: &str) -> Result<(), BlobError>;

    /// Local path of an existing blob.
    async fn get(&self, key: &str) -> Result<PathBuf, BlobError>;
}

/// Blob store backed by a directory tree; a key maps to `root/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` under the root, refusing absolute keys and `..`.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let rel = Path::new(key);
        let valid = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str) -> Result<PathBuf, BlobError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }

    async fn finalize(&self, key: &str) -> Result<(), BlobError> {
        // Files written under the root are visible immediately.
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(())
        } else {
            Err(BlobError::NotFound(key.to_string()))
        }
    }

    async fn get(&self, key: &str) -> Result<PathBuf, BlobError> {
        let path = self.resolve(key)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(BlobError::NotFound(key.to_string()))
        }
    }
}
