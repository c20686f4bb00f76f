//! File storage backends.
//!
//! Provides the storage trait and the local filesystem implementation that
//! backs the public upload directories.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// File storage backend trait.
///
/// URIs are `local://<dir>/<name>` paths relative to the storage root.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write data to storage at the given URI, replacing any existing file.
    ///
    /// Readers observe either the previous file or the complete new one,
    /// never a partially written file.
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()>;

    /// Check if a file exists.
    async fn exists(&self, uri: &str) -> Result<bool>;

    /// Create a directory under the storage root (idempotent, recursive).
    async fn ensure_dir(&self, dir: &str) -> Result<()>;

    /// Get the public URL for a file.
    fn public_url(&self, uri: &str) -> String;
}

/// Local filesystem storage.
pub struct LocalFileStorage {
    /// Base path for file storage.
    base_path: PathBuf,
    /// Base URL for public file access.
    base_url: String,
}

impl LocalFileStorage {
    /// Create a new local file storage.
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Root directory on disk.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Parse a local:// URI to get the on-disk path.
    ///
    /// Rejects paths containing `..` components to prevent directory traversal.
    fn parse_uri(&self, uri: &str) -> Result<PathBuf> {
        let path = uri
            .strip_prefix("local://")
            .context("invalid local URI, must start with local://")?;
        for component in Path::new(path).components() {
            if !matches!(component, Component::Normal(_)) {
                anyhow::bail!("directory traversal not allowed in storage URI");
            }
        }
        Ok(self.base_path.join(path))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path = self.parse_uri(uri)?;
        let parent = path
            .parent()
            .context("storage path has no parent directory")?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("storage path has no file name")?;

        // Create parent directories if needed
        fs::create_dir_all(parent)
            .await
            .context("failed to create directories")?;

        // Stage next to the target so the rename stays on one filesystem
        let staging = parent.join(format!(
            ".{file_name}.{}.part",
            uuid::Uuid::now_v7().simple()
        ));

        if let Err(e) = write_staged(&staging, data).await {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                warn!(path = ?staging, error = %cleanup, "failed to remove staging file");
            }
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &path).await {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                warn!(path = ?staging, error = %cleanup, "failed to remove staging file");
            }
            return Err(e).context("failed to move file into place");
        }

        debug!(uri = %uri, path = ?path, size = data.len(), "file written");
        Ok(())
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        let path = self.parse_uri(uri)?;
        fs::try_exists(&path)
            .await
            .context("failed to check file existence")
    }

    async fn ensure_dir(&self, dir: &str) -> Result<()> {
        let path = self.parse_uri(&format!("local://{dir}"))?;
        fs::create_dir_all(&path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))
    }

    fn public_url(&self, uri: &str) -> String {
        let path = uri.strip_prefix("local://").unwrap_or(uri);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

async fn write_staged(staging: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::File::create(staging)
        .await
        .context("failed to create file")?;
    file.write_all(data).await.context("failed to write file")?;
    file.flush().await.context("failed to flush file")?;
    file.sync_all().await.context("failed to sync file")?;
    Ok(())
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}
