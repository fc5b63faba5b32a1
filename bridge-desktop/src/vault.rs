//! Vault Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    vault::{VaultAccess, VaultFile},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Directory-backed vault
///
/// Exposes every regular file below `root` with a `/`-separated,
/// root-relative path. Hidden entries (names starting with `.`, such as the
/// editor's configuration folder) are skipped unless `include_hidden` is set.
pub struct TokioVault {
    root: PathBuf,
    include_hidden: bool,
}

impl TokioVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_hidden: false,
        }
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a vault path, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || path.is_empty() {
            return Err(BridgeError::OperationFailed(format!(
                "Invalid vault path: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn to_vault_path(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn is_hidden(name: &str) -> bool {
        name.starts_with('.')
    }

    fn map_io_error(path: &str, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(path.to_string())
        } else {
            BridgeError::Io(e)
        }
    }
}

fn modified_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl VaultAccess for TokioVault {
    async fn list_files(&self) -> Result<Vec<VaultFile>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(BridgeError::Io)?;

            while let Some(entry) = entries.next_entry().await.map_err(BridgeError::Io)? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !self.include_hidden && Self::is_hidden(&name) {
                    continue;
                }

                let file_type = entry.file_type().await.map_err(BridgeError::Io)?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if !file_type.is_file() {
                    continue;
                }

                let Some(path) = self.to_vault_path(&entry.path()) else {
                    warn!(entry = ?entry.path(), "Skipping entry outside vault root");
                    continue;
                };

                match entry.metadata().await {
                    Ok(metadata) => {
                        files.push(VaultFile::new(path, modified_time(&metadata), metadata.len()))
                    }
                    // Deleted between read_dir and stat
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(BridgeError::Io(e)),
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = ?self.root, count = files.len(), "Listed vault files");
        Ok(files)
    }

    async fn stat(&self, path: &str) -> Result<Option<VaultFile>> {
        let absolute = self.resolve(path)?;
        match fs::metadata(&absolute).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(VaultFile::new(
                path,
                modified_time(&metadata),
                metadata.len(),
            ))),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn read_binary(&self, path: &str) -> Result<Bytes> {
        let absolute = self.resolve(path)?;
        let data = fs::read(&absolute)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        Ok(Bytes::from(data))
    }
}
