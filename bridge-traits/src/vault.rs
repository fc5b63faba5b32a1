//! Vault Abstractions
//!
//! The vault is the local collection of documents being published. Paths are
//! always vault-relative and use `/` as separator.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Metadata for a single file in the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    /// Vault-relative path, e.g. `notes/daily/2024-01-01.md`
    pub path: String,
    /// Extension without the leading dot, empty when the file has none
    pub extension: String,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

impl VaultFile {
    pub fn new(path: impl Into<String>, modified_at: DateTime<Utc>, size: u64) -> Self {
        let path = path.into();
        let extension = extension_of(&path).to_string();
        Self {
            path,
            extension,
            modified_at,
            size,
        }
    }
}

/// Extension of a vault path, without the dot.
///
/// Dotfiles such as `.gitignore` have no extension.
pub fn extension_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx + 1..],
    }
}

/// Read access to the document vault.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::vault::VaultAccess;
///
/// async fn total_size(vault: &dyn VaultAccess) -> Result<u64> {
///     Ok(vault.list_files().await?.iter().map(|f| f.size).sum())
/// }
/// ```
#[async_trait]
pub trait VaultAccess: Send + Sync {
    /// Enumerate every file in the vault.
    async fn list_files(&self) -> Result<Vec<VaultFile>>;

    /// Metadata for a single path, `None` if it does not exist.
    async fn stat(&self, path: &str) -> Result<Option<VaultFile>>;

    /// Read the full contents of a file.
    ///
    /// Returns [`BridgeError::NotFound`](crate::BridgeError::NotFound) when the
    /// file has gone away.
    async fn read_binary(&self, path: &str) -> Result<Bytes>;
}

/// Reports which file the host editor currently has focused.
pub trait ActiveFileProvider: Send + Sync {
    fn active_file(&self) -> Option<String>;
}
