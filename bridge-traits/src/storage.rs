//! Settings Storage Abstraction
//!
//! Key-value persistence used for the publisher's settings and its pending
//! change set across process restarts.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts host-specific persistence:
/// - Desktop: a JSON document next to the plugin (`data.json`)
/// - Embedded hosts: whatever load/save primitive the host exposes
///
/// Values are opaque strings; callers serialize structured state themselves.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_endpoint(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("endpoint", "https://jade.example.com").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}
