//! # State Repository
//!
//! Persists the connection settings and the pending change set between runs.
//!
//! The document is stored as one JSON string under a single settings key:
//!
//! ```json
//! {
//!   "endpoint": "https://jade.example.com",
//!   "accessToken": "...",
//!   "modifiedFiles": { "notes/a.md": "created", "b.md": "renamed:old/b.md" }
//! }
//! ```

use crate::settings::RemoteSettings;
use crate::status::PathStatus;
use crate::tracker::PendingChangeSet;
use crate::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::storage::SettingsStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub modified_files: BTreeMap<String, String>,
}

impl PersistedState {
    pub fn new(settings: &RemoteSettings, pending: &PendingChangeSet) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            access_token: settings.access_token.clone(),
            modified_files: pending
                .iter()
                .map(|(path, status)| (path.clone(), status.encode()))
                .collect(),
        }
    }

    pub fn settings(&self) -> RemoteSettings {
        RemoteSettings::new(self.endpoint.clone(), self.access_token.clone())
    }

    /// Decode the pending set. Entries with an unreadable status are dropped
    /// with a warning.
    pub fn pending(&self) -> PendingChangeSet {
        self.modified_files
            .iter()
            .filter_map(|(path, raw)| match raw.parse::<PathStatus>() {
                Ok(status) => Some((path.clone(), status)),
                Err(e) => {
                    warn!(path = %path, status = %raw, error = %e, "Skipping unreadable pending entry");
                    None
                }
            })
            .collect()
    }
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Load the saved state, or the empty state when nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the document is not valid JSON
    async fn load(&self) -> Result<PersistedState>;

    /// Replace the saved state.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails
    async fn save(&self, state: &PersistedState) -> Result<()>;
}

// ============================================================================
// Settings-store implementation
// ============================================================================

pub struct SettingsStateRepository {
    store: Arc<dyn SettingsStore>,
    key: String,
}

impl SettingsStateRepository {
    pub fn new(store: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl StateRepository for SettingsStateRepository {
    async fn load(&self) -> Result<PersistedState> {
        let Some(raw) = self.store.get_string(&self.key).await? else {
            debug!(key = %self.key, "No saved state");
            return Ok(PersistedState::default());
        };
        serde_json::from_str(&raw).map_err(|e| SyncError::Persistence(e.to_string()))
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        let raw =
            serde_json::to_string(state).map_err(|e| SyncError::Persistence(e.to_string()))?;
        self.store.set_string(&self.key, &raw).await?;
        Ok(())
    }
}
