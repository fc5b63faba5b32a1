//! Remote endpoint settings.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of the sync API below the configured endpoint.
pub const SYNC_API_PATH: &str = "/api/sync";

/// User-editable connection settings.
///
/// Snapshotted at the start of every cycle; edits made while a cycle is in
/// flight are rejected by the publisher.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    pub endpoint: String,
    pub access_token: String,
}

impl RemoteSettings {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        }
    }

    /// Fail locally, before any network call, when something is missing.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(SyncError::NotConfigured { field: "endpoint" });
        }
        if self.access_token.trim().is_empty() {
            return Err(SyncError::NotConfigured {
                field: "access token",
            });
        }
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// `<endpoint>/api/sync`, without a doubled slash.
    pub fn base_url(&self) -> String {
        format!("{}{}", self.endpoint.trim().trim_end_matches('/'), SYNC_API_PATH)
    }
}

impl fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("RemoteSettings")
            .field("endpoint", &self.endpoint)
            .field("access_token", &token)
            .finish()
    }
}
