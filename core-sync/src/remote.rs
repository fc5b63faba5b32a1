//! # Remote Store Boundary
//!
//! The operations a publish cycle needs from the content store. The HTTP
//! implementation lives in `provider-jade`; tests substitute fakes.

use crate::manifest::Manifest;
use crate::settings::RemoteSettings;
use crate::status::PathStatus;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of the pre-flight probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// The store answered but rejected the credential.
    Unauthorized,
    /// Unreachable, timed out, or answered "not ready".
    Unavailable(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Metadata sent alongside every non-deleted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
    pub content_hash: String,
    pub extension: String,
    pub last_modified: String,
}

/// One per-path sync call.
///
/// `content` carries the file body only when this call is the one that
/// stores the bytes; dedup hits and deletions leave it empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub path: String,
    pub status: PathStatus,
    pub metadata: Option<ContentMetadata>,
    pub content: Option<Bytes>,
}

impl SyncRequest {
    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: PathStatus::Deleted,
            metadata: None,
            content: None,
        }
    }

    pub fn with_metadata(
        path: impl Into<String>,
        status: PathStatus,
        metadata: ContentMetadata,
    ) -> Self {
        Self {
            path: path.into(),
            status,
            metadata: Some(metadata),
            content: None,
        }
    }

    pub fn with_content(mut self, content: Bytes) -> Self {
        self.content = Some(content);
        self
    }

    pub fn carries_content(&self) -> bool {
        self.content.is_some()
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Probe liveness and credential validity. Never errors; failures are
    /// folded into [`HealthStatus`].
    async fn check_health(&self, timeout: Duration) -> HealthStatus;

    /// Whether content with this hash is already stored.
    async fn exists(&self, content_hash: &str) -> Result<bool>;

    /// Report one path's status, uploading the body when present.
    async fn sync_file(&self, request: SyncRequest) -> Result<()>;

    /// Clear remote staging state before a full sync.
    async fn flush(&self) -> Result<()>;

    /// Submit the manifest. `clear_others` drops every remote path not in it.
    async fn rebuild(&self, manifest: &Manifest, clear_others: bool) -> Result<()>;
}

/// Builds a store for a settings snapshot.
pub trait RemoteStoreFactory: Send + Sync {
    fn connect(&self, settings: &RemoteSettings) -> Result<Arc<dyn RemoteStore>>;
}
