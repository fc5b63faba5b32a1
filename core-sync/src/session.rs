//! # Sync Sessions
//!
//! A session is one publish cycle: an id, the mode, the settings snapshot
//! taken at start, and the entries drained from the tracker. The session
//! also owns the content ledger that keeps concurrent entries with equal
//! content from uploading the same bytes twice.

use crate::rebuild::CommitMode;
use crate::remote::{RemoteStore, SyncRequest};
use crate::settings::RemoteSettings;
use crate::tracker::PendingChangeSet;
use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// Session ID
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidSessionId(e.to_string()))?,
        ))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Mode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Publish the drained pending set, merging into the remote index.
    Incremental,
    /// Publish every vault file and replace the remote index.
    Full,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Incremental => "incremental",
            SyncMode::Full => "full",
        }
    }

    pub fn commit_mode(&self) -> CommitMode {
        match self {
            SyncMode::Incremental => CommitMode::Merge,
            SyncMode::Full => CommitMode::ReplaceAll,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SyncMode::Full)
    }
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "incremental" => Ok(SyncMode::Incremental),
            "full" => Ok(SyncMode::Full),
            other => Err(SyncError::Persistence(format!("unknown sync mode: {other}"))),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Content Ledger
// ============================================================================

/// What the ledger learned about a hash during this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// The remote already had it before this session touched it.
    AlreadyStored,
    /// Uploaded by this session.
    Uploaded,
}

/// Result of pushing one entry through the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// This entry's sync call carried the bytes.
    pub uploaded: bool,
}

/// Per-session map from content hash to a single-initialisation cell.
///
/// The first entry to claim a hash checks existence and, when needed,
/// uploads; every other entry with that hash waits on the cell and then sends
/// its own sync call without the body. A failed initialisation leaves the
/// cell empty so the next waiter retries.
#[derive(Default)]
pub struct ContentLedger {
    cells: Mutex<HashMap<String, Arc<OnceCell<Presence>>>>,
}

impl ContentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    async fn cell(&self, content_hash: &str) -> Arc<OnceCell<Presence>> {
        let mut cells = self.cells.lock().await;
        cells
            .entry(content_hash.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Number of distinct hashes claimed so far.
    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    /// Send `request` (which must carry metadata and content), uploading the
    /// body at most once per hash per session.
    pub async fn publish(
        &self,
        remote: &dyn RemoteStore,
        content_hash: &str,
        request: SyncRequest,
    ) -> Result<LedgerOutcome> {
        let cell = self.cell(content_hash).await;
        let mut claimed = false;

        let presence = *cell
            .get_or_try_init(|| {
                claimed = true;
                let request = request.clone();
                async move {
                    if remote.exists(content_hash).await? {
                        return Ok::<_, SyncError>(Presence::AlreadyStored);
                    }
                    remote.sync_file(request).await?;
                    Ok(Presence::Uploaded)
                }
            })
            .await?;

        if claimed && presence == Presence::Uploaded {
            return Ok(LedgerOutcome { uploaded: true });
        }

        debug!(path = %request.path, hash = %content_hash, "Content already stored, sending metadata only");
        let SyncRequest {
            path,
            status,
            metadata,
            ..
        } = request;
        remote
            .sync_file(SyncRequest {
                path,
                status,
                metadata,
                content: None,
            })
            .await?;
        Ok(LedgerOutcome { uploaded: false })
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct SyncSession {
    id: SessionId,
    mode: SyncMode,
    settings: RemoteSettings,
    entries: PendingChangeSet,
    started_at: DateTime<Utc>,
    ledger: ContentLedger,
}

impl SyncSession {
    pub fn new(
        mode: SyncMode,
        settings: RemoteSettings,
        entries: PendingChangeSet,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            mode,
            settings,
            entries,
            started_at,
            ledger: ContentLedger::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    pub fn entries(&self) -> &PendingChangeSet {
        &self.entries
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ledger(&self) -> &ContentLedger {
        &self.ledger
    }

    /// Hand the entries back, e.g. to restore them after an abort.
    pub fn into_entries(self) -> PendingChangeSet {
        self.entries
    }
}

impl fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("settings", &self.settings)
            .field("entries", &self.entries.len())
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::remote::{ContentMetadata, HealthStatus};
    use crate::status::PathStatus;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingRemote {
        stored: StdMutex<HashSet<String>>,
        exists_calls: AtomicUsize,
        fail_next_upload: StdMutex<bool>,
        requests: StdMutex<Vec<SyncRequest>>,
    }

    #[async_trait]
    impl RemoteStore for CountingRemote {
        async fn check_health(&self, _timeout: Duration) -> HealthStatus {
            HealthStatus::Healthy
        }

        async fn exists(&self, content_hash: &str) -> Result<bool> {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(self.stored.lock().unwrap().contains(content_hash))
        }

        async fn sync_file(&self, request: SyncRequest) -> Result<()> {
            tokio::task::yield_now().await;
            if request.content.is_some() {
                let mut fail = self.fail_next_upload.lock().unwrap();
                if *fail {
                    *fail = false;
                    return Err(SyncError::Remote {
                        operation: "sync".into(),
                        message: "boom".into(),
                    });
                }
                let hash = request.metadata.as_ref().unwrap().content_hash.clone();
                self.stored.lock().unwrap().insert(hash);
            }
            self.requests.lock().unwrap().push(request);
            Ok(())
        }

        async fn flush(&self) -> Result<()> {
            Ok(())
        }

        async fn rebuild(&self, _manifest: &Manifest, _clear_others: bool) -> Result<()> {
            Ok(())
        }
    }

    fn request(path: &str, hash: &str) -> SyncRequest {
        SyncRequest::with_metadata(
            path,
            PathStatus::Created,
            ContentMetadata {
                content_hash: hash.to_string(),
                extension: "md".to_string(),
                last_modified: String::new(),
            },
        )
        .with_content(Bytes::from_static(b"same"))
    }

    #[test]
    fn test_session_id_roundtrip() {
        let id = SessionId::new();
        assert_eq!(SessionId::from_string(&id.as_str()).unwrap(), id);
        assert!(matches!(
            SessionId::from_string("nope"),
            Err(SyncError::InvalidSessionId(_))
        ));
    }

    #[test]
    fn test_mode_commit_mapping() {
        assert_eq!(SyncMode::Incremental.commit_mode(), CommitMode::Merge);
        assert_eq!(SyncMode::Full.commit_mode(), CommitMode::ReplaceAll);
        assert_eq!("full".parse::<SyncMode>().unwrap(), SyncMode::Full);
    }

    #[tokio::test]
    async fn test_concurrent_equal_content_uploads_once() {
        let remote = CountingRemote::default();
        let ledger = ContentLedger::new();

        let outcomes = futures::future::join_all(
            ["a.md", "b.md", "c.md"]
                .iter()
                .map(|path| ledger.publish(&remote, "h1", request(path, "h1"))),
        )
        .await;

        let uploads = outcomes
            .iter()
            .filter(|o| o.as_ref().unwrap().uploaded)
            .count();
        assert_eq!(uploads, 1);
        assert_eq!(remote.exists_calls.load(Ordering::SeqCst), 1);

        let requests = remote.requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests.iter().filter(|r| r.carries_content()).count(), 1);
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_already_stored_content_is_not_uploaded() {
        let remote = CountingRemote::default();
        remote.stored.lock().unwrap().insert("h1".to_string());
        let ledger = ContentLedger::new();

        let outcome = ledger
            .publish(&remote, "h1", request("a.md", "h1"))
            .await
            .unwrap();

        assert!(!outcome.uploaded);
        let requests = remote.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].carries_content());
    }

    #[tokio::test]
    async fn test_failed_upload_lets_next_entry_retry() {
        let remote = CountingRemote::default();
        *remote.fail_next_upload.lock().unwrap() = true;
        let ledger = ContentLedger::new();

        let first = ledger.publish(&remote, "h1", request("a.md", "h1")).await;
        assert!(first.is_err());

        let second = ledger
            .publish(&remote, "h1", request("b.md", "h1"))
            .await
            .unwrap();
        assert!(second.uploaded);
        assert_eq!(remote.exists_calls.load(Ordering::SeqCst), 2);
    }
}
