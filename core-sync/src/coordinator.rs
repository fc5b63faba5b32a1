//! # Sync Coordinator
//!
//! Runs one publish cycle against a [`RemoteStore`].
//!
//! ## Workflow
//!
//! 1. Probe the remote, bounded by `health_timeout`; unauthorized,
//!    unavailable or a stalled probe aborts before any file work.
//! 2. Full sync only: flush remote staging state.
//! 3. Resolve every entry concurrently. Each one reads and hashes the file,
//!    goes through the session's content ledger, and ends as
//!    [`EntryOutcome::Synced`], [`EntryOutcome::Skipped`] or
//!    [`EntryOutcome::Failed`], emitting its event as soon as it settles.
//!    One entry never fails the batch.
//! 4. Build the manifest from synced entries only.
//! 5. Commit through [`RebuildProtocol`]: merge for incremental cycles,
//!    replace-all for full syncs.
//!
//! The coordinator never touches the tracker. The caller drains it, passes
//! the entries in, and decides what to restore from the returned report or
//! error.

use crate::hash::ContentHasher;
use crate::manifest::{format_last_modified, Manifest, ManifestEntry};
use crate::rebuild::RebuildProtocol;
use crate::remote::{ContentMetadata, HealthStatus, RemoteStore, SyncRequest};
use crate::report::{EntryOutcome, PublishReport};
use crate::session::{SyncMode, SyncSession};
use crate::settings::RemoteSettings;
use crate::status::PathStatus;
use crate::tracker::PendingChangeSet;
use crate::{Result, SyncError};
use bridge_traits::time::Clock;
use bridge_traits::vault::{VaultAccess, VaultFile};
use bytes::Bytes;
use core_runtime::events::{AbortReason, CoreEvent, EventBus, PublishEvent};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// What happens to entries whose sync call failed in a cycle that committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailedEntryPolicy {
    /// Put them back into the pending set for the next publish.
    #[default]
    Retain,
    /// Forget them.
    Drop,
}

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Budget for the pre-flight health probe
    pub health_timeout: Duration,

    /// Budget for a whole cycle; `None` waits indefinitely
    pub cycle_timeout: Option<Duration>,

    /// Call `flush` before a full sync
    pub flush_before_full_sync: bool,

    pub failed_entry_policy: FailedEntryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            health_timeout: Duration::from_millis(500),
            cycle_timeout: None,
            flush_before_full_sync: true,
            failed_entry_policy: FailedEntryPolicy::Retain,
        }
    }
}

/// Sync coordinator for publish cycles
pub struct SyncCoordinator {
    config: SyncConfig,
    vault: Arc<dyn VaultAccess>,
    hasher: Arc<dyn ContentHasher>,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        vault: Arc<dyn VaultAccess>,
        hasher: Arc<dyn ContentHasher>,
        event_bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            vault,
            hasher,
            event_bus,
            clock,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Publish a drained pending set, merging into the remote index.
    ///
    /// An empty set returns an uncommitted report without touching the
    /// network.
    pub async fn run_incremental(
        &self,
        remote: Arc<dyn RemoteStore>,
        settings: RemoteSettings,
        pending: PendingChangeSet,
    ) -> Result<PublishReport> {
        let session = SyncSession::new(SyncMode::Incremental, settings, pending, self.clock.now());
        if session.entries().is_empty() {
            debug!("No pending changes, nothing to publish");
            return Ok(PublishReport::empty(session.id(), SyncMode::Incremental));
        }
        self.run(remote, session).await
    }

    /// Publish every file in the vault and replace the remote index.
    pub async fn run_full(
        &self,
        remote: Arc<dyn RemoteStore>,
        settings: RemoteSettings,
    ) -> Result<PublishReport> {
        let listing = self.full_listing().await?;
        let session = SyncSession::new(SyncMode::Full, settings, listing, self.clock.now());
        self.run(remote, session).await
    }

    /// Every vault file, marked as created.
    pub async fn full_listing(&self) -> Result<PendingChangeSet> {
        let files = self.vault.list_files().await?;
        Ok(files
            .into_iter()
            .map(|file| (file.path, PathStatus::Created))
            .collect())
    }

    async fn run(&self, remote: Arc<dyn RemoteStore>, session: SyncSession) -> Result<PublishReport> {
        let Some(budget) = self.config.cycle_timeout else {
            return self.execute(remote, &session).await;
        };

        match tokio::time::timeout(budget, self.execute(remote, &session)).await {
            Ok(result) => result,
            Err(_) => {
                error!(session_id = %session.id(), ?budget, "Publish cycle timed out");
                let err = SyncError::Timeout(budget);
                self.abort(AbortReason::Timeout, &err);
                Err(err)
            }
        }
    }

    #[instrument(skip_all, fields(session_id = %session.id(), mode = %session.mode(), entries = session.entries().len()))]
    async fn execute(
        &self,
        remote: Arc<dyn RemoteStore>,
        session: &SyncSession,
    ) -> Result<PublishReport> {
        let started = Instant::now();
        let session_id = session.id().to_string();

        match self.probe(remote.as_ref()).await {
            HealthStatus::Healthy => debug!("Remote healthy"),
            HealthStatus::Unauthorized => {
                let err = SyncError::Unauthorized;
                self.abort(AbortReason::Unauthorized, &err);
                return Err(err);
            }
            HealthStatus::Unavailable(message) => {
                let err = SyncError::RemoteUnavailable(message);
                self.abort(AbortReason::Unavailable, &err);
                return Err(err);
            }
        }

        if session.mode().is_full() && self.config.flush_before_full_sync {
            if let Err(err) = remote.flush().await {
                let reason = match err {
                    SyncError::Unauthorized => AbortReason::Unauthorized,
                    _ => AbortReason::FlushFailed,
                };
                self.abort(reason, &err);
                return Err(err);
            }
            debug!("Remote staging flushed");
        }

        info!("Publishing entries");
        self.emit(PublishEvent::Started {
            session_id: session_id.clone(),
            full: session.mode().is_full(),
            entries: session.entries().len(),
        });

        let entries = session.entries().sorted();
        let store = remote.as_ref();
        let id = session_id.as_str();
        let outcomes = join_all(entries.into_iter().map(|(path, status)| async move {
            let outcome = self.sync_entry(store, session, path, status).await;
            self.emit_outcome(id, &outcome);
            outcome
        }))
        .await;

        let mut manifest = Manifest::new();
        for outcome in &outcomes {
            if let EntryOutcome::Synced { entry, .. } = outcome {
                manifest.push(entry.clone());
            }
        }
        manifest.sort();

        let commit_mode = session.mode().commit_mode();
        self.emit(PublishEvent::Rebuilding {
            session_id: session_id.clone(),
            files: manifest.len(),
            clear_others: commit_mode.clear_others(),
        });

        if let Err(err) = RebuildProtocol::new(remote)
            .commit(&manifest, commit_mode)
            .await
        {
            let reason = match err {
                SyncError::Unauthorized => AbortReason::Unauthorized,
                _ => AbortReason::CommitFailed,
            };
            self.abort(reason, &err);
            return Err(err);
        }

        let report = PublishReport {
            session_id: session.id(),
            mode: session.mode(),
            outcomes,
            manifest,
            committed: true,
            duration: started.elapsed(),
        };

        info!(
            synced = report.synced_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            uploaded = report.uploaded_count(),
            "Publish completed"
        );
        self.emit(PublishEvent::Completed {
            session_id,
            synced: report.synced_count(),
            skipped: report.skipped_count(),
            failed: report.failed_count(),
            uploaded: report.uploaded_count(),
            duration_ms: report.duration.as_millis() as u64,
        });

        Ok(report)
    }

    /// Health probe bounded by `health_timeout`, whatever the store does with
    /// the budget it is handed.
    async fn probe(&self, remote: &dyn RemoteStore) -> HealthStatus {
        let budget = self.config.health_timeout;
        match tokio::time::timeout(budget, remote.check_health(budget)).await {
            Ok(status) => status,
            Err(_) => {
                warn!(?budget, "Health probe timed out");
                HealthStatus::Unavailable(format!("health check timed out after {:?}", budget))
            }
        }
    }

    /// Resolve one entry. Never returns an error; failures are tagged.
    async fn sync_entry(
        &self,
        remote: &dyn RemoteStore,
        session: &SyncSession,
        path: String,
        status: PathStatus,
    ) -> EntryOutcome {
        if !status.requires_content() {
            return match remote.sync_file(SyncRequest::deletion(path.clone())).await {
                Ok(()) => EntryOutcome::Synced {
                    entry: ManifestEntry::deleted(path),
                    status,
                    uploaded: false,
                },
                Err(e) => failed(path, status, e),
            };
        }

        let (file, content) = match self.read_content(&path).await {
            Ok(Some(found)) => found,
            Ok(None) => {
                warn!(path = %path, "File disappeared before it could be published");
                return EntryOutcome::Skipped {
                    reason: SyncError::MissingFile { path: path.clone() }.to_string(),
                    path,
                    status,
                };
            }
            Err(e) => return failed(path, status, e),
        };

        let content_hash = self.hasher.hash(&content);
        let metadata = ContentMetadata {
            content_hash: content_hash.clone(),
            extension: file.extension.clone(),
            last_modified: format_last_modified(file.modified_at),
        };
        let request = SyncRequest::with_metadata(path.clone(), status.clone(), metadata.clone())
            .with_content(content);

        match session
            .ledger()
            .publish(remote, &content_hash, request)
            .await
        {
            Ok(outcome) => EntryOutcome::Synced {
                entry: ManifestEntry::present(
                    path,
                    metadata.content_hash,
                    metadata.extension,
                    metadata.last_modified,
                ),
                status,
                uploaded: outcome.uploaded,
            },
            Err(e) => failed(path, status, e),
        }
    }

    /// Stat and read a file; `None` when it no longer exists.
    async fn read_content(
        &self,
        path: &str,
    ) -> Result<Option<(VaultFile, Bytes)>> {
        let Some(file) = self.vault.stat(path).await? else {
            return Ok(None);
        };
        match self.vault.read_binary(path).await {
            Ok(content) => Ok(Some((file, content))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn emit_outcome(&self, session_id: &str, outcome: &EntryOutcome) {
        let event = match outcome {
            EntryOutcome::Synced {
                entry,
                status,
                uploaded,
            } => PublishEvent::FileSynced {
                session_id: session_id.to_string(),
                path: entry.path.clone(),
                status: status.as_tag().to_string(),
                uploaded: *uploaded,
            },
            EntryOutcome::Skipped { path, reason, .. } => PublishEvent::FileSkipped {
                session_id: session_id.to_string(),
                path: path.clone(),
                reason: reason.clone(),
            },
            EntryOutcome::Failed { path, error, .. } => PublishEvent::FileFailed {
                session_id: session_id.to_string(),
                path: path.clone(),
                message: error.clone(),
            },
        };
        self.emit(event);
    }

    fn abort(&self, reason: AbortReason, err: &SyncError) {
        warn!(?reason, error = %err, "Publish aborted");
        self.emit(PublishEvent::Aborted {
            reason,
            message: err.to_string(),
        });
    }

    fn emit(&self, event: PublishEvent) {
        // No subscribers is fine.
        let _ = self.event_bus.emit(CoreEvent::Publish(event));
    }
}

fn failed(path: String, status: PathStatus, error: SyncError) -> EntryOutcome {
    warn!(path = %path, error = %error, "Entry failed to sync");
    EntryOutcome::Failed {
        path,
        status,
        error: error.to_string(),
    }
}
