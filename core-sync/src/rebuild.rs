//! # Rebuild Protocol
//!
//! The commit step of a cycle: one call that makes the remote index reflect
//! the manifest. An incremental cycle merges; a full sync replaces.

use crate::manifest::Manifest;
use crate::remote::RemoteStore;
use crate::{Result, SyncError};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Upsert the listed paths, leave the rest alone.
    Merge,
    /// Drop every remote path not in the manifest.
    ReplaceAll,
}

impl CommitMode {
    pub fn clear_others(&self) -> bool {
        matches!(self, CommitMode::ReplaceAll)
    }
}

pub struct RebuildProtocol {
    remote: Arc<dyn RemoteStore>,
}

impl RebuildProtocol {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Submit `manifest`. A rejected credential surfaces as
    /// [`SyncError::Unauthorized`]; every other failure becomes
    /// [`SyncError::CommitFailed`].
    #[instrument(skip(self, manifest), fields(files = manifest.len()))]
    pub async fn commit(&self, manifest: &Manifest, mode: CommitMode) -> Result<()> {
        let clear_others = mode.clear_others();
        match self.remote.rebuild(manifest, clear_others).await {
            Ok(()) => {
                info!(clear_others, "Remote index rebuilt");
                Ok(())
            }
            Err(SyncError::Unauthorized) => Err(SyncError::Unauthorized),
            Err(SyncError::CommitFailed(message)) => Err(SyncError::CommitFailed(message)),
            Err(e) => {
                warn!(error = %e, "Rebuild call failed");
                Err(SyncError::CommitFailed(e.to_string()))
            }
        }
    }
}
