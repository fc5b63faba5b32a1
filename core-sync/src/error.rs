use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Please setup your Jade {field}")]
    NotConfigured { field: &'static str },

    #[error("Unauthorized: the remote rejected the access token")]
    Unauthorized,

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote call {operation} failed: {message}")]
    Remote { operation: String, message: String },

    #[error("Remote rejected {path} (HTTP {status}): {message}")]
    Rejected {
        path: String,
        status: u16,
        message: String,
    },

    #[error("File {path} no longer exists in the vault")]
    MissingFile { path: String },

    #[error("Rebuild failed: {0}")]
    CommitFailed(String),

    #[error("A publish cycle is already in progress")]
    CycleInProgress,

    #[error("Publish cycle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid path status: {0}")]
    InvalidStatus(String),

    #[error("Invalid session ID: {0}")]
    InvalidSessionId(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl SyncError {
    /// Errors that stop a whole cycle rather than a single entry.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::NotConfigured { .. }
                | SyncError::Unauthorized
                | SyncError::RemoteUnavailable(_)
                | SyncError::CommitFailed(_)
                | SyncError::Timeout(_)
                | SyncError::CycleInProgress
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
