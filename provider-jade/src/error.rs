//! Error types for the Jade provider

use core_sync::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JadeError {
    /// 401 from any endpoint
    #[error("Access token rejected")]
    Unauthorized,

    /// Any other non-2xx answer
    #[error("Jade API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Body did not match the expected envelope
    #[error("Failed to parse Jade response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Jade operations
pub type Result<T> = std::result::Result<T, JadeError>;

impl JadeError {
    /// Attach the remote operation name on the way into the sync layer.
    pub fn into_sync_error(self, operation: &str) -> SyncError {
        match self {
            JadeError::Unauthorized => SyncError::Unauthorized,
            JadeError::ApiError {
                status_code,
                message,
            } => SyncError::Remote {
                operation: operation.to_string(),
                message: format!("HTTP {}: {}", status_code, message),
            },
            JadeError::ParseError(message) => SyncError::Remote {
                operation: operation.to_string(),
                message,
            },
            JadeError::BridgeError(e) => SyncError::Bridge(e),
        }
    }
}

impl From<JadeError> for SyncError {
    fn from(error: JadeError) -> Self {
        error.into_sync_error("jade")
    }
}
