//! # Host Bridge Traits
//!
//! Host abstraction traits that each embedding application must implement.
//!
//! ## Overview
//!
//! This crate defines the contract between the publishing core and the host
//! that owns the document vault. Each trait is a capability the core requires
//! but that lives outside of it: the network transport, the file collection,
//! the persisted key-value store and the editor's notion of an active file.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and multipart forms
//!
//! ### Vault & Storage
//! - [`VaultAccess`](vault::VaultAccess) - Enumerate, stat and read files in the vault
//! - [`SettingsStore`](storage::SettingsStore) - Key-value persistence for plugin state
//!
//! ### Host Integration
//! - [`ActiveFileProvider`](vault::ActiveFileProvider) - Which file the editor currently has open
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is missing:
//!
//! ```ignore
//! let vault = config.vault
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "VaultAccess".to_string(),
//!         message: "No vault implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. A
//! missing vault file is reported as [`BridgeError::NotFound`] so callers can
//! tell a raced delete apart from a real I/O failure.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! concurrently dispatched sync tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;
pub mod vault;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{
    FilePart, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy,
};
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use vault::{ActiveFileProvider, VaultAccess, VaultFile};
