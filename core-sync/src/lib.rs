//! # Change Tracking & Publish Cycles
//!
//! Tracks vault mutations and publishes them to a content-addressed remote
//! store.
//!
//! ## Components
//!
//! - **Path status** (`status`): net status of one path since the last publish
//! - **Change tracker** (`tracker`): folds file events into a pending set
//! - **Content hashing** (`hash`): MD5 fingerprints used for dedup
//! - **Remote boundary** (`remote`): what a cycle needs from the store
//! - **Sessions** (`session`): one cycle's snapshot and content ledger
//! - **Sync coordinator** (`coordinator`): health probe, per-entry sync, commit
//! - **Rebuild protocol** (`rebuild`): merge or replace the remote index
//! - **Persistence** (`persistence`): settings and pending set across runs

pub mod coordinator;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod persistence;
pub mod rebuild;
pub mod remote;
pub mod report;
pub mod session;
pub mod settings;
pub mod status;
pub mod tracker;

pub use coordinator::{FailedEntryPolicy, SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use hash::{ContentHasher, Md5Hasher};
pub use manifest::{format_last_modified, Manifest, ManifestEntry, LAST_MODIFIED_FORMAT};
pub use persistence::{PersistedState, SettingsStateRepository, StateRepository};
pub use rebuild::{CommitMode, RebuildProtocol};
pub use remote::{
    ContentMetadata, HealthStatus, RemoteStore, RemoteStoreFactory, SyncRequest,
};
pub use report::{EntryOutcome, PublishReport};
pub use session::{ContentLedger, LedgerOutcome, SessionId, SyncMode, SyncSession};
pub use settings::{RemoteSettings, SYNC_API_PATH};
pub use status::PathStatus;
pub use tracker::{ChangeTracker, FileEvent, PendingChangeSet, Transition};
