//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (vault access, HTTP,
//! settings storage, editor focus) into the change tracker and the publish
//! pipeline. Desktop hosts enable the `desktop-shims` feature so
//! [`CoreConfig`] can fall back to the `bridge-desktop` adapters; other hosts
//! inject their own.

pub mod error;
pub mod publisher;

pub use error::{CoreError, Result};
pub use publisher::{Publisher, PublisherBuilder};

pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_sync::{FileEvent, PublishReport, RemoteSettings, SyncConfig};

/// Alias kept for hosts that address the façade generically.
pub type CoreService = Publisher;

/// Build a [`Publisher`] for a vault on the local filesystem.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let publisher = core_service::bootstrap_desktop("/path/to/vault").await?;
/// publisher.mark_ready();
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(vault_root: impl Into<std::path::PathBuf>) -> Result<Publisher> {
    let config = CoreConfig::builder().vault_root(vault_root).build()?;
    Publisher::bootstrap(config).await
}
