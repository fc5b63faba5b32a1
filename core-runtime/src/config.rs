//! # Core Configuration Module
//!
//! Provides configuration management for the publisher core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every host capability the core needs. It enforces fail-fast
//! validation so a missing bridge is reported at startup instead of halfway
//! through a publish cycle.
//!
//! ## Required Dependencies
//!
//! - `VaultAccess` - The document collection being published
//!
//! ## Optional Dependencies (with desktop defaults)
//!
//! - `HttpClient` - Transport for the remote store (desktop default: reqwest)
//! - `SettingsStore` - Persisted settings and pending changes (desktop default: JSON file)
//! - `ActiveFileProvider` - Editor focus signal used to gate modify events
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, `vault_root` can be given
//! instead of a `VaultAccess`, and the transport and settings store are
//! created automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .vault_root("/home/me/notes")
//!     .state_path("/home/me/notes/.obsidian/plugins/jade/data.json")
//!     .build()?;
//! ```
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .vault(Arc::new(MyVault))
//!     .http_client(Arc::new(MyHttpClient))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .active_file(Arc::new(MyEditor))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{ActiveFileProvider, Clock, HttpClient, SettingsStore, SystemClock, VaultAccess};
use std::path::PathBuf;
use std::sync::Arc;

/// Settings key under which the publisher persists its state.
pub const DEFAULT_STATE_KEY: &str = "publisher.state";

/// Core configuration for the publisher.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Document collection being published (required)
    pub vault: Arc<dyn VaultAccess>,

    /// Transport used by the remote store connector
    pub http_client: Arc<dyn HttpClient>,

    /// Persistence for settings and pending changes
    pub settings_store: Arc<dyn SettingsStore>,

    /// Editor focus signal (optional)
    pub active_file: Option<Arc<dyn ActiveFileProvider>>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Key used inside the settings store
    pub state_key: String,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("vault", &"VaultAccess { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "active_file",
                &self
                    .active_file
                    .as_ref()
                    .map(|_| "ActiveFileProvider { ... }"),
            )
            .field("state_key", &self.state_key)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control how host events are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Ignore create events until the host reports its layout is ready.
    ///
    /// Hosts replay a create event for every file while the vault loads.
    pub gate_creates_until_ready: bool,

    /// Track modifications of files that are not open in the editor.
    pub track_background_modifications: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            gate_creates_until_ready: true,
            track_background_modifications: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.state_key.trim().is_empty() {
            return Err(Error::Config("State key cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > 65_536 {
            return Err(Error::Config(
                "Event buffer size exceeds maximum of 65,536".to_string(),
            ));
        }

        Ok(())
    }
}

fn vault_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "VaultAccess".to_string(),
        message: "A VaultAccess implementation is required to read the documents being published. \
                 Desktop: enable the 'desktop-shims' feature and set .vault_root(). \
                 Other hosts: inject an adapter over the host's vault API with .vault()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_vault(root: Option<PathBuf>) -> Result<Arc<dyn VaultAccess>> {
    use bridge_desktop::TokioVault;

    let root = root.ok_or_else(vault_missing_error)?;
    if root.as_os_str().is_empty() {
        return Err(Error::Config("Vault root cannot be empty".to_string()));
    }
    let vault: Arc<dyn VaultAccess> = Arc::new(TokioVault::new(root));
    Ok(vault)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_vault(_root: Option<PathBuf>) -> Result<Arc<dyn VaultAccess>> {
    Err(vault_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to initialize default HttpClient: {}", e)))?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use ReqwestHttpClient. \
                 Other hosts: inject the host's request API with .http_client()."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(state_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonSettingsStore;

    let path = state_path.unwrap_or_else(JsonSettingsStore::default_path);
    let store: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::new(path));
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_state_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to persist settings and pending changes. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use JsonSettingsStore. \
                 Other hosts: inject the host's load/save data API with .settings_store()."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    vault: Option<Arc<dyn VaultAccess>>,
    vault_root: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    state_path: Option<PathBuf>,
    active_file: Option<Arc<dyn ActiveFileProvider>>,
    clock: Option<Arc<dyn Clock>>,
    state_key: Option<String>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the vault implementation.
    pub fn vault(mut self, vault: Arc<dyn VaultAccess>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Sets the vault root directory, used with the `desktop-shims` feature
    /// when no [`vault`](Self::vault) is injected.
    pub fn vault_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.vault_root = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the settings store implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets where the default JSON settings store keeps its document.
    ///
    /// Ignored when a [`settings_store`](Self::settings_store) is injected.
    pub fn state_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_path = Some(path.into());
        self
    }

    /// Sets the active-file provider.
    ///
    /// Without one, every modify event is tracked.
    pub fn active_file(mut self, provider: Arc<dyn ActiveFileProvider>) -> Self {
        self.active_file = Some(provider);
        self
    }

    /// Sets the clock. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the settings key used for persisted state.
    ///
    /// Default: `publisher.state`
    pub fn state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = Some(key.into());
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables create gating until layout ready.
    ///
    /// Default: true
    pub fn gate_creates_until_ready(mut self, enabled: bool) -> Self {
        self.features.gate_creates_until_ready = enabled;
        self
    }

    /// Enables or disables tracking of modifications to unfocused files.
    ///
    /// Default: false
    pub fn track_background_modifications(mut self, enabled: bool) -> Self {
        self.features.track_background_modifications = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a required bridge has neither an
    ///   injected implementation nor a desktop default
    /// - [`Error::Config`] when a value is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let vault = match self.vault {
            Some(vault) => vault,
            None => provide_default_vault(self.vault_root)?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.state_path)?,
        };

        let config = CoreConfig {
            vault,
            http_client,
            settings_store,
            active_file: self.active_file,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            state_key: self
                .state_key
                .unwrap_or_else(|| DEFAULT_STATE_KEY.to_string()),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse, VaultFile};
    use bytes::Bytes;

    struct MockVault;

    #[async_trait]
    impl VaultAccess for MockVault {
        async fn list_files(&self) -> BridgeResult<Vec<VaultFile>> {
            Ok(Vec::new())
        }

        async fn stat(&self, _path: &str) -> BridgeResult<Option<VaultFile>> {
            Ok(None)
        }

        async fn read_binary(&self, path: &str) -> BridgeResult<Bytes> {
            Err(bridge_traits::BridgeError::NotFound(path.to_string()))
        }
    }

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct FixedEditor(&'static str);

    impl ActiveFileProvider for FixedEditor {
        fn active_file(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn full_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .vault(Arc::new(MockVault))
            .http_client(Arc::new(MockHttpClient))
            .settings_store(Arc::new(MockSettingsStore))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = full_builder()
            .active_file(Arc::new(FixedEditor("a.md")))
            .state_key("jade")
            .event_buffer_size(32)
            .build()
            .unwrap();

        assert_eq!(config.state_key, "jade");
        assert_eq!(config.event_buffer_size, 32);
        assert_eq!(
            config.active_file.as_ref().and_then(|p| p.active_file()),
            Some("a.md".to_string())
        );
    }

    #[test]
    fn test_defaults() {
        let config = full_builder().build().unwrap();

        assert_eq!(config.state_key, DEFAULT_STATE_KEY);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.features.gate_creates_until_ready);
        assert!(!config.features.track_background_modifications);
        assert!(config.active_file.is_none());
    }

    #[test]
    fn test_feature_flags() {
        let config = full_builder()
            .gate_creates_until_ready(false)
            .track_background_modifications(true)
            .build()
            .unwrap();

        assert!(!config.features.gate_creates_until_ready);
        assert!(config.features.track_background_modifications);
    }

    #[test]
    fn test_validation_rejects_empty_state_key() {
        let err = full_builder().state_key("  ").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation_rejects_bad_buffer_size() {
        assert!(matches!(
            full_builder().event_buffer_size(0).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            full_builder().event_buffer_size(100_000).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_vault_is_capability_error() {
        let err = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .settings_store(Arc::new(MockSettingsStore))
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "VaultAccess"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_without_shims() {
        let err = CoreConfig::builder()
            .vault(Arc::new(MockVault))
            .settings_store(Arc::new(MockSettingsStore))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_from_paths() {
        let dir = std::env::temp_dir().join(format!("core-runtime-test-{}", uuid::Uuid::new_v4()));

        let config = CoreConfig::builder()
            .vault_root(&dir)
            .state_path(dir.join("data.json"))
            .build()
            .unwrap();

        let debug = format!("{:?}", config);
        assert!(debug.contains("VaultAccess"));
        assert!(debug.contains("publisher.state"));
    }
}
