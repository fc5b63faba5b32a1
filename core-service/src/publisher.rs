//! # Publisher
//!
//! Host-facing façade. The host feeds it file events and asks it to publish;
//! it owns the tracker, the settings snapshot, persistence and the event bus.
//!
//! ## Lifecycle
//!
//! ```ignore
//! let config = CoreConfig::builder().vault_root("/path/to/vault").build()?;
//! let publisher = Publisher::bootstrap(config).await?;
//!
//! publisher.mark_ready();
//! publisher.handle_event(FileEvent::create("notes/a.md")).await?;
//! let report = publisher.publish().await?;
//! ```
//!
//! Only one cycle runs at a time. Events that arrive while a cycle is in
//! flight wait for the tracker and are applied once the cycle settles.

use crate::error::Result;
use core_runtime::config::CoreConfig;
use core_runtime::events::{AbortReason, CoreEvent, EventBus, EventStream, PublishEvent};
use core_sync::{
    ChangeTracker, ContentHasher, FailedEntryPolicy, FileEvent, Md5Hasher, PendingChangeSet,
    PersistedState, PublishReport, RemoteSettings, RemoteStoreFactory, SettingsStateRepository,
    StateRepository, SyncConfig, SyncCoordinator, SyncError, SyncMode, Transition,
};
use provider_jade::JadeRemoteFactory;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Builder for [`Publisher`] with overridable collaborators.
pub struct PublisherBuilder {
    config: CoreConfig,
    sync_config: SyncConfig,
    remote_factory: Option<Arc<dyn RemoteStoreFactory>>,
    repository: Option<Arc<dyn StateRepository>>,
    hasher: Option<Arc<dyn ContentHasher>>,
}

impl PublisherBuilder {
    pub fn sync_config(mut self, sync_config: SyncConfig) -> Self {
        self.sync_config = sync_config;
        self
    }

    /// Replace the Jade connector, e.g. with a different remote backend.
    pub fn remote_factory(mut self, factory: Arc<dyn RemoteStoreFactory>) -> Self {
        self.remote_factory = Some(factory);
        self
    }

    pub fn state_repository(mut self, repository: Arc<dyn StateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Load persisted state and assemble the publisher.
    pub async fn bootstrap(self) -> Result<Publisher> {
        let config = self.config;
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let remote_factory = self.remote_factory.unwrap_or_else(|| {
            Arc::new(JadeRemoteFactory::new(config.http_client.clone()))
                as Arc<dyn RemoteStoreFactory>
        });
        let repository = self.repository.unwrap_or_else(|| {
            Arc::new(SettingsStateRepository::new(
                config.settings_store.clone(),
                config.state_key.clone(),
            )) as Arc<dyn StateRepository>
        });
        let hasher = self
            .hasher
            .unwrap_or_else(|| Arc::new(Md5Hasher) as Arc<dyn ContentHasher>);

        let state = repository.load().await?;
        let pending = state.pending();
        info!(pending = pending.len(), "Publisher state loaded");

        let coordinator = SyncCoordinator::new(
            self.sync_config.clone(),
            config.vault.clone(),
            hasher,
            event_bus.clone(),
            config.clock.clone(),
        );

        Ok(Publisher {
            inner: Arc::new(Inner {
                ready: AtomicBool::new(!config.features.gate_creates_until_ready),
                config,
                sync_config: self.sync_config,
                coordinator,
                remote_factory,
                repository,
                event_bus,
                tracker: Mutex::new(ChangeTracker::with_pending(pending)),
                settings: RwLock::new(state.settings()),
                cycle_guard: Mutex::new(()),
            }),
        })
    }
}

struct Inner {
    config: CoreConfig,
    sync_config: SyncConfig,
    coordinator: SyncCoordinator,
    remote_factory: Arc<dyn RemoteStoreFactory>,
    repository: Arc<dyn StateRepository>,
    event_bus: Arc<EventBus>,
    tracker: Mutex<ChangeTracker>,
    settings: RwLock<RemoteSettings>,
    /// Held for the duration of a cycle and while settings change.
    cycle_guard: Mutex<()>,
    ready: AtomicBool,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<Inner>,
}

impl Publisher {
    pub fn builder(config: CoreConfig) -> PublisherBuilder {
        PublisherBuilder {
            config,
            sync_config: SyncConfig::default(),
            remote_factory: None,
            repository: None,
            hasher: None,
        }
    }

    /// Build with the Jade connector and default sync options.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        Self::builder(config).bootstrap().await
    }

    // ========================================================================
    // Events in
    // ========================================================================

    /// Fold one host file event into the pending set.
    ///
    /// Creates are ignored until [`mark_ready`](Self::mark_ready) when gating
    /// is enabled. Modifications are only recorded for the active file unless
    /// background tracking is enabled or no active-file provider is set.
    #[instrument(skip(self), fields(path = %event.path()))]
    pub async fn handle_event(&self, event: FileEvent) -> Result<Transition> {
        if !self.admits(&event) {
            debug!("Event ignored");
            return Ok(Transition::default());
        }

        let mut tracker = self.inner.tracker.lock().await;
        let transition = tracker.record(&event);
        if transition.is_noop() {
            return Ok(transition);
        }

        self.save(&tracker).await?;
        drop(tracker);

        for change in transition.to_events() {
            self.emit(change);
        }
        Ok(transition)
    }

    fn admits(&self, event: &FileEvent) -> bool {
        let features = &self.inner.config.features;
        match event {
            FileEvent::Create { .. } => self.is_ready(),
            FileEvent::Modify { path } => {
                if features.track_background_modifications {
                    return true;
                }
                match &self.inner.config.active_file {
                    Some(provider) => provider.active_file().as_deref() == Some(path.as_str()),
                    None => true,
                }
            }
            FileEvent::Rename { .. } | FileEvent::Delete { .. } => true,
        }
    }

    /// The host finished loading its vault; start admitting creates.
    pub fn mark_ready(&self) {
        if !self.inner.ready.swap(true, Ordering::SeqCst) {
            info!("Vault layout ready, tracking creates");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    /// Publish pending changes and merge them into the remote index.
    pub async fn publish(&self) -> Result<PublishReport> {
        self.run_cycle(SyncMode::Incremental).await
    }

    /// Publish the whole vault and replace the remote index.
    pub async fn sync_vault(&self) -> Result<PublishReport> {
        self.run_cycle(SyncMode::Full).await
    }

    #[instrument(skip(self), fields(mode = %mode))]
    async fn run_cycle(&self, mode: SyncMode) -> Result<PublishReport> {
        let _cycle = self
            .inner
            .cycle_guard
            .try_lock()
            .map_err(|_| SyncError::CycleInProgress)?;

        let settings = self.inner.settings.read().await.clone();
        if let Err(err) = settings.validate() {
            warn!(error = %err, "Publish requested without settings");
            self.emit(CoreEvent::Publish(PublishEvent::Aborted {
                reason: AbortReason::NotConfigured,
                message: err.to_string(),
            }));
            return Err(err.into());
        }
        let remote = self.inner.remote_factory.connect(&settings)?;

        let mut tracker = self.inner.tracker.lock().await;
        let drained = tracker.drain();

        let result = match mode {
            SyncMode::Incremental => {
                self.inner
                    .coordinator
                    .run_incremental(remote, settings, drained.clone())
                    .await
            }
            SyncMode::Full => self.inner.coordinator.run_full(remote, settings).await,
        };

        match &result {
            Ok(report) if report.committed => {
                if self.inner.sync_config.failed_entry_policy == FailedEntryPolicy::Retain {
                    let failed = report.failed_entries();
                    if !failed.is_empty() {
                        info!(count = failed.len(), "Keeping failed entries for the next publish");
                    }
                    tracker.restore(failed);
                }
            }
            Ok(_) => tracker.restore(drained),
            Err(err) => {
                warn!(error = %err, "Cycle aborted, restoring pending changes");
                tracker.restore(drained);
            }
        }

        if let Err(err) = self.save(&tracker).await {
            error!(error = %err, "Failed to persist state after cycle");
        }

        result.map_err(Into::into)
    }

    // ========================================================================
    // Settings & state
    // ========================================================================

    pub async fn settings(&self) -> RemoteSettings {
        self.inner.settings.read().await.clone()
    }

    /// Replace the connection settings. Rejected while a cycle is running.
    pub async fn update_settings(&self, settings: RemoteSettings) -> Result<()> {
        let _cycle = self
            .inner
            .cycle_guard
            .try_lock()
            .map_err(|_| SyncError::CycleInProgress)?;

        *self.inner.settings.write().await = settings;
        let tracker = self.inner.tracker.lock().await;
        self.save(&tracker).await?;
        info!("Settings updated");
        Ok(())
    }

    /// Snapshot of the pending set.
    pub async fn pending(&self) -> PendingChangeSet {
        self.inner.tracker.lock().await.pending().clone()
    }

    pub fn is_publishing(&self) -> bool {
        self.inner.cycle_guard.try_lock().is_err()
    }

    async fn save(&self, tracker: &ChangeTracker) -> Result<()> {
        let settings = self.inner.settings.read().await.clone();
        let state = PersistedState::new(&settings, tracker.pending());
        self.inner.repository.save(&state).await?;
        Ok(())
    }

    // ========================================================================
    // Events out
    // ========================================================================

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.inner.event_bus.subscribe()
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    fn emit(&self, event: CoreEvent) {
        let _ = self.inner.event_bus.emit(event);
    }
}
