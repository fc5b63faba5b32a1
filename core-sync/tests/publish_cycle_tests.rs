//! End-to-end publish cycles against an in-memory content store.
//!
//! Covers:
//! - Tracker drain followed by incremental publish
//! - Content dedup within and across sessions
//! - Full resync pruning and round-trip of content hashes
//! - Aborts that leave the remote untouched

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::time::SystemClock;
use bridge_traits::vault::{VaultAccess, VaultFile};
use bytes::Bytes;
use chrono::Utc;
use core_runtime::events::{CoreEvent, EventBus, PublishEvent};
use core_sync::{
    ChangeTracker, ContentHasher, FileEvent, HealthStatus, Manifest, ManifestEntry, Md5Hasher,
    PathStatus, RemoteSettings, RemoteStore, Result, SyncConfig, SyncCoordinator, SyncError,
    SyncRequest,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct MemoryVault {
    files: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryVault {
    fn write(&self, path: &str, body: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::from(body.to_string()));
    }

    fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    fn hashes(&self) -> BTreeSet<String> {
        self.files
            .lock()
            .unwrap()
            .values()
            .map(|body| Md5Hasher.hash(body))
            .collect()
    }
}

#[async_trait]
impl VaultAccess for MemoryVault {
    async fn list_files(&self) -> BridgeResult<Vec<VaultFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, body)| VaultFile::new(path.clone(), Utc::now(), body.len() as u64))
            .collect())
    }

    async fn stat(&self, path: &str) -> BridgeResult<Option<VaultFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|body| VaultFile::new(path, Utc::now(), body.len() as u64)))
    }

    async fn read_binary(&self, path: &str) -> BridgeResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(path.to_string()))
    }
}

#[derive(Debug, Clone)]
enum Call {
    Health,
    Exists(String),
    Sync(SyncRequest),
    Flush,
    Rebuild { files: usize, clear_others: bool },
}

struct FakeJade {
    health: Mutex<HealthStatus>,
    blobs: Mutex<HashSet<String>>,
    index: Mutex<BTreeMap<String, ManifestEntry>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeJade {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            health: Mutex::new(HealthStatus::Healthy),
            blobs: Mutex::new(HashSet::new()),
            index: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn set_health(&self, health: HealthStatus) {
        *self.health.lock().unwrap() = health;
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn sync_requests(&self) -> Vec<SyncRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Sync(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn uploads(&self) -> usize {
        self.sync_requests()
            .iter()
            .filter(|r| r.carries_content())
            .count()
    }

    fn rebuilds(&self) -> Vec<(usize, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Rebuild {
                    files,
                    clear_others,
                } => Some((files, clear_others)),
                _ => None,
            })
            .collect()
    }

    fn indexed_paths(&self) -> Vec<String> {
        self.index.lock().unwrap().keys().cloned().collect()
    }

    fn indexed_hashes(&self) -> BTreeSet<String> {
        self.index
            .lock()
            .unwrap()
            .values()
            .map(|entry| entry.content_hash.clone())
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteStore for FakeJade {
    async fn check_health(&self, _timeout: Duration) -> HealthStatus {
        self.record(Call::Health);
        self.health.lock().unwrap().clone()
    }

    async fn exists(&self, content_hash: &str) -> Result<bool> {
        self.record(Call::Exists(content_hash.to_string()));
        tokio::task::yield_now().await;
        Ok(self.blobs.lock().unwrap().contains(content_hash))
    }

    async fn sync_file(&self, request: SyncRequest) -> Result<()> {
        tokio::task::yield_now().await;
        if request.carries_content() {
            let hash = request
                .metadata
                .as_ref()
                .map(|m| m.content_hash.clone())
                .ok_or_else(|| SyncError::Remote {
                    operation: "sync".into(),
                    message: "file without md5".into(),
                })?;
            self.blobs.lock().unwrap().insert(hash);
        }
        self.record(Call::Sync(request));
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.record(Call::Flush);
        Ok(())
    }

    async fn rebuild(&self, manifest: &Manifest, clear_others: bool) -> Result<()> {
        self.record(Call::Rebuild {
            files: manifest.len(),
            clear_others,
        });
        let mut index = self.index.lock().unwrap();
        if clear_others {
            index.clear();
        }
        for entry in manifest.entries() {
            if entry.deleted {
                index.remove(&entry.path);
            } else {
                index.insert(entry.path.clone(), entry.clone());
            }
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    vault: Arc<MemoryVault>,
    remote: Arc<FakeJade>,
    bus: Arc<EventBus>,
    coordinator: SyncCoordinator,
}

fn harness() -> Harness {
    let vault = Arc::new(MemoryVault::default());
    let bus = Arc::new(EventBus::new(256));
    let coordinator = SyncCoordinator::new(
        SyncConfig::default(),
        vault.clone(),
        Arc::new(Md5Hasher),
        bus.clone(),
        Arc::new(SystemClock),
    );
    Harness {
        vault,
        remote: FakeJade::new(),
        bus,
        coordinator,
    }
}

fn settings() -> RemoteSettings {
    RemoteSettings::new("https://jade.example.com", "token")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_create_publishes_one_created_call_and_merges() {
    let h = harness();
    let mut tracker = ChangeTracker::new();

    h.vault.write("a.md", "# A");
    tracker.record(&FileEvent::create("a.md"));

    let report = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert!(report.committed);
    let requests = h.remote.sync_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "a.md");
    assert_eq!(requests[0].status, PathStatus::Created);
    assert!(requests[0].carries_content());
    assert_eq!(h.remote.rebuilds(), vec![(1, false)]);
    assert!(tracker.is_empty());
}

#[tokio::test]
async fn test_create_then_delete_makes_no_calls() {
    let h = harness();
    let mut tracker = ChangeTracker::new();

    tracker.record(&FileEvent::create("a.md"));
    tracker.record(&FileEvent::delete("a.md"));

    let report = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert!(!report.committed);
    assert!(report.manifest.is_empty());
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn test_equal_content_uploads_once() {
    let h = harness();
    h.vault.write("a.md", "shared body");
    h.vault.write("b.md", "shared body");

    let mut tracker = ChangeTracker::new();
    tracker.record(&FileEvent::create("a.md"));
    tracker.record(&FileEvent::create("b.md"));

    let report = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert_eq!(h.remote.uploads(), 1);
    assert_eq!(h.remote.sync_requests().len(), 2);
    let exists_calls = h
        .remote
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Exists(_)))
        .count();
    assert_eq!(exists_calls, 1);

    assert_eq!(report.manifest.len(), 2);
    let a = report.manifest.find("a.md").unwrap();
    let b = report.manifest.find("b.md").unwrap();
    assert_eq!(a.content_hash, b.content_hash);
}

#[tokio::test]
async fn test_content_already_stored_is_not_uploaded_again() {
    let h = harness();
    h.vault.write("a.md", "body");

    let mut tracker = ChangeTracker::new();
    tracker.record(&FileEvent::create("a.md"));
    h.coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();
    h.remote.clear_calls();

    tracker.record(&FileEvent::modify("a.md"));
    let report = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert_eq!(report.uploaded_count(), 0);
    let requests = h.remote.sync_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, PathStatus::Modified);
    assert!(!requests[0].carries_content());
}

#[tokio::test]
async fn test_full_sync_round_trips_content_hashes() {
    let h = harness();
    h.vault.write("a.md", "alpha");
    h.vault.write("notes/b.md", "beta");
    h.vault.write("notes/c.md", "alpha");
    h.vault.write("img/d.png", "\u{89}PNG");

    let report = h
        .coordinator
        .run_full(h.remote.clone(), settings())
        .await
        .unwrap();

    assert!(report.committed);
    assert_eq!(report.manifest.hashes(), h.vault.hashes());
    assert_eq!(h.remote.indexed_hashes(), h.vault.hashes());
    assert_eq!(h.remote.uploads(), 3);
    assert_eq!(h.remote.rebuilds(), vec![(4, true)]);
    assert!(matches!(h.remote.calls()[1], Call::Flush));
}

#[tokio::test]
async fn test_full_sync_prunes_stale_remote_paths() {
    let h = harness();
    h.vault.write("keep.md", "keep");
    h.vault.write("stale.md", "stale");
    h.coordinator
        .run_full(h.remote.clone(), settings())
        .await
        .unwrap();

    h.vault.remove("stale.md");
    h.coordinator
        .run_full(h.remote.clone(), settings())
        .await
        .unwrap();

    assert_eq!(h.remote.indexed_paths(), vec!["keep.md".to_string()]);
}

#[tokio::test]
async fn test_incremental_merge_keeps_untouched_paths() {
    let h = harness();
    h.vault.write("one.md", "1");
    h.vault.write("two.md", "2");
    h.coordinator
        .run_full(h.remote.clone(), settings())
        .await
        .unwrap();

    let mut tracker = ChangeTracker::new();
    h.vault.write("three.md", "3");
    tracker.record(&FileEvent::create("three.md"));
    h.vault.remove("one.md");
    tracker.record(&FileEvent::delete("one.md"));

    h.coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert_eq!(
        h.remote.indexed_paths(),
        vec!["three.md".to_string(), "two.md".to_string()]
    );
}

#[tokio::test]
async fn test_rename_reports_old_path() {
    let h = harness();
    h.vault.write("new.md", "moved");

    let mut tracker = ChangeTracker::new();
    tracker.record(&FileEvent::rename("old.md", "new.md"));

    h.coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    let requests = h.remote.sync_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status.old_path(), Some("old.md"));
}

#[tokio::test]
async fn test_unauthorized_touches_nothing() {
    let h = harness();
    h.remote.set_health(HealthStatus::Unauthorized);
    h.vault.write("a.md", "a");

    let mut tracker = ChangeTracker::new();
    tracker.record(&FileEvent::create("a.md"));
    let drained = tracker.drain();

    let err = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), drained.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized));

    let calls = h.remote.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], Call::Health));

    tracker.restore(drained);
    assert_eq!(tracker.status("a.md"), Some(&PathStatus::Created));
}

#[tokio::test]
async fn test_raced_delete_is_skipped() {
    let h = harness();
    h.vault.write("kept.md", "kept");

    let mut tracker = ChangeTracker::new();
    tracker.record(&FileEvent::create("kept.md"));
    tracker.record(&FileEvent::modify("vanished.md"));

    let mut events = h.bus.subscribe();
    let report = h
        .coordinator
        .run_incremental(h.remote.clone(), settings(), tracker.drain())
        .await
        .unwrap();

    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.manifest.len(), 1);
    assert_eq!(h.remote.rebuilds(), vec![(1, false)]);

    let mut saw_skip = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Publish(PublishEvent::FileSkipped { path, .. }) = event {
            assert_eq!(path, "vanished.md");
            saw_skip = true;
        }
    }
    assert!(saw_skip);
}
