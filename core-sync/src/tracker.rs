//! # Change Tracker
//!
//! Folds the host's file events into the net status of each path since the
//! last successful publish.
//!
//! ## Transition Table
//!
//! | Event         | Status at key            | New status                       |
//! |---------------|--------------------------|----------------------------------|
//! | Create(p)     | any                      | p = Created                      |
//! | Modify(p)     | Created                  | unchanged                        |
//! | Modify(p)     | Renamed{from}            | unchanged                        |
//! | Modify(p)     | Modified / Deleted / none| p = Modified                     |
//! | Rename(p→q)   | p is Created             | drop p, q = Created              |
//! | Rename(p→q)   | otherwise                | drop p, q = Renamed{from: p}     |
//! | Delete(p)     | Created                  | drop p                           |
//! | Delete(p)     | otherwise                | p = Deleted                      |
//!
//! A rename onto a path that already has a pending status overwrites it.
//! The tracker is the only writer of the pending set; a publish cycle takes
//! the whole set with [`ChangeTracker::drain`] and hands back what must be
//! retried with [`ChangeTracker::restore`].

use crate::status::PathStatus;
use core_runtime::events::{ChangeEvent, CoreEvent};
use serde::{Deserialize, Serialize};
use std::collections::hash_map;
use std::collections::HashMap;

// ============================================================================
// Events
// ============================================================================

/// A mutation reported by the host's file watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileEvent {
    Create {
        path: String,
    },
    Modify {
        path: String,
    },
    Rename {
        path: String,
        #[serde(rename = "oldPath")]
        old_path: String,
    },
    Delete {
        path: String,
    },
}

impl FileEvent {
    pub fn create(path: impl Into<String>) -> Self {
        FileEvent::Create { path: path.into() }
    }

    pub fn modify(path: impl Into<String>) -> Self {
        FileEvent::Modify { path: path.into() }
    }

    pub fn rename(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        FileEvent::Rename {
            path: path.into(),
            old_path: old_path.into(),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        FileEvent::Delete { path: path.into() }
    }

    /// Current path the event refers to.
    pub fn path(&self) -> &str {
        match self {
            FileEvent::Create { path }
            | FileEvent::Modify { path }
            | FileEvent::Rename { path, .. }
            | FileEvent::Delete { path } => path,
        }
    }
}

// ============================================================================
// Pending Change Set
// ============================================================================

/// Current path → net status. Insertion order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingChangeSet(HashMap<String, PathStatus>);

impl PendingChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&PathStatus> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, PathStatus> {
        self.0.iter()
    }

    pub fn insert(&mut self, path: impl Into<String>, status: PathStatus) -> Option<PathStatus> {
        self.0.insert(path.into(), status)
    }

    pub fn remove(&mut self, path: &str) -> Option<PathStatus> {
        self.0.remove(path)
    }

    /// Entries sorted by path, for deterministic dispatch and logging.
    pub fn sorted(&self) -> Vec<(String, PathStatus)> {
        let mut entries: Vec<_> = self
            .0
            .iter()
            .map(|(path, status)| (path.clone(), status.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl FromIterator<(String, PathStatus)> for PendingChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, PathStatus)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PendingChangeSet {
    type Item = (String, PathStatus);
    type IntoIter = hash_map::IntoIter<String, PathStatus>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Keys touched by one recorded event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Paths whose pending status was removed
    pub untracked: Vec<String>,
    /// Paths whose pending status was set
    pub tracked: Vec<(String, PathStatus)>,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.untracked.is_empty() && self.tracked.is_empty()
    }

    fn untrack(mut self, path: &str) -> Self {
        self.untracked.push(path.to_string());
        self
    }

    fn track(mut self, path: &str, status: PathStatus) -> Self {
        self.tracked.push((path.to_string(), status));
        self
    }

    /// Event bus representation of this transition.
    pub fn to_events(&self) -> Vec<CoreEvent> {
        let untracked = self.untracked.iter().map(|path| {
            CoreEvent::Changes(ChangeEvent::Untracked { path: path.clone() })
        });
        let tracked = self.tracked.iter().map(|(path, status)| {
            CoreEvent::Changes(ChangeEvent::Tracked {
                path: path.clone(),
                status: status.encode(),
            })
        });
        untracked.chain(tracked).collect()
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Exclusive owner of the pending change set.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    pending: PendingChangeSet,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted pending set.
    pub fn with_pending(pending: PendingChangeSet) -> Self {
        Self { pending }
    }

    /// Apply one event.
    pub fn record(&mut self, event: &FileEvent) -> Transition {
        match event {
            FileEvent::Create { path } => self.on_create(path),
            FileEvent::Modify { path } => self.on_modify(path),
            FileEvent::Rename { path, old_path } => self.on_rename(path, old_path),
            FileEvent::Delete { path } => self.on_delete(path),
        }
    }

    pub fn on_create(&mut self, path: &str) -> Transition {
        self.pending.insert(path, PathStatus::Created);
        Transition::default().track(path, PathStatus::Created)
    }

    pub fn on_modify(&mut self, path: &str) -> Transition {
        match self.pending.get(path) {
            Some(PathStatus::Created) | Some(PathStatus::Renamed { .. }) => Transition::default(),
            Some(PathStatus::Modified) => Transition::default(),
            Some(PathStatus::Deleted) | None => {
                self.pending.insert(path, PathStatus::Modified);
                Transition::default().track(path, PathStatus::Modified)
            }
        }
    }

    pub fn on_rename(&mut self, path: &str, old_path: &str) -> Transition {
        if path == old_path {
            return Transition::default();
        }

        let previous = self.pending.remove(old_path);
        let status = match previous {
            Some(PathStatus::Created) => PathStatus::Created,
            _ => PathStatus::Renamed {
                from: old_path.to_string(),
            },
        };
        self.pending.insert(path, status.clone());

        let transition = if previous.is_some() {
            Transition::default().untrack(old_path)
        } else {
            Transition::default()
        };
        transition.track(path, status)
    }

    pub fn on_delete(&mut self, path: &str) -> Transition {
        match self.pending.get(path) {
            Some(PathStatus::Created) => {
                self.pending.remove(path);
                Transition::default().untrack(path)
            }
            Some(PathStatus::Deleted) => Transition::default(),
            _ => {
                self.pending.insert(path, PathStatus::Deleted);
                Transition::default().track(path, PathStatus::Deleted)
            }
        }
    }

    pub fn status(&self, path: &str) -> Option<&PathStatus> {
        self.pending.get(path)
    }

    pub fn pending(&self) -> &PendingChangeSet {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take the whole pending set, leaving the tracker empty.
    pub fn drain(&mut self) -> PendingChangeSet {
        std::mem::take(&mut self.pending)
    }

    /// Put entries back after an aborted or partially failed cycle.
    ///
    /// A path that picked up a status after the drain keeps that status.
    pub fn restore(&mut self, entries: PendingChangeSet) {
        for (path, status) in entries {
            if !self.pending.contains(&path) {
                self.pending.insert(path, status);
            }
        }
    }
}
