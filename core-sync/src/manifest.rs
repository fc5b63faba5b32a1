//! # Manifest
//!
//! One entry per successfully synced path, submitted in a single rebuild
//! call. The wire shape is
//! `{ path, md5, extension, lastModified, deleted }`.

use bridge_traits::vault::extension_of;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `lastModified` format, rendered in the host's local time zone.
pub const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a modification time the way the remote index stores it.
pub fn format_last_modified(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(LAST_MODIFIED_FORMAT)
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    #[serde(rename = "md5")]
    pub content_hash: String,
    pub extension: String,
    pub last_modified: String,
    pub deleted: bool,
}

impl ManifestEntry {
    pub fn present(
        path: impl Into<String>,
        content_hash: impl Into<String>,
        extension: impl Into<String>,
        last_modified: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            extension: extension.into(),
            last_modified: last_modified.into(),
            deleted: false,
        }
    }

    /// Entry for a deleted path: no hash, no timestamp.
    pub fn deleted(path: impl Into<String>) -> Self {
        let path = path.into();
        let extension = extension_of(&path).to_string();
        Self {
            path,
            content_hash: String::new(),
            extension,
            last_modified: String::new(),
            deleted: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Vec<ManifestEntry>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct hashes of present (non-deleted) entries.
    pub fn hashes(&self) -> BTreeSet<String> {
        self.0
            .iter()
            .filter(|entry| !entry.deleted)
            .map(|entry| entry.content_hash.clone())
            .collect()
    }

    pub fn find(&self, path: &str) -> Option<&ManifestEntry> {
        self.0.iter().find(|entry| entry.path == path)
    }

    /// Sort by path so identical inputs produce identical manifests.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
