//! Per-cycle results.

use crate::manifest::{Manifest, ManifestEntry};
use crate::session::{SessionId, SyncMode};
use crate::status::PathStatus;
use crate::tracker::PendingChangeSet;
use std::time::Duration;

/// What happened to one drained entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Synced {
        status: PathStatus,
        entry: ManifestEntry,
        uploaded: bool,
    },
    /// The file vanished between the event and the read.
    Skipped {
        path: String,
        status: PathStatus,
        reason: String,
    },
    Failed {
        path: String,
        status: PathStatus,
        error: String,
    },
}

impl EntryOutcome {
    pub fn path(&self) -> &str {
        match self {
            EntryOutcome::Synced { entry, .. } => &entry.path,
            EntryOutcome::Skipped { path, .. } | EntryOutcome::Failed { path, .. } => path,
        }
    }

    pub fn status(&self) -> &PathStatus {
        match self {
            EntryOutcome::Synced { status, .. }
            | EntryOutcome::Skipped { status, .. }
            | EntryOutcome::Failed { status, .. } => status,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, EntryOutcome::Synced { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub session_id: SessionId,
    pub mode: SyncMode,
    pub outcomes: Vec<EntryOutcome>,
    pub manifest: Manifest,
    /// Whether the rebuild call was made and succeeded.
    pub committed: bool,
    pub duration: Duration,
}

impl PublishReport {
    /// Report for a cycle that had nothing to do.
    pub fn empty(session_id: SessionId, mode: SyncMode) -> Self {
        Self {
            session_id,
            mode,
            outcomes: Vec::new(),
            manifest: Manifest::new(),
            committed: false,
            duration: Duration::ZERO,
        }
    }

    pub fn synced_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_synced()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Failed { .. }))
            .count()
    }

    pub fn uploaded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Synced { uploaded: true, .. }))
            .count()
    }

    /// Entries to hand back to the tracker when failures are retained.
    pub fn failed_entries(&self) -> PendingChangeSet {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                EntryOutcome::Failed { path, status, .. } => Some((path.clone(), status.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_failed_entries() {
        let mut report = PublishReport::empty(SessionId::new(), SyncMode::Incremental);
        report.outcomes = vec![
            EntryOutcome::Synced {
                status: PathStatus::Created,
                entry: ManifestEntry::present("a.md", "h", "md", ""),
                uploaded: true,
            },
            EntryOutcome::Synced {
                status: PathStatus::Modified,
                entry: ManifestEntry::present("b.md", "h", "md", ""),
                uploaded: false,
            },
            EntryOutcome::Skipped {
                path: "c.md".into(),
                status: PathStatus::Modified,
                reason: "missing".into(),
            },
            EntryOutcome::Failed {
                path: "d.md".into(),
                status: PathStatus::Renamed {
                    from: "old.md".into(),
                },
                error: "HTTP 500".into(),
            },
        ];

        assert_eq!(report.synced_count(), 2);
        assert_eq!(report.uploaded_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_clean());

        let failed = report.failed_entries();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed.get("d.md"),
            Some(&PathStatus::Renamed {
                from: "old.md".into()
            })
        );
    }
}
