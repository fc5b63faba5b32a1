//! # Path Status
//!
//! Net pending status of a single vault path.
//!
//! The persisted and wire encodings are plain strings
//! (`created`, `modified`, `deleted`, `renamed:<oldPath>`). In memory the
//! rename source is a typed field, so nothing outside this module parses the
//! string form.

use crate::{Result, SyncError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const RENAMED_PREFIX: &str = "renamed:";

/// Net effect of all events on a path since the last publish.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStatus {
    Created,
    Modified,
    Deleted,
    Renamed { from: String },
}

impl PathStatus {
    /// Status tag as sent in the `status` form field.
    pub fn as_tag(&self) -> &'static str {
        match self {
            PathStatus::Created => "created",
            PathStatus::Modified => "modified",
            PathStatus::Deleted => "deleted",
            PathStatus::Renamed { .. } => "renamed",
        }
    }

    /// Rename source, if any.
    pub fn old_path(&self) -> Option<&str> {
        match self {
            PathStatus::Renamed { from } => Some(from),
            _ => None,
        }
    }

    /// Whether syncing this entry needs the file's current bytes.
    pub fn requires_content(&self) -> bool {
        !matches!(self, PathStatus::Deleted)
    }

    pub fn is_created(&self) -> bool {
        matches!(self, PathStatus::Created)
    }

    /// Persisted encoding.
    pub fn encode(&self) -> String {
        match self {
            PathStatus::Renamed { from } => format!("{}{}", RENAMED_PREFIX, from),
            other => other.as_tag().to_string(),
        }
    }
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for PathStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created" => Ok(PathStatus::Created),
            "modified" => Ok(PathStatus::Modified),
            "deleted" => Ok(PathStatus::Deleted),
            _ => match s.strip_prefix(RENAMED_PREFIX) {
                Some(from) if !from.is_empty() => Ok(PathStatus::Renamed {
                    from: from.to_string(),
                }),
                _ => Err(SyncError::InvalidStatus(s.to_string())),
            },
        }
    }
}

impl Serialize for PathStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for PathStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let cases = [
            (PathStatus::Created, "created"),
            (PathStatus::Modified, "modified"),
            (PathStatus::Deleted, "deleted"),
            (
                PathStatus::Renamed {
                    from: "old/a.md".to_string(),
                },
                "renamed:old/a.md",
            ),
        ];

        for (status, encoded) in cases {
            assert_eq!(status.encode(), encoded);
            assert_eq!(encoded.parse::<PathStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_rename_source_may_contain_colons() {
        let status: PathStatus = "renamed:notes/10:30 meeting.md".parse().unwrap();
        assert_eq!(status.old_path(), Some("notes/10:30 meeting.md"));
    }

    #[test]
    fn test_invalid_status_strings() {
        for raw in ["renamed", "renamed:", "Created", "", "moved"] {
            assert!(
                matches!(raw.parse::<PathStatus>(), Err(SyncError::InvalidStatus(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_tags_and_content_requirements() {
        let renamed = PathStatus::Renamed {
            from: "a.md".to_string(),
        };
        assert_eq!(renamed.as_tag(), "renamed");
        assert!(renamed.requires_content());
        assert!(PathStatus::Created.requires_content());
        assert!(PathStatus::Modified.requires_content());
        assert!(!PathStatus::Deleted.requires_content());
        assert_eq!(PathStatus::Deleted.old_path(), None);
    }

    #[test]
    fn test_serde_uses_string_encoding() {
        let json = serde_json::to_string(&PathStatus::Renamed {
            from: "x.md".to_string(),
        })
        .unwrap();
        assert_eq!(json, "\"renamed:x.md\"");

        let back: PathStatus = serde_json::from_str("\"deleted\"").unwrap();
        assert_eq!(back, PathStatus::Deleted);
        assert!(serde_json::from_str::<PathStatus>("\"renamed\"").is_err());
    }
}
