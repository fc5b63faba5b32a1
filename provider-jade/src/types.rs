//! Jade API wire types

use core_sync::ManifestEntry;
use serde::{Deserialize, Serialize};

/// Envelope every JSON answer is wrapped in: `{ "data": ..., "msg": ... }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,

    #[serde(default)]
    pub msg: Option<String>,
}

/// `data` of `GET /check-file-exists`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FileExists {
    pub exists: bool,
}

/// Body of `POST /rebuild`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildRequest<'a> {
    pub files: &'a [ManifestEntry],
    pub clear_others: bool,
}

/// Multipart field names of the per-path sync call.
pub mod fields {
    pub const PATH: &str = "path";
    pub const STATUS: &str = "status";
    pub const OLD_PATH: &str = "oldPath";
    pub const MD5: &str = "md5";
    pub const EXTENSION: &str = "extension";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const FILE: &str = "file";
}
