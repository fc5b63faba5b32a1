//! Content fingerprinting.

use md5::{Digest, Md5};

/// Computes the content fingerprint the remote store indexes files by.
///
/// Must be deterministic; two buffers with the same fingerprint are treated
/// as identical content.
pub trait ContentHasher: Send + Sync {
    /// Lowercase hex digest of `bytes`.
    fn hash(&self, bytes: &[u8]) -> String;
}

/// MD5, matching the `md5` field the remote expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl ContentHasher for Md5Hasher {
    fn hash(&self, bytes: &[u8]) -> String {
        format!("{:x}", Md5::digest(bytes))
    }
}
