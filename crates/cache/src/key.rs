use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute the sha-256 hex digest of a byte slice.
///
/// Used for both halves of the cache key: file content bytes and the
/// canonical serialization of an effective configuration.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The three-part cache key: absolute file path, content hash, config hash.
///
/// An entry is valid only while both hashes match current state; any
/// mismatch produces a different key and therefore a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: String,
    pub content_hash: String,
    pub config_hash: String,
}

impl CacheKey {
    /// Build a key for a file path and its two input hashes.
    #[must_use]
    pub fn new(
        path: &Path,
        content_hash: impl Into<String>,
        config_hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            content_hash: content_hash.into(),
            config_hash: config_hash.into(),
        }
    }

    /// Storage key used in the persisted JSON object.
    ///
    /// Hashes are fixed-width hex so the leading segments are unambiguous
    /// even though paths may contain any character.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.content_hash, self.config_hash, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_content_hash_stable() {
        let a = content_hash(b"hello");
        let b = content_hash(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_differs_on_single_byte() {
        assert_ne!(content_hash(b"hello"), content_hash(b"hellp"));
    }

    #[test]
    fn test_storage_key_distinguishes_parts() {
        let path = PathBuf::from("/ws/CLAUDE.md");
        let a = CacheKey::new(&path, "aaaa", "bbbb");
        let b = CacheKey::new(&path, "bbbb", "aaaa");
        assert_ne!(a.storage_key(), b.storage_key());
    }
}
