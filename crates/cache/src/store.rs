use crate::CacheKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persisted key → result mapping, generic over the stored result type.
///
/// Entries are keyed independently, so concurrent lint tasks need no
/// coordination beyond the internal mutex that serializes map access and
/// the final write of the store file (last-writer-wins is acceptable).
pub struct CacheStore<T> {
    path: PathBuf,
    entries: Mutex<HashMap<String, T>>,
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Open a store backed by the given file.
    ///
    /// A missing file starts empty. An unreadable or corrupt file is
    /// treated as empty with a warning; the run proceeds at full cost.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, T>>(&contents) {
                Ok(map) => {
                    tracing::debug!(path = %path.display(), entries = map.len(), "Cache loaded");
                    map
                }
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "Cache file is corrupt, starting with empty cache"
                    );
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Cache file is unreadable, starting with empty cache"
                );
                HashMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Create an empty in-memory store that will persist to `path`.
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The file this store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point lookup by the three-part key.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(&key.storage_key()).cloned()
    }

    /// Store a complete result under the given key.
    ///
    /// Callers must only ever insert fully assembled results; partial
    /// results would otherwise be replayed on a later hit.
    pub fn insert(&self, key: &CacheKey, value: T) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.storage_key(), value);
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.len()
    }

    /// True when the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, forcing full re-validation on the next run.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "Cache invalidated");
    }

    /// Write the store to disk.
    ///
    /// Serializes to a temporary file in the same directory and renames it
    /// into place, so a crash mid-write never leaves a truncated store.
    pub fn persist(&self) -> std::io::Result<()> {
        let json = {
            let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            serde_json::to_string(&*entries)?
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "Cache persisted");
        Ok(())
    }

    /// Delete the persisted store file, if present.
    pub fn remove_file(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_hash;
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct FakeResult {
        violations: usize,
    }

    fn key(path: &str, content: &str, config: &str) -> CacheKey {
        CacheKey::new(
            &PathBuf::from(path),
            content_hash(content.as_bytes()),
            content_hash(config.as_bytes()),
        )
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("cache.json");

        let store = CacheStore::open(&store_path);
        let k = key("/ws/CLAUDE.md", "content", "config");
        store.insert(&k, FakeResult { violations: 2 });
        store.persist().unwrap();

        let reopened: CacheStore<FakeResult> = CacheStore::open(&store_path);
        assert_eq!(reopened.get(&k), Some(FakeResult { violations: 2 }));
    }

    #[test]
    fn test_content_change_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store: CacheStore<FakeResult> = CacheStore::open(dir.path().join("cache.json"));

        store.insert(&key("/ws/CLAUDE.md", "v1", "cfg"), FakeResult { violations: 0 });
        assert!(store.get(&key("/ws/CLAUDE.md", "v2", "cfg")).is_none());
    }

    #[test]
    fn test_config_change_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store: CacheStore<FakeResult> = CacheStore::open(dir.path().join("cache.json"));

        store.insert(&key("/ws/CLAUDE.md", "v1", "cfg-a"), FakeResult { violations: 0 });
        assert!(store.get(&key("/ws/CLAUDE.md", "v1", "cfg-b")).is_none());
    }

    #[test]
    fn test_corrupt_store_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("cache.json");
        fs::write(&store_path, "{not json at all").unwrap();

        let store: CacheStore<FakeResult> = CacheStore::open(&store_path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_invalidate_all() {
        let dir = tempfile::tempdir().unwrap();
        let store: CacheStore<FakeResult> = CacheStore::open(dir.path().join("cache.json"));

        store.insert(&key("/a", "c", "g"), FakeResult { violations: 1 });
        store.insert(&key("/b", "c", "g"), FakeResult { violations: 1 });
        assert_eq!(store.len(), 2);

        store.invalidate_all();
        assert!(store.is_empty());
    }
}
