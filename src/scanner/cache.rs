use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::Result;

/// Cached digest metadata for a single path.
///
/// A cached digest is reused only when the mode's type bits, the size, and
/// the modification time all still match the current stat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub mode: u32,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
    pub size: u64,
    pub digest: Vec<u8>,
}

/// Digest cache keyed by scan-relative path.
///
/// Keys use forward slashes on every platform; the empty string keys a file
/// root. The scan consumes one cache read-only and produces a fresh one
/// covering exactly the paths it observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, path: &str) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: String, entry: CacheEntry) {
        self.entries.insert(path, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &HashMap<String, CacheEntry> {
        &self.entries
    }

    /// Loads a cache persisted by `save`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| crate::SnapSyncError::Fs {
            op: "open cache",
            path: path.to_owned(),
            source,
        })?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| crate::SnapSyncError::Protocol(format!("cache decode failed: {}", e)))
    }

    /// Persists the cache so a later run can skip rehashing.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| crate::SnapSyncError::Fs {
            op: "create cache",
            path: path.to_owned(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| crate::SnapSyncError::Protocol(format!("cache encode failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(size: u64) -> CacheEntry {
        CacheEntry {
            mode: 0o100644,
            mtime_secs: 1_700_000_000,
            mtime_nanos: 123_456_789,
            size,
            digest: vec![0xab; 32],
        }
    }

    #[test]
    fn insert_and_get() {
        let mut cache = Cache::new();
        cache.insert("a.txt".into(), entry(11));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a.txt").unwrap().size, 11);
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut cache = Cache::new();
        cache.insert("".into(), entry(11));
        cache.insert("sub/b.bin".into(), entry(1024));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digests.cache");
        cache.save(&path).unwrap();

        let loaded = Cache::load(&path).unwrap();
        assert_eq!(cache, loaded);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Cache::load(&dir.path().join("absent")).is_err());
    }
}
