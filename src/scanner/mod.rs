use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod cache;
pub mod ignore;
pub mod local;
pub mod symlink;

pub use cache::{Cache, CacheEntry};
pub use ignore::PathIgnorer;
pub use local::scan;
pub use symlink::SymlinkMode;

/// Snapshot node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// A node of the snapshot tree.
///
/// Directory contents are keyed by base name; iteration order carries no
/// meaning and equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    File {
        executable: bool,
        digest: Vec<u8>,
    },
    Directory {
        contents: HashMap<String, Entry>,
    },
    Symlink {
        target: String,
    },
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::File { .. } => EntryKind::File,
            Entry::Directory { .. } => EntryKind::Directory,
            Entry::Symlink { .. } => EntryKind::Symlink,
        }
    }

    /// Counts (files, directories, symlinks) across the whole tree, the
    /// root included.
    pub fn count(&self) -> (u64, u64, u64) {
        match self {
            Entry::File { .. } => (1, 0, 0),
            Entry::Symlink { .. } => (0, 0, 1),
            Entry::Directory { contents } => {
                let mut totals = (0, 1, 0);
                for child in contents.values() {
                    let (files, dirs, links) = child.count();
                    totals.0 += files;
                    totals.1 += dirs;
                    totals.2 += links;
                }
                totals
            }
        }
    }
}

/// Streaming hash state supplied by the caller.
///
/// The scanner treats digests opaquely; the digest length is fixed per
/// hasher instance.
pub trait Hasher {
    fn reset(&mut self);
    fn write(&mut self, data: &[u8]);
    fn sum(&mut self) -> Vec<u8>;
}

/// Default hasher backed by BLAKE3.
#[derive(Default)]
pub struct Blake3Hasher {
    inner: blake3::Hasher,
}

impl Blake3Hasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hasher for Blake3Hasher {
    fn reset(&mut self) {
        self.inner.reset();
    }

    fn write(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn sum(&mut self) -> Vec<u8> {
        self.inner.finalize().as_bytes().to_vec()
    }
}
