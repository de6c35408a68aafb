use std::collections::HashMap;
use std::fs::{self, File, Metadata};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::scanner::{symlink, Cache, CacheEntry, Entry, Hasher, PathIgnorer, SymlinkMode};
use crate::{Result, SnapSyncError};

/// Size of the buffer used to stream file contents into the hasher.
const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Initial capacity for a new cache when the previous one is empty. Saves a
/// few rounds of rehashing on insert without always allocating a huge map.
const INITIAL_CACHE_CAPACITY: usize = 1024;

const MODE_TYPE_MASK: u32 = 0o170_000;
const ANY_EXECUTE_MASK: u32 = 0o111;

#[cfg(unix)]
const SYMLINKS_SUPPORTED: bool = true;
#[cfg(not(unix))]
const SYMLINKS_SUPPORTED: bool = false;

#[cfg(unix)]
fn metadata_mode(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(unix)]
fn metadata_mtime(metadata: &Metadata) -> (i64, u32) {
    use std::os::unix::fs::MetadataExt;
    (metadata.mtime(), metadata.mtime_nsec() as u32)
}

#[cfg(not(unix))]
fn metadata_mode(metadata: &Metadata) -> u32 {
    // Synthesize POSIX-style modes on platforms without them.
    if metadata.is_dir() {
        0o040_755
    } else if metadata.file_type().is_symlink() {
        0o120_777
    } else {
        0o100_644
    }
}

#[cfg(not(unix))]
fn metadata_mtime(metadata: &Metadata) -> (i64, u32) {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| (d.as_secs() as i64, d.subsec_nanos()))
        .unwrap_or((0, 0))
}

struct Scanner<'a, 'h> {
    root: &'a Path,
    hasher: &'h mut dyn Hasher,
    cache: &'a Cache,
    ignorer: PathIgnorer,
    symlink_mode: SymlinkMode,
    size_limit: u64,
    new_cache: Cache,
    buffer: Vec<u8>,
}

impl<'a, 'h> Scanner<'a, 'h> {
    /// Maps a scan-relative forward-slash path onto the filesystem.
    fn on_disk(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn file(&mut self, path: &str, metadata: &Metadata) -> Result<Entry> {
        let mode = metadata_mode(metadata);
        let (mtime_secs, mtime_nanos) = metadata_mtime(metadata);
        let size = metadata.len();
        let executable = mode & ANY_EXECUTE_MASK != 0;

        // A cached digest is reusable if type bits, modification time, and
        // size are all unchanged.
        let digest = match self.cache.get(path) {
            Some(cached)
                if (cached.mode ^ mode) & MODE_TYPE_MASK == 0
                    && cached.mtime_secs == mtime_secs
                    && cached.mtime_nanos == mtime_nanos
                    && cached.size == size =>
            {
                cached.digest.clone()
            }
            _ => self.hash(path, size)?,
        };

        self.new_cache.insert(
            path.to_owned(),
            CacheEntry {
                mode,
                mtime_secs,
                mtime_nanos,
                size,
                digest: digest.clone(),
            },
        );

        Ok(Entry::File { executable, digest })
    }

    fn hash(&mut self, path: &str, size: u64) -> Result<Vec<u8>> {
        let on_disk = self.on_disk(path);
        let mut file = File::open(&on_disk).map_err(|source| SnapSyncError::Fs {
            op: "open file",
            path: on_disk.clone(),
            source,
        })?;

        self.hasher.reset();
        let mut hashed: u64 = 0;
        loop {
            let read = file
                .read(&mut self.buffer)
                .map_err(|source| SnapSyncError::Fs {
                    op: "read file",
                    path: on_disk.clone(),
                    source,
                })?;
            if read == 0 {
                break;
            }
            self.hasher.write(&self.buffer[..read]);
            hashed += read as u64;
        }

        // The stat that classified this entry reported a size; anything else
        // means the file changed underneath us and the snapshot would lie.
        if hashed != size {
            return Err(SnapSyncError::HashedSizeMismatch {
                path: on_disk,
                hashed,
                expected: size,
            });
        }

        Ok(self.hasher.sum())
    }

    fn symlink(&mut self, path: &str) -> Result<Entry> {
        let on_disk = self.on_disk(path);
        let target = fs::read_link(&on_disk).map_err(|source| SnapSyncError::Fs {
            op: "read symlink target",
            path: on_disk.clone(),
            source,
        })?;
        let target = target
            .into_os_string()
            .into_string()
            .map_err(|_| SnapSyncError::NonUtf8Name(on_disk))?;
        let target = symlink::normalize(path, &target, self.symlink_mode)?;
        Ok(Entry::Symlink { target })
    }

    fn directory(&mut self, path: &str) -> Result<Entry> {
        let on_disk = self.on_disk(path);
        let reader = fs::read_dir(&on_disk).map_err(|source| SnapSyncError::Fs {
            op: "read directory",
            path: on_disk.clone(),
            source,
        })?;

        let mut contents = HashMap::new();
        for dirent in reader {
            let dirent = dirent.map_err(|source| SnapSyncError::Fs {
                op: "read directory",
                path: on_disk.clone(),
                source,
            })?;
            let name = dirent
                .file_name()
                .into_string()
                .map_err(|_| SnapSyncError::NonUtf8Name(on_disk.clone()))?;

            let content_path = if path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", path, name)
            };

            if self.ignorer.ignored(&content_path) {
                continue;
            }

            // Stat without following. The entry may have vanished between
            // listing and stat; that race is survivable.
            let metadata = match fs::symlink_metadata(self.on_disk(&content_path)) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %content_path, "entry vanished during scan");
                    continue;
                }
                Err(source) => {
                    return Err(SnapSyncError::Fs {
                        op: "stat directory content",
                        path: self.on_disk(&content_path),
                        source,
                    })
                }
            };

            let file_type = metadata.file_type();
            let entry = if file_type.is_dir() {
                self.directory(&content_path)?
            } else if file_type.is_symlink() {
                if !SYMLINKS_SUPPORTED || self.symlink_mode == SymlinkMode::Ignore {
                    continue;
                }
                self.symlink(&content_path)?
            } else if file_type.is_file() {
                if self.size_limit > 0 && metadata.len() >= self.size_limit {
                    debug!(path = %content_path, size = metadata.len(), "skipping oversized file");
                    continue;
                }
                self.file(&content_path, &metadata)?
            } else {
                // Sockets, devices, and FIFOs have no snapshot representation.
                debug!(path = %content_path, "skipping unsupported entry kind");
                continue;
            };

            contents.insert(name, entry);
        }

        Ok(Entry::Directory { contents })
    }
}

/// Produces a snapshot of the tree under `root` along with a fresh digest
/// cache covering exactly the paths observed.
///
/// A missing root is a valid empty snapshot, not an error. The root is
/// stat'd with symlink-following semantics so it may itself be a link to a
/// file or directory; below the root, links are never followed. A `None`
/// cache is treated as empty, and `size_limit == 0` disables size filtering.
pub fn scan(
    root: &Path,
    hasher: &mut dyn Hasher,
    cache: Option<&Cache>,
    ignores: &[String],
    symlink_mode: SymlinkMode,
    size_limit: u64,
) -> Result<(Option<Entry>, Cache)> {
    if symlink_mode.is_default() {
        return Err(SnapSyncError::UnresolvedSymlinkMode);
    }

    let ignorer = PathIgnorer::new(ignores)?;

    let empty = Cache::new();
    let cache = cache.unwrap_or(&empty);
    let capacity = if cache.is_empty() {
        INITIAL_CACHE_CAPACITY
    } else {
        cache.len()
    };

    let mut scanner = Scanner {
        root,
        hasher,
        cache,
        ignorer,
        symlink_mode,
        size_limit,
        new_cache: Cache::with_capacity(capacity),
        buffer: vec![0u8; COPY_BUFFER_SIZE],
    };

    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok((None, scanner.new_cache));
        }
        Err(source) => {
            return Err(SnapSyncError::Fs {
                op: "probe snapshot root",
                path: root.to_owned(),
                source,
            })
        }
    };

    let file_type = metadata.file_type();
    let entry = if file_type.is_dir() {
        scanner.directory("")?
    } else if file_type.is_file() {
        scanner.file("", &metadata)?
    } else {
        return Err(SnapSyncError::InvalidRootType(root.to_owned()));
    };

    Ok((Some(entry), scanner.new_cache))
}
