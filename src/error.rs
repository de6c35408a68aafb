use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum SnapSyncError {
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid ignore pattern {0:?}")]
    InvalidPattern(String),

    #[error("pattern error: {0}")]
    Pattern(#[from] globset::Error),

    #[error("unknown symlink mode: {0}")]
    InvalidSymlinkMode(String),

    #[error("symlink mode must be resolved before scanning")]
    UnresolvedSymlinkMode,

    #[error("invalid snapshot root type: {0}")]
    InvalidRootType(PathBuf),

    #[error("unable to {op} {path}: {source}")]
    Fs {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("non-UTF-8 name in directory {0}")]
    NonUtf8Name(PathBuf),

    #[error("hashed size mismatch for {path}: hashed {hashed} bytes, stat reported {expected}")]
    HashedSizeMismatch {
        path: PathBuf,
        hashed: u64,
        expected: u64,
    },

    #[error("unportable symlink {path}: {reason}")]
    UnportableSymlink { path: String, reason: &'static str },

    #[error("SSH connection failed: {0}")]
    SshConnection(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("remote command failed: {0}")]
    RemoteCommand(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connect cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
