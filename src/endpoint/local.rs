use std::path::PathBuf;

use tracing::debug;

use crate::endpoint::Endpoint;
use crate::scanner::{self, Blake3Hasher, Cache, Entry, PathIgnorer, SymlinkMode};
use crate::Result;

/// In-process endpoint scanning a root on the local filesystem.
///
/// The digest cache is carried across scans so an unchanged tree costs one
/// metadata pass and no rehashing.
pub struct LocalEndpoint {
    session: String,
    version: u32,
    root: PathBuf,
    ignores: Vec<String>,
    alpha: bool,
    symlink_mode: SymlinkMode,
    hasher: Blake3Hasher,
    cache: Cache,
}

impl LocalEndpoint {
    pub fn new(
        session: &str,
        version: u32,
        path: &str,
        ignores: &[String],
        alpha: bool,
    ) -> Result<Self> {
        // Surface bad ignore patterns at connect time, not first scan.
        PathIgnorer::new(ignores)?;
        debug!(session, version, root = %path, alpha, "created local endpoint");
        Ok(Self {
            session: session.to_owned(),
            version,
            root: PathBuf::from(path),
            ignores: ignores.to_vec(),
            alpha,
            symlink_mode: SymlinkMode::Portable,
            hasher: Blake3Hasher::new(),
            cache: Cache::new(),
        })
    }
}

impl Endpoint for LocalEndpoint {
    fn scan(&mut self) -> Result<Option<Entry>> {
        debug!(
            session = %self.session,
            version = self.version,
            alpha = self.alpha,
            "scanning local endpoint"
        );
        let (root, cache) = scanner::scan(
            &self.root,
            &mut self.hasher,
            Some(&self.cache),
            &self.ignores,
            self.symlink_mode,
            0,
        )?;
        self.cache = cache;
        Ok(root)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
