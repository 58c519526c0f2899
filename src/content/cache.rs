//! Content-hash keyed parse cache.
//!
//! Watch mode re-runs the whole loader on every change. Each file is still
//! read, but a file whose bytes hash to the same [`blake3`] digest as last
//! time reuses its previous parse result.

use super::loader::Parsed;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ParseCache {
    entries: RwLock<FxHashMap<PathBuf, (blake3::Hash, Parsed)>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `path` if its content still hashes to `hash`.
    pub fn get(&self, path: &Path, hash: &blake3::Hash) -> Option<Parsed> {
        let entries = self.entries.read();
        entries
            .get(path)
            .filter(|(cached, _)| cached == hash)
            .map(|(_, parsed)| parsed.clone())
    }

    pub fn insert(&self, path: PathBuf, hash: blake3::Hash, parsed: Parsed) {
        self.entries.write().insert(path, (hash, parsed));
    }

    /// Drop entries whose files were not seen in the latest walk.
    pub fn retain(&self, keep: impl Fn(&Path) -> bool) {
        self.entries.write().retain(|path, _| keep(path));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
