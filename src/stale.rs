//! Decides whether an operation's outputs are out of date.
//!
//! Timestamps are gathered lazily and cached for the whole invocation, on
//! the assumption that nothing but our own operations modifies the tree
//! while we build.  The scheduler forgets an operation's outputs once it
//! has run, so its consumers see the new timestamps.  Any
//! file we fail to stat or read makes the answer "stale": rebuilding is
//! always safe, skipping is not.

use crate::canon::canon_path;
use crate::fs::{FileSystem, MTime};
use crate::graph::{Graph, Operation, Target, TargetKind};
use crate::includes::{self, Include};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Staleness oracle.  Shared by all scheduler threads; cache misses may be
/// computed more than once under contention, which is harmless.
pub struct Oracle {
    fs: Arc<dyn FileSystem>,
    /// None when the stat itself failed.
    mtimes: DashMap<PathBuf, Option<MTime>>,
    /// None when the file could not be read or scanned.
    includes: DashMap<PathBuf, Option<Arc<[Include]>>>,
}

impl Oracle {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Oracle {
            fs,
            mtimes: DashMap::new(),
            includes: DashMap::new(),
        }
    }

    fn stat(&self, path: &Path) -> Option<MTime> {
        let cached = self.mtimes.get(path).map(|entry| *entry);
        if let Some(mtime) = cached {
            return mtime;
        }
        let mtime = self.fs.stat(path).ok();
        self.mtimes.insert(path.to_path_buf(), mtime);
        mtime
    }

    /// Drops everything cached about `path`, which was just (re)written.
    pub fn forget(&self, path: &Path) {
        self.mtimes.remove(path);
        self.includes.remove(path);
    }

    /// The file's mtime, or None if it is missing or cannot be stat'd.
    pub fn file_mtime(&self, path: &Path) -> Option<SystemTime> {
        match self.stat(path) {
            Some(MTime::Stamp(t)) => Some(t),
            _ => None,
        }
    }

    fn includes(&self, path: &Path) -> Option<Arc<[Include]>> {
        let cached = self.includes.get(path).map(|entry| entry.value().clone());
        if let Some(includes) = cached {
            return includes;
        }
        let includes: Option<Arc<[Include]>> = self
            .fs
            .read(path)
            .ok()
            .and_then(|text| includes::scan(&text))
            .map(Arc::from);
        self.includes.insert(path.to_path_buf(), includes.clone());
        includes
    }

    /// Finds the file an include refers to the way a compiler would.
    /// Ok(None) means it is in none of the searched directories.
    fn resolve_include(
        &self,
        from: &Path,
        include: &Include,
        include_dirs: &[PathBuf],
    ) -> Result<Option<PathBuf>, ()> {
        let local = match (include.quoted, from.parent()) {
            (true, Some(dir)) => Some(dir),
            _ => None,
        };
        for dir in local.into_iter().chain(include_dirs.iter().map(PathBuf::as_path)) {
            let candidate = canon_path(dir.join(&include.path));
            match self.stat(&candidate) {
                Some(MTime::Stamp(_)) => return Ok(Some(candidate)),
                Some(MTime::Missing) => {}
                None => return Err(()),
            }
        }
        Ok(None)
    }

    /// Newest mtime across `path` and everything it transitively includes.
    /// Includes found in no search directory (e.g. system headers) are
    /// skipped.
    pub fn source_mtime(&self, path: &Path, include_dirs: &[PathBuf]) -> Option<SystemTime> {
        let path = canon_path(path);
        let mut newest: Option<SystemTime> = None;
        let mut seen = FxHashSet::default();
        seen.insert(path.clone());
        let mut stack = vec![path];
        while let Some(path) = stack.pop() {
            let mtime = self.file_mtime(&path)?;
            newest = Some(newest.map_or(mtime, |n| n.max(mtime)));

            for include in self.includes(&path)?.iter() {
                let found = match self.resolve_include(&path, include, include_dirs) {
                    Ok(found) => found,
                    Err(()) => return None,
                };
                if let Some(found) = found {
                    if seen.insert(found.clone()) {
                        stack.push(found);
                    }
                }
            }
        }
        newest
    }

    /// The timestamp `target` contributes when checking `op`, which is the
    /// operation consuming or producing it.
    pub fn target_mtime(&self, target: &Target, op: &Operation) -> Option<SystemTime> {
        match target.kind {
            TargetKind::File => self.file_mtime(&target.path),
            TargetKind::Source => self.source_mtime(&target.path, op.settings.include_dirs()),
        }
    }

    /// Whether `op` must run: some input is newer than some output, or any
    /// timestamp is unavailable.  Equal timestamps count as up to date.
    pub fn is_stale(&self, graph: &Graph, op: &Operation) -> bool {
        let mut newest_in: Option<SystemTime> = None;
        for &id in op.ins() {
            match self.target_mtime(graph.target(id), op) {
                None => return true,
                Some(t) => newest_in = Some(newest_in.map_or(t, |n| n.max(t))),
            }
        }
        for &id in op.outs() {
            match self.target_mtime(graph.target(id), op) {
                None => return true,
                Some(out) => {
                    if newest_in.map_or(false, |newest| newest > out) {
                        return true;
                    }
                }
            }
        }
        false
    }
}
