//! Resolution of the buildfile tree: which directories have been evaluated,
//! the targets each declared, and the state buildfiles share.

use crate::canon::{canon_path, relative_to};
use crate::error::{dir_name, Error, Result};
use crate::graph::{Graph, TargetId, TargetKind};
use crate::kind::{OperationKind, Registry};
use crate::settings::SettingsStore;
use crate::trace;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File marking the top of the project tree.
pub const ROOT_MARKER: &str = "buildroot";
/// File holding a directory's build declarations.
pub const BUILDFILE_MARKER: &str = "buildfile";

/// What evaluating one directory's buildfile produced.
#[derive(Debug)]
pub struct BuildfileModule {
    /// Root-relative directory.
    pub dir: PathBuf,
    /// Targets declared at the buildfile's top level, by name.
    pub targets: BTreeMap<String, TargetId>,
}

/// Evaluates buildfiles.  Called at most once per directory per invocation.
pub trait Evaluate: Send + Sync {
    /// Evaluates the buildfile of root-relative `dir`, declaring its targets
    /// and operations in `project`, and returns the targets by name.
    fn evaluate(&self, project: &mut Project, dir: &Path) -> Result<Vec<(String, TargetId)>>;
}

/// Finds the project root: the nearest directory at or above `start` holding
/// the root marker.
pub fn find_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(ROOT_MARKER).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::RootNotFound {
            marker: ROOT_MARKER,
            start: start.to_path_buf(),
        })
}

/// Splits a target string `"dir/sub/name"` into directory and name parts.
/// Either may be empty.
pub fn split_target(target: &str) -> (&str, &str) {
    match target.rfind('/') {
        Some(i) => (&target[..i], &target[i + 1..]),
        None => ("", target),
    }
}

pub struct Project {
    /// Absolute, canonical project root.
    root: PathBuf,
    evaluator: Arc<dyn Evaluate>,
    pub graph: Graph,
    pub settings: SettingsStore,
    kinds: Registry,
    /// Resolved buildfiles by root-relative directory.
    modules: FxHashMap<PathBuf, Arc<BuildfileModule>>,
    /// Directories currently being resolved, outermost first.
    active: Vec<PathBuf>,
    defaults: FxHashMap<PathBuf, TargetId>,
}

impl Project {
    pub fn new(root: &Path, evaluator: Arc<dyn Evaluate>) -> Self {
        Project {
            root: canon_path(root),
            evaluator,
            graph: Graph::new(),
            settings: SettingsStore::new(),
            kinds: Registry::default(),
            modules: FxHashMap::default(),
            active: Vec::new(),
            defaults: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The root-relative form of absolute directory `dir`.
    pub fn relative(&self, dir: &Path) -> Result<PathBuf> {
        relative_to(dir, &self.root).ok_or_else(|| Error::OutsideRoot(dir.to_path_buf()))
    }

    pub fn register_kind(&mut self, kind: Arc<dyn OperationKind>) -> Result<()> {
        self.kinds.register(kind)
    }

    pub fn kind(&self, name: &str) -> Result<Arc<dyn OperationKind>> {
        self.kinds.get(name)
    }

    /// Declares a target named `name` in root-relative `dir`.  Its full name
    /// is qualified with the directory.
    pub fn add_target(
        &mut self,
        dir: &Path,
        name: &str,
        path: PathBuf,
        kind: TargetKind,
    ) -> TargetId {
        let full_name = if dir.as_os_str().is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", dir_name(dir), name)
        };
        self.graph.add_target(full_name, path, kind)
    }

    /// Resolves the buildfile in absolute directory `dir`, evaluating it and
    /// its implicit parent first if needed.
    pub fn resolve(&mut self, dir: &Path) -> Result<Arc<BuildfileModule>> {
        let dir = self.relative(dir)?;
        self.resolve_relative(&dir)
    }

    fn resolve_relative(&mut self, dir: &Path) -> Result<Arc<BuildfileModule>> {
        if !self.root.join(dir).join(BUILDFILE_MARKER).is_file() {
            return Err(Error::BuildfileNotFound {
                marker: BUILDFILE_MARKER,
                dir: dir_name(dir),
            });
        }
        if self.active.iter().any(|d| d == dir) {
            let mut chain: Vec<String> = self.active.iter().map(|d| dir_name(d)).collect();
            chain.push(dir_name(dir));
            return Err(Error::CyclicBuildfiles(chain));
        }
        if let Some(module) = self.modules.get(dir) {
            return Ok(module.clone());
        }

        self.active.push(dir.to_path_buf());
        let result = self.evaluate(dir);
        self.active.pop();

        let mut targets = BTreeMap::new();
        for (name, id) in result? {
            if targets.contains_key(&name) {
                return Err(Error::DuplicateTarget {
                    dir: dir_name(dir),
                    name,
                });
            }
            targets.insert(name, id);
        }
        let module = Arc::new(BuildfileModule {
            dir: dir.to_path_buf(),
            targets,
        });
        self.modules.insert(dir.to_path_buf(), module.clone());
        Ok(module)
    }

    /// Evaluates `dir`'s buildfile after its nearest ancestor buildfile, so
    /// that settings and rules declared above are visible.
    fn evaluate(&mut self, dir: &Path) -> Result<Vec<(String, TargetId)>> {
        let parent = dir
            .ancestors()
            .skip(1)
            .find(|d| self.root.join(d).join(BUILDFILE_MARKER).is_file());
        if let Some(parent) = parent {
            self.resolve_relative(parent)?;
        }
        let evaluator = self.evaluator.clone();
        trace::scope("evaluate", || evaluator.evaluate(self, dir))
    }

    pub fn set_default_target(&mut self, dir: &Path, target: TargetId) {
        self.defaults.insert(dir.to_path_buf(), target);
    }

    pub fn default_target(&self, dir: &Path) -> Option<TargetId> {
        self.defaults.get(dir).copied()
    }

    /// Resolves a target string against absolute directory `from`.
    /// `"dir/name"` names a target in the buildfile of `from/dir`; an empty
    /// name (`""` or `"dir/"`) selects that buildfile's default target.
    pub fn lookup_target(&mut self, from: &Path, target: &str) -> Result<TargetId> {
        let (dir, name) = split_target(target);
        let module = self.resolve(&canon_path(from.join(dir)))?;
        if name.is_empty() {
            return self
                .default_target(&module.dir)
                .ok_or_else(|| Error::NoDefaultTarget(dir_name(&module.dir)));
        }
        module
            .targets
            .get(name)
            .copied()
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))
    }
}
