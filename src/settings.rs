//! Per-directory default settings for each operation kind.
//!
//! A buildfile may override the settings of an operation kind for its
//! directory; subdirectories inherit the nearest override, and directories
//! with no override anywhere above them get the kind's built-in default.

use crate::error::{Error, Result};
use crate::kind::OperationKind;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Configuration of one operation, one concrete type per operation kind.
/// Values are copied, never shared, whenever they cross into or out of the
/// store.
pub trait OperationSettings: Any + Debug + Send + Sync {
    fn clone_settings(&self) -> Box<dyn OperationSettings>;

    fn as_any(&self) -> &dyn Any;

    /// Applies `key = value` as written in the buildfile of directory `base`
    /// (absolute), which relative paths in `value` are resolved against.
    fn assign(&mut self, key: &str, value: &str, base: &Path) -> Result<()>;

    /// Directories searched when crawling #includes of source inputs.
    fn include_dirs(&self) -> &[PathBuf] {
        &[]
    }
}

impl Clone for Box<dyn OperationSettings> {
    fn clone(&self) -> Self {
        self.clone_settings()
    }
}

#[derive(Default)]
pub struct SettingsStore {
    /// Built-in defaults, queried once per kind.
    builtin: FxHashMap<String, Box<dyn OperationSettings>>,
    /// Root-relative directory => kind name => override.
    overrides: FxHashMap<PathBuf, FxHashMap<String, Box<dyn OperationSettings>>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        SettingsStore::default()
    }

    fn builtin(&mut self, kind: &dyn OperationKind) -> &dyn OperationSettings {
        &**self
            .builtin
            .entry(kind.name().to_string())
            .or_insert_with(|| kind.default_settings())
    }

    /// The nearest override at or above `dir`.  Directories are relative to
    /// the project root, so the walk stops at the root.
    fn inherited(&self, dir: &Path, kind: &str) -> Option<&dyn OperationSettings> {
        let mut cur = Some(dir);
        while let Some(d) = cur {
            if let Some(settings) = self.overrides.get(d).and_then(|m| m.get(kind)) {
                return Some(settings.as_ref());
            }
            cur = d.parent();
        }
        None
    }

    /// A copy of the settings in effect for `dir`, leaving the store as is.
    pub fn lookup(&mut self, dir: &Path, kind: &dyn OperationKind) -> Box<dyn OperationSettings> {
        if let Some(settings) = self.inherited(dir, kind.name()) {
            return settings.clone_settings();
        }
        self.builtin(kind).clone_settings()
    }

    /// The settings for `dir`, materialized as `dir`'s own override on first
    /// use.  Mutating the result affects `dir` and the directories beneath
    /// it only.
    pub fn get_effective(
        &mut self,
        dir: &Path,
        kind: &dyn OperationKind,
    ) -> &mut dyn OperationSettings {
        let settings = self.lookup(dir, kind);
        self.overrides
            .entry(dir.to_path_buf())
            .or_default()
            .entry(kind.name().to_string())
            .or_insert(settings)
            .as_mut()
    }

    /// Replaces `dir`'s override with a copy of `settings`.
    pub fn set_override(
        &mut self,
        dir: &Path,
        kind: &dyn OperationKind,
        settings: &dyn OperationSettings,
    ) -> Result<()> {
        if settings.as_any().type_id() != self.builtin(kind).as_any().type_id() {
            return Err(Error::SettingsShape(kind.name().to_string()));
        }
        self.overrides
            .entry(dir.to_path_buf())
            .or_default()
            .insert(kind.name().to_string(), settings.clone_settings());
        Ok(())
    }
}
