//! Errors surfaced while resolving, planning and executing builds.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{marker:?} was not found in {} or any parent directory", .start.display())]
    RootNotFound {
        marker: &'static str,
        start: PathBuf,
    },

    #[error("{marker:?} not found in directory {dir:?}")]
    BuildfileNotFound { marker: &'static str, dir: String },

    #[error("{} is not under the project root", .0.display())]
    OutsideRoot(PathBuf),

    #[error("target {name:?} declared twice in {dir:?}")]
    DuplicateTarget { dir: String, name: String },

    #[error("target {0:?} is already the output of an operation")]
    AlreadyOwned(String),

    #[error("settings provided for operation kind {0:?} have the wrong type")]
    SettingsShape(String),

    #[error("unknown setting {key:?} for operation kind {kind:?}")]
    UnknownSetting { kind: String, key: String },

    #[error("{0:?} is not an operation kind")]
    UnknownKind(String),

    #[error("operation kind {0:?} declared twice")]
    DuplicateKind(String),

    #[error("recursive buildfile dependencies detected: {}", .0.join(" -> "))]
    CyclicBuildfiles(Vec<String>),

    #[error("cyclic dependency detected for target {0:?}")]
    CyclicOperations(String),

    #[error("the target {0:?} was not found")]
    TargetNotFound(String),

    #[error("no default target was set in {0:?}")]
    NoDefaultTarget(String),

    #[error("the target {0:?} is not the output of any operation")]
    NotBuildable(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Parse(String),

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{op}: {err:#}")]
    Execution { op: String, err: anyhow::Error },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Formats a root-relative directory key for messages; the root is ".".
pub fn dir_name(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.to_string_lossy().replace('\\', "/")
    }
}
