//! Path canonicalization.

use std::path::{Component, Path, PathBuf};

/// Lexically canonicalize a path, removing redundant components.
/// Does not access the disk, but only simplifies things like
/// "foo/./bar" => "foo/bar" and "foo/../bar" => "bar".
/// These paths show up when buildfiles refer to sibling directories.
pub fn canon_path<P: AsRef<Path>>(inpath: P) -> PathBuf {
    let mut path = PathBuf::new();
    // Count of components in `path` that a ".." is allowed to back up over.
    let mut depth = 0usize;
    for component in inpath.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    path.pop();
                    depth -= 1;
                } else if !path.has_root() {
                    path.push("..");
                }
            }
            Component::Normal(c) => {
                path.push(c);
                depth += 1;
            }
            Component::RootDir | Component::Prefix(_) => path.push(component.as_os_str()),
        }
    }
    path
}

/// Returns `path` relative to `base`, or None if it lies outside of it.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    canon_path(path)
        .strip_prefix(canon_path(base))
        .ok()
        .map(Path::to_path_buf)
}
