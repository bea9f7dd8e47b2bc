use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn traversal(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Collapses `.` and `..` lexically; `..` may never climb above the root.
pub(crate) fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(path, "'..' climbs above the storage root"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(traversal(path, "absolute paths are not allowed"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(traversal(path, "path does not name a file"));
    }

    Ok(out)
}

/// Joins `path` to `root` and checks that the result, symlinks included, stays under it.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let path = path.as_ref();
    let joined = root.join(normalize_relative(path)?);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(traversal(&canonical, "resolves outside the storage root")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_ancestors(root, &joined),
        Err(e) => Err(StorageError::Io {
            source: e,
            context: Some(format!("Failed to resolve {}", joined.display()).into()),
        }),
    }
}

/// For a path that does not exist yet, the nearest existing ancestor must live under the root.
fn validate_ancestors(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(ancestor) = current {
        if ancestor == root {
            return Ok(joined.to_path_buf());
        }
        if ancestor.exists() {
            return match ancestor.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(_) => Err(traversal(ancestor, "parent directory links outside the storage root")),
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }
        current = ancestor.parent();
    }

    Err(traversal(joined, "no parent directory inside the storage root"))
}
