//! Sandboxed, atomic file I/O for vault containers.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance::{self, TMP_MARKER};
use crate::security;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// The internal shared state of a [`Storage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// Canonical physical root; every resolved path lives under it.
    pub(crate) root: PathBuf,
    /// Permission bits for written files (Unix only).
    pub(crate) file_mode: u32,
    pub(crate) tmp_counter: AtomicU64,
}

/// A cheaply clonable handle to a sandboxed directory.
///
/// All paths are relative to the root and validated against traversal. Writes replace the
/// target atomically, so a reader sees either the previous container or the new one, never
/// a torn file.
///
/// # Example
///
/// ```rust
/// use flash_storage::{Storage, StorageError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("vault");
///     let storage = Storage::builder().root(&root).create(true).connect().await?;
///
///     storage.write("auth.bin", b"sealed container").await?;
///     assert_eq!(storage.read("auth.bin").await?, b"sealed container");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    /// The canonical storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path to its physical location inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path is absolute or escapes the
    /// root, and [`StorageError::Io`] if an existing ancestor cannot be verified.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
        security::resolve_path(&self.root, path)
    }

    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the path does not exist and
    /// [`StorageError::Io`] for any other read failure.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, StorageError> {
        let resolved = self.resolve(path)?;

        match fs::read(&resolved).await {
            Ok(data) => {
                debug!(path = %resolved.display(), len = data.len(), "File read");
                Ok(data)
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    /// Writes a file atomically.
    ///
    /// The data goes to a unique `<name>.flashtmp.<pid>.<n>` sibling that is created exclusively,
    /// given the configured permissions, synced to disk, and renamed over the target. Any
    /// failure removes the temp file and leaves the previous target untouched. Missing parent
    /// directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the root and
    /// [`StorageError::Io`] if any filesystem step fails.
    pub async fn write(&self, path: impl AsRef<Path>, data: &[u8]) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;

        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create parent of {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(&resolved, &self.tmp_counter);

        if let Err(err) = self.swap_in(&temp, &resolved, data).await {
            if let Err(cleanup) = fs::remove_file(&temp).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %temp.display(), error = %cleanup, "Temp file cleanup failed");
            }
            return Err(err);
        }

        if let Some(parent) = resolved.parent() {
            Self::sync_dir(parent).await;
        }

        info!(path = %resolved.display(), len = data.len(), "File saved atomically");
        Ok(())
    }

    async fn swap_in(&self, temp: &Path, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        {
            let mut options = fs::OpenOptions::new();
            options.create_new(true).write(true);
            #[cfg(unix)]
            options.mode(self.file_mode);

            let mut file = options
                .open(temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        // Creation mode is filtered by the umask; set the exact bits.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp, std::fs::Permissions::from_mode(self.file_mode))
                .await
                .context(format!("Failed to set permissions on {}", temp.display()))?;
        }

        match fs::rename(temp, target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                fs::remove_file(target)
                    .await
                    .context(format!("Failed to replace existing file: {}", target.display()))?;
                fs::rename(temp, target).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    target.display()
                ))
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                        .into(),
                ),
            }),
        }
    }

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the file does not exist and
    /// [`StorageError::Io`] if it cannot be removed.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {
                debug!(path = %resolved.display(), "File deleted");
                Ok(())
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to delete: {}", resolved.display()).into()),
            }),
        }
    }

    /// Checks whether a regular file exists inside the root.
    ///
    /// A missing path or a directory is `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathTraversalAttempt`] if the path escapes the root and
    /// [`StorageError::Io`] if the target cannot be examined.
    pub async fn exists(&self, path: impl AsRef<Path>) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        match fs::metadata(&resolved).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to check: {}", resolved.display()).into()),
            }),
        }
    }

    /// Filesystem metadata of a file inside the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the target does not exist and
    /// [`StorageError::Io`] for other failures.
    pub async fn metadata(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<std::fs::Metadata, StorageError> {
        let resolved = self.resolve(path)?;
        match fs::metadata(&resolved).await {
            Ok(meta) => Ok(meta),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound {
                    message: resolved.display().to_string().into(),
                    context: None,
                })
            },
            Err(err) => Err(StorageError::Io {
                source: err,
                context: Some(format!("Failed to get metadata: {}", resolved.display()).into()),
            }),
        }
    }

    /// Removes stale temp files under the root. Returns how many were deleted.
    pub async fn purge_tmp(&self) -> usize {
        maintenance::purge_tmp(&self.root).await
    }

    async fn sync_dir(path: &Path) {
        match fs::File::open(path).await {
            Ok(dir) => {
                if let Err(err) = dir.sync_all().await {
                    warn!(path = %path.display(), error = %err, "Directory sync failed");
                }
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Directory open failed");
            },
        }
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let n = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("container");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{}.{n}", std::process::id()))
}
