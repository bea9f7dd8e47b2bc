use crate::engine::{Storage, StorageInner};
use crate::error::{StorageError, StorageErrorExt};
use crate::maintenance;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::info;

/// Owner read/write only; containers hold secrets.
pub const DEFAULT_FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone)]
struct StorageConfig {
    create: bool,
    file_mode: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { create: true, file_mode: DEFAULT_FILE_MODE }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets whether the storage root should be created if it does not exist"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    /// Unix permission bits applied to every written file. Ignored on other platforms.
    #[must_use = "Sets the permission bits of written files"]
    pub const fn permissions(mut self, mode: u32) -> Self {
        self.config.file_mode = mode & 0o7777;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, config: self.config }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the root directory of the storage sandbox"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Opens the storage root.
    ///
    /// Creates the directory when `create(true)` is set, canonicalizes it so symlinks cannot
    /// be used to escape, and removes temp files that a crashed writer left behind.
    /// Cleanup failures are logged and never fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the root is missing and `create` is false, or if it
    /// cannot be created or resolved.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let root = &self.state.0;

        if self.config.create && fs::metadata(root).await.is_err() {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to create storage root: {}", root.display()))?;
            info!(path = %root.display(), "Created storage root directory");
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        maintenance::purge_tmp(&canonical).await;

        Ok(Storage {
            inner: Arc::new(StorageInner {
                root: canonical,
                file_mode: self.config.file_mode,
                tmp_counter: AtomicU64::new(1),
            }),
        })
    }
}
