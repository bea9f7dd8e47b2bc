//! A small sandboxed storage engine for sealed credential containers.
//!
//! # Core Features
//!
//! - **Sandbox Security**: relative paths only, with `..` collapsed lexically and the result
//!   checked against the canonical root so symlinks cannot escape it.
//! - **Atomic Writes**: unique temp file, `fsync`, then `rename` over the target. A failed
//!   write removes its temp file and never truncates the previous container.
//! - **Private by Default**: written files get mode `0600` on Unix unless configured otherwise.
//! - **Self-Healing**: temp files left by a crashed writer are purged on connect.
//!
//! # Examples
//!
//! ```rust
//! use flash_storage::{Storage, StorageError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let storage = Storage::builder()
//!         .root(tmp.path())
//!         .permissions(0o640)
//!         .connect()
//!         .await?;
//!
//!     storage.write("node/auth.bin", b"container").await?;
//!     assert!(storage.exists("node/auth.bin").await?);
//!     assert!(storage.resolve("../outside.bin").is_err());
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::{DEFAULT_FILE_MODE, StorageBuilder};
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
