//! # Credentials
//!
//! Ties the vault codec to the filesystem: read a node certificate and macaroon, seal them
//! into a container under a fresh key, write it atomically, and later open or inspect it.
//!
//! The key string returned by [`seal_files`] is never stored by this crate. Callers decide
//! where it goes.

mod error;
pub mod workflow;

pub use crate::error::{CredentialsError, CredentialsErrorExt};
pub use crate::workflow::{SealReport, inspect_file, open_file, seal_files};
