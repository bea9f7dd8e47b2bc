//! # Vault Errors
//!
//! This module defines the [`VaultError`] enum used throughout the vault crate for
//! reporting entropy, key encoding, container format, and authentication failures.
//!
//! None of the messages produced here ever contain key material or plaintext.

use std::borrow::Cow;

/// A specialized [`VaultError`] enum for credential vault failures.
#[flash_derive::flash_error]
pub enum VaultError {
    /// The operating system's secure random source failed during key or nonce generation.
    ///
    /// This indicates a broken environment and must never be retried with a weaker source.
    #[error("Entropy source unavailable{}: {message}", format_context(.context))]
    Entropy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The key string is not valid hex, or does not decode into a usable AES-256-GCM keyset.
    #[error("Invalid key encoding{}: {message}", format_context(.context))]
    KeyEncoding { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The container is truncated, its header is malformed, or its header disagrees
    /// with the decrypted payload.
    #[error("Invalid container format{}: {message}", format_context(.context))]
    ContainerFormat { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// AEAD verification failed.
    ///
    /// A wrong key and tampered data are deliberately reported the same way.
    #[error("Authentication failed{}: {message}", format_context(.context))]
    Authentication { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// A stable, matchable classification of [`VaultError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Entropy,
    KeyEncoding,
    ContainerFormat,
    Authentication,
    Internal,
}

impl VaultError {
    /// Returns the error category without any message payload.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Entropy { .. } => ErrorKind::Entropy,
            Self::KeyEncoding { .. } => ErrorKind::KeyEncoding,
            Self::ContainerFormat { .. } => ErrorKind::ContainerFormat,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub(crate) fn key_encoding(message: impl Into<Cow<'static, str>>) -> Self {
        Self::KeyEncoding { message: message.into(), context: None }
    }

    pub(crate) fn container_format(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ContainerFormat { message: message.into(), context: None }
    }

    pub(crate) const fn authentication() -> Self {
        Self::Authentication { message: Cow::Borrowed("ciphertext could not be verified"), context: None }
    }

    pub(crate) fn entropy(source: &getrandom::Error) -> Self {
        Self::Entropy { message: source.to_string().into(), context: None }
    }
}
