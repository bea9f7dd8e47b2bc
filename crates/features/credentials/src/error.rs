use std::borrow::Cow;

/// Error types of the credential workflow.
///
/// Messages carry paths and error kinds only, never key strings or secret bytes.
#[flash_derive::flash_error]
pub enum CredentialsError {
    /// An input certificate or macaroon file could not be read.
    #[error("Input file error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Container storage error{}: {source}", format_context(.context))]
    Storage { source: flash_storage::StorageError, context: Option<Cow<'static, str>> },

    #[error("Vault error{}: {source}", format_context(.context))]
    Vault { source: flash_vault::VaultError, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal credentials error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl CredentialsError {
    /// The vault error kind, if this failure came from the vault.
    #[must_use]
    pub const fn vault_kind(&self) -> Option<flash_vault::ErrorKind> {
        match self {
            Self::Vault { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
