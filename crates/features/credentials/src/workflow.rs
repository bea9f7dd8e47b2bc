//! File-level seal, open, and inspect operations.

use crate::error::{CredentialsError, CredentialsErrorExt};
use flash_storage::Storage;
use flash_vault::{Credentials, EnvelopeFormat, Header, KeyString};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Outcome of sealing a certificate and macaroon into a container.
#[derive(Debug)]
pub struct SealReport {
    /// The only way back into the container. Show it once, store it elsewhere.
    pub key: KeyString,
    /// Physical path of the written container.
    pub output: PathBuf,
    pub header: Header,
    /// Total container size in bytes.
    pub container_len: usize,
}

/// Reads a certificate and a macaroon, seals them under a fresh key, and writes the
/// container to `output` inside the storage root.
///
/// Input paths are read as given; `output` is relative to the storage root and replaced
/// atomically if it already exists.
///
/// # Errors
///
/// * [`CredentialsError::Io`] if an input file cannot be read.
/// * [`CredentialsError::Vault`] if sealing fails (entropy, oversized input).
/// * [`CredentialsError::Storage`] if the container cannot be written.
pub async fn seal_files(
    storage: &Storage,
    certificate: impl AsRef<Path>,
    macaroon: impl AsRef<Path>,
    output: impl AsRef<Path>,
    format: EnvelopeFormat,
) -> Result<SealReport, CredentialsError> {
    let certificate = read_input(certificate.as_ref()).await?;
    let macaroon = read_input(macaroon.as_ref()).await?;

    let sealed = flash_vault::seal_as(format, &certificate, &macaroon)
        .context("Failed to seal credentials")?;
    let header = flash_vault::inspect(&sealed.container).context("Sealed header unreadable")?;

    let output = output.as_ref();
    storage
        .write(output, &sealed.container)
        .await
        .context(format!("Failed to persist container {}", output.display()))?;
    let physical = storage.resolve(output).context("Failed to resolve container path")?;

    info!(
        path = %physical.display(),
        %format,
        certificate_len = header.certificate_len,
        macaroon_len = header.macaroon_len,
        "Credentials sealed"
    );

    Ok(SealReport {
        key: sealed.key,
        output: physical,
        header,
        container_len: sealed.container.len(),
    })
}

/// Reads a container from storage and decrypts it with `key`.
///
/// # Errors
///
/// * [`CredentialsError::Storage`] if the container cannot be read.
/// * [`CredentialsError::Vault`] for a malformed key, a malformed container, or a failed
///   authentication check.
pub async fn open_file(
    storage: &Storage,
    key: &str,
    container: impl AsRef<Path>,
    format: EnvelopeFormat,
) -> Result<Credentials, CredentialsError> {
    let path = container.as_ref();
    let bytes = storage
        .read(path)
        .await
        .context(format!("Failed to load container {}", path.display()))?;

    let credentials = flash_vault::open_as(format, key, &bytes)
        .context(format!("Failed to open container {}", path.display()))?;

    debug!(
        path = %path.display(),
        certificate_len = credentials.certificate().len(),
        macaroon_len = credentials.macaroon().len(),
        "Container opened"
    );
    Ok(credentials)
}

/// Reads only the header of a stored container. Nothing is authenticated.
///
/// # Errors
///
/// Returns [`CredentialsError::Storage`] if the container cannot be read and
/// [`CredentialsError::Vault`] if it is shorter than a header.
pub async fn inspect_file(
    storage: &Storage,
    container: impl AsRef<Path>,
) -> Result<Header, CredentialsError> {
    let path = container.as_ref();
    let bytes = storage
        .read(path)
        .await
        .context(format!("Failed to load container {}", path.display()))?;

    flash_vault::inspect(&bytes).context(format!("Unreadable header in {}", path.display()))
}

async fn read_input(path: &Path) -> Result<Zeroizing<Vec<u8>>, CredentialsError> {
    let data = fs::read(path).await.context(format!("Failed to read {}", path.display()))?;
    debug!(path = %path.display(), len = data.len(), "Input loaded");
    Ok(Zeroizing::new(data))
}
