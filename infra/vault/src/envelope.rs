//! # Envelope Codec
//!
//! Packs a certificate and a macaroon into one container:
//!
//! ```text
//! [HEADER(8): certLength u32 BE || macaroonLength u32 BE][AEAD CIPHERTEXT of cert || macaroon]
//! ```
//!
//! With [`EnvelopeFormat::Detached`] the header is outside the authenticated region, so
//! it is only trusted after decryption, when its lengths must sum to the plaintext length.
//! [`EnvelopeFormat::Bound`] keeps the same layout but feeds the header to the AEAD as
//! associated data.

use crate::aead::Cipher;
use crate::error::VaultError;
use crate::header::Header;
use crate::keyset::{Keyset, generate_key, parse_key};
use crate::types::{Credentials, SealedCredentials};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Whether the cleartext header is covered by the AEAD tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    /// Header is not authenticated. Byte-compatible with existing containers.
    #[default]
    Detached,
    /// Header bytes are passed as associated data.
    Bound,
}

impl EnvelopeFormat {
    fn associated_data(self, header: &[u8; Header::SIZE]) -> &[u8] {
        match self {
            Self::Detached => &[],
            Self::Bound => header,
        }
    }
}

impl fmt::Display for EnvelopeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detached => "detached",
            Self::Bound => "bound",
        })
    }
}

/// Seals both secrets under a freshly generated key.
///
/// # Errors
/// * [`VaultError::Entropy`] if the RNG fails.
/// * [`VaultError::ContainerFormat`] if a buffer is longer than `u32::MAX`.
pub fn seal(certificate: &[u8], macaroon: &[u8]) -> Result<SealedCredentials, VaultError> {
    seal_as(EnvelopeFormat::Detached, certificate, macaroon)
}

/// Seals both secrets under a freshly generated key with an explicit envelope format.
///
/// # Errors
/// See [`seal`].
pub fn seal_as(
    format: EnvelopeFormat,
    certificate: &[u8],
    macaroon: &[u8],
) -> Result<SealedCredentials, VaultError> {
    // Reject oversized input before spending entropy on a key.
    Header::new(certificate.len(), macaroon.len())?;

    let key = generate_key()?;
    let keyset = parse_key(key.expose())?;
    let container = seal_with(&keyset, certificate, macaroon, format)?;

    Ok(SealedCredentials { key, container })
}

/// Seals both secrets under an existing keyset.
///
/// # Errors
/// See [`seal`].
pub fn seal_with(
    keyset: &Keyset,
    certificate: &[u8],
    macaroon: &[u8],
    format: EnvelopeFormat,
) -> Result<Vec<u8>, VaultError> {
    let header = Header::new(certificate.len(), macaroon.len())?.to_bytes();

    let mut bundle = Zeroizing::new(Vec::with_capacity(certificate.len() + macaroon.len()));
    bundle.extend_from_slice(certificate);
    bundle.extend_from_slice(macaroon);

    let ciphertext = Cipher::new(keyset)?.encrypt(&bundle, format.associated_data(&header))?;

    let mut container = Vec::with_capacity(Header::SIZE + ciphertext.len());
    container.extend_from_slice(&header);
    container.extend_from_slice(&ciphertext);

    debug!(
        certificate_len = certificate.len(),
        macaroon_len = macaroon.len(),
        container_len = container.len(),
        %format,
        "Credentials sealed"
    );
    Ok(container)
}

/// Opens a detached-format container with a key string.
///
/// # Errors
/// * [`VaultError::ContainerFormat`] if the container is shorter than the header, or the
///   header disagrees with the decrypted payload.
/// * [`VaultError::KeyEncoding`] if the key string cannot be parsed.
/// * [`VaultError::Authentication`] for a wrong key or tampered ciphertext.
pub fn open(key: &str, container: &[u8]) -> Result<Credentials, VaultError> {
    open_as(EnvelopeFormat::Detached, key, container)
}

/// Opens a container with a key string and an explicit envelope format.
///
/// # Errors
/// See [`open`].
pub fn open_as(
    format: EnvelopeFormat,
    key: &str,
    container: &[u8],
) -> Result<Credentials, VaultError> {
    split_container(container)?;
    let keyset = parse_key(key)?;
    open_with(&keyset, container, format)
}

/// Opens a container with an already parsed keyset.
///
/// # Errors
/// See [`open`].
pub fn open_with(
    keyset: &Keyset,
    container: &[u8],
    format: EnvelopeFormat,
) -> Result<Credentials, VaultError> {
    let (header_bytes, ciphertext) = split_container(container)?;
    let header = Header::from_bytes(header_bytes)?;

    let mut header_raw = [0u8; Header::SIZE];
    header_raw.copy_from_slice(header_bytes);

    let bundle = Zeroizing::new(
        Cipher::new(keyset)?.decrypt(ciphertext, format.associated_data(&header_raw))?,
    );

    if header.bundle_len() != bundle.len() as u64 {
        return Err(VaultError::container_format(format!(
            "header announces {} + {} bytes but the payload holds {}",
            header.certificate_len,
            header.macaroon_len,
            bundle.len()
        )));
    }

    let (certificate, macaroon) = bundle.split_at(header.certificate_len as usize);
    debug!(
        certificate_len = certificate.len(),
        macaroon_len = macaroon.len(),
        %format,
        "Credentials opened"
    );
    Ok(Credentials::new(certificate.to_vec(), macaroon.to_vec()))
}

/// Reads the cleartext header of a container without a key.
///
/// The lengths are unauthenticated until the container is opened.
///
/// # Errors
/// Returns [`VaultError::ContainerFormat`] if the container is shorter than the header.
pub fn inspect(container: &[u8]) -> Result<Header, VaultError> {
    let (header, _) = split_container(container)?;
    Header::from_bytes(header)
}

fn split_container(container: &[u8]) -> Result<(&[u8], &[u8]), VaultError> {
    if container.len() < Header::SIZE {
        return Err(VaultError::container_format(format!(
            "container is {} bytes, shorter than the {}-byte header",
            container.len(),
            Header::SIZE
        )));
    }
    Ok(container.split_at(Header::SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn short_container_is_format_error_before_key_parsing() {
        let err = open("definitely not hex", &[0u8; 7]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerFormat);
    }

    #[test]
    fn bad_key_is_encoding_error() {
        let sealed = seal(b"c", b"m").unwrap();
        let err = open("zz", &sealed.container).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
    }

    #[test]
    fn format_defaults_to_detached() {
        assert_eq!(EnvelopeFormat::default(), EnvelopeFormat::Detached);
        assert_eq!(EnvelopeFormat::default().to_string(), "detached");
        assert_eq!(EnvelopeFormat::Bound.to_string(), "bound");
    }

    #[test]
    fn inspect_reads_header_only() {
        let sealed = seal(&[1u8; 3], &[2u8; 5]).unwrap();
        assert_eq!(inspect(&sealed.container).unwrap(), Header::from_lengths(3, 5));
        assert_eq!(inspect(&sealed.container[..8]).unwrap(), Header::from_lengths(3, 5));
        assert_eq!(inspect(&[0u8; 4]).unwrap_err().kind(), ErrorKind::ContainerFormat);
    }
}
