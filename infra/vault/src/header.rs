//! The 8-byte cleartext container header: `certLength: u32 BE || macaroonLength: u32 BE`.

use crate::error::VaultError;

/// Lengths of the two secrets packed into a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub certificate_len: u32,
    pub macaroon_len: u32,
}

impl Header {
    /// Encoded size in bytes.
    pub const SIZE: usize = 8;

    /// Builds a header from buffer lengths.
    ///
    /// # Errors
    /// Returns [`VaultError::ContainerFormat`] if either length does not fit in a `u32`.
    pub fn new(certificate_len: usize, macaroon_len: usize) -> Result<Self, VaultError> {
        let narrow = |len: usize, what: &str| {
            u32::try_from(len).map_err(|_| {
                VaultError::container_format(format!(
                    "{what} length {len} exceeds the 32-bit header range"
                ))
            })
        };
        Ok(Self {
            certificate_len: narrow(certificate_len, "certificate")?,
            macaroon_len: narrow(macaroon_len, "macaroon")?,
        })
    }

    #[must_use]
    pub const fn from_lengths(certificate_len: u32, macaroon_len: u32) -> Self {
        Self { certificate_len, macaroon_len }
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..4].copy_from_slice(&self.certificate_len.to_be_bytes());
        out[4..].copy_from_slice(&self.macaroon_len.to_be_bytes());
        out
    }

    /// Decodes exactly [`Header::SIZE`] bytes.
    ///
    /// # Errors
    /// Returns [`VaultError::ContainerFormat`] for any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        let raw: [u8; Self::SIZE] = bytes.try_into().map_err(|_| {
            VaultError::container_format(format!(
                "header must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            ))
        })?;
        let [c0, c1, c2, c3, m0, m1, m2, m3] = raw;
        Ok(Self {
            certificate_len: u32::from_be_bytes([c0, c1, c2, c3]),
            macaroon_len: u32::from_be_bytes([m0, m1, m2, m3]),
        })
    }

    /// Total plaintext length the header announces.
    #[must_use]
    pub fn bundle_len(self) -> u64 {
        u64::from(self.certificate_len) + u64::from(self.macaroon_len)
    }
}

/// Encodes both lengths as a big-endian header.
///
/// # Errors
/// Returns [`VaultError::ContainerFormat`] if either length does not fit in a `u32`.
pub fn serialize_header(
    certificate_len: usize,
    macaroon_len: usize,
) -> Result<[u8; Header::SIZE], VaultError> {
    Header::new(certificate_len, macaroon_len).map(Header::to_bytes)
}

/// Decodes a header; the input must be exactly [`Header::SIZE`] bytes.
///
/// # Errors
/// Returns [`VaultError::ContainerFormat`] for any other length.
pub fn deserialize_header(bytes: &[u8]) -> Result<Header, VaultError> {
    Header::from_bytes(bytes)
}
