use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// --- Key transport string ---

/// The printable transport form of a keyset: lowercase hex of the binary keyset.
///
/// Possession of this string equals possession of the key. It is wiped from memory on
/// drop and never rendered by `Debug`; use [`KeyString::expose`] to hand it to the operator.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyString(String);

impl KeyString {
    pub(crate) const fn new(hex: String) -> Self {
        Self(hex)
    }

    /// Returns the raw key string.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length of the hex string in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for KeyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyString").field(&"<redacted>").finish()
    }
}

// --- Opened credentials ---

/// The two opaque secrets recovered from a container.
///
/// Both buffers are zeroized on drop. `Debug` prints lengths only.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    certificate: Vec<u8>,
    macaroon: Vec<u8>,
}

impl Credentials {
    #[must_use]
    pub const fn new(certificate: Vec<u8>, macaroon: Vec<u8>) -> Self {
        Self { certificate, macaroon }
    }

    /// The TLS certificate bytes, exactly as sealed.
    #[must_use]
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    /// The macaroon bytes, exactly as sealed.
    #[must_use]
    pub fn macaroon(&self) -> &[u8] {
        &self.macaroon
    }

    /// Hex of the macaroon, the form node clients usually expect in request metadata.
    #[must_use]
    pub fn macaroon_hex(&self) -> String {
        hex::encode(&self.macaroon)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("certificate_len", &self.certificate.len())
            .field("macaroon_len", &self.macaroon.len())
            .finish()
    }
}

// --- Seal result ---

/// Output of a fresh seal: the key the operator must keep and the container to persist.
///
/// The container is never produced without its matching key.
#[derive(Debug, Clone)]
pub struct SealedCredentials {
    pub key: KeyString,
    pub container: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let key = KeyString::new("deadbeef".to_owned());
        assert!(!format!("{key:?}").contains("deadbeef"));

        let creds = Credentials::new(b"-----BEGIN CERT".to_vec(), vec![0xAB; 4]);
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("certificate_len: 15"));
        assert!(!rendered.contains("BEGIN"));
    }

    #[test]
    fn macaroon_hex_is_lowercase() {
        let creds = Credentials::new(Vec::new(), vec![0xAB, 0x01]);
        assert_eq!(creds.macaroon_hex(), "ab01");
    }
}
