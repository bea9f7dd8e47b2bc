//! A stateless credential vault for a TLS certificate and a macaroon.
//!
//! `seal` packs both secrets into one authenticated container under a freshly generated
//! AES-256-GCM key and hands the key back as a hex string. `open` reverses it with that string.
//! Nothing is cached or persisted here; the caller owns both the container and the key.
//!
//! ## Container Format
//!
//! ```text
//! [CERT_LEN u32 BE][MAC_LEN u32 BE][PREFIX(0|5)][NONCE(12)][CIPHERTEXT(CERT_LEN + MAC_LEN)][TAG(16)]
//! ```
//!
//! The key string is the hex of a cleartext Tink binary keyset, so containers and keys stay
//! interchangeable with other Tink-based tooling.
//!
//! ## Header Authentication
//!
//! In the default [`EnvelopeFormat::Detached`] the two length fields are not covered by the
//! tag. Their sum is checked against the decrypted payload, which rejects inconsistent
//! headers but still lets an attacker move the split point between the two secrets. Choose
//! [`EnvelopeFormat::Bound`] for new containers when compatibility is not required.
//!
//! ## Nonce Policy
//!
//! Every encryption draws a fresh random 96-bit nonce. Each seal also uses a brand-new key,
//! so nonce reuse under one key is not a practical concern.
//!
//! ## Examples
//!
//! ```rust
//! use flash_vault::prelude::*;
//!
//! # fn main() -> Result<(), VaultError> {
//! let sealed = seal(b"-----BEGIN CERTIFICATE-----", &[0x02, 0x01, 0x0c])?;
//!
//! let header = inspect(&sealed.container)?;
//! assert_eq!(header.certificate_len, 27);
//!
//! let creds = open(sealed.key.expose(), &sealed.container)?;
//! assert_eq!(creds.macaroon(), &[0x02, 0x01, 0x0c]);
//! # Ok(())
//! # }
//! ```

pub mod aead;
pub mod envelope;
mod error;
pub mod header;
pub mod keyset;
mod proto;
mod types;

pub use envelope::{EnvelopeFormat, inspect, open, open_as, open_with, seal, seal_as, seal_with};
pub use error::{ErrorKind, VaultError, VaultErrorExt};
pub use header::{Header, deserialize_header, serialize_header};
pub use keyset::{KeyStatus, Keyset, OutputPrefix, generate_key, parse_key};
pub use types::{Credentials, KeyString, SealedCredentials};

pub mod prelude {
    pub use crate::aead::Cipher;
    pub use crate::envelope::{EnvelopeFormat, inspect, open, open_with, seal, seal_with};
    pub use crate::error::{ErrorKind, VaultError, VaultErrorExt};
    pub use crate::header::{Header, deserialize_header, serialize_header};
    pub use crate::keyset::{Keyset, generate_key, parse_key};
    pub use crate::types::{Credentials, KeyString, SealedCredentials};
}
