//! # AEAD Engine
//!
//! AES-256-GCM encryption under a [`Keyset`], producing the prefixed ciphertext layout:
//!
//! ```text
//! [PREFIX(0 or 5)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
//! ```

use crate::error::VaultError;
use crate::keyset::{KeyEntry, Keyset, OutputPrefix};
use aead::inout::InOutBuf;
use aead::{AeadInOut, Key, KeyInit, Nonce, Tag};
use aes_gcm::Aes256Gcm;
use getrandom::fill;
use std::fmt;

/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// GCM tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Length of a non-raw output prefix.
pub const PREFIX_LEN: usize = 5;

struct Slot {
    key_id: u32,
    prefix: Option<[u8; PREFIX_LEN]>,
    cipher: Aes256Gcm,
}

impl Slot {
    fn new(entry: &KeyEntry) -> Result<Self, VaultError> {
        let key = Key::<Aes256Gcm>::try_from(&entry.material[..])
            .map_err(|_| VaultError::key_encoding("key material has the wrong length"))?;
        Ok(Self {
            key_id: entry.key_id,
            prefix: entry.prefix.bytes(entry.key_id),
            cipher: Aes256Gcm::new(&key),
        })
    }
}

/// A ready-to-use AEAD primitive built from every enabled key of a keyset.
///
/// `Cipher` is stateless between calls and can be shared across threads.
pub struct Cipher {
    primary: usize,
    slots: Vec<Slot>,
}

impl Cipher {
    /// Instantiates one AES-256-GCM cipher per enabled key.
    ///
    /// # Errors
    /// Returns [`VaultError::Internal`] if the keyset has no enabled primary key, which a
    /// parsed or generated [`Keyset`] never allows.
    pub fn new(keyset: &Keyset) -> Result<Self, VaultError> {
        let slots = keyset
            .entries()
            .iter()
            .filter(|e| e.is_enabled())
            .map(Slot::new)
            .collect::<Result<Vec<_>, _>>()?;

        let primary_id = keyset.primary()?.key_id;
        let primary = slots
            .iter()
            .position(|s| s.key_id == primary_id)
            .ok_or("primary key is not enabled")?;

        Ok(Self { primary, slots })
    }

    fn next_nonce() -> Result<Nonce<Aes256Gcm>, VaultError> {
        let mut nonce = Nonce::<Aes256Gcm>::default();
        fill(&mut nonce).map_err(|e| VaultError::entropy(&e))?;
        Ok(nonce)
    }

    /// Encrypts with the primary key and a fresh random nonce.
    ///
    /// # Errors
    /// * [`VaultError::Entropy`] if no nonce can be drawn.
    /// * [`VaultError::Internal`] if the plaintext exceeds the GCM length limit.
    pub fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, VaultError> {
        let slot = &self.slots[self.primary];
        let nonce = Self::next_nonce()?;
        let prefix = slot.prefix.as_ref().map_or(&[][..], |p| &p[..]);

        let mut buf = Vec::with_capacity(prefix.len() + NONCE_LEN + plaintext.len() + TAG_LEN);
        buf.extend_from_slice(prefix);
        buf.extend_from_slice(&nonce);
        buf.extend_from_slice(plaintext);

        let (_, body) = buf.split_at_mut(prefix.len() + NONCE_LEN);
        let tag = slot
            .cipher
            .encrypt_inout_detached(&nonce, associated_data, InOutBuf::from(body))
            .map_err(|_| VaultError::from("AEAD encryption failed"))?;

        buf.extend_from_slice(tag.as_slice());
        Ok(buf)
    }

    /// Verifies and decrypts a ciphertext produced by any enabled key of the keyset.
    ///
    /// Keys whose prefix matches are tried first, then raw keys.
    ///
    /// # Errors
    /// Returns [`VaultError::Authentication`] for every failure: too short, unknown prefix,
    /// wrong key, or tampered bytes.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        if ciphertext.len() >= PREFIX_LEN + NONCE_LEN + TAG_LEN {
            let (prefix, body) = ciphertext.split_at(PREFIX_LEN);
            let matching =
                self.slots.iter().filter(|s| s.prefix.is_some_and(|p| p.as_slice() == prefix));
            for slot in matching {
                if let Some(plaintext) = Self::try_open(&slot.cipher, body, associated_data) {
                    return Ok(plaintext);
                }
            }
        }

        self.slots
            .iter()
            .filter(|s| s.prefix.is_none())
            .find_map(|slot| Self::try_open(&slot.cipher, ciphertext, associated_data))
            .ok_or_else(VaultError::authentication)
    }

    fn try_open(cipher: &Aes256Gcm, body: &[u8], associated_data: &[u8]) -> Option<Vec<u8>> {
        if body.len() < NONCE_LEN + TAG_LEN {
            return None;
        }
        let (nonce, rest) = body.split_at(NONCE_LEN);
        let (sealed, tag) = rest.split_at(rest.len() - TAG_LEN);

        let nonce: Nonce<Aes256Gcm> = nonce.try_into().ok()?;
        let tag: Tag<Aes256Gcm> = tag.try_into().ok()?;

        let mut buf = sealed.to_vec();
        cipher
            .decrypt_inout_detached(&nonce, associated_data, InOutBuf::from(&mut buf[..]), &tag)
            .ok()?;
        Some(buf)
    }

    /// Id of the key used for encryption.
    #[must_use]
    pub fn primary_key_id(&self) -> u32 {
        self.slots[self.primary].key_id
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("primary_key_id", &self.primary_key_id())
            .field("keys", &self.slots.len())
            .finish_non_exhaustive()
    }
}

/// Encrypts `plaintext` under the keyset's primary key.
///
/// # Errors
/// See [`Cipher::encrypt`].
pub fn seal(
    keyset: &Keyset,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, VaultError> {
    Cipher::new(keyset)?.encrypt(plaintext, associated_data)
}

/// Verifies and decrypts `ciphertext` under any enabled key of the keyset.
///
/// # Errors
/// See [`Cipher::decrypt`].
pub fn open(
    keyset: &Keyset,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, VaultError> {
    Cipher::new(keyset)?.decrypt(ciphertext, associated_data)
}

/// Overhead added by the primary key of a keyset on every encryption.
#[must_use]
pub const fn overhead(prefix: OutputPrefix) -> usize {
    prefix.len() + NONCE_LEN + TAG_LEN
}
