//! # Key Manager
//!
//! Generation, binary (de)serialization, and hex transport encoding of AES-256-GCM keysets.
//!
//! The binary form is a cleartext Tink keyset protobuf. The key string handed to the
//! operator is the lowercase hex of that buffer, so anyone holding the string holds the key.
//! No wrapping key is applied; protecting the string is the caller's job.

use crate::error::VaultError;
use crate::proto;
use crate::types::KeyString;
use getrandom::fill;
use prost::Message;
use std::fmt;
use tracing::info;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Type URL identifying an AES-GCM key inside a keyset.
pub const AES_GCM_TYPE_URL: &str = "type.googleapis.com/google.crypto.tink.AesGcmKey";

/// Raw key length for AES-256-GCM.
pub const KEY_LEN: usize = 32;

/// Only version 0 of the AES-GCM key message exists.
const AES_GCM_KEY_VERSION: u32 = 0;

/// How ciphertexts produced by a key are prefixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputPrefix {
    /// `0x01 || key_id` (the default for generated keys).
    #[default]
    Tink,
    /// `0x00 || key_id`.
    Legacy,
    /// `0x00 || key_id`.
    Crunchy,
    /// No prefix.
    Raw,
}

impl OutputPrefix {
    /// Length of the prefix in bytes.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::Raw => 0,
            Self::Tink | Self::Legacy | Self::Crunchy => 5,
        }
    }

    /// Returns the prefix bytes for a given key id, or `None` for [`OutputPrefix::Raw`].
    #[must_use]
    pub const fn bytes(self, key_id: u32) -> Option<[u8; 5]> {
        let marker = match self {
            Self::Raw => return None,
            Self::Tink => 0x01,
            Self::Legacy | Self::Crunchy => 0x00,
        };
        let id = key_id.to_be_bytes();
        Some([marker, id[0], id[1], id[2], id[3]])
    }

    fn from_proto(value: i32) -> Result<Self, VaultError> {
        match proto::OutputPrefixType::try_from(value) {
            Ok(proto::OutputPrefixType::Tink) => Ok(Self::Tink),
            Ok(proto::OutputPrefixType::Legacy) => Ok(Self::Legacy),
            Ok(proto::OutputPrefixType::Crunchy) => Ok(Self::Crunchy),
            Ok(proto::OutputPrefixType::Raw) => Ok(Self::Raw),
            _ => Err(VaultError::key_encoding(format!("unsupported output prefix type {value}"))),
        }
    }

    const fn to_proto(self) -> proto::OutputPrefixType {
        match self {
            Self::Tink => proto::OutputPrefixType::Tink,
            Self::Legacy => proto::OutputPrefixType::Legacy,
            Self::Crunchy => proto::OutputPrefixType::Crunchy,
            Self::Raw => proto::OutputPrefixType::Raw,
        }
    }
}

/// Lifecycle state of a key inside a keyset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    /// Usable for encryption (if primary) and decryption.
    Enabled,
    /// Kept in the keyset but never used.
    Disabled,
}

/// One AES-256-GCM key with its id, status, and ciphertext prefix.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct KeyEntry {
    #[zeroize(skip)]
    pub(crate) key_id: u32,
    #[zeroize(skip)]
    pub(crate) status: KeyStatus,
    #[zeroize(skip)]
    pub(crate) prefix: OutputPrefix,
    pub(crate) material: [u8; KEY_LEN],
}

impl KeyEntry {
    fn random(key_id: u32, prefix: OutputPrefix) -> Result<Self, VaultError> {
        let mut material = [0u8; KEY_LEN];
        fill(&mut material).map_err(|e| VaultError::entropy(&e))?;
        Ok(Self { key_id, status: KeyStatus::Enabled, prefix, material })
    }

    pub(crate) const fn is_enabled(&self) -> bool {
        matches!(self.status, KeyStatus::Enabled)
    }

    fn from_proto(key: &proto::KeysetKey) -> Result<Option<Self>, VaultError> {
        let status = match proto::KeyStatusType::try_from(key.status) {
            Ok(proto::KeyStatusType::Enabled) => KeyStatus::Enabled,
            Ok(proto::KeyStatusType::Disabled) => KeyStatus::Disabled,
            // Destroyed keys carry no material and can never be used again.
            Ok(proto::KeyStatusType::Destroyed) => return Ok(None),
            _ => {
                return Err(VaultError::key_encoding(format!(
                    "key {} has unknown status {}",
                    key.key_id, key.status
                )));
            },
        };
        let prefix = OutputPrefix::from_proto(key.output_prefix_type)?;

        let data = key
            .key_data
            .as_ref()
            .ok_or_else(|| VaultError::key_encoding(format!("key {} has no key data", key.key_id)))?;

        if data.type_url != AES_GCM_TYPE_URL {
            return Err(VaultError::key_encoding(format!(
                "key {} is not an AES-GCM key ({})",
                key.key_id, data.type_url
            )));
        }
        if !matches!(
            proto::KeyMaterialType::try_from(data.key_material_type),
            Ok(proto::KeyMaterialType::Symmetric)
        ) {
            return Err(VaultError::key_encoding(format!(
                "key {} is not symmetric key material",
                key.key_id
            )));
        }

        let mut aes = proto::AesGcmKey::decode(data.value.as_slice()).map_err(|e| {
            VaultError::key_encoding(format!("key {} is malformed: {e}", key.key_id))
        })?;

        if aes.version != AES_GCM_KEY_VERSION {
            aes.key_value.zeroize();
            return Err(VaultError::key_encoding(format!(
                "key {} has unsupported version {}",
                key.key_id, aes.version
            )));
        }

        let material: Result<[u8; KEY_LEN], _> = aes.key_value.as_slice().try_into();
        let len = aes.key_value.len();
        aes.key_value.zeroize();
        let material = material.map_err(|_| {
            VaultError::key_encoding(format!(
                "key {} is {len} bytes, expected {KEY_LEN} for AES-256-GCM",
                key.key_id
            ))
        })?;

        Ok(Some(Self { key_id: key.key_id, status, prefix, material }))
    }

    fn to_proto(&self) -> proto::KeysetKey {
        let aes = proto::AesGcmKey { version: AES_GCM_KEY_VERSION, key_value: self.material.to_vec() };
        let status = match self.status {
            KeyStatus::Enabled => proto::KeyStatusType::Enabled,
            KeyStatus::Disabled => proto::KeyStatusType::Disabled,
        };

        proto::KeysetKey {
            key_data: Some(proto::KeyData {
                type_url: AES_GCM_TYPE_URL.to_owned(),
                value: aes.encode_to_vec(),
                key_material_type: proto::KeyMaterialType::Symmetric as i32,
            }),
            status: status as i32,
            key_id: self.key_id,
            output_prefix_type: self.prefix.to_proto() as i32,
        }
    }
}

/// An in-memory AES-256-GCM keyset handle.
///
/// The primary key encrypts; every enabled key may decrypt. Raw key bytes are wiped on drop.
#[derive(Clone)]
pub struct Keyset {
    primary_key_id: u32,
    entries: Vec<KeyEntry>,
}

impl Keyset {
    /// Generates a keyset holding one fresh AES-256-GCM key with a Tink output prefix.
    ///
    /// # Errors
    /// Returns [`VaultError::Entropy`] if the operating system RNG fails.
    pub fn generate() -> Result<Self, VaultError> {
        Self::generate_with(OutputPrefix::Tink)
    }

    /// Generates a keyset holding one fresh key with the given output prefix.
    ///
    /// # Errors
    /// Returns [`VaultError::Entropy`] if the operating system RNG fails.
    pub fn generate_with(prefix: OutputPrefix) -> Result<Self, VaultError> {
        let key_id = fresh_key_id(&[])?;
        let entry = KeyEntry::random(key_id, prefix)?;
        Ok(Self { primary_key_id: key_id, entries: vec![entry] })
    }

    /// Adds a new Tink-prefixed key and makes it primary.
    ///
    /// Older keys stay enabled so containers sealed before the rotation still open.
    ///
    /// # Errors
    /// Returns [`VaultError::Entropy`] if the operating system RNG fails.
    pub fn rotate(&mut self) -> Result<u32, VaultError> {
        let taken: Vec<u32> = self.entries.iter().map(|e| e.key_id).collect();
        let key_id = fresh_key_id(&taken)?;
        self.entries.push(KeyEntry::random(key_id, OutputPrefix::Tink)?);
        self.primary_key_id = key_id;
        Ok(key_id)
    }

    /// Marks a non-primary key as disabled.
    ///
    /// # Errors
    /// Returns [`VaultError::KeyEncoding`] for an unknown id or the primary key.
    pub fn disable(&mut self, key_id: u32) -> Result<(), VaultError> {
        if key_id == self.primary_key_id {
            return Err(VaultError::key_encoding("the primary key cannot be disabled"));
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.key_id == key_id)
            .ok_or_else(|| VaultError::key_encoding(format!("no key with id {key_id}")))?;
        entry.status = KeyStatus::Disabled;
        Ok(())
    }

    #[must_use]
    pub const fn primary_key_id(&self) -> u32 {
        self.primary_key_id
    }

    /// Ids of all keys held, in keyset order.
    #[must_use]
    pub fn key_ids(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.key_id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[KeyEntry] {
        &self.entries
    }

    pub(crate) fn primary(&self) -> Result<&KeyEntry, VaultError> {
        self.entries
            .iter()
            .find(|e| e.key_id == self.primary_key_id)
            .ok_or_else(|| "keyset lost its primary key".into())
    }

    /// Serializes the keyset into its cleartext binary protobuf form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let message = proto::Keyset {
            primary_key_id: self.primary_key_id,
            key: self.entries.iter().map(KeyEntry::to_proto).collect(),
        };
        let bytes = message.encode_to_vec();
        wipe_message(message);
        bytes
    }

    /// Parses the cleartext binary protobuf form.
    ///
    /// # Errors
    /// Returns [`VaultError::KeyEncoding`] if the buffer is not a well-formed keyset whose
    /// primary key is an enabled AES-256-GCM key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        let message = proto::Keyset::decode(bytes)
            .map_err(|e| VaultError::key_encoding(format!("keyset is malformed: {e}")))?;

        let parsed: Result<Vec<Option<KeyEntry>>, VaultError> =
            message.key.iter().map(KeyEntry::from_proto).collect();
        let primary_key_id = message.primary_key_id;
        wipe_message(message);
        let entries: Vec<KeyEntry> = parsed?.into_iter().flatten().collect();

        if entries.is_empty() {
            return Err(VaultError::key_encoding("keyset holds no usable keys"));
        }

        let keyset = Self { primary_key_id, entries };
        match keyset.primary() {
            Ok(primary) if primary.is_enabled() => Ok(keyset),
            Ok(_) => Err(VaultError::key_encoding(format!(
                "primary key {primary_key_id} is not enabled"
            ))),
            Err(_) => Err(VaultError::key_encoding(format!(
                "primary key {primary_key_id} is missing from the keyset"
            ))),
        }
    }

    /// Encodes the keyset into its hex transport string.
    #[must_use]
    pub fn encode(&self) -> KeyString {
        let mut bytes = self.to_bytes();
        let hex = hex::encode(&bytes);
        bytes.zeroize();
        KeyString::new(hex)
    }

    /// Decodes a hex transport string. Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// Returns [`VaultError::KeyEncoding`] if the string is not hex or not a valid keyset.
    pub fn parse(encoded: &str) -> Result<Self, VaultError> {
        let mut bytes = hex::decode(encoded.trim())
            .map_err(|e| VaultError::key_encoding(format!("key is not valid hex: {e}")))?;
        let keyset = Self::from_bytes(&bytes);
        bytes.zeroize();
        keyset
    }
}

impl fmt::Debug for Keyset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyset")
            .field("primary_key_id", &self.primary_key_id)
            .field("key_ids", &self.key_ids())
            .finish_non_exhaustive()
    }
}

/// Produces a new random AES-256-GCM key and returns its hex transport string.
///
/// The caller owns the result; the vault never persists it.
///
/// # Errors
/// Returns [`VaultError::Entropy`] if the operating system RNG fails.
pub fn generate_key() -> Result<KeyString, VaultError> {
    let keyset = Keyset::generate()?;
    info!(key_id = keyset.primary_key_id(), "Encryption key generated");
    Ok(keyset.encode())
}

/// Parses a hex transport string back into a usable keyset.
///
/// # Errors
/// Returns [`VaultError::KeyEncoding`] if the string is not hex or not a valid keyset.
pub fn parse_key(encoded: &str) -> Result<Keyset, VaultError> {
    Keyset::parse(encoded)
}

fn fresh_key_id(taken: &[u32]) -> Result<u32, VaultError> {
    loop {
        let mut raw = [0u8; 4];
        fill(&mut raw).map_err(|e| VaultError::entropy(&e))?;
        let id = u32::from_be_bytes(raw);
        if id != 0 && !taken.contains(&id) {
            return Ok(id);
        }
    }
}

/// Clears every embedded key buffer of a decoded or freshly built message.
fn wipe_message(mut message: proto::Keyset) {
    for key in &mut message.key {
        if let Some(data) = key.key_data.as_mut() {
            data.value.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw_keyset(keys: Vec<proto::KeysetKey>, primary: u32) -> Vec<u8> {
        proto::Keyset { primary_key_id: primary, key: keys }.encode_to_vec()
    }

    fn aes_key(id: u32, key_len: usize, status: proto::KeyStatusType) -> proto::KeysetKey {
        proto::KeysetKey {
            key_data: Some(proto::KeyData {
                type_url: AES_GCM_TYPE_URL.to_owned(),
                value: proto::AesGcmKey { version: 0, key_value: vec![7; key_len] }
                    .encode_to_vec(),
                key_material_type: proto::KeyMaterialType::Symmetric as i32,
            }),
            status: status as i32,
            key_id: id,
            output_prefix_type: proto::OutputPrefixType::Tink as i32,
        }
    }

    #[test]
    fn generated_key_is_even_lowercase_hex() {
        let key = generate_key().unwrap();
        let s = key.expose();
        assert!(s.len() > 10);
        assert_eq!(s.len() % 2, 0);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn encode_parse_is_stable() {
        let keyset = Keyset::generate().unwrap();
        let encoded = keyset.encode();
        let parsed = parse_key(encoded.expose()).unwrap();

        assert_eq!(parsed.primary_key_id(), keyset.primary_key_id());
        assert_eq!(parsed.encode(), encoded);
    }

    #[test]
    fn parse_accepts_uppercase_and_whitespace() {
        let encoded = Keyset::generate().unwrap().encode();
        let noisy = format!("  {}\n", encoded.expose().to_uppercase());
        assert!(parse_key(&noisy).is_ok());
    }

    #[test]
    fn rejects_non_hex() {
        let err = parse_key("not-a-key").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
    }

    #[test]
    fn rejects_truncated_keyset() {
        let encoded = Keyset::generate().unwrap().encode();
        let cut = &encoded.expose()[..encoded.len() / 2];
        let err = parse_key(cut).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
    }

    #[test]
    fn rejects_missing_primary() {
        let bytes = raw_keyset(vec![aes_key(5, KEY_LEN, proto::KeyStatusType::Enabled)], 6);
        let err = Keyset::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
    }

    #[test]
    fn rejects_disabled_primary() {
        let bytes = raw_keyset(vec![aes_key(5, KEY_LEN, proto::KeyStatusType::Disabled)], 5);
        assert!(Keyset::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_aes_128_material() {
        let bytes = raw_keyset(vec![aes_key(5, 16, proto::KeyStatusType::Enabled)], 5);
        let err = Keyset::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
        assert!(err.to_string().contains("expected 32"));
    }

    #[test]
    fn rejects_foreign_key_type() {
        let mut key = aes_key(5, KEY_LEN, proto::KeyStatusType::Enabled);
        if let Some(data) = key.key_data.as_mut() {
            data.type_url = "type.googleapis.com/google.crypto.tink.HmacKey".to_owned();
        }
        let bytes = raw_keyset(vec![key], 5);
        assert!(Keyset::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_empty_keyset() {
        let err = Keyset::from_bytes(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyEncoding);
    }

    #[test]
    fn destroyed_keys_are_dropped() {
        let destroyed = proto::KeysetKey {
            key_data: None,
            status: proto::KeyStatusType::Destroyed as i32,
            key_id: 9,
            output_prefix_type: proto::OutputPrefixType::Tink as i32,
        };
        let bytes =
            raw_keyset(vec![destroyed, aes_key(5, KEY_LEN, proto::KeyStatusType::Enabled)], 5);
        let keyset = Keyset::from_bytes(&bytes).unwrap();
        assert_eq!(keyset.key_ids(), vec![5]);
    }

    #[test]
    fn rotation_keeps_old_keys() {
        let mut keyset = Keyset::generate().unwrap();
        let first = keyset.primary_key_id();
        let second = keyset.rotate().unwrap();

        assert_ne!(first, second);
        assert_eq!(keyset.primary_key_id(), second);
        assert_eq!(keyset.len(), 2);
        assert!(keyset.disable(second).is_err());
        assert!(keyset.disable(first).is_ok());
    }

    #[test]
    fn prefix_bytes_follow_key_id() {
        assert_eq!(OutputPrefix::Tink.bytes(0x0102_0304), Some([1, 1, 2, 3, 4]));
        assert_eq!(OutputPrefix::Legacy.bytes(7), Some([0, 0, 0, 0, 7]));
        assert_eq!(OutputPrefix::Raw.bytes(7), None);
    }

    #[test]
    fn debug_does_not_print_material() {
        let keyset = Keyset::generate().unwrap();
        let rendered = format!("{keyset:?}");
        assert!(rendered.contains("primary_key_id"));
        assert!(!rendered.contains("material"));
    }
}
