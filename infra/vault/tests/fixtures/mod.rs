use flash_vault::prelude::*;
use hex_literal::hex;

/// Cleartext Tink keyset: one enabled AES-256-GCM key, id 42, TINK prefix, key bytes 0x00..=0x1f.
pub const KEYSET_ID_42: [u8; 100] = hex!(
    "082a12600a580a30"
    "747970652e676f6f676c65617069732e636f6d2f676f6f676c652e63727970746f2e74696e6b2e41657347636d4b6579"
    "12221a20000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
    "18011001182a2001"
);

/// Detached container of `cert = b"CERT"`, `macaroon = b"MAC"` under [`KEYSET_ID_42`] with nonce `0x11 * 12`.
pub const DETACHED_CONTAINER: [u8; 48] = hex!(
    "0000000400000003"
    "010000002a"
    "111111111111111111111111"
    "c325c6ebf5416c"
    "775e33b8e2b4d2850d7fb5d53e8d8e4f"
);

/// Same plaintext and nonce, sealed with the header as associated data.
pub const BOUND_CONTAINER: [u8; 48] = hex!(
    "0000000400000003"
    "010000002a"
    "111111111111111111111111"
    "c325c6ebf5416c"
    "83f69959875ee853ad51a35f04a5fd0c"
);

/// Parses [`KEYSET_ID_42`].
/// # Panics
/// * If the fixture no longer decodes.
#[must_use]
pub fn fixed_keyset() -> Keyset {
    Keyset::from_bytes(&KEYSET_ID_42).expect("fixture keyset must decode")
}

/// A certificate-shaped buffer of `len` bytes.
#[must_use]
pub fn cert_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| b"-----BEGIN CERTIFICATE-----\n"[i % 28]).collect()
}

/// A macaroon-shaped buffer of `len` bytes.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn macaroon_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}
