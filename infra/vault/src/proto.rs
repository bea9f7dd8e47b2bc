//! Wire messages for the cleartext binary keyset.
//!
//! These mirror `google.crypto.tink.Keyset` and `google.crypto.tink.AesGcmKey`, so keys
//! exchanged with other Tink-based tooling decode field for field.

#![allow(unreachable_pub, clippy::derive_partial_eq_without_eq)]

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct Keyset {
    #[prost(uint32, tag = "1")]
    pub primary_key_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub key: Vec<KeysetKey>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct KeysetKey {
    #[prost(message, optional, tag = "1")]
    pub key_data: Option<KeyData>,
    #[prost(enumeration = "KeyStatusType", tag = "2")]
    pub status: i32,
    #[prost(uint32, tag = "3")]
    pub key_id: u32,
    #[prost(enumeration = "OutputPrefixType", tag = "4")]
    pub output_prefix_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct KeyData {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(enumeration = "KeyMaterialType", tag = "3")]
    pub key_material_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct AesGcmKey {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub key_value: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub(crate) enum KeyStatusType {
    UnknownStatus = 0,
    Enabled = 1,
    Disabled = 2,
    Destroyed = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub(crate) enum OutputPrefixType {
    UnknownPrefix = 0,
    Tink = 1,
    Legacy = 2,
    Raw = 3,
    Crunchy = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub(crate) enum KeyMaterialType {
    UnknownKeymaterial = 0,
    Symmetric = 1,
    AsymmetricPrivate = 2,
    AsymmetricPublic = 3,
    Remote = 4,
}
