//! Hex string (de)serialization for byte blobs in JSON.

use serde::{de::Error, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    hex::decode(s).map_err(D::Error::custom)
}

/// Implements `Serialize`/`Deserialize` as a hex string of `to_bytes()` for a
/// type exposing `to_bytes(&self) -> impl AsRef<[u8]>` and
/// `from_bytes(&[u8]) -> privacy_crypto::Result<Self>`.
#[macro_export]
macro_rules! impl_hex_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
                $crate::hex_serde::serialize(self.to_bytes().as_ref(), serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
                let bytes = $crate::hex_serde::deserialize(deserializer)?;
                <$ty>::from_bytes(&bytes).map_err(serde::de::Error::custom)
            }
        }
    };
}
