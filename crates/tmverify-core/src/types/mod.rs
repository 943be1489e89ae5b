pub mod block;
pub mod commit;
pub mod epoch;
pub mod validator;

pub use block::*;
pub use commit::*;
pub use epoch::*;
pub use validator::*;

/// Number of bytes in a SHA256 digest (block hashes, validator set hashes).
pub const HASH_LEN: usize = 32;

/// Number of bytes in a validator address (truncated SHA256 of the public key).
pub const ADDRESS_LEN: usize = 20;

/// A 32-byte SHA256 digest.
pub type Hash = [u8; HASH_LEN];

/// Hex serde for variable-length byte fields.
/// Accepts upper or lower case, with or without a 0x prefix.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Hex serde for fixed 32-byte digests.
pub(crate) mod hex_hash {
    use super::{Hash, HASH_LEN};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::hex_bytes::serialize(hash, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Hash, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = super::hex_bytes::deserialize(deserializer)?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected {} bytes, got {}", HASH_LEN, len))
        })
    }
}
