use super::{hex_bytes, Header};
use serde::{Deserialize, Serialize};

/// The trust anchor for verifying a height: what the previous trusted height said
/// the next validator set would be, and the chain it belongs to.
///
/// Must come from a header that was itself trusted or verified. Deriving it from an
/// unverified header hands the forger the choice of validator set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    #[serde(with = "hex_bytes")]
    pub next_validators_hash: Vec<u8>,
    pub chain_id: String,
}

impl EpochInfo {
    pub fn new(next_validators_hash: impl Into<Vec<u8>>, chain_id: impl Into<String>) -> Self {
        Self {
            next_validators_hash: next_validators_hash.into(),
            chain_id: chain_id.into(),
        }
    }

    /// Anchor for `header.height + 1`, taken from a header the caller already trusts.
    pub fn from_trusted_header(header: &Header) -> Self {
        Self {
            next_validators_hash: header.next_validators_hash.clone(),
            chain_id: header.chain_id.clone(),
        }
    }
}
