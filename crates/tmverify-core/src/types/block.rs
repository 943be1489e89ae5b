use super::{hex_bytes, Hash, HASH_LEN};
use crate::encoding::{ChainCodec, Tendermint};
use serde::{Deserialize, Serialize};

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch.
/// This is the zero value of timestamps on chains whose nodes are written in Go.
pub const ZERO_TIME_SECONDS: i64 = -62_135_596_800;

/// A point in time as carried in headers and votes: seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    /// Always in `0..1_000_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// The chain's notion of an unset timestamp (year 1, not the Unix epoch).
    pub const fn zero() -> Self {
        Self {
            seconds: ZERO_TIME_SECONDS,
            nanos: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

/// Protocol versions a block was produced under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub block: u64,
    pub app: u64,
}

/// Reference to the parts a block was gossiped in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSetHeader {
    pub total: u32,
    #[serde(with = "hex_bytes")]
    pub hash: Vec<u8>,
}

impl PartSetHeader {
    pub fn is_zero(&self) -> bool {
        self.total == 0 && self.hash.is_empty()
    }
}

/// Identity of a block: its header hash plus the part set reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockId {
    #[serde(with = "hex_bytes")]
    pub hash: Vec<u8>,
    pub part_set_header: PartSetHeader,
}

impl BlockId {
    pub fn new(hash: Hash, part_set_header: PartSetHeader) -> Self {
        Self {
            hash: hash.to_vec(),
            part_set_header,
        }
    }

    /// A zero block id is what a vote for "no block" (nil) refers to.
    pub fn is_zero(&self) -> bool {
        self.hash.is_empty() && self.part_set_header.is_zero()
    }

    /// Check that the hash has the length of a SHA256 digest.
    pub fn has_valid_hash(&self) -> bool {
        self.hash.len() == HASH_LEN
    }
}

/// A block header as produced by the remote chain.
///
/// Verification reads the height and the two validator set hashes. The other fields are
/// carried because the block hash commits to all of them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: Version,
    pub chain_id: String,
    pub height: u64,
    pub time: Timestamp,
    pub last_block_id: BlockId,
    #[serde(with = "hex_bytes")]
    pub last_commit_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub data_hash: Vec<u8>,
    /// Claimed hash of the validator set that signs this block.
    #[serde(with = "hex_bytes")]
    pub validators_hash: Vec<u8>,
    /// Claimed hash of the validator set that signs the next block.
    #[serde(with = "hex_bytes")]
    pub next_validators_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub consensus_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub app_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub last_results_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub evidence_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub proposer_address: Vec<u8>,
}

impl Header {
    /// The block hash (block identity) under the default codec.
    /// `None` when the header has no validators hash and therefore no identity.
    pub fn hash(&self) -> Option<Hash> {
        Tendermint.header_hash(self)
    }
}
