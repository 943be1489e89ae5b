use super::{hex_bytes, Hash, ADDRESS_LEN};
use crate::consensus::error::VerificationError;
use crate::encoding::{ChainCodec, Tendermint};
use serde::{Deserialize, Serialize};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Number of bytes in an Ed25519 public key.
pub const ED25519_PUBKEY_LEN: usize = 32;

/// Number of bytes in a BLS12-381 public key (compressed G1 point).
pub const BLS_PUBKEY_LEN: usize = 48;

/// Number of bytes in a compressed secp256k1 public key.
pub const SECP256K1_PUBKEY_LEN: usize = 33;

/// Upper bound on the summed voting power of a validator set.
/// Leaves headroom so that `total * 2` and proposer priority arithmetic cannot overflow an i64.
pub const MAX_TOTAL_VOTING_POWER: u64 = (i64::MAX / 8) as u64;

/// Signature scheme a validator key belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "ed25519")]
    Ed25519,
    #[serde(rename = "bls12_381")]
    Bls12381,
    #[serde(rename = "secp256k1")]
    Secp256k1,
}

/// A validator's consensus public key, tagged with its algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PublicKey {
    Ed25519([u8; ED25519_PUBKEY_LEN]),
    Bls12381([u8; BLS_PUBKEY_LEN]),
    Secp256k1([u8; SECP256K1_PUBKEY_LEN]),
}

impl PublicKey {
    pub fn from_bytes(algorithm: KeyAlgorithm, bytes: &[u8]) -> Result<Self, &'static str> {
        match algorithm {
            KeyAlgorithm::Ed25519 => {
                let arr: [u8; ED25519_PUBKEY_LEN] = bytes
                    .try_into()
                    .map_err(|_| "Invalid Ed25519 public key length")?;
                Ok(Self::Ed25519(arr))
            }
            KeyAlgorithm::Bls12381 => {
                let arr: [u8; BLS_PUBKEY_LEN] = bytes
                    .try_into()
                    .map_err(|_| "Invalid BLS public key length")?;
                Ok(Self::Bls12381(arr))
            }
            KeyAlgorithm::Secp256k1 => {
                let arr: [u8; SECP256K1_PUBKEY_LEN] = bytes
                    .try_into()
                    .map_err(|_| "Invalid secp256k1 public key length")?;
                Ok(Self::Secp256k1(arr))
            }
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Ed25519(_) => KeyAlgorithm::Ed25519,
            Self::Bls12381(_) => KeyAlgorithm::Bls12381,
            Self::Secp256k1(_) => KeyAlgorithm::Secp256k1,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Ed25519(bytes) => bytes,
            Self::Bls12381(bytes) => bytes,
            Self::Secp256k1(bytes) => bytes,
        }
    }

    /// Validator address.
    ///
    /// RIPEMD160(SHA256(key)) for secp256k1 keys, the first 20 bytes of SHA256(key) otherwise.
    pub fn address(&self) -> [u8; ADDRESS_LEN] {
        let sha = Sha256::digest(self.as_bytes());
        let mut address = [0u8; ADDRESS_LEN];
        match self {
            Self::Secp256k1(_) => address.copy_from_slice(&Ripemd160::digest(sha)),
            _ => address.copy_from_slice(&sha[..ADDRESS_LEN]),
        }
        address
    }
}

#[derive(Serialize, Deserialize)]
struct TaggedPublicKey {
    #[serde(rename = "type")]
    algorithm: KeyAlgorithm,
    #[serde(with = "hex_bytes")]
    value: Vec<u8>,
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaggedPublicKey {
            algorithm: self.algorithm(),
            value: self.as_bytes().to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tagged = TaggedPublicKey::deserialize(deserializer)?;
        Self::from_bytes(tagged.algorithm, &tagged.value).map_err(serde::de::Error::custom)
    }
}

/// A member of a validator set. Immutable once constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Position in the canonical set.
    pub index: u32,
    #[serde(with = "hex_bytes")]
    pub address: Vec<u8>,
    pub public_key: PublicKey,
    pub voting_power: u64,
    /// Informational only; verification never reads it.
    pub proposer_priority: i64,
}

impl Validator {
    /// Create a validator, deriving its address from the public key.
    pub fn new(index: u32, public_key: PublicKey, voting_power: u64) -> Self {
        Self {
            index,
            address: public_key.address().to_vec(),
            public_key,
            voting_power,
            proposer_priority: 0,
        }
    }
}

/// An ordered validator set with its hash and total voting power computed once, at construction.
///
/// Positions are load-bearing: commit entry `i` is the vote of the validator at position `i`.
/// Reordering the validators (or the commit entries) independently breaks verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    hash: Hash,
    total_voting_power: u64,
}

impl ValidatorSet {
    /// Build a set hashed with the default codec.
    pub fn new(validators: Vec<Validator>) -> Result<Self, VerificationError> {
        Self::with_codec(validators, &Tendermint)
    }

    /// Build a set hashed with a chain-specific codec.
    ///
    /// Rejects empty sets, validators whose `index` differs from their position,
    /// and sets whose summed voting power is zero or exceeds [`MAX_TOTAL_VOTING_POWER`].
    pub fn with_codec<C: ChainCodec + ?Sized>(
        validators: Vec<Validator>,
        codec: &C,
    ) -> Result<Self, VerificationError> {
        if validators.is_empty() {
            return Err(VerificationError::InvalidValidatorSet {
                reason: "validator set is empty".into(),
            });
        }

        for (position, validator) in validators.iter().enumerate() {
            if validator.index as usize != position {
                return Err(VerificationError::InvalidValidatorSet {
                    reason: format!(
                        "validator at position {} claims index {}",
                        position, validator.index
                    ),
                });
            }
        }

        let total_voting_power = sum_voting_power(&validators)?;
        if total_voting_power == 0 {
            return Err(VerificationError::InvalidValidatorSet {
                reason: "total voting power is zero".into(),
            });
        }

        let hash = codec.validator_set_hash(&validators);

        Ok(Self {
            validators,
            hash,
            total_voting_power,
        })
    }

    /// Deterministic digest over the index-ordered validators.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn total_voting_power(&self) -> u64 {
        self.total_voting_power
    }

    pub fn get_by_index(&self, index: usize) -> Result<&Validator, VerificationError> {
        self.validators
            .get(index)
            .ok_or(VerificationError::ValidatorIndexUnknown {
                index,
                size: self.validators.len(),
            })
    }

    pub fn size(&self) -> usize {
        self.validators.len()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }
}

/// Sum voting power, failing instead of saturating once the bound is crossed.
fn sum_voting_power(validators: &[Validator]) -> Result<u64, VerificationError> {
    validators.iter().try_fold(0u64, |total, validator| {
        total
            .checked_add(validator.voting_power)
            .filter(|sum| *sum <= MAX_TOTAL_VOTING_POWER)
            .ok_or(VerificationError::VotingPowerOverflow {
                max: MAX_TOTAL_VOTING_POWER,
            })
    })
}
