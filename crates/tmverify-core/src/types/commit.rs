use super::{hex_bytes, BlockId, Timestamp, ADDRESS_LEN, HASH_LEN};
use crate::encoding::{ChainCodec, Tendermint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest signature accepted in a commit entry (a compressed BLS12-381 G2 point).
pub const MAX_SIGNATURE_LEN: usize = 96;

/// Structural defects in a commit, reported before any signature is checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("negative round {0}")]
    NegativeRound(i32),

    #[error("commit cannot be for a nil block")]
    NilBlock,

    #[error("block id hash must be {expected} bytes, got {got}")]
    InvalidBlockHash { expected: usize, got: usize },

    #[error("no signatures in commit")]
    NoSignatures,

    #[error("every signature in the commit is absent")]
    AllAbsent,

    #[error("commit entry {index}: validator address must be {expected} bytes, got {got}")]
    InvalidValidatorAddress {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("commit entry {index}: signature is empty")]
    EmptySignature { index: usize },

    #[error("commit entry {index}: signature is {got} bytes, max is {max}")]
    SignatureTooLarge { index: usize, got: usize, max: usize },
}

/// What a present vote was cast for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockIdFlag {
    /// The vote is for the commit's block.
    Commit,
    /// The vote is for no block.
    Nil,
}

/// A present vote inside a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSignature {
    pub block_id_flag: BlockIdFlag,
    #[serde(with = "hex_bytes")]
    pub validator_address: Vec<u8>,
    pub timestamp: Timestamp,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

/// One commit entry per validator position: either no vote was received, or a signed vote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitSig {
    Absent,
    Signed(VoteSignature),
}

impl CommitSig {
    pub fn is_absent(&self) -> bool {
        matches!(self, CommitSig::Absent)
    }

    /// The block id this entry's vote refers to.
    /// Only a `Commit` vote refers to the commit's own block; everything else refers to the zero id.
    pub fn block_id(&self, commit_block_id: &BlockId) -> BlockId {
        match self {
            CommitSig::Signed(VoteSignature {
                block_id_flag: BlockIdFlag::Commit,
                ..
            }) => commit_block_id.clone(),
            _ => BlockId::default(),
        }
    }
}

/// The quorum certificate for one height.
///
/// `signatures[i]` belongs to the validator at position `i` of the set that signed the height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub height: u64,
    pub round: i32,
    pub block_id: BlockId,
    pub signatures: Vec<CommitSig>,
}

impl Commit {
    /// Structural checks that need no validator set and no cryptography.
    pub fn validate_basic(&self) -> Result<(), CommitError> {
        if self.round < 0 {
            return Err(CommitError::NegativeRound(self.round));
        }

        if self.block_id.is_zero() {
            return Err(CommitError::NilBlock);
        }
        if !self.block_id.has_valid_hash() {
            return Err(CommitError::InvalidBlockHash {
                expected: HASH_LEN,
                got: self.block_id.hash.len(),
            });
        }

        if self.signatures.is_empty() {
            return Err(CommitError::NoSignatures);
        }
        if self.signatures.iter().all(CommitSig::is_absent) {
            return Err(CommitError::AllAbsent);
        }

        for (index, sig) in self.signatures.iter().enumerate() {
            if let CommitSig::Signed(vote) = sig {
                if vote.validator_address.len() != ADDRESS_LEN {
                    return Err(CommitError::InvalidValidatorAddress {
                        index,
                        expected: ADDRESS_LEN,
                        got: vote.validator_address.len(),
                    });
                }
                if vote.signature.is_empty() {
                    return Err(CommitError::EmptySignature { index });
                }
                if vote.signature.len() > MAX_SIGNATURE_LEN {
                    return Err(CommitError::SignatureTooLarge {
                        index,
                        got: vote.signature.len(),
                        max: MAX_SIGNATURE_LEN,
                    });
                }
            }
        }

        Ok(())
    }

    /// The entry at position `index`, if any.
    pub fn signature(&self, index: usize) -> Option<&CommitSig> {
        self.signatures.get(index)
    }

    /// Bytes the validator at `index` signed, under the default codec.
    /// `None` if the entry is absent or out of range.
    pub fn vote_sign_bytes(&self, chain_id: &str, index: usize) -> Option<Vec<u8>> {
        Tendermint.vote_sign_bytes(chain_id, self, index)
    }

    pub fn present_signatures(&self) -> usize {
        self.signatures.iter().filter(|s| !s.is_absent()).count()
    }
}
