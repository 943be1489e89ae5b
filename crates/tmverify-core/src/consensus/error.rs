use crate::types::CommitError;
use std::fmt;
use thiserror::Error;

/// Which party claimed the validator set hash that failed to match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashClaim {
    /// The trusted anchor from the previous height.
    EpochAnchor,
    /// The header being verified.
    Header,
}

impl fmt::Display for HashClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashClaim::EpochAnchor => write!(f, "epoch anchor next_validators_hash"),
            HashClaim::Header => write!(f, "header validators_hash"),
        }
    }
}

/// Reasons a header is rejected.
/// Each check of the verification pipeline maps to exactly one variant; the context fields
/// are for diagnostics only and never feed back into the accept/reject decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Validator set mismatch: {claim} is {expected}, supplied validator set hashes to {actual}")]
    ValidatorSetMismatch {
        claim: HashClaim,
        expected: String,
        actual: String,
    },

    #[error("Commit height {commit_height} does not match header height {header_height}")]
    HeightMismatch {
        commit_height: u64,
        header_height: u64,
    },

    #[error("Commit block hash {commit_block_hash} does not match header hash {header_hash}")]
    BlockHashMismatch {
        commit_block_hash: String,
        header_hash: String,
    },

    #[error("Malformed commit: {0}")]
    CommitMalformed(#[from] CommitError),

    #[error("Commit has {signatures} entries but the validator set has {validators} members")]
    SignatureCountMismatch { signatures: usize, validators: usize },

    #[error("No validator at index {index} (set size {size})")]
    ValidatorIndexUnknown { index: usize, size: usize },

    #[error("Invalid signature from validator {index} ({address})")]
    InvalidSignature { index: usize, address: String },

    #[error("Insufficient voting power: tallied {tallied} of {total}, need more than {threshold}")]
    InsufficientVotingPower {
        tallied: u64,
        total: u64,
        threshold: u64,
    },

    #[error("Total voting power exceeds the maximum of {max}")]
    VotingPowerOverflow { max: u64 },

    #[error("Invalid validator set: {reason}")]
    InvalidValidatorSet { reason: String },
}
