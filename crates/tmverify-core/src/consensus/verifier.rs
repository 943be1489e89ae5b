use crate::consensus::error::{HashClaim, VerificationError};
use crate::consensus::signature::{SignatureVerifier, StandardVerifier};
use crate::encoding::{ChainCodec, Tendermint};
use crate::types::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Everything a remote source claims about one height. Nothing in here is trusted yet.
#[derive(Clone, Debug)]
pub struct UntrustedHeader {
    pub header: Header,
    pub commit: Commit,
    pub validators: ValidatorSet,
}

/// A header that passed every check, with the facts needed to move on to the next height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedHeader {
    pub height: u64,
    #[serde(with = "crate::types::hex_hash")]
    pub hash: Hash,
    pub chain_id: String,
    /// Voting power of the valid votes for this block.
    pub tallied_power: u64,
    pub total_power: u64,
    #[serde(with = "crate::types::hex_bytes")]
    pub next_validators_hash: Vec<u8>,
}

impl VerifiedHeader {
    /// Anchor for `height + 1`, derived from this verified header.
    pub fn next_epoch_info(&self) -> EpochInfo {
        EpochInfo::new(self.next_validators_hash.clone(), self.chain_id.clone())
    }
}

/// Quorum threshold: tallied power must be strictly greater than this.
pub fn quorum_threshold(total_voting_power: u64) -> u64 {
    total_voting_power * 2 / 3
}

/// Decides accept/reject for a single height.
///
/// Stateless: every call reads only its arguments, so one verifier can be shared
/// across threads and heights.
#[derive(Clone, Debug, Default)]
pub struct HeaderVerifier<V = StandardVerifier, C = Tendermint> {
    signatures: V,
    codec: C,
}

impl HeaderVerifier {
    /// Standard signature algorithms with the default chain encoding.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: SignatureVerifier, C: ChainCodec> HeaderVerifier<V, C> {
    pub fn with_parts(signatures: V, codec: C) -> Self {
        Self { signatures, codec }
    }

    pub fn signature_verifier(&self) -> &V {
        &self.signatures
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Run the verification pipeline. The first failing check decides the error and
    /// no later check runs; structural checks come before any signature is verified.
    ///
    /// 1. the anchor's `next_validators_hash` matches the supplied set
    /// 2. the header's `validators_hash` matches the supplied set
    /// 3. commit height equals header height
    /// 4. commit block hash equals the header hash
    /// 5. the commit is well formed
    /// 6. one commit entry per validator, index-aligned
    /// 7. every present signature verifies; votes for this block are tallied
    /// 8. tallied power is more than two thirds of the total
    pub fn verify(
        &self,
        candidate: &UntrustedHeader,
        epoch: &EpochInfo,
    ) -> Result<VerifiedHeader, VerificationError> {
        let UntrustedHeader {
            header,
            commit,
            validators,
        } = candidate;
        let set_hash = validators.hash();

        if epoch.next_validators_hash != set_hash {
            return Err(VerificationError::ValidatorSetMismatch {
                claim: HashClaim::EpochAnchor,
                expected: hex::encode_upper(&epoch.next_validators_hash),
                actual: hex::encode_upper(set_hash),
            });
        }

        if header.validators_hash != set_hash {
            return Err(VerificationError::ValidatorSetMismatch {
                claim: HashClaim::Header,
                expected: hex::encode_upper(&header.validators_hash),
                actual: hex::encode_upper(set_hash),
            });
        }

        if commit.height != header.height {
            return Err(VerificationError::HeightMismatch {
                commit_height: commit.height,
                header_height: header.height,
            });
        }

        // validators_hash is non-empty here (it matched the set hash), so the header has an identity.
        let header_hash = self.codec.header_hash(header);
        if header_hash.map_or(true, |h| commit.block_id.hash != h) {
            return Err(VerificationError::BlockHashMismatch {
                commit_block_hash: hex::encode_upper(&commit.block_id.hash),
                header_hash: header_hash.map(hex::encode_upper).unwrap_or_default(),
            });
        }

        commit.validate_basic()?;

        if commit.signatures.len() != validators.size() {
            return Err(VerificationError::SignatureCountMismatch {
                signatures: commit.signatures.len(),
                validators: validators.size(),
            });
        }

        let tallied_power = self.tally_votes(commit, validators, &epoch.chain_id)?;

        let total_power = validators.total_voting_power();
        let threshold = quorum_threshold(total_power);
        if tallied_power <= threshold {
            debug!(
                height = header.height,
                tallied_power, total_power, "rejecting header: no quorum"
            );
            return Err(VerificationError::InsufficientVotingPower {
                tallied: tallied_power,
                total: total_power,
                threshold,
            });
        }

        // Step 4 guarantees the hash exists.
        let hash = header_hash.unwrap_or_default();
        debug!(
            height = header.height,
            hash = %hex::encode_upper(hash),
            tallied_power,
            total_power,
            "header verified"
        );

        Ok(VerifiedHeader {
            height: header.height,
            hash,
            chain_id: epoch.chain_id.clone(),
            tallied_power,
            total_power,
            next_validators_hash: header.next_validators_hash.clone(),
        })
    }

    /// Verify every present vote and sum the power of those cast for the commit's block.
    ///
    /// Any invalid signature rejects the whole header. A valid vote for another block
    /// (a nil vote) is tolerated but does not count toward the quorum.
    fn tally_votes(
        &self,
        commit: &Commit,
        validators: &ValidatorSet,
        chain_id: &str,
    ) -> Result<u64, VerificationError> {
        let mut tallied: u64 = 0;

        for (index, entry) in commit.signatures.iter().enumerate() {
            let CommitSig::Signed(vote) = entry else {
                continue;
            };

            let validator = validators.get_by_index(index)?;
            let message = self
                .codec
                .vote_sign_bytes(chain_id, commit, index)
                .ok_or(VerificationError::ValidatorIndexUnknown {
                    index,
                    size: commit.signatures.len(),
                })?;

            if !self
                .signatures
                .verify(&validator.public_key, &message, &vote.signature)
            {
                debug!(height = commit.height, index, "rejecting header: invalid signature");
                return Err(VerificationError::InvalidSignature {
                    index,
                    address: hex::encode_upper(&validator.address),
                });
            }

            // Compare the vote's own target with the commit's block, never the commit with itself.
            if entry.block_id(&commit.block_id) == commit.block_id {
                // Cannot overflow: the set's total is bounded well below u64::MAX.
                tallied += validator.voting_power;
                trace!(index, power = validator.voting_power, tallied, "vote tallied");
            } else {
                trace!(index, "valid vote for a different block, not tallied");
            }
        }

        Ok(tallied)
    }
}

/// Verify one height with the standard verifier and the default chain encoding.
pub fn verify_header(
    candidate: &UntrustedHeader,
    epoch: &EpochInfo,
) -> Result<VerifiedHeader, VerificationError> {
    HeaderVerifier::new().verify(candidate, epoch)
}
