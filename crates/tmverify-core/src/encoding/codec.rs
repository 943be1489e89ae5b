use super::merkle::simple_hash_from_byte_slices;
use super::proto::{length_delimited, ProtoWriter};
use crate::types::*;

/// The byte-level conventions a chain fixes once: how validator sets and headers are hashed,
/// and what exactly a validator signs when it votes.
///
/// Any deviation from the chain's own encoding makes every hash comparison or every
/// signature check fail, so an implementation must be bit-exact with the signer.
pub trait ChainCodec: Send + Sync {
    fn validator_set_hash(&self, validators: &[Validator]) -> Hash;

    /// `None` when the header carries no validators hash.
    fn header_hash(&self, header: &Header) -> Option<Hash>;

    /// `None` when the entry at `index` is absent or out of range.
    fn vote_sign_bytes(&self, chain_id: &str, commit: &Commit, index: usize) -> Option<Vec<u8>>;
}

/// Signed message type of a precommit vote.
const PRECOMMIT_TYPE: u64 = 2;

/// Field numbers of the consensus key oneof.
const PUBKEY_FIELD_ED25519: u32 = 1;
const PUBKEY_FIELD_SECP256K1: u32 = 2;
const PUBKEY_FIELD_BLS12_381: u32 = 3;

/// Encoding used by Tendermint / CometBFT chains: protobuf-encoded fields, merkleized with SHA256.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tendermint;

impl ChainCodec for Tendermint {
    fn validator_set_hash(&self, validators: &[Validator]) -> Hash {
        let leaves: Vec<Vec<u8>> = validators.iter().map(encode_simple_validator).collect();
        simple_hash_from_byte_slices(&leaves)
    }

    fn header_hash(&self, header: &Header) -> Option<Hash> {
        if header.validators_hash.is_empty() {
            return None;
        }

        let fields: [Vec<u8>; 14] = [
            ProtoWriter::new()
                .uint64(1, header.version.block)
                .uint64(2, header.version.app)
                .finish(),
            wrap_bytes(header.chain_id.as_bytes()),
            ProtoWriter::new().int64(1, header.height as i64).finish(),
            encode_timestamp(&header.time),
            encode_block_id(&header.last_block_id),
            wrap_bytes(&header.last_commit_hash),
            wrap_bytes(&header.data_hash),
            wrap_bytes(&header.validators_hash),
            wrap_bytes(&header.next_validators_hash),
            wrap_bytes(&header.consensus_hash),
            wrap_bytes(&header.app_hash),
            wrap_bytes(&header.last_results_hash),
            wrap_bytes(&header.evidence_hash),
            wrap_bytes(&header.proposer_address),
        ];

        Some(simple_hash_from_byte_slices(&fields))
    }

    fn vote_sign_bytes(&self, chain_id: &str, commit: &Commit, index: usize) -> Option<Vec<u8>> {
        let entry = commit.signature(index)?;
        let vote = match entry {
            CommitSig::Absent => return None,
            CommitSig::Signed(vote) => vote,
        };
        let block_id = entry.block_id(&commit.block_id);

        let mut canonical = ProtoWriter::new();
        canonical
            .uint64(1, PRECOMMIT_TYPE)
            .sfixed64(2, commit.height as i64)
            .sfixed64(3, commit.round as i64);
        // A nil vote signs no block id at all, not an empty one.
        if !block_id.is_zero() {
            // CanonicalBlockID has the same wire shape as BlockID.
            canonical.message(4, &encode_block_id(&block_id));
        }
        canonical
            .message(5, &encode_timestamp(&vote.timestamp))
            .string(6, chain_id);

        Some(length_delimited(&canonical.finish()))
    }
}

/// `SimpleValidator { pub_key, voting_power }`: the leaf committed to by the validator set hash.
fn encode_simple_validator(validator: &Validator) -> Vec<u8> {
    ProtoWriter::new()
        .message(1, &encode_public_key(&validator.public_key))
        .int64(2, validator.voting_power as i64)
        .finish()
}

fn encode_public_key(key: &PublicKey) -> Vec<u8> {
    let field = match key {
        PublicKey::Ed25519(_) => PUBKEY_FIELD_ED25519,
        PublicKey::Secp256k1(_) => PUBKEY_FIELD_SECP256K1,
        PublicKey::Bls12381(_) => PUBKEY_FIELD_BLS12_381,
    };
    ProtoWriter::new().bytes(field, key.as_bytes()).finish()
}

/// Header byte fields are hashed wrapped in a `BytesValue` / `StringValue` message.
fn wrap_bytes(value: &[u8]) -> Vec<u8> {
    ProtoWriter::new().bytes(1, value).finish()
}

fn encode_timestamp(ts: &Timestamp) -> Vec<u8> {
    ProtoWriter::new()
        .int64(1, ts.seconds)
        .int32(2, ts.nanos)
        .finish()
}

fn encode_part_set_header(psh: &PartSetHeader) -> Vec<u8> {
    ProtoWriter::new()
        .uint64(1, psh.total as u64)
        .bytes(2, &psh.hash)
        .finish()
}

fn encode_block_id(block_id: &BlockId) -> Vec<u8> {
    ProtoWriter::new()
        .bytes(1, &block_id.hash)
        .message(2, &encode_part_set_header(&block_id.part_set_header))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::merkle::sha256_hash;
    use hex_literal::hex;

    fn sha(s: &str) -> Vec<u8> {
        sha256_hash(s.as_bytes()).to_vec()
    }

    /// Header from the upstream engine's own hash test, with its published block hash.
    #[test]
    fn test_header_hash_known_vector() {
        let header = Header {
            version: Version { block: 1, app: 2 },
            chain_id: "chainId".into(),
            height: 3,
            // 2019-10-13T16:14:44Z
            time: Timestamp::new(1_570_983_284, 0),
            last_block_id: BlockId {
                hash: vec![0; 32],
                part_set_header: PartSetHeader {
                    total: 6,
                    hash: vec![0; 32],
                },
            },
            last_commit_hash: sha("last_commit_hash"),
            data_hash: sha("data_hash"),
            validators_hash: sha("validators_hash"),
            next_validators_hash: sha("next_validators_hash"),
            consensus_hash: sha("consensus_hash"),
            app_hash: sha("app_hash"),
            last_results_hash: sha("last_results_hash"),
            evidence_hash: sha("evidence_hash"),
            proposer_address: sha("proposer_address")[..20].to_vec(),
        };

        assert_eq!(
            header.hash(),
            Some(hex!(
                "F740121F553B5418C3EFBD343C2DBFE9E007BB67B0D020A0741374BAB65242A4"
            ))
        );
    }

    #[test]
    fn test_header_without_validators_hash_has_no_hash() {
        assert_eq!(Header::default().hash(), None);
    }

    /// Precommit at height 1, round 1, zero timestamp, no block, no chain id.
    #[test]
    fn test_vote_sign_bytes_known_vector() {
        let commit = Commit {
            height: 1,
            round: 1,
            block_id: BlockId::default(),
            signatures: vec![CommitSig::Signed(VoteSignature {
                block_id_flag: BlockIdFlag::Nil,
                validator_address: vec![0; 20],
                timestamp: Timestamp::zero(),
                signature: vec![0; 64],
            })],
        };

        assert_eq!(
            Tendermint.vote_sign_bytes("", &commit, 0).unwrap(),
            hex!("2108021101000000000000001901000000000000002a0b088092b8c398feffffff01").to_vec()
        );
    }

    #[test]
    fn test_vote_sign_bytes_with_block_and_chain_id() {
        let commit = Commit {
            height: 10,
            round: 0,
            block_id: BlockId {
                hash: vec![0xAA; 32],
                part_set_header: PartSetHeader {
                    total: 1,
                    hash: vec![0xBB; 32],
                },
            },
            signatures: vec![CommitSig::Signed(VoteSignature {
                block_id_flag: BlockIdFlag::Commit,
                validator_address: vec![0; 20],
                timestamp: Timestamp::new(1_600_000_000, 500),
                signature: vec![0; 64],
            })],
        };

        let expected = hex!(
            "6f0802110a0000000000000022480a20aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa122408011220bbbbbbbbbbbbbbbbbbbb"
            "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2a090880a0f8fa0510f4"
            "03320d746573745f636861696e5f6964"
        );
        assert_eq!(commit.vote_sign_bytes("test_chain_id", 0).unwrap(), expected.to_vec());
    }

    #[test]
    fn test_secp256k1_key_uses_its_oneof_field() {
        let validator = Validator::new(0, PublicKey::Secp256k1([2; 33]), 10);
        let mut expected = vec![0x0a, 35, 0x12, 33];
        expected.extend_from_slice(&[2; 33]);
        expected.extend_from_slice(&[0x10, 10]);
        assert_eq!(encode_simple_validator(&validator), expected);
    }

    #[test]
    fn test_validator_set_hash_vector() {
        let set = ValidatorSet::new(vec![
            Validator::new(0, PublicKey::Ed25519([1; 32]), 10),
            Validator::new(1, PublicKey::Ed25519([2; 32]), 20),
        ])
        .unwrap();
        assert_eq!(
            set.hash(),
            hex!("7d50d641fa2e92a49423e5f7b67d5963ea7fa04409ae999d78da2f09b405e4b7")
        );
    }
}
