//! Tendermint RPC JSON format adapter.
//!
//! The node's JSON differs from tmverify-core's types in a few ways, and this module
//! defines serde types matching the wire shape plus `to_core` conversions:
//! - int64 values are quoted strings ("12345"), small ints (round, parts.total) are numbers
//! - hashes and addresses are uppercase hex without a prefix
//! - public keys and signatures are base64
//! - commit entries carry a numeric flag: 1 absent, 2 commit, 3 nil
//! - times are RFC 3339 with nanoseconds; an unset time is year 1, not the Unix epoch

use crate::error::DecodeError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tmverify_core::types::*;

/// Wire value of `block_id_flag` for a missing vote.
pub const BLOCK_ID_FLAG_ABSENT: u8 = 1;
/// Wire value of `block_id_flag` for a vote for the committed block.
pub const BLOCK_ID_FLAG_COMMIT: u8 = 2;
/// Wire value of `block_id_flag` for a vote for no block.
pub const BLOCK_ID_FLAG_NIL: u8 = 3;

/// Amino type name of Ed25519 consensus keys.
pub const ED25519_KEY_TYPE: &str = "tendermint/PubKeyEd25519";
/// Amino type name of secp256k1 consensus keys.
pub const SECP256K1_KEY_TYPE: &str = "tendermint/PubKeySecp256k1";
/// Type names BLS12-381 consensus keys are published under.
pub const BLS12_381_KEY_TYPES: &[&str] = &["tendermint/PubKeyBls12_381", "cometbft/PubKeyBls12_381"];

// ---------------------------------------------------------------------------
// Scalar conversion helpers
// ---------------------------------------------------------------------------

/// An integer the node may send quoted or bare.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcInt {
    Text(String),
    Number(i64),
}

impl RpcInt {
    pub fn parse_u64(&self, field: &'static str) -> Result<u64, DecodeError> {
        match self {
            RpcInt::Text(s) => s.parse::<u64>().map_err(|_| DecodeError::Integer {
                field,
                value: s.clone(),
            }),
            RpcInt::Number(n) => u64::try_from(*n).map_err(|_| DecodeError::Integer {
                field,
                value: n.to_string(),
            }),
        }
    }

    pub fn parse_i64(&self, field: &'static str) -> Result<i64, DecodeError> {
        match self {
            RpcInt::Text(s) => s.parse::<i64>().map_err(|_| DecodeError::Integer {
                field,
                value: s.clone(),
            }),
            RpcInt::Number(n) => Ok(*n),
        }
    }

    fn parse_narrow<T: TryFrom<i64>>(&self, field: &'static str) -> Result<T, DecodeError> {
        let wide = self.parse_i64(field)?;
        T::try_from(wide).map_err(|_| DecodeError::Integer {
            field,
            value: wide.to_string(),
        })
    }
}

impl Default for RpcInt {
    fn default() -> Self {
        RpcInt::Number(0)
    }
}

pub fn hex_to_bytes(field: &'static str, s: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| DecodeError::Hex {
        field,
        value: s.to_string(),
        reason: e.to_string(),
    })
}

pub fn base64_to_bytes(field: &'static str, s: &str) -> Result<Vec<u8>, DecodeError> {
    BASE64.decode(s).map_err(|e| DecodeError::Base64 {
        field,
        reason: e.to_string(),
    })
}

pub fn parse_timestamp(field: &'static str, s: &str) -> Result<Timestamp, DecodeError> {
    let parsed = OffsetDateTime::parse(s, &Rfc3339).map_err(|e| DecodeError::Time {
        field,
        value: s.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Timestamp::new(
        parsed.unix_timestamp(),
        parsed.nanosecond() as i32,
    ))
}

/// Map a wire key type name to the algorithm it carries.
pub fn key_algorithm(type_name: &str) -> Result<KeyAlgorithm, DecodeError> {
    if type_name == ED25519_KEY_TYPE {
        Ok(KeyAlgorithm::Ed25519)
    } else if type_name == SECP256K1_KEY_TYPE {
        Ok(KeyAlgorithm::Secp256k1)
    } else if BLS12_381_KEY_TYPES.contains(&type_name) {
        Ok(KeyAlgorithm::Bls12381)
    } else {
        Err(DecodeError::UnsupportedKeyType(type_name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Shared sub-structures
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcPartSetHeader {
    pub total: RpcInt,
    pub hash: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcBlockId {
    pub hash: String,
    pub parts: RpcPartSetHeader,
}

impl RpcBlockId {
    pub fn to_core(&self) -> Result<BlockId, DecodeError> {
        Ok(BlockId {
            hash: hex_to_bytes("block_id.hash", &self.hash)?,
            part_set_header: PartSetHeader {
                total: self.parts.total.parse_narrow("block_id.parts.total")?,
                hash: hex_to_bytes("block_id.parts.hash", &self.parts.hash)?,
            },
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcVersion {
    pub block: RpcInt,
    #[serde(default)]
    pub app: RpcInt,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcHeader {
    pub version: RpcVersion,
    pub chain_id: String,
    pub height: RpcInt,
    pub time: String,
    pub last_block_id: RpcBlockId,
    pub last_commit_hash: String,
    pub data_hash: String,
    pub validators_hash: String,
    pub next_validators_hash: String,
    pub consensus_hash: String,
    pub app_hash: String,
    pub last_results_hash: String,
    pub evidence_hash: String,
    pub proposer_address: String,
}

impl RpcHeader {
    pub fn to_core(&self) -> Result<Header, DecodeError> {
        Ok(Header {
            version: Version {
                block: self.version.block.parse_u64("version.block")?,
                app: self.version.app.parse_u64("version.app")?,
            },
            chain_id: self.chain_id.clone(),
            height: self.height.parse_u64("height")?,
            time: parse_timestamp("time", &self.time)?,
            last_block_id: self.last_block_id.to_core()?,
            last_commit_hash: hex_to_bytes("last_commit_hash", &self.last_commit_hash)?,
            data_hash: hex_to_bytes("data_hash", &self.data_hash)?,
            validators_hash: hex_to_bytes("validators_hash", &self.validators_hash)?,
            next_validators_hash: hex_to_bytes(
                "next_validators_hash",
                &self.next_validators_hash,
            )?,
            consensus_hash: hex_to_bytes("consensus_hash", &self.consensus_hash)?,
            app_hash: hex_to_bytes("app_hash", &self.app_hash)?,
            last_results_hash: hex_to_bytes("last_results_hash", &self.last_results_hash)?,
            evidence_hash: hex_to_bytes("evidence_hash", &self.evidence_hash)?,
            proposer_address: hex_to_bytes("proposer_address", &self.proposer_address)?,
        })
    }
}

// ---------------------------------------------------------------------------
// /block
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RpcBlock {
    pub header: RpcHeader,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcBlockResponse {
    pub block_id: RpcBlockId,
    pub block: RpcBlock,
}

// ---------------------------------------------------------------------------
// /commit
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct RpcCommitSig {
    pub block_id_flag: u8,
    pub validator_address: String,
    pub timestamp: String,
    pub signature: Option<String>,
}

impl RpcCommitSig {
    pub fn to_core(&self, index: usize) -> Result<CommitSig, DecodeError> {
        let signature = match &self.signature {
            Some(s) => base64_to_bytes("signature", s)?,
            None => Vec::new(),
        };

        let block_id_flag = match self.block_id_flag {
            BLOCK_ID_FLAG_ABSENT => {
                // An absent entry carries nothing; anything else means the node sent garbage.
                if !self.validator_address.is_empty() || !signature.is_empty() {
                    return Err(DecodeError::InvalidCommitSig {
                        index,
                        reason: "absent entry carries an address or signature".into(),
                    });
                }
                return Ok(CommitSig::Absent);
            }
            BLOCK_ID_FLAG_COMMIT => BlockIdFlag::Commit,
            BLOCK_ID_FLAG_NIL => BlockIdFlag::Nil,
            other => {
                return Err(DecodeError::InvalidCommitSig {
                    index,
                    reason: format!("unknown block_id_flag {}", other),
                })
            }
        };

        Ok(CommitSig::Signed(VoteSignature {
            block_id_flag,
            validator_address: hex_to_bytes("validator_address", &self.validator_address)?,
            timestamp: parse_timestamp("timestamp", &self.timestamp)?,
            signature,
        }))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcCommit {
    pub height: RpcInt,
    pub round: RpcInt,
    pub block_id: RpcBlockId,
    pub signatures: Vec<RpcCommitSig>,
}

impl RpcCommit {
    pub fn to_core(&self) -> Result<Commit, DecodeError> {
        let signatures = self
            .signatures
            .iter()
            .enumerate()
            .map(|(i, sig)| sig.to_core(i))
            .collect::<Result<_, _>>()?;

        Ok(Commit {
            height: self.height.parse_u64("commit.height")?,
            round: self.round.parse_narrow("commit.round")?,
            block_id: self.block_id.to_core()?,
            signatures,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcSignedHeader {
    pub header: RpcHeader,
    pub commit: RpcCommit,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcCommitResponse {
    pub signed_header: RpcSignedHeader,
    #[serde(default)]
    pub canonical: bool,
}

// ---------------------------------------------------------------------------
// /validators
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct RpcPubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

impl RpcPubKey {
    pub fn to_core(&self) -> Result<PublicKey, DecodeError> {
        let algorithm = key_algorithm(&self.key_type)?;
        let bytes = base64_to_bytes("pub_key.value", &self.value)?;
        PublicKey::from_bytes(algorithm, &bytes)
            .map_err(|reason| DecodeError::UnsupportedKeyType(format!("{}: {}", self.key_type, reason)))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcValidator {
    pub address: String,
    pub pub_key: RpcPubKey,
    pub voting_power: RpcInt,
    #[serde(default)]
    pub proposer_priority: RpcInt,
}

impl RpcValidator {
    /// Convert the validator found at `index` of the node's list.
    pub fn to_core(&self, index: usize) -> Result<Validator, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidValidator { index, reason };

        let public_key = self
            .pub_key
            .to_core()
            .map_err(|e| invalid(e.to_string()))?;
        let position = u32::try_from(index).map_err(|_| invalid("index out of range".into()))?;
        let voting_power = self.voting_power.parse_u64("voting_power")?;

        let mut validator = Validator::new(position, public_key, voting_power);
        validator.proposer_priority = self.proposer_priority.parse_i64("proposer_priority")?;

        // The node's address must be the one the key derives; the derived one is kept.
        let claimed = hex_to_bytes("address", &self.address)?;
        if claimed != validator.address {
            return Err(invalid(format!(
                "address {} does not match public key (expected {})",
                self.address,
                hex::encode_upper(&validator.address)
            )));
        }

        Ok(validator)
    }
}

/// Build a validator set from the node's list, in the node's order.
pub fn validators_to_core(validators: &[RpcValidator]) -> Result<ValidatorSet, DecodeError> {
    let converted = validators
        .iter()
        .enumerate()
        .map(|(i, v)| v.to_core(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ValidatorSet::new(converted)?)
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcValidatorsResponse {
    pub block_height: RpcInt,
    pub validators: Vec<RpcValidator>,
    pub count: RpcInt,
    pub total: RpcInt,
}

// ---------------------------------------------------------------------------
// /status
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
pub struct RpcSyncInfo {
    pub latest_block_hash: String,
    pub latest_block_height: RpcInt,
    pub latest_block_time: String,
    #[serde(default)]
    pub catching_up: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcNodeInfo {
    pub network: String,
    #[serde(default)]
    pub moniker: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcStatusResponse {
    pub node_info: RpcNodeInfo,
    pub sync_info: RpcSyncInfo,
}

// ---------------------------------------------------------------------------
// /abci_query
// ---------------------------------------------------------------------------

/// Result of a raw application store query. Unverified: no proof is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbciQueryResult {
    pub code: u32,
    pub log: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub height: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcAbciQuery {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub height: RpcInt,
}

impl RpcAbciQuery {
    pub fn to_core(&self) -> Result<AbciQueryResult, DecodeError> {
        let decode = |field, v: &Option<String>| match v {
            Some(s) => base64_to_bytes(field, s),
            None => Ok(Vec::new()),
        };
        Ok(AbciQueryResult {
            code: self.code,
            log: self.log.clone(),
            key: decode("response.key", &self.key)?,
            value: decode("response.value", &self.value)?,
            height: self.height.parse_u64("response.height")?,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcAbciQueryResponse {
    pub response: RpcAbciQuery,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header_json() -> serde_json::Value {
        json!({
            "version": { "block": "11", "app": "0" },
            "chain_id": "heimdall-137",
            "height": "8000000",
            "time": "2021-06-01T12:00:00.123456789Z",
            "last_block_id": {
                "hash": "AA".repeat(32),
                "parts": { "total": 1, "hash": "BB".repeat(32) }
            },
            "last_commit_hash": "01".repeat(32),
            "data_hash": "",
            "validators_hash": "02".repeat(32),
            "next_validators_hash": "03".repeat(32),
            "consensus_hash": "04".repeat(32),
            "app_hash": "05".repeat(32),
            "last_results_hash": "",
            "evidence_hash": "",
            "proposer_address": "06".repeat(20)
        })
    }

    #[test]
    fn test_rpc_int_accepts_quoted_and_bare() {
        assert_eq!(RpcInt::Text("42".into()).parse_u64("x").unwrap(), 42);
        assert_eq!(RpcInt::Number(42).parse_u64("x").unwrap(), 42);
        assert!(RpcInt::Number(-1).parse_u64("x").is_err());
        assert!(RpcInt::Text("4x".into()).parse_i64("x").is_err());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("t", "2020-09-13T12:26:40.0000005Z").unwrap();
        assert_eq!(ts, Timestamp::new(1_600_000_000, 500));
    }

    #[test]
    fn test_parse_go_zero_time() {
        let ts = parse_timestamp("t", "0001-01-01T00:00:00Z").unwrap();
        assert!(ts.is_zero());
    }

    #[test]
    fn test_header_conversion() {
        let api: RpcHeader = serde_json::from_value(header_json()).unwrap();
        let header = api.to_core().unwrap();

        assert_eq!(header.version, Version { block: 11, app: 0 });
        assert_eq!(header.height, 8_000_000);
        assert_eq!(header.time.nanos, 123_456_789);
        assert_eq!(header.last_block_id.part_set_header.total, 1);
        assert_eq!(header.validators_hash, vec![2; 32]);
        assert_eq!(header.next_validators_hash, vec![3; 32]);
        assert!(header.data_hash.is_empty());
        assert_eq!(header.proposer_address, vec![6; 20]);
    }

    #[test]
    fn test_header_bad_hex_names_field() {
        let mut value = header_json();
        value["app_hash"] = json!("ZZ");
        let api: RpcHeader = serde_json::from_value(value).unwrap();
        match api.to_core() {
            Err(DecodeError::Hex { field, .. }) => assert_eq!(field, "app_hash"),
            other => panic!("expected hex error, got {:?}", other),
        }
    }

    #[test]
    fn test_commit_sig_flags() {
        let absent: RpcCommitSig = serde_json::from_value(json!({
            "block_id_flag": 1,
            "validator_address": "",
            "timestamp": "0001-01-01T00:00:00Z",
            "signature": null
        }))
        .unwrap();
        assert_eq!(absent.to_core(0).unwrap(), CommitSig::Absent);

        let nil: RpcCommitSig = serde_json::from_value(json!({
            "block_id_flag": 3,
            "validator_address": "07".repeat(20),
            "timestamp": "2020-09-13T12:26:40Z",
            "signature": BASE64.encode([9u8; 64])
        }))
        .unwrap();
        match nil.to_core(1).unwrap() {
            CommitSig::Signed(vote) => {
                assert_eq!(vote.block_id_flag, BlockIdFlag::Nil);
                assert_eq!(vote.validator_address, vec![7; 20]);
                assert_eq!(vote.signature, vec![9; 64]);
                assert_eq!(vote.timestamp, Timestamp::new(1_600_000_000, 0));
            }
            other => panic!("expected signed entry, got {:?}", other),
        }
    }

    #[test]
    fn test_commit_sig_rejects_unknown_flag_and_dirty_absent() {
        let unknown: RpcCommitSig = serde_json::from_value(json!({
            "block_id_flag": 4,
            "validator_address": "",
            "timestamp": "0001-01-01T00:00:00Z",
            "signature": null
        }))
        .unwrap();
        assert!(matches!(
            unknown.to_core(2),
            Err(DecodeError::InvalidCommitSig { index: 2, .. })
        ));

        let dirty: RpcCommitSig = serde_json::from_value(json!({
            "block_id_flag": 1,
            "validator_address": "07".repeat(20),
            "timestamp": "0001-01-01T00:00:00Z",
            "signature": null
        }))
        .unwrap();
        assert!(dirty.to_core(0).is_err());
    }

    #[test]
    fn test_commit_conversion() {
        let api: RpcCommit = serde_json::from_value(json!({
            "height": "10",
            "round": 2,
            "block_id": {
                "hash": "AA".repeat(32),
                "parts": { "total": 1, "hash": "BB".repeat(32) }
            },
            "signatures": [
                {
                    "block_id_flag": 2,
                    "validator_address": "01".repeat(20),
                    "timestamp": "2020-09-13T12:26:40Z",
                    "signature": BASE64.encode([1u8; 64])
                },
                {
                    "block_id_flag": 1,
                    "validator_address": "",
                    "timestamp": "0001-01-01T00:00:00Z",
                    "signature": null
                }
            ]
        }))
        .unwrap();

        let commit = api.to_core().unwrap();
        assert_eq!(commit.height, 10);
        assert_eq!(commit.round, 2);
        assert_eq!(commit.block_id.hash, vec![0xAA; 32]);
        assert_eq!(commit.signatures.len(), 2);
        assert_eq!(commit.present_signatures(), 1);
        assert!(commit.validate_basic().is_ok());
    }

    fn validator_json(key: [u8; 32], power: &str) -> serde_json::Value {
        let public_key = PublicKey::Ed25519(key);
        json!({
            "address": hex::encode_upper(public_key.address()),
            "pub_key": { "type": ED25519_KEY_TYPE, "value": BASE64.encode(key) },
            "voting_power": power,
            "proposer_priority": "-5"
        })
    }

    #[test]
    fn test_validators_conversion_matches_known_hash() {
        let api: Vec<RpcValidator> = serde_json::from_value(json!([
            validator_json([1; 32], "10"),
            validator_json([2; 32], "20"),
        ]))
        .unwrap();

        let set = validators_to_core(&api).unwrap();
        assert_eq!(set.size(), 2);
        assert_eq!(set.total_voting_power(), 30);
        assert_eq!(set.get_by_index(0).unwrap().proposer_priority, -5);
        assert_eq!(
            hex::encode(set.hash()),
            "7d50d641fa2e92a49423e5f7b67d5963ea7fa04409ae999d78da2f09b405e4b7"
        );
    }

    #[test]
    fn test_validator_address_must_match_key() {
        let mut value = validator_json([1; 32], "10");
        value["address"] = json!("00".repeat(20));
        let api: RpcValidator = serde_json::from_value(value).unwrap();
        assert!(matches!(
            api.to_core(3),
            Err(DecodeError::InvalidValidator { index: 3, .. })
        ));
    }

    #[test]
    fn test_secp256k1_validator_decodes() {
        let key = [2u8; 33];
        let address = PublicKey::Secp256k1(key).address();
        let api: RpcValidator = serde_json::from_value(json!({
            "address": hex::encode_upper(address),
            "pub_key": { "type": SECP256K1_KEY_TYPE, "value": BASE64.encode(key) },
            "voting_power": "10",
            "proposer_priority": "0"
        }))
        .unwrap();

        let validator = api.to_core(0).unwrap();
        assert_eq!(validator.public_key, PublicKey::Secp256k1(key));
        assert_eq!(validator.address, address.to_vec());
    }

    #[test]
    fn test_secp256k1_key_length_is_checked() {
        let api: RpcPubKey = serde_json::from_value(json!({
            "type": SECP256K1_KEY_TYPE,
            "value": BASE64.encode([4u8; 65])
        }))
        .unwrap();
        assert!(matches!(api.to_core(), Err(DecodeError::UnsupportedKeyType(_))));
    }

    #[test]
    fn test_unsupported_key_type() {
        let api: RpcPubKey = serde_json::from_value(json!({
            "type": "tendermint/PubKeySr25519",
            "value": BASE64.encode([2u8; 32])
        }))
        .unwrap();
        assert!(matches!(api.to_core(), Err(DecodeError::UnsupportedKeyType(_))));
    }

    #[test]
    fn test_bls_key_type() {
        let api: RpcPubKey = serde_json::from_value(json!({
            "type": "cometbft/PubKeyBls12_381",
            "value": BASE64.encode([3u8; 48])
        }))
        .unwrap();
        assert_eq!(api.to_core().unwrap().algorithm(), KeyAlgorithm::Bls12381);
    }

    #[test]
    fn test_abci_query_conversion() {
        let api: RpcAbciQueryResponse = serde_json::from_value(json!({
            "response": {
                "code": 0,
                "log": "",
                "key": BASE64.encode([0x36, 0, 0, 0, 0, 0, 0, 0, 1]),
                "value": BASE64.encode(b"span"),
                "height": "123"
            }
        }))
        .unwrap();
        let result = api.response.to_core().unwrap();
        assert_eq!(result.key[0], 0x36);
        assert_eq!(result.value, b"span");
        assert_eq!(result.height, 123);
    }
}
