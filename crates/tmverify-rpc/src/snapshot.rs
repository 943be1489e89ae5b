//! Validator snapshots of the secondary (Bor) chain.
//!
//! Transport only: nothing here is verified.

use crate::error::RpcError;
use crate::jsonrpc::JsonRpcClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub const SNAPSHOT_METHOD: &str = "bor_getSnapshot";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotValidator {
    #[serde(rename = "ID")]
    pub id: u64,
    pub signer: String,
    pub power: i64,
    #[serde(default)]
    pub accum: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotValidatorSet {
    pub validators: Vec<SnapshotValidator>,
    pub proposer: Option<SnapshotValidator>,
}

/// The validator set the secondary chain considers active at a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub number: u64,
    pub hash: String,
    pub validator_set: SnapshotValidatorSet,
    /// Recent block number to signer address.
    #[serde(default)]
    pub recents: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct SnapshotClient {
    rpc: JsonRpcClient,
}

impl SnapshotClient {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(url, request_timeout)?,
        })
    }

    /// Snapshot at the block with hash `block_hash` (0x-prefixed hex).
    pub async fn snapshot(&self, block_hash: &str) -> Result<Snapshot, RpcError> {
        let snapshot: Snapshot = self.rpc.call(SNAPSHOT_METHOD, [block_hash]).await?;
        debug!(
            number = snapshot.number,
            validators = snapshot.validator_set.validators.len(),
            "fetched snapshot"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_deserializes() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{
                "number": 22000000,
                "hash": "0xabc",
                "validatorSet": {
                    "validators": [
                        {"ID": 4, "signer": "0x01", "power": 100, "accum": -50},
                        {"ID": 7, "signer": "0x02", "power": 50, "accum": 50}
                    ],
                    "proposer": {"ID": 4, "signer": "0x01", "power": 100, "accum": -50}
                },
                "recents": {"21999999": "0x02"}
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.number, 22_000_000);
        assert_eq!(snapshot.validator_set.validators.len(), 2);
        assert_eq!(snapshot.validator_set.validators[1].id, 7);
        assert_eq!(snapshot.validator_set.proposer.as_ref().unwrap().accum, -50);
        assert_eq!(snapshot.recents["21999999"], "0x02");
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = Snapshot {
            number: 1,
            hash: "0x00".into(),
            validator_set: SnapshotValidatorSet {
                validators: vec![],
                proposer: None,
            },
            recents: BTreeMap::new(),
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("validatorSet").is_some());
    }
}
