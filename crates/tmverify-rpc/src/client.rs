use crate::api::*;
use crate::error::RpcError;
use crate::jsonrpc::{JsonRpcClient, JsonRpcError};
use crate::keys::{span_key, SPAN_PREFIX_KEY, SPAN_STORE_PATH};
use crate::source::BlockSource;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tmverify_core::{Commit, Header, ValidatorSet};
use tracing::debug;

/// Default page size for validator queries.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Largest page size nodes accept.
pub const MAX_PER_PAGE: u32 = 100;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tendermint reports a height beyond its tip with this text in the error data.
const HEIGHT_UNAVAILABLE: &str = "must be less than or equal to the current blockchain height";

/// A Tendermint node's JSON-RPC endpoint.
#[derive(Debug)]
pub struct TendermintRpc {
    rpc: JsonRpcClient,
    per_page: u32,
}

impl TendermintRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_options(url, DEFAULT_PER_PAGE, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_options(
        url: impl Into<String>,
        per_page: u32,
        request_timeout: Duration,
    ) -> Result<Self, RpcError> {
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(RpcError::Config(format!(
                "per_page must be in 1..={}, got {}",
                MAX_PER_PAGE, per_page
            )));
        }
        Ok(Self {
            rpc: JsonRpcClient::new(url, request_timeout)?,
            per_page,
        })
    }

    pub fn url(&self) -> &str {
        self.rpc.url()
    }

    /// Call a height-scoped method, mapping "beyond the tip" to [`RpcError::NotFound`].
    async fn call_at<T: DeserializeOwned>(
        &self,
        method: &str,
        height: u64,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        match self.rpc.call_raw(method, params).await? {
            Ok(result) => Ok(result),
            Err(error) if is_height_unavailable(&error) => Err(RpcError::NotFound { height }),
            Err(error) => Err(error.into_rpc_error(method)),
        }
    }

    pub async fn status(&self) -> Result<RpcStatusResponse, RpcError> {
        self.rpc.call("status", json!({})).await
    }

    /// Query the application store. The result carries no verified proof.
    pub async fn abci_query(
        &self,
        path: &str,
        data: &[u8],
        height: Option<u64>,
        prove: bool,
    ) -> Result<AbciQueryResult, RpcError> {
        let params = json!({
            "path": path,
            "data": hex::encode_upper(data),
            "height": height.unwrap_or(0).to_string(),
            "prove": prove,
        });
        let response: RpcAbciQueryResponse = self.rpc.call("abci_query", params).await?;
        response
            .response
            .to_core()
            .map_err(|e| RpcError::decode("abci_query", e))
    }

    /// Raw store entry of span `id`.
    pub async fn query_span(&self, id: u64, height: Option<u64>) -> Result<AbciQueryResult, RpcError> {
        self.abci_query(SPAN_STORE_PATH, &span_key(SPAN_PREFIX_KEY, id), height, true)
            .await
    }
}

fn is_height_unavailable(error: &JsonRpcError) -> bool {
    error.data_text().contains(HEIGHT_UNAVAILABLE) || error.message.contains(HEIGHT_UNAVAILABLE)
}

#[async_trait]
impl BlockSource for TendermintRpc {
    async fn block_header(&self, height: u64) -> Result<Header, RpcError> {
        let response: RpcBlockResponse = self
            .call_at("block", height, json!({ "height": height.to_string() }))
            .await?;
        let header = response
            .block
            .header
            .to_core()
            .map_err(|e| RpcError::decode("block", e))?;
        debug!(height, "fetched block");
        Ok(header)
    }

    async fn commit(&self, height: u64) -> Result<Commit, RpcError> {
        let response: RpcCommitResponse = self
            .call_at("commit", height, json!({ "height": height.to_string() }))
            .await?;
        let commit = response
            .signed_header
            .commit
            .to_core()
            .map_err(|e| RpcError::decode("commit", e))?;
        debug!(height, signatures = commit.signatures.len(), "fetched commit");
        Ok(commit)
    }

    async fn validators(&self, height: u64) -> Result<ValidatorSet, RpcError> {
        let decode = |e| RpcError::decode("validators", e);
        let mut collected: Vec<RpcValidator> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let params = json!({
                "height": height.to_string(),
                "page": page.to_string(),
                "per_page": self.per_page.to_string(),
            });
            let response: RpcValidatorsResponse = self.call_at("validators", height, params).await?;
            let total = response.total.parse_u64("total").map_err(decode)?;
            let received = response.validators.len();
            collected.extend(response.validators);

            if received == 0 || collected.len() as u64 >= total {
                break;
            }
            page += 1;
        }

        debug!(height, validators = collected.len(), pages = page, "fetched validators");
        validators_to_core(&collected).map_err(decode)
    }

    async fn latest_height(&self) -> Result<u64, RpcError> {
        let status = self.status().await?;
        status
            .sync_info
            .latest_block_height
            .parse_u64("sync_info.latest_block_height")
            .map_err(|e| RpcError::decode("status", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_page_bounds() {
        assert!(TendermintRpc::with_options("http://localhost:26657", 0, DEFAULT_REQUEST_TIMEOUT).is_err());
        assert!(TendermintRpc::with_options("http://localhost:26657", 101, DEFAULT_REQUEST_TIMEOUT).is_err());
        let rpc = TendermintRpc::new("http://localhost:26657").unwrap();
        assert_eq!(rpc.url(), "http://localhost:26657");
    }

    #[test]
    fn test_height_unavailable_detection() {
        let beyond_tip = JsonRpcError {
            code: -32603,
            message: "Internal error".into(),
            data: Some(json!(
                "height 100 must be less than or equal to the current blockchain height 99"
            )),
        };
        assert!(is_height_unavailable(&beyond_tip));

        let other = JsonRpcError {
            code: -32603,
            message: "Internal error".into(),
            data: Some(json!("could not find results for height #5")),
        };
        assert!(!is_height_unavailable(&other));
    }
}
