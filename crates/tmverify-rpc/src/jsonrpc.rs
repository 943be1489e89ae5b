//! JSON-RPC 2.0 over HTTP POST, shared by the Tendermint and Bor clients.

use crate::error::RpcError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

#[derive(Serialize, Debug)]
pub struct JsonRpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Deserialize, Debug)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub id: serde_json::Value,
    pub result: Option<T>,
    pub error: Option<JsonRpcError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// `data` flattened to text; Tendermint puts the useful detail there.
    pub fn data_text(&self) -> String {
        match &self.data {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn into_rpc_error(self, method: &str) -> RpcError {
        RpcError::JsonRpc {
            method: method.to_string(),
            code: self.code,
            data: self.data_text(),
            message: self.message,
        }
    }
}

/// A JSON-RPC endpoint. Request ids increase per client.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Config(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one call and return the raw error object on a JSON-RPC failure,
    /// so callers can map node-specific errors.
    pub async fn call_raw<P, T>(&self, method: &str, params: P) -> Result<Result<T, JsonRpcError>, RpcError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        trace!(method, id, url = %self.url, "json-rpc request");

        let transport = |source| RpcError::Transport {
            method: method.to_string(),
            source,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        // Tendermint answers some JSON-RPC errors with a 500 and a well-formed body.
        let parsed: JsonRpcResponse<T> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RpcError::HttpStatus {
                    method: method.to_string(),
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(RpcError::decode(method, e.into())),
        };

        match (parsed.result, parsed.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => Err(RpcError::EmptyResponse {
                method: method.to_string(),
            }),
        }
    }

    /// Send one call; a JSON-RPC error becomes [`RpcError::JsonRpc`].
    pub async fn call<P, T>(&self, method: &str, params: P) -> Result<T, RpcError>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        self.call_raw(method, params)
            .await?
            .map_err(|error| error.into_rpc_error(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "block",
            params: serde_json::json!({ "height": "5" }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "block",
                "params": { "height": "5" }
            })
        );
    }

    #[test]
    fn test_error_response_parses() {
        let response: JsonRpcResponse<serde_json::Value> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32603,"message":"Internal error","data":"height 10 must be less than or equal to the current blockchain height 9"}}"#,
        )
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32603);
        assert!(error.data_text().contains("must be less than or equal"));
        assert!(response.result.is_none());
    }
}
