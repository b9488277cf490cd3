//! RenVM lightnode JSON-RPC client

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::BlockState;

pub const DEFAULT_LIGHTNODE: &str = "https://lightnode-mainnet.herokuapp.com";

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

pub struct RenVmClient {
    endpoint: String,
    http: reqwest::Client,
}

impl RenVmClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| Error::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        tracing::debug!("RenVM {} -> {}", method, self.endpoint);

        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|source| Error::Http {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(Error::Status {
                endpoint: self.endpoint.clone(),
                status: response.status(),
            });
        }

        let body: RpcResponse<T> = response.json().await.map_err(|source| Error::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if let Some(error) = body.error {
            return Err(Error::RenVm {
                code: error.code,
                message: error.message,
            });
        }
        body.result.ok_or(Error::MissingData("result"))
    }

    /// Fee, node and epoch state of every RenVM contract
    pub async fn query_block_state(&self) -> Result<BlockState> {
        self.call("ren_queryBlockState", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees;
    use crate::models::Epoch;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn test_query_block_state() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(
                json!({ "method": "ren_queryBlockState" }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": { "state": { "v": {
                        "System": {
                            "epoch": { "number": "4", "timestamp": "1650000000" },
                            "nodes": []
                        },
                        "BTC": { "fees": {
                            "epochs": [{ "amount": "300", "epoch": "4", "numNodes": "3" }],
                            "nodes": [],
                            "unassigned": "0"
                        }}
                    }}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = RenVmClient::new(&server.url()).unwrap();
        let state = client.query_block_state().await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            fees::get_token_rewards_for_epoch("BTC", Epoch::Current, &state, true),
            BigDecimal::from(100)
        );
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#,
            )
            .create_async()
            .await;

        let client = RenVmClient::new(&server.url()).unwrap();
        let err = client.query_block_state().await.unwrap_err();
        assert!(matches!(err, Error::RenVm { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_http_status_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(502)
            .create_async()
            .await;

        let client = RenVmClient::new(&server.url()).unwrap();
        let err = client.query_block_state().await.unwrap_err();
        assert!(matches!(err, Error::Status { .. }));
    }
}
