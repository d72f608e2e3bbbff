//! Lotus JSON-RPC client
//!
//! Implements `NodeApi` over HTTP POST against the `/rpc/v1` endpoint of a
//! Lotus-compatible node.

use async_trait::async_trait;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::node::NodeApi;
use super::types::{ActorState, ChainHead, GasEstimate, MinerInfo, PendingTransaction, RpcError};
use crate::config::ChainConfig;
use crate::core::json::cid_link;
use crate::core::{Address, Message, MessageRef, MsgLookup, SignedMessage, TokenAmount};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct CidLink(#[serde(with = "cid_link")] Cid);

/// Client for a Lotus-compatible node
pub struct LotusClient {
    inner: reqwest::Client,
    url: String,
    auth_token: Option<String>,
    /// Budget for `StateWaitMsg`, which holds the request open on the node
    wait_timeout: Duration,
    next_id: AtomicU64,
}

impl LotusClient {
    /// Create a new client from the chain section of the configuration
    pub fn new(config: &ChainConfig) -> Result<Self, RpcError> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            inner,
            url: config.rpc_addr.clone(),
            auth_token: config.token.clone().filter(|t| !t.is_empty()),
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<JsonRpcResponse, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        };
        log::debug!("rpc -> {} (id {})", method, id);

        let mut request = self.inner.post(&self.url).json(&payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Call a method whose result must be present
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let response = self.request(method, params, None).await?;
        decode_result::<T>(method, response)?.ok_or_else(|| RpcError::EmptyResult(method.to_string()))
    }

    /// Call a method that may legitimately return `null`
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        let response = self.request(method, params, None).await?;
        decode_result(method, response)
    }
}

fn decode_result<T: DeserializeOwned>(
    method: &str,
    response: JsonRpcResponse,
) -> Result<Option<T>, RpcError> {
    if let Some(error) = response.error {
        return Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    match response.result {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| RpcError::Decode {
                method: method.to_string(),
                source,
            }),
    }
}

fn to_param<T: Serialize>(method: &str, value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|source| RpcError::Decode {
        method: method.to_string(),
        source,
    })
}

#[async_trait]
impl NodeApi for LotusClient {
    async fn chain_head(&self) -> Result<ChainHead, RpcError> {
        self.call("Filecoin.ChainHead", json!([])).await
    }

    async fn balance(&self, address: &Address) -> Result<TokenAmount, RpcError> {
        self.call("Filecoin.WalletBalance", json!([address])).await
    }

    async fn estimate_gas(
        &self,
        message: &Message,
        max_fee: &TokenAmount,
    ) -> Result<GasEstimate, RpcError> {
        let method = "Filecoin.GasEstimateMessageGas";
        let message = to_param(method, message)?;
        self.call(method, json!([message, { "MaxFee": max_fee }, null]))
            .await
    }

    async fn next_sequence(&self, address: &Address) -> Result<u64, RpcError> {
        self.call("Filecoin.MpoolGetNonce", json!([address])).await
    }

    async fn lookup_id(&self, address: &Address) -> Result<Address, RpcError> {
        self.call("Filecoin.StateLookupID", json!([address, null])).await
    }

    async fn actor(&self, address: &Address) -> Result<ActorState, RpcError> {
        self.call("Filecoin.StateGetActor", json!([address, null])).await
    }

    async fn miner_info(&self, miner: &Address) -> Result<MinerInfo, RpcError> {
        self.call("Filecoin.StateMinerInfo", json!([miner, null])).await
    }

    async fn miner_available_balance(&self, miner: &Address) -> Result<TokenAmount, RpcError> {
        self.call("Filecoin.StateMinerAvailableBalance", json!([miner, null]))
            .await
    }

    async fn account_key(&self, address: &Address) -> Result<Address, RpcError> {
        self.call("Filecoin.StateAccountKey", json!([address, null])).await
    }

    async fn push(&self, message: &SignedMessage) -> Result<MessageRef, RpcError> {
        let method = "Filecoin.MpoolPush";
        let message = to_param(method, message)?;
        self.call(method, json!([message])).await
    }

    async fn search_message(&self, message: &MessageRef) -> Result<Option<MsgLookup>, RpcError> {
        self.call_optional("Filecoin.StateSearchMsg", json!([null, message, -1, true]))
            .await
    }

    async fn wait_message(
        &self,
        message: &MessageRef,
        confidence: u64,
    ) -> Result<Option<MsgLookup>, RpcError> {
        let method = "Filecoin.StateWaitMsg";
        let params = json!([message, confidence, -1, true]);
        let response = self.request(method, params, Some(self.wait_timeout)).await?;
        decode_result(method, response)
    }

    async fn pending_transactions(
        &self,
        multisig: &Address,
    ) -> Result<Vec<PendingTransaction>, RpcError> {
        let pending: Option<Vec<PendingTransaction>> = self
            .call_optional("Filecoin.MsigGetPending", json!([multisig, null]))
            .await?;
        Ok(pending.unwrap_or_default())
    }

    async fn network_version(&self) -> Result<u32, RpcError> {
        self.call("Filecoin.StateNetworkVersion", json!([null])).await
    }

    async fn actor_code_cids(&self, version: u32) -> Result<HashMap<String, Cid>, RpcError> {
        let codes: HashMap<String, CidLink> =
            self.call("Filecoin.StateActorCodeCIDs", json!([version])).await?;
        Ok(codes.into_iter().map(|(name, link)| (name, link.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{SigType, Signature};
    use httpmock::prelude::*;

    const RPC_PATH: &str = "/rpc/v1";

    fn response(raw: Value) -> JsonRpcResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_request_payload_shape() {
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method: "Filecoin.StateLookupID",
            params: json!([Address::new_id(5), null]),
            id: 9,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "Filecoin.StateLookupID",
                "params": ["f05", null],
                "id": 9
            })
        );
    }

    #[test]
    fn test_decode_result_value() {
        let decoded: Option<u64> =
            decode_result("Filecoin.MpoolGetNonce", response(json!({"jsonrpc": "2.0", "result": 12, "id": 1})))
                .unwrap();
        assert_eq!(decoded, Some(12));
    }

    #[test]
    fn test_decode_null_result() {
        let decoded: Option<MsgLookup> =
            decode_result("Filecoin.StateSearchMsg", response(json!({"jsonrpc": "2.0", "result": null, "id": 1})))
                .unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_decode_rpc_error() {
        let err = decode_result::<u64>(
            "Filecoin.MpoolPush",
            response(json!({
                "jsonrpc": "2.0",
                "error": {"code": 1, "message": "minimum expected nonce is 4"},
                "id": 1
            })),
        )
        .unwrap_err();
        match err {
            RpcError::Rpc { code, message } => {
                assert_eq!(code, 1);
                assert!(message.contains("nonce"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_shape() {
        let err = decode_result::<ChainHead>(
            "Filecoin.ChainHead",
            response(json!({"jsonrpc": "2.0", "result": [1, 2], "id": 1})),
        )
        .unwrap_err();
        assert!(matches!(err, RpcError::Decode { .. }));
    }

    #[test]
    fn test_client_drops_empty_token() {
        let config = ChainConfig {
            token: Some(String::new()),
            ..ChainConfig::default()
        };
        let client = LotusClient::new(&config).unwrap();
        assert!(client.auth_token.is_none());
        assert_eq!(client.url(), config.rpc_addr);
    }

    fn client(server: &MockServer, token: Option<&str>) -> LotusClient {
        let config = ChainConfig {
            rpc_addr: server.url(RPC_PATH),
            token: token.map(str::to_string),
            ..ChainConfig::default()
        };
        LotusClient::new(&config).unwrap()
    }

    fn signed_message() -> SignedMessage {
        SignedMessage {
            message: Message {
                version: 0,
                to: Address::new_id(200),
                from: Address::new_secp256k1(&[4u8; 65]),
                sequence: 4,
                value: TokenAmount::from_whole(1),
                gas_limit: 1_000_000,
                gas_fee_cap: TokenAmount::from(200_000),
                gas_premium: TokenAmount::from(100_000),
                method: 0,
                params: Vec::new(),
            },
            signature: Signature {
                sig_type: SigType::Secp256k1,
                data: vec![1u8; 65],
            },
        }
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .header("authorization", "Bearer secret-token");
            then.status(200)
                .json_body(json!({"jsonrpc": "2.0", "result": {"Height": 10}, "id": 1}));
        });

        let head = client(&server, Some("secret-token")).chain_head().await.unwrap();

        assert_eq!(head.height, 10);
        mock.assert();
    }

    #[tokio::test]
    async fn test_no_authorization_header_without_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH).header_missing("authorization");
            then.status(200)
                .json_body(json!({"jsonrpc": "2.0", "result": {"Height": 10}, "id": 1}));
        });

        client(&server, None).chain_head().await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(500).body("internal error");
        });

        let err = client(&server, None).chain_head().await.unwrap_err();

        match err {
            RpcError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_rejection_is_rpc_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .body_includes("Filecoin.MpoolPush");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "error": {"code": 1, "message": "minimum expected nonce is 5"},
                "id": 1
            }));
        });

        let err = client(&server, None).push(&signed_message()).await.unwrap_err();

        mock.assert();
        match err {
            RpcError::Rpc { code, message } => {
                assert_eq!(code, 1);
                assert!(message.contains("nonce"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_balance_round_trip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH).json_body_includes(
                r#"{"jsonrpc": "2.0", "method": "Filecoin.WalletBalance", "params": ["f0100"]}"#,
            );
            then.status(200)
                .json_body(json!({"jsonrpc": "2.0", "result": "2500000000000000000", "id": 1}));
        });

        let balance = client(&server, None)
            .balance(&Address::new_id(100))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(balance, TokenAmount::parse_fil("2.5").unwrap());
    }

    #[tokio::test]
    async fn test_wait_outlives_the_request_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .body_includes("Filecoin.StateWaitMsg");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({"jsonrpc": "2.0", "result": null, "id": 1}));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .body_includes("Filecoin.ChainHead");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({"jsonrpc": "2.0", "result": {"Height": 10}, "id": 1}));
        });
        let config = ChainConfig {
            rpc_addr: server.url(RPC_PATH),
            request_timeout_secs: 1,
            wait_timeout_secs: 10,
            ..ChainConfig::default()
        };
        let client = LotusClient::new(&config).unwrap();
        let message = MessageRef(crate::testing::cid_of("waited"));

        assert!(client.wait_message(&message, 5).await.unwrap().is_none());
        match client.chain_head().await.unwrap_err() {
            RpcError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
