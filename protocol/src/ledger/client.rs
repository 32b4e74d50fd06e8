// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! JSON-RPC client for a running ledger node.
//!
//! One shared `reqwest::Client` per node; calls are independent POSTs with
//! no session state. A response is abandoned as soon as it announces or
//! streams more than [`NODE_RPC_PAYLOAD_LIMIT`] bytes.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::rpc::{AccountPayload, OperationPayload, PublicKeyPayload, RpcMethod, RpcRequest, RpcResponse};
use super::{AccountFilter, AccountInfo, LedgerNode, NodeError, OperationResult};
use crate::config::{NODE_RPC_PAYLOAD_LIMIT, NODE_RPC_TIMEOUT};
use crate::crypto::keys::{CurveType, PublicKey};
use crate::error::ErrorCode;
use crate::transaction::types::AccountNumber;

/// [`LedgerNode`] backed by the node's JSON-RPC endpoint.
pub struct JsonRpcNode {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcNode {
    /// Client with the default request timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, NodeError> {
        Self::with_timeout(url, NODE_RPC_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, NodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, NodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!(method = method.as_str(), id, "node rpc call");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NodeError::Transport(format!(
                "{} answered {}",
                method.as_str(),
                response.status()
            )));
        }

        let bytes = read_limited(response, NODE_RPC_PAYLOAD_LIMIT).await?;
        let envelope: RpcResponse =
            serde_json::from_slice(&bytes).map_err(|e| NodeError::Decode(e.to_string()))?;
        envelope.into_result()
    }

    async fn call_as<R: DeserializeOwned>(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<R, NodeError> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| NodeError::Decode(format!("{}: {e}", method.as_str())))
    }

    async fn operations(
        &self,
        method: RpcMethod,
        params: serde_json::Value,
    ) -> Result<Vec<OperationResult>, NodeError> {
        let payloads: Vec<OperationPayload> = self.call_as(method, params).await?;
        payloads.into_iter().map(OperationResult::try_from).collect()
    }
}

/// Reads the response body, stopping as soon as it grows past `limit`.
async fn read_limited(mut response: Response, limit: usize) -> Result<Vec<u8>, NodeError> {
    let too_large = |len: u64| {
        NodeError::Decode(format!(
            "response payload too large: {len} bytes, limit: {limit} bytes"
        ))
    };
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(too_large(len));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| NodeError::Transport(format!("failed to read payload: {e}")))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large((body.len() + chunk.len()) as u64));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// `true` for the node's "no such object" errors, which the trait reports
/// as `None` instead.
fn is_not_found(err: &NodeError) -> bool {
    matches!(err.code(), ErrorCode::NotFound | ErrorCode::InvalidAccount)
}

#[async_trait]
impl LedgerNode for JsonRpcNode {
    async fn get_account(&self, account: AccountNumber) -> Result<Option<AccountInfo>, NodeError> {
        let value = match self
            .call(RpcMethod::GetAccount, json!({ "account": account.number() }))
            .await
        {
            Ok(value) => value,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        if value.is_null() {
            return Ok(None);
        }
        let payload: AccountPayload =
            serde_json::from_value(value).map_err(|e| NodeError::Decode(e.to_string()))?;
        AccountInfo::try_from(payload).map(Some)
    }

    async fn find_accounts(&self, filter: &AccountFilter) -> Result<Vec<AccountInfo>, NodeError> {
        let mut params = json!({ "start": filter.start, "max": filter.max });
        if let Some(name) = &filter.name {
            params["name"] = json!(name);
        }
        if filter.listed_only {
            params["listed"] = json!(true);
        }
        if let Some(key) = &filter.enc_pubkey {
            params["enc_pubkey"] = json!(key);
        }
        let payloads: Vec<AccountPayload> = self.call_as(RpcMethod::FindAccounts, params).await?;
        payloads.into_iter().map(AccountInfo::try_from).collect()
    }

    async fn decode_pubkey(&self, enc_pubkey: &str) -> Result<PublicKey, NodeError> {
        let payload: PublicKeyPayload = self
            .call_as(RpcMethod::DecodePubKey, json!({ "enc_pubkey": enc_pubkey }))
            .await?;
        let curve = CurveType::from_id(payload.ec_nid)
            .map_err(|e| NodeError::rpc(ErrorCode::InvalidPubKey, e.to_string()))?;
        PublicKey::from_hex(curve, &payload.x, &payload.y)
            .map_err(|e| NodeError::rpc(ErrorCode::InvalidPubKey, e.to_string()))
    }

    async fn encode_pubkey(&self, key: &PublicKey) -> Result<String, NodeError> {
        self.call_as(
            RpcMethod::EncodePubKey,
            json!({ "ec_nid": key.curve.id(), "x": key.x_hex(), "y": key.y_hex() }),
        )
        .await
    }

    async fn execute_operations(&self, raw: &[u8]) -> Result<Vec<OperationResult>, NodeError> {
        self.operations(
            RpcMethod::ExecuteOperations,
            json!({ "rawoperations": hex::encode(raw) }),
        )
        .await
    }

    async fn find_operation(&self, ophash: &str) -> Result<Option<OperationResult>, NodeError> {
        let value = match self
            .call(RpcMethod::FindOperation, json!({ "ophash": ophash }))
            .await
        {
            Ok(value) => value,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        if value.is_null() {
            return Ok(None);
        }
        let payload: OperationPayload =
            serde_json::from_value(value).map_err(|e| NodeError::Decode(e.to_string()))?;
        OperationResult::try_from(payload).map(Some)
    }

    async fn get_pendings(&self) -> Result<Vec<OperationResult>, NodeError> {
        self.operations(RpcMethod::GetPendings, json!({})).await
    }

    async fn get_account_operations(
        &self,
        account: AccountNumber,
        start: Option<u32>,
        max: Option<u32>,
    ) -> Result<Vec<OperationResult>, NodeError> {
        let mut params = json!({ "account": account.number() });
        if let Some(start) = start {
            params["start"] = json!(start);
        }
        if let Some(max) = max {
            params["max"] = json!(max);
        }
        self.operations(RpcMethod::GetAccountOperations, params).await
    }
}
