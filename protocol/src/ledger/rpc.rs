// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Node JSON-RPC Definitions
//!
//! Request/response envelopes and typed payloads for the ledger node's
//! JSON-RPC 2.0 interface. The HTTP transport lives in [`super::client`].
//!
//! ## Method Index
//!
//! | Method                  | Description                                 |
//! |-------------------------|---------------------------------------------|
//! | `getaccount`            | Account state by number                     |
//! | `findaccounts`          | Accounts by name, sale state or owner key   |
//! | `decodepubkey`          | Encoded key to curve id and coordinates     |
//! | `encodepubkey`          | Curve id and coordinates to encoded key     |
//! | `executeoperations`     | Submit hex-encoded operation frames         |
//! | `findoperation`         | Operation by ophash                         |
//! | `getpendings`           | Operations not yet in a block               |
//! | `getaccountoperations`  | Operation history of an account             |
//!
//! Coin values arrive as JSON numbers with up to four decimals. They are
//! read from their decimal text and converted to units here, once.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountInfo, AccountState, NodeError, OperationResult};
use crate::config::AMOUNT_SCALE;
use crate::transaction::types::{coins, AccountNumber, Amount};

// ---------------------------------------------------------------------------
// RPC Method Enumeration
// ---------------------------------------------------------------------------

/// Node methods the gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcMethod {
    GetAccount,
    FindAccounts,
    DecodePubKey,
    EncodePubKey,
    ExecuteOperations,
    FindOperation,
    GetPendings,
    GetAccountOperations,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAccount => "getaccount",
            Self::FindAccounts => "findaccounts",
            Self::DecodePubKey => "decodepubkey",
            Self::EncodePubKey => "encodepubkey",
            Self::ExecuteOperations => "executeoperations",
            Self::FindOperation => "findoperation",
            Self::GetPendings => "getpendings",
            Self::GetAccountOperations => "getaccountoperations",
        }
    }
}

// ---------------------------------------------------------------------------
// RPC Request / Response
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: RpcMethod,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: RpcMethod, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` or `error` is set by a
/// conforming node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// The result value, or the node's error mapped to [`NodeError::Rpc`].
    ///
    /// A `null` result is returned as `Value::Null`; callers that expect an
    /// object decide whether that means "not found".
    pub fn into_result(self) -> Result<serde_json::Value, NodeError> {
        if let Some(err) = self.error {
            return Err(NodeError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Typed Response Payloads
// ---------------------------------------------------------------------------

fn units(value: Decimal, field: &str) -> Result<i64, NodeError> {
    value
        .checked_mul(Decimal::from(AMOUNT_SCALE))
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or_else(|| NodeError::Decode(format!("{field} out of range: {value}")))
}

fn unsigned_units(value: Decimal, field: &str) -> Result<Amount, NodeError> {
    let n = units(value, field)?;
    u64::try_from(n)
        .map(Amount::from_units)
        .map_err(|_| NodeError::Decode(format!("{field} must not be negative: {value}")))
}

/// Payload of `getaccount` and the elements of `findaccounts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPayload {
    pub account: u32,
    pub enc_pubkey: String,
    #[serde(with = "coins")]
    pub balance: Decimal,
    pub n_operation: u32,
    #[serde(default)]
    pub state: AccountState,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub account_type: u16,
    #[serde(default, with = "coins")]
    pub price: Decimal,
    #[serde(default)]
    pub seller_account: Option<u32>,
    #[serde(default)]
    pub private_sale: bool,
}

impl TryFrom<AccountPayload> for AccountInfo {
    type Error = NodeError;

    fn try_from(p: AccountPayload) -> Result<Self, Self::Error> {
        Ok(AccountInfo {
            account: AccountNumber::new(p.account),
            enc_pubkey: p.enc_pubkey,
            balance: unsigned_units(p.balance, "balance")?,
            n_operation: p.n_operation,
            state: p.state,
            name: p.name,
            account_type: p.account_type,
            price: unsigned_units(p.price, "price")?,
            seller_account: p.seller_account.map(AccountNumber::new),
            private_sale: p.private_sale,
        })
    }
}

/// Payload of `decodepubkey`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyPayload {
    pub ec_nid: u16,
    pub x: String,
    pub y: String,
}

/// Operation object returned by `executeoperations`, `findoperation`,
/// `getpendings` and `getaccountoperations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationPayload {
    #[serde(default)]
    pub block: u32,
    #[serde(default)]
    pub time: u32,
    #[serde(default)]
    pub maturation: Option<u32>,
    #[serde(default)]
    pub optype: u32,
    #[serde(default)]
    pub subtype: u32,
    #[serde(default)]
    pub account: u32,
    #[serde(default)]
    pub signer_account: u32,
    #[serde(default)]
    pub sender_account: u32,
    #[serde(default)]
    pub dest_account: u32,
    #[serde(default)]
    pub n_operation: u32,
    #[serde(default, with = "coins")]
    pub amount: Decimal,
    #[serde(default, with = "coins")]
    pub fee: Decimal,
    #[serde(default, with = "coins")]
    pub balance: Decimal,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub ophash: String,
    #[serde(default)]
    pub errors: Option<String>,
}

impl TryFrom<OperationPayload> for OperationResult {
    type Error = NodeError;

    fn try_from(p: OperationPayload) -> Result<Self, Self::Error> {
        let payload = hex::decode(&p.payload)
            .map_err(|e| NodeError::Decode(format!("payload is not hex: {e}")))?;
        Ok(OperationResult {
            block: p.block,
            time: p.time,
            maturation: p.maturation,
            op_type: p.optype,
            subtype: p.subtype,
            account: AccountNumber::new(p.account),
            signer_account: AccountNumber::new(p.signer_account),
            sender_account: AccountNumber::new(p.sender_account),
            dest_account: AccountNumber::new(p.dest_account),
            n_operation: p.n_operation,
            amount: units(p.amount, "amount")?,
            fee: units(p.fee, "fee")?,
            balance: unsigned_units(p.balance, "balance")?,
            payload,
            ophash: p.ophash,
            errors: p.errors.filter(|e| !e.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_lowercase_method_names() {
        let req = RpcRequest::new(7, RpcMethod::GetAccountOperations, json!({"account": 1}));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["method"], "getaccountoperations");
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(
            serde_json::to_value(RpcMethod::DecodePubKey).unwrap(),
            RpcMethod::DecodePubKey.as_str()
        );
    }

    #[test]
    fn error_response_maps_to_node_error() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 1002, "message": "Account not found"}
        }))
        .unwrap();
        assert_eq!(
            resp.into_result(),
            Err(NodeError::Rpc {
                code: 1002,
                message: "Account not found".into()
            })
        );
    }

    #[test]
    fn account_payload_converts_coins_to_units() {
        let payload: AccountPayload = serde_json::from_value(json!({
            "account": 12,
            "enc_pubkey": "CA02",
            "balance": 10.0001,
            "n_operation": 5,
            "state": "listed",
            "name": "shop",
            "type": 0,
            "price": 2.5,
            "seller_account": 3,
            "private_sale": false
        }))
        .unwrap();
        let info = AccountInfo::try_from(payload).unwrap();
        assert_eq!(info.balance, Amount::from_units(100_001));
        assert_eq!(info.price, Amount::from_units(25_000));
        assert!(info.is_for_sale());
        assert_eq!(info.seller_account, Some(AccountNumber::new(3)));
    }

    #[test]
    fn operation_payload_keeps_signs_and_errors() {
        let payload: OperationPayload = serde_json::from_value(json!({
            "block": 0,
            "optype": 1,
            "account": 1,
            "signer_account": 1,
            "sender_account": 1,
            "dest_account": 2,
            "amount": -10.0,
            "fee": -0.0001,
            "balance": 89.9999,
            "payload": "6869",
            "ophash": "AB",
            "errors": ""
        }))
        .unwrap();
        let op = OperationResult::try_from(payload).unwrap();
        assert_eq!(op.amount, -100_000);
        assert_eq!(op.fee, -1);
        assert_eq!(op.balance, Amount::from_units(899_999));
        assert_eq!(op.payload, b"hi");
        assert_eq!(op.errors, None);
    }

    #[test]
    fn negative_balance_is_a_decode_error() {
        let payload: OperationPayload =
            serde_json::from_value(json!({"balance": -1, "payload": ""})).unwrap();
        assert!(matches!(
            OperationResult::try_from(payload),
            Err(NodeError::Decode(_))
        ));
    }
}
