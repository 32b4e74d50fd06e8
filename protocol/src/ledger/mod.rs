// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Node Collaborator
//!
//! The gateway never validates or stores operations itself. It asks a
//! ledger node. [`LedgerNode`] is the seam: every account lookup, key
//! conversion and submission goes through it.
//!
//! ## Implementations
//!
//! ```text
//! client.rs  - JsonRpcNode: JSON-RPC 2.0 over HTTP to a running node
//! memory.rs  - InMemoryLedger: deterministic ledger for tests and offline use
//! rpc.rs     - JSON-RPC envelope types
//! ```
//!
//! Coin values cross this boundary as fixed-point units. Converting from
//! the node's decimal representation is the implementation's job.

pub mod client;
pub mod memory;
pub mod rpc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::AMOUNT_DECIMALS;
use crate::crypto::keys::PublicKey;
use crate::error::ErrorCode;
use crate::transaction::types::{AccountNumber, Amount};

pub use client::JsonRpcNode;
pub use memory::{InMemoryLedger, LedgerSeed};

/// Failures talking to the ledger node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The node answered with a JSON-RPC error object.
    #[error("node error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// The node could not be reached, or answered with a non-200 status.
    #[error("node unreachable: {0}")]
    Transport(String),

    /// The node answered with something we could not parse.
    #[error("malformed node response: {0}")]
    Decode(String),
}

impl NodeError {
    pub fn rpc(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Rpc {
            code: code.as_i32(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Rpc { code, .. } => ErrorCode::from_i32(*code),
            Self::Transport(_) | Self::Decode(_) => ErrorCode::InternalError,
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Sale state of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    #[default]
    Normal,
    Listed,
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Listed => write!(f, "listed"),
        }
    }
}

/// Account state as the node reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account: AccountNumber,
    /// Owner key in the node's encoded form. Decode via
    /// [`LedgerNode::decode_pubkey`].
    pub enc_pubkey: String,
    pub balance: Amount,
    /// Operations this account has signed so far.
    pub n_operation: u32,
    pub state: AccountState,
    pub name: String,
    pub account_type: u16,
    /// Sale price. Meaningful only when `state` is `Listed`.
    pub price: Amount,
    /// Account that receives the price when this one is sold.
    pub seller_account: Option<AccountNumber>,
    pub private_sale: bool,
}

impl AccountInfo {
    /// An unlisted, unnamed account with no operations.
    pub fn new(account: AccountNumber, enc_pubkey: impl Into<String>, balance: Amount) -> Self {
        Self {
            account,
            enc_pubkey: enc_pubkey.into(),
            balance,
            n_operation: 0,
            state: AccountState::Normal,
            name: String::new(),
            account_type: 0,
            price: Amount::ZERO,
            seller_account: None,
            private_sale: false,
        }
    }

    pub fn is_for_sale(&self) -> bool {
        self.state == AccountState::Listed
    }
}

/// Criteria for [`LedgerNode::find_accounts`]. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub name: Option<String>,
    pub listed_only: bool,
    pub enc_pubkey: Option<String>,
    pub start: u32,
    pub max: u32,
}

impl AccountFilter {
    pub const DEFAULT_MAX: u32 = 100;

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            max: Self::DEFAULT_MAX,
            ..Self::default()
        }
    }

    pub fn listed() -> Self {
        Self {
            listed_only: true,
            max: Self::DEFAULT_MAX,
            ..Self::default()
        }
    }

    pub fn by_key(enc_pubkey: impl Into<String>) -> Self {
        Self {
            enc_pubkey: Some(enc_pubkey.into()),
            max: Self::DEFAULT_MAX,
            ..Self::default()
        }
    }

    pub fn matches(&self, account: &AccountInfo) -> bool {
        if let Some(name) = &self.name {
            if !account.name.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        if self.listed_only && !account.is_for_sale() {
            return false;
        }
        if let Some(key) = &self.enc_pubkey {
            if !account.enc_pubkey.eq_ignore_ascii_case(key) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// An operation as the node reports it, pending or included in a block.
///
/// `amount` and `fee` are signed units: negative when `account` paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Block number, 0 while pending.
    pub block: u32,
    /// Unix time of the block, 0 while pending.
    pub time: u32,
    /// Blocks since inclusion. `None` while pending.
    pub maturation: Option<u32>,
    pub op_type: u32,
    pub subtype: u32,
    pub account: AccountNumber,
    pub signer_account: AccountNumber,
    pub sender_account: AccountNumber,
    pub dest_account: AccountNumber,
    pub n_operation: u32,
    pub amount: i64,
    pub fee: i64,
    /// Balance of `account` after the operation.
    pub balance: Amount,
    pub payload: Vec<u8>,
    pub ophash: String,
    /// Node-reported failure. `Some` means the operation was not applied.
    pub errors: Option<String>,
}

impl OperationResult {
    /// Whether `account` appears in any role.
    pub fn involves(&self, account: AccountNumber) -> bool {
        self.account == account
            || self.signer_account == account
            || self.sender_account == account
            || self.dest_account == account
    }
}

/// Renders signed units as coins.
pub fn signed_coins(units: i64) -> Decimal {
    Decimal::new(units, AMOUNT_DECIMALS)
}

// ---------------------------------------------------------------------------
// LedgerNode
// ---------------------------------------------------------------------------

/// Operations the gateway needs from a ledger node.
///
/// All calls are independent. Implementations must be safe to share
/// across concurrent requests.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Account state, or `None` when the number is unassigned.
    async fn get_account(&self, account: AccountNumber) -> Result<Option<AccountInfo>, NodeError>;

    async fn find_accounts(&self, filter: &AccountFilter) -> Result<Vec<AccountInfo>, NodeError>;

    /// Decodes the node's encoded key form.
    async fn decode_pubkey(&self, enc_pubkey: &str) -> Result<PublicKey, NodeError>;

    /// Encodes a key into the node's form, as used by `find_accounts`.
    async fn encode_pubkey(&self, key: &PublicKey) -> Result<String, NodeError>;

    /// Submits framed operations. The node reports per-operation failures
    /// through [`OperationResult::errors`]; `Err` means the call itself
    /// failed.
    async fn execute_operations(&self, raw: &[u8]) -> Result<Vec<OperationResult>, NodeError>;

    async fn find_operation(&self, ophash: &str) -> Result<Option<OperationResult>, NodeError>;

    async fn get_pendings(&self) -> Result<Vec<OperationResult>, NodeError>;

    /// Operations touching `account`, newest first.
    async fn get_account_operations(
        &self,
        account: AccountNumber,
        start: Option<u32>,
        max: Option<u32>,
    ) -> Result<Vec<OperationResult>, NodeError>;

    /// The checksum the node derives for `number`, when it exposes one.
    fn account_checksum(&self, _number: u32) -> Option<u8> {
        None
    }
}
