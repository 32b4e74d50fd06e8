// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Error Taxonomy
//!
//! Every failure the gateway reports to a client is one of the ledger
//! node's error codes, a short message and an optional help string. This
//! module owns that taxonomy:
//!
//! - [`ErrorCode`] are the node's numeric codes and their HTTP status.
//! - [`ApiError`] is the `{errorCode, message, help}` body.
//! - [`ProtocolError`] is what the protocol layer returns internally.
//!   It converts into an `ApiError` without losing the triggering detail.
//!
//! Mapping is a lookup. No business decisions are made here.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::keys::KeyError;
use crate::ledger::NodeError;
use crate::transaction::builder::BuildError;
use crate::transaction::types::{AccountNumber, ValueError};

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Error codes shared with the ledger node's JSON-RPC interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum ErrorCode {
    InternalError,
    MethodNotFound,
    InvalidAccount,
    InvalidBlock,
    InvalidOperation,
    InvalidPubKey,
    NotFound,
    WalletPasswordProtected,
    InvalidData,
    InvalidSignature,
    UnknownError,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::InternalError => 100,
            Self::MethodNotFound => 1001,
            Self::InvalidAccount => 1002,
            Self::InvalidBlock => 1003,
            Self::InvalidOperation => 1004,
            Self::InvalidPubKey => 1005,
            Self::NotFound => 1010,
            Self::WalletPasswordProtected => 1015,
            Self::InvalidData => 1016,
            Self::InvalidSignature => 1020,
            Self::UnknownError => 999,
        }
    }

    /// Maps a node code. Codes outside the taxonomy become `UnknownError`.
    pub fn from_i32(code: i32) -> Self {
        match code {
            100 => Self::InternalError,
            1001 => Self::MethodNotFound,
            1002 => Self::InvalidAccount,
            1003 => Self::InvalidBlock,
            1004 => Self::InvalidOperation,
            1005 => Self::InvalidPubKey,
            1010 => Self::NotFound,
            1015 => Self::WalletPasswordProtected,
            1016 => Self::InvalidData,
            1020 => Self::InvalidSignature,
            _ => Self::UnknownError,
        }
    }

    /// HTTP status for this code.
    pub fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InternalError => 500,
            Self::InvalidSignature => 403,
            _ => 400,
        }
    }

    /// Short label used in metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::InternalError => "internal_error",
            Self::MethodNotFound => "method_not_found",
            Self::InvalidAccount => "invalid_account",
            Self::InvalidBlock => "invalid_block",
            Self::InvalidOperation => "invalid_operation",
            Self::InvalidPubKey => "invalid_pubkey",
            Self::NotFound => "not_found",
            Self::WalletPasswordProtected => "wallet_password_protected",
            Self::InvalidData => "invalid_data",
            Self::InvalidSignature => "invalid_signature",
            Self::UnknownError => "unknown_error",
        }
    }

    fn default_text(self) -> (&'static str, &'static str) {
        match self {
            Self::InternalError => ("Internal error", "Internal error, please try again later"),
            Self::MethodNotFound => ("Method not found", "The node server is outdated"),
            Self::InvalidAccount => (
                "Invalid account",
                "Account not found or account state is invalid",
            ),
            Self::InvalidBlock => ("Invalid block", "Invalid block, or block does not exist"),
            Self::InvalidOperation => ("Invalid transaction", "Please check transaction data"),
            Self::InvalidPubKey => ("Invalid public key", "Please check your public key"),
            Self::NotFound => ("Not found", "The requested object was not found"),
            Self::WalletPasswordProtected => (
                "Wallet protected",
                "The node wallet is password protected and cannot be accessed",
            ),
            Self::InvalidData => ("Invalid data", "Your data is invalid. Please check your input"),
            Self::InvalidSignature => (
                "Invalid signature",
                "The signature is invalid. Please sign the hash with your private key",
            ),
            Self::UnknownError => ("Unknown error", "Please check your data"),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self::from_i32(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Error body returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{error_code}: {message}")]
pub struct ApiError {
    pub error_code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub help: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            error_code: code,
            message: message.into(),
            help: help.into(),
        }
    }

    /// The canned message and help text for `code`.
    pub fn from_code(code: ErrorCode) -> Self {
        let (message, help) = code.default_text();
        Self::new(code, message, help)
    }

    pub fn status(&self) -> u16 {
        self.error_code.http_status()
    }
}

// ---------------------------------------------------------------------------
// ProtocolError
// ---------------------------------------------------------------------------

const ACCOUNT_FORMS_HELP: &str =
    "You can specify account numbers in two ways: number-checksum, or single number";

/// Failures detected by the protocol layer before or instead of a node
/// submission.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    InvalidAccount(#[source] ValueError),

    #[error("invalid checksum for account {account}")]
    ChecksumMismatch { account: AccountNumber },

    #[error("account {0} not found")]
    AccountNotFound(AccountNumber),

    #[error("account {0} is not for sale")]
    NotForSale(AccountNumber),

    #[error("account {0} has no operation numbers left")]
    SequenceExhausted(AccountNumber),

    #[error("{0}")]
    InvalidPubKey(#[from] KeyError),

    #[error("{0}")]
    InvalidAmount(#[source] ValueError),

    #[error("{0}")]
    InvalidPayload(#[from] BuildError),

    #[error("missing signature")]
    MissingSignature,

    #[error("transaction {0} not found")]
    OperationNotFound(String),

    #[error(transparent)]
    Node(#[from] NodeError),
}

impl ProtocolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAccount(_)
            | Self::ChecksumMismatch { .. }
            | Self::NotForSale(_)
            | Self::SequenceExhausted(_) => ErrorCode::InvalidAccount,
            Self::AccountNotFound(_) | Self::OperationNotFound(_) => ErrorCode::NotFound,
            Self::InvalidPubKey(_) => ErrorCode::InvalidPubKey,
            Self::InvalidAmount(_) | Self::InvalidPayload(_) | Self::MissingSignature => {
                ErrorCode::InvalidData
            }
            Self::Node(e) => e.code(),
        }
    }

    fn help(&self) -> String {
        match self {
            Self::InvalidAccount(_) => ACCOUNT_FORMS_HELP.to_string(),
            Self::ChecksumMismatch { account } => format!(
                "The checksum does not belong to account {}. {ACCOUNT_FORMS_HELP}",
                account.number()
            ),
            Self::AccountNotFound(_) => {
                "Your account number is valid, but no account exists with this number".to_string()
            }
            Self::NotForSale(_) => {
                "Only accounts listed for public sale can be purchased".to_string()
            }
            Self::SequenceExhausted(_) => {
                "This account cannot sign further operations".to_string()
            }
            Self::InvalidPubKey(_) => {
                "Valid curve types are secp256k1 and secp256r1; coordinates are hex, at most 64 digits"
                    .to_string()
            }
            Self::InvalidAmount(_) => "Amounts are coins with up to four decimal places".to_string(),
            Self::InvalidPayload(_) => "Shorten the payload".to_string(),
            Self::MissingSignature => "Please sign your transaction hash".to_string(),
            Self::OperationNotFound(_) => {
                "No transaction found with the requested ophash".to_string()
            }
            Self::Node(_) => ApiError::from_code(self.code()).help,
        }
    }
}

impl From<&ProtocolError> for ApiError {
    fn from(err: &ProtocolError) -> Self {
        ApiError::new(err.code(), err.to_string(), err.help())
    }
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError::from(&err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
