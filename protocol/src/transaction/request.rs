// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Client requests and the builders that turn them into transactions.
//!
//! A request says *what* the client wants. Everything the ledger decides
//! (signer key, sequence number, purchase price and seller) is read from
//! current account state, never from the request body.
//!
//! ## Resolution order
//!
//! 1. Account numbers: syntax, then checksum, then existence.
//! 2. Signer key: decoded from the account's stored encoded key.
//! 3. Coin values: converted to fixed-point units.
//! 4. Variant fields: new keys are validated on their curve.
//!
//! Every step fails before a hash is computed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::builder::{Transaction, TransactionBuilder};
use super::types::{coins, AccountNumber, Amount, OperationType};
use crate::crypto::hash::TxHash;
use crate::crypto::keys::{PublicKey, PublicKeyInput, SignatureInput};
use crate::error::ProtocolError;
use crate::ledger::{AccountInfo, LedgerNode};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Coin transfer from `sender` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender: AccountNumber,
    pub target: AccountNumber,
    #[serde(with = "coins")]
    pub amount: Decimal,
    #[serde(with = "coins")]
    pub fee: Decimal,
    /// Free text attached to the operation, sent as UTF-8 bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Hand `account_number` over to a new owner key. Signed by the account
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeKeyRequest {
    pub account_number: AccountNumber,
    pub new_owner_public_key: PublicKeyInput,
    #[serde(with = "coins")]
    pub fee: Decimal,
}

/// Buy a listed account. `founder_account` signs and pays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAccountRequest {
    pub account_number: AccountNumber,
    pub founder_account: AccountNumber,
    pub new_key: PublicKeyInput,
    #[serde(with = "coins")]
    pub fee: Decimal,
}

/// A request as posted to a `commit` route: the original body plus the
/// hash returned by `start` and the client's signature over it.
///
/// Both extras are optional on the wire so that a missing signature can be
/// reported with a proper error body instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signed<T> {
    #[serde(flatten)]
    pub request: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureInput>,
}

// ---------------------------------------------------------------------------
// OperationRequest
// ---------------------------------------------------------------------------

/// One of the three ledger-mutating requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    Transfer(TransferRequest),
    ChangeKey(ChangeKeyRequest),
    PurchaseAccount(PurchaseAccountRequest),
}

impl From<TransferRequest> for OperationRequest {
    fn from(req: TransferRequest) -> Self {
        Self::Transfer(req)
    }
}

impl From<ChangeKeyRequest> for OperationRequest {
    fn from(req: ChangeKeyRequest) -> Self {
        Self::ChangeKey(req)
    }
}

impl From<PurchaseAccountRequest> for OperationRequest {
    fn from(req: PurchaseAccountRequest) -> Self {
        Self::PurchaseAccount(req)
    }
}

impl OperationRequest {
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::Transfer(_) => OperationType::Transfer,
            Self::ChangeKey(_) => OperationType::ChangeKey,
            Self::PurchaseAccount(_) => OperationType::PurchaseAccount,
        }
    }

    /// Account whose key must sign.
    pub fn signer(&self) -> AccountNumber {
        match self {
            Self::Transfer(req) => req.sender,
            Self::ChangeKey(req) => req.account_number,
            Self::PurchaseAccount(req) => req.founder_account,
        }
    }

    /// Builds the unsigned transaction from current ledger state.
    pub async fn build(&self, node: &dyn LedgerNode) -> Result<Transaction, ProtocolError> {
        match self {
            Self::Transfer(req) => build_transfer(node, req).await,
            Self::ChangeKey(req) => build_change_key(node, req).await,
            Self::PurchaseAccount(req) => build_purchase(node, req).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

async fn build_transfer(
    node: &dyn LedgerNode,
    req: &TransferRequest,
) -> Result<Transaction, ProtocolError> {
    let (sender, key) = resolve_signer(node, req.sender).await?;
    fetch_account(node, req.target).await?;

    let amount = to_amount(req.amount)?;
    let fee = to_amount(req.fee)?;
    let payload = req
        .payload
        .as_deref()
        .map(|p| p.as_bytes().to_vec())
        .unwrap_or_default();

    Ok(TransactionBuilder::new(req.sender, key)
        .sequence(next_sequence(&sender)?)
        .fee(fee)
        .transfer(req.target, amount, payload)?)
}

async fn build_change_key(
    node: &dyn LedgerNode,
    req: &ChangeKeyRequest,
) -> Result<Transaction, ProtocolError> {
    let (account, key) = resolve_signer(node, req.account_number).await?;
    let fee = to_amount(req.fee)?;
    let new_key = req.new_owner_public_key.parse()?;

    Ok(TransactionBuilder::new(req.account_number, key)
        .sequence(next_sequence(&account)?)
        .fee(fee)
        .change_key(req.account_number, new_key))
}

async fn build_purchase(
    node: &dyn LedgerNode,
    req: &PurchaseAccountRequest,
) -> Result<Transaction, ProtocolError> {
    let (founder, key) = resolve_signer(node, req.founder_account).await?;
    let listed = fetch_account(node, req.account_number).await?;

    // Price and seller come from the listing, never from the client.
    let seller = match listed.seller_account {
        Some(seller) if listed.is_for_sale() && !listed.private_sale => seller,
        _ => return Err(ProtocolError::NotForSale(req.account_number)),
    };
    let fee = to_amount(req.fee)?;
    let new_key = req.new_key.parse()?;

    Ok(TransactionBuilder::new(req.founder_account, key)
        .sequence(next_sequence(&founder)?)
        .fee(fee)
        .purchase_account(req.account_number, seller, listed.price, new_key))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Checks the `N-CC` checksum against the node's derivation.
///
/// Bare numbers pass. When the node exposes no checksum function, the
/// checksum is taken as given.
pub fn check_account(node: &dyn LedgerNode, account: AccountNumber) -> Result<(), ProtocolError> {
    let Some(given) = account.checksum() else {
        return Ok(());
    };
    match node.account_checksum(account.number()) {
        Some(expected) if expected == given => Ok(()),
        Some(_) => Err(ProtocolError::ChecksumMismatch { account }),
        None => {
            debug!(%account, "node has no checksum function, accepting checksum as given");
            Ok(())
        }
    }
}

/// Checksum, then existence.
pub async fn fetch_account(
    node: &dyn LedgerNode,
    account: AccountNumber,
) -> Result<AccountInfo, ProtocolError> {
    check_account(node, account)?;
    node.get_account(account)
        .await?
        .ok_or(ProtocolError::AccountNotFound(account))
}

/// The account and its current owner key as stored by the node.
async fn resolve_signer(
    node: &dyn LedgerNode,
    account: AccountNumber,
) -> Result<(AccountInfo, PublicKey), ProtocolError> {
    let info = fetch_account(node, account).await?;
    let key = node.decode_pubkey(&info.enc_pubkey).await?;
    Ok((info, key))
}

fn next_sequence(account: &AccountInfo) -> Result<u32, ProtocolError> {
    account
        .n_operation
        .checked_add(1)
        .ok_or(ProtocolError::SequenceExhausted(account.account))
}

fn to_amount(value: Decimal) -> Result<Amount, ProtocolError> {
    Amount::from_decimal(value).map_err(ProtocolError::InvalidAmount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::CurveType;
    use crate::crypto::signatures::public_key_from_secret;
    use crate::error::ErrorCode;
    use crate::ledger::memory::encode_key;
    use crate::ledger::{AccountState, InMemoryLedger};
    use crate::transaction::builder::TransactionBody;
    use serde_json::json;

    const OWNER: [u8; 32] = [0x31; 32];
    const BUYER: [u8; 32] = [0x32; 32];

    fn key(secret: &[u8; 32]) -> PublicKey {
        public_key_from_secret(CurveType::Secp256k1, secret).unwrap()
    }

    fn checksum(n: u32) -> u8 {
        ((n * 23) % 100) as u8
    }

    fn ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::with_checksum(checksum);
        let mut owner = AccountInfo::new(
            AccountNumber::new(1),
            encode_key(&key(&OWNER)),
            Amount::from_units(500_000),
        );
        owner.n_operation = 5;
        ledger.insert_account(owner);

        let mut shop = AccountInfo::new(AccountNumber::new(3), encode_key(&key(&OWNER)), Amount::ZERO);
        shop.state = AccountState::Listed;
        shop.price = Amount::from_units(20_000);
        shop.seller_account = Some(AccountNumber::new(1));
        ledger.insert_account(shop);

        ledger.insert_account(AccountInfo::new(
            AccountNumber::new(2),
            encode_key(&key(&BUYER)),
            Amount::from_units(100_000),
        ));
        ledger
    }

    fn transfer(body: serde_json::Value) -> OperationRequest {
        OperationRequest::Transfer(serde_json::from_value(body).unwrap())
    }

    #[tokio::test]
    async fn transfer_takes_key_and_sequence_from_ledger() {
        let req = transfer(json!({
            "sender": "1-23", "target": "2-46", "amount": 10, "fee": 0.0001, "payload": "hi"
        }));
        let tx = req.build(&ledger()).await.unwrap();

        assert_eq!(tx.sequence(), 6);
        assert_eq!(tx.account_key(), &key(&OWNER));
        assert_eq!(tx.fee(), Amount::from_units(1));
        assert_eq!(tx.amount(), Amount::from_units(100_000));
        assert!(matches!(tx.body(), TransactionBody::Transfer { payload, .. } if payload == b"hi"));
    }

    #[tokio::test]
    async fn exhausted_sequence_is_refused() {
        let ledger = ledger();
        let mut owner = ledger.account(AccountNumber::new(1)).unwrap();
        owner.n_operation = u32::MAX;
        ledger.insert_account(owner);

        let req = transfer(json!({"sender": 1, "target": 2, "amount": 1, "fee": 0}));
        let err = req.build(&ledger).await.unwrap_err();
        assert!(matches!(err, ProtocolError::SequenceExhausted(a) if a.number() == 1));
        assert_eq!(err.code(), ErrorCode::InvalidAccount);
    }

    #[tokio::test]
    async fn wrong_checksum_fails_before_lookup() {
        let req = transfer(json!({"sender": "1-24", "target": 2, "amount": 1, "fee": 0}));
        let err = req.build(&ledger()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
        assert_eq!(err.code(), ErrorCode::InvalidAccount);
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let req = transfer(json!({"sender": 1, "target": 77, "amount": 1, "fee": 0}));
        let err = req.build(&ledger()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn negative_amount_is_invalid_data() {
        let req = transfer(json!({"sender": 1, "target": 2, "amount": "-1", "fee": 0}));
        let err = req.build(&ledger()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
    }

    #[tokio::test]
    async fn oversized_payload_is_invalid_data() {
        let req = transfer(json!({
            "sender": 1, "target": 2, "amount": 1, "fee": 0, "payload": "x".repeat(256)
        }));
        let err = req.build(&ledger()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn change_key_rejects_off_curve_key() {
        let req = OperationRequest::ChangeKey(ChangeKeyRequest {
            account_number: AccountNumber::new(1),
            new_owner_public_key: PublicKeyInput {
                curve_type: "secp256k1".into(),
                x: "01".into(),
                y: "01".into(),
            },
            fee: Decimal::ZERO,
        });
        let err = req.build(&ledger()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPubKey);
    }

    #[tokio::test]
    async fn purchase_uses_listed_price_and_seller() {
        let buyer = key(&BUYER);
        let req = OperationRequest::PurchaseAccount(PurchaseAccountRequest {
            account_number: AccountNumber::new(3),
            founder_account: AccountNumber::new(2),
            new_key: PublicKeyInput::from(&buyer),
            fee: Decimal::ZERO,
        });
        assert_eq!(req.signer(), AccountNumber::new(2));

        let tx = req.build(&ledger()).await.unwrap();
        match tx.body() {
            TransactionBody::PurchaseAccount {
                account,
                seller,
                price,
                new_key,
            } => {
                assert_eq!(*account, AccountNumber::new(3));
                assert_eq!(*seller, AccountNumber::new(1));
                assert_eq!(*price, Amount::from_units(20_000));
                assert_eq!(*new_key, buyer);
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(tx.sequence(), 1);
    }

    #[tokio::test]
    async fn unlisted_account_cannot_be_purchased() {
        let req = OperationRequest::PurchaseAccount(PurchaseAccountRequest {
            account_number: AccountNumber::new(1),
            founder_account: AccountNumber::new(2),
            new_key: PublicKeyInput::from(&key(&BUYER)),
            fee: Decimal::ZERO,
        });
        let err = req.build(&ledger()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::NotForSale(_)));
    }

    #[test]
    fn signed_envelope_flattens_the_request() {
        let signed: Signed<TransferRequest> = serde_json::from_value(json!({
            "sender": "1-23",
            "target": 2,
            "amount": "10.0",
            "fee": 0.0001,
            "hash": "00".repeat(32),
            "signature": {"r": "01", "s": "02"}
        }))
        .unwrap();
        assert_eq!(signed.request.sender, AccountNumber::new(1));
        assert_eq!(signed.hash, Some(TxHash::from_bytes([0u8; 32])));
        assert!(signed.signature.is_some());
    }
}
