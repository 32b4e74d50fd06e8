// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Read-Only Queries
//!
//! Account and operation lookups, and the views they are rendered into.
//! None of these touch the commit path; they are thin wrappers over
//! [`LedgerNode`] that apply the same account-number rules the builders do.
//!
//! Views serialize in camelCase with coin values as decimal strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::crypto::hash::TxHash;
use crate::crypto::keys::{PublicKeyInput, SignatureInput};
use crate::error::ProtocolError;
use crate::ledger::{signed_coins, AccountFilter, AccountInfo, LedgerNode, OperationResult};
use crate::transaction::commit::Confirmed;
use crate::transaction::request::{check_account, fetch_account};
use crate::transaction::types::AccountNumber;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Account details as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub account_number: AccountNumber,
    pub balance: Decimal,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: u16,
    pub status: String,
    pub price: Decimal,
    pub public_key: PublicKeyInput,
}

/// A pending or included operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationView {
    pub op_hash: String,
    pub block: u32,
    /// Block time; absent while pending.
    pub timestamp: Option<DateTime<Utc>>,
    /// Blocks since inclusion; absent while pending.
    pub confirmations: Option<u32>,
    #[serde(rename = "type")]
    pub op_type: u32,
    pub sub_type: u32,
    pub account: AccountNumber,
    pub signer: AccountNumber,
    pub sender: AccountNumber,
    pub target: AccountNumber,
    pub amount: Decimal,
    pub fee: Decimal,
    pub balance: Decimal,
    pub payload: String,
}

impl From<&OperationResult> for OperationView {
    fn from(op: &OperationResult) -> Self {
        Self {
            op_hash: op.ophash.clone(),
            block: op.block,
            timestamp: op
                .maturation
                .and_then(|_| DateTime::from_timestamp(i64::from(op.time), 0)),
            confirmations: op.maturation,
            op_type: op.op_type,
            sub_type: op.subtype,
            account: op.account,
            signer: op.signer_account,
            sender: op.sender_account,
            target: op.dest_account,
            amount: signed_coins(op.amount),
            fee: signed_coins(op.fee),
            balance: op.balance.to_decimal(),
            payload: String::from_utf8_lossy(&op.payload).into_owned(),
        }
    }
}

/// Response of a confirmed commit: the node's view of the operation plus
/// the hash and signature that were verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    #[serde(flatten)]
    pub operation: OperationView,
    pub hash: TxHash,
    pub signature: Option<SignatureInput>,
}

impl From<&Confirmed> for CommitReceipt {
    fn from(confirmed: &Confirmed) -> Self {
        Self {
            operation: OperationView::from(&confirmed.result),
            hash: confirmed.hash,
            signature: confirmed.transaction.signature().map(SignatureInput::from),
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Renders the account number with its checksum when the node provides one.
fn display_number(node: &dyn LedgerNode, account: AccountNumber) -> AccountNumber {
    match node.account_checksum(account.number()) {
        Some(cs) => AccountNumber::with_checksum(account.number(), cs),
        None => account,
    }
}

async fn account_view(
    node: &dyn LedgerNode,
    info: &AccountInfo,
) -> Result<AccountView, ProtocolError> {
    let key = node.decode_pubkey(&info.enc_pubkey).await?;
    Ok(AccountView {
        account_number: display_number(node, info.account),
        balance: info.balance.to_decimal(),
        name: info.name.clone(),
        account_type: info.account_type,
        status: info.state.to_string(),
        price: info.price.to_decimal(),
        public_key: PublicKeyInput::from(&key),
    })
}

/// Account details by number. Text that is not an account number is
/// looked up as an account name.
pub async fn account_details(
    node: &dyn LedgerNode,
    text: &str,
) -> Result<AccountView, ProtocolError> {
    let info = match text.parse::<AccountNumber>() {
        Ok(account) => fetch_account(node, account).await?,
        Err(parse_err) => node
            .find_accounts(&AccountFilter::by_name(text))
            .await?
            .into_iter()
            .next()
            .ok_or(ProtocolError::InvalidAccount(parse_err))?,
    };
    account_view(node, &info).await
}

/// Accounts listed for public sale, cheapest relative to their balance
/// first.
pub async fn offers(node: &dyn LedgerNode) -> Result<Vec<AccountView>, ProtocolError> {
    let mut listed: Vec<AccountInfo> = node
        .find_accounts(&AccountFilter::listed())
        .await?
        .into_iter()
        .filter(|a| a.is_for_sale() && !a.private_sale)
        .collect();
    listed.sort_by_key(|a| i128::from(a.price.units()) - i128::from(a.balance.units()));

    let mut views = Vec::with_capacity(listed.len());
    for info in &listed {
        views.push(account_view(node, info).await?);
    }
    Ok(views)
}

/// Accounts owned by `key`.
pub async fn accounts_by_key(
    node: &dyn LedgerNode,
    key: &PublicKeyInput,
) -> Result<Vec<AccountView>, ProtocolError> {
    let key = key.parse()?;
    let encoded = node.encode_pubkey(&key).await?;
    let owned = node.find_accounts(&AccountFilter::by_key(encoded)).await?;

    let mut views = Vec::with_capacity(owned.len());
    for info in &owned {
        views.push(account_view(node, info).await?);
    }
    Ok(views)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Pending operations in which `account` takes any role.
pub async fn pending(
    node: &dyn LedgerNode,
    account: AccountNumber,
) -> Result<Vec<OperationView>, ProtocolError> {
    check_account(node, account)?;
    Ok(node
        .get_pendings()
        .await?
        .iter()
        .filter(|op| op.involves(account))
        .map(OperationView::from)
        .collect())
}

/// Operation history of `account`, newest first.
pub async fn history(
    node: &dyn LedgerNode,
    account: AccountNumber,
    start: Option<u32>,
    max: Option<u32>,
) -> Result<Vec<OperationView>, ProtocolError> {
    check_account(node, account)?;
    Ok(node
        .get_account_operations(account, start, max)
        .await?
        .iter()
        .map(OperationView::from)
        .collect())
}

pub async fn operation(node: &dyn LedgerNode, ophash: &str) -> Result<OperationView, ProtocolError> {
    node.find_operation(ophash)
        .await?
        .as_ref()
        .map(OperationView::from)
        .ok_or_else(|| ProtocolError::OperationNotFound(ophash.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{CurveType, PublicKey};
    use crate::crypto::signatures::public_key_from_secret;
    use crate::error::ErrorCode;
    use crate::ledger::memory::encode_key;
    use crate::ledger::{AccountState, InMemoryLedger};
    use crate::transaction::types::Amount;

    fn key(byte: u8) -> PublicKey {
        public_key_from_secret(CurveType::Secp256r1, &[byte; 32]).unwrap()
    }

    fn listed(n: u32, balance: u64, price: u64, private: bool) -> AccountInfo {
        let mut info = AccountInfo::new(
            AccountNumber::new(n),
            encode_key(&key(1)),
            Amount::from_units(balance),
        );
        info.state = AccountState::Listed;
        info.price = Amount::from_units(price);
        info.seller_account = Some(AccountNumber::new(1));
        info.private_sale = private;
        info
    }

    fn ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::with_checksum(|n| ((n * 23) % 100) as u8);
        let mut named = AccountInfo::new(AccountNumber::new(1), encode_key(&key(1)), Amount::ZERO);
        named.name = "treasury".into();
        ledger.insert_account(named);
        ledger.insert_account(AccountInfo::new(AccountNumber::new(2), encode_key(&key(2)), Amount::ZERO));
        ledger.insert_account(listed(10, 0, 50_000, false));
        ledger.insert_account(listed(11, 40_000, 50_000, false));
        ledger.insert_account(listed(12, 0, 1, true));
        ledger
    }

    #[tokio::test]
    async fn details_render_checksum_and_key() {
        let view = account_details(&ledger(), "2").await.unwrap();
        assert_eq!(view.account_number.to_string(), "2-46");
        assert_eq!(view.public_key, PublicKeyInput::from(&key(2)));
        assert_eq!(view.status, "normal");
    }

    #[tokio::test]
    async fn details_fall_back_to_name() {
        let view = account_details(&ledger(), "treasury").await.unwrap();
        assert_eq!(view.account_number.number(), 1);

        let err = account_details(&ledger(), "nobody").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAccount);
    }

    #[tokio::test]
    async fn offers_skip_private_sales_and_sort_by_net_price() {
        let views = offers(&ledger()).await.unwrap();
        let numbers: Vec<u32> = views.iter().map(|v| v.account_number.number()).collect();
        assert_eq!(numbers, vec![11, 10]);
        assert_eq!(views[0].price, Decimal::new(50_000, 4));
    }

    #[tokio::test]
    async fn accounts_by_key_uses_encoded_form() {
        let owned = accounts_by_key(&ledger(), &PublicKeyInput::from(&key(2))).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].account_number.number(), 2);
    }

    #[tokio::test]
    async fn unknown_operation_is_not_found() {
        let err = operation(&ledger(), "ABCD").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn history_checks_the_checksum() {
        let err = history(&ledger(), AccountNumber::with_checksum(2, 1), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAccount);
        assert!(history(&ledger(), AccountNumber::new(2), None, None)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn pending_view_has_no_timestamp() {
        let op = OperationResult {
            amount: -100_001,
            payload: b"memo".to_vec(),
            ..OperationResult::default()
        };
        let view = OperationView::from(&op);
        assert_eq!(view.timestamp, None);
        assert_eq!(view.amount.to_string(), "-10.0001");
        assert_eq!(view.payload, "memo");

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("opHash").is_some());
        assert!(json.get("subType").is_some());
        assert_eq!(json["type"], 0);
    }
}
