// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! In-memory ledger.
//!
//! A small, deterministic stand-in for a ledger node, used by the test
//! suites and by the gateway's offline mode. It accepts the same wire
//! frames a real node does and applies the rules the gateway depends on:
//!
//! - the signature must verify against the signer's stored key;
//! - the sequence number must be exactly `n_operation + 1`;
//! - the signer must cover amount plus fee.
//!
//! A rule violation is not an RPC error. Like a real node, the ledger
//! returns the operation with its `errors` field set.
//!
//! Operations stay pending until [`InMemoryLedger::seal_block`] is called.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::{AccountFilter, AccountInfo, AccountState, LedgerNode, NodeError, OperationResult};
use crate::crypto::hash::TxHash;
use crate::crypto::keys::{CurveType, KeyError, PublicKey, PublicKeyInput};
use crate::error::ErrorCode;
use crate::transaction::builder::{Transaction, TransactionBody};
use crate::transaction::encoding::decode_frame;
use crate::transaction::types::{coins, AccountNumber, Amount};
use crate::transaction::verification::verify_transaction;

const SUBTYPE_TRANSFER: u32 = 11;
const SUBTYPE_PURCHASE: u32 = 61;
const SUBTYPE_CHANGE_KEY: u32 = 71;

// ---------------------------------------------------------------------------
// Encoded keys
// ---------------------------------------------------------------------------

/// Encodes a key the way the node stores it:
/// `curve:u16 len:u16 X len:u16 Y`, little-endian, as uppercase hex.
pub fn encode_key(key: &PublicKey) -> String {
    let mut raw = Vec::with_capacity(70);
    raw.extend_from_slice(&key.curve.id().to_le_bytes());
    raw.extend_from_slice(&(key.x.len() as u16).to_le_bytes());
    raw.extend_from_slice(&key.x);
    raw.extend_from_slice(&(key.y.len() as u16).to_le_bytes());
    raw.extend_from_slice(&key.y);
    hex::encode_upper(raw)
}

/// Inverse of [`encode_key`].
pub fn decode_key(enc_pubkey: &str) -> Result<PublicKey, KeyError> {
    let invalid = || KeyError::InvalidHex { field: "enc_pubkey" };
    let raw = hex::decode(enc_pubkey.trim()).map_err(|_| invalid())?;
    if raw.len() != 70 || raw[2..4] != [32, 0] || raw[36..38] != [32, 0] {
        return Err(invalid());
    }
    let curve = CurveType::from_id(u16::from_le_bytes([raw[0], raw[1]]))?;
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&raw[4..36]);
    y.copy_from_slice(&raw[38..70]);
    Ok(PublicKey::new(curve, x, y))
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// Initial accounts, as loaded from a JSON seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSeed {
    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAccount {
    pub account: AccountNumber,
    pub public_key: PublicKeyInput,
    #[serde(with = "coins")]
    pub balance: Decimal,
    #[serde(default)]
    pub n_operation: u32,
    #[serde(default)]
    pub name: String,
    /// When set, the account is listed for sale at this price.
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub seller_account: Option<AccountNumber>,
    #[serde(default)]
    pub private_sale: bool,
}

impl SeedAccount {
    fn into_info(self) -> Result<AccountInfo, NodeError> {
        let bad = |what: String| NodeError::Decode(format!("seed account {}: {what}", self.account));
        let key = self.public_key.parse().map_err(|e| bad(e.to_string()))?;
        let balance = Amount::from_decimal(self.balance).map_err(|e| bad(e.to_string()))?;

        let mut info = AccountInfo::new(self.account, encode_key(&key), balance);
        info.n_operation = self.n_operation;
        info.name = self.name.clone();
        if let Some(price) = &self.price {
            let price = coins::parse(price).map_err(|e| bad(e.to_string()))?;
            info.state = AccountState::Listed;
            info.price = Amount::from_decimal(price).map_err(|e| bad(e.to_string()))?;
            info.seller_account = Some(self.seller_account.unwrap_or(self.account));
            info.private_sale = self.private_sale;
        }
        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<u32, AccountInfo>,
    /// Oldest first. Pending entries have `maturation == None`.
    operations: Vec<OperationResult>,
    height: u32,
}

/// Deterministic [`LedgerNode`] held entirely in memory.
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    checksum: Option<fn(u32) -> u8>,
    submissions: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger that validates `N-CC` checksums with `checksum`.
    pub fn with_checksum(checksum: fn(u32) -> u8) -> Self {
        Self {
            checksum: Some(checksum),
            ..Self::default()
        }
    }

    pub fn from_seed(seed: LedgerSeed) -> Result<Self, NodeError> {
        let ledger = Self::new();
        for account in seed.accounts {
            ledger.insert_account(account.into_info()?);
        }
        Ok(ledger)
    }

    /// Adds or replaces an account.
    pub fn insert_account(&self, info: AccountInfo) {
        self.state.write().accounts.insert(info.account.number(), info);
    }

    pub fn account(&self, account: AccountNumber) -> Option<AccountInfo> {
        self.state.read().accounts.get(&account.number()).cloned()
    }

    /// Number of `execute_operations` calls received.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn height(&self) -> u32 {
        self.state.read().height
    }

    /// Includes every pending operation in a new block and ages the rest.
    pub fn seal_block(&self) -> u32 {
        let mut state = self.state.write();
        state.height += 1;
        let height = state.height;
        let now = block_time(Utc::now().timestamp());
        for op in state.operations.iter_mut() {
            match op.maturation {
                None => {
                    op.block = height;
                    op.time = now;
                    op.maturation = Some(0);
                }
                Some(m) => op.maturation = Some(m + 1),
            }
        }
        height
    }

    fn apply(&self, tx: &Transaction, ophash: String) -> OperationResult {
        let mut result = OperationResult {
            op_type: tx.op_type().code(),
            account: tx.signer(),
            signer_account: tx.signer(),
            sender_account: tx.signer(),
            dest_account: tx.target(),
            n_operation: tx.sequence(),
            ..OperationResult::default()
        };

        let mut state = self.state.write();
        match apply_to(&mut state.accounts, tx) {
            Ok(outcome) => {
                result.subtype = outcome.subtype;
                result.fee = outcome.fee;
                result.amount = outcome.amount;
                result.balance = outcome.signer_balance;
                result.payload = outcome.payload;
                result.ophash = ophash;
                state.operations.push(result.clone());
                debug!(
                    signer = %tx.signer(),
                    sequence = tx.sequence(),
                    ophash = %result.ophash,
                    "in-memory ledger applied operation"
                );
            }
            Err(reason) => {
                debug!(signer = %tx.signer(), %reason, "in-memory ledger rejected operation");
                result.errors = Some(reason);
            }
        }
        result
    }
}

struct Applied {
    subtype: u32,
    amount: i64,
    fee: i64,
    signer_balance: Amount,
    payload: Vec<u8>,
}

fn apply_to(accounts: &mut BTreeMap<u32, AccountInfo>, tx: &Transaction) -> Result<Applied, String> {
    let signer_no = tx.signer().number();
    let signer = accounts
        .get(&signer_no)
        .ok_or_else(|| format!("Account {signer_no} does not exist"))?;

    if decode_key(&signer.enc_pubkey).ok().as_ref() != Some(tx.account_key()) {
        return Err(format!("Signer key does not own account {signer_no}"));
    }
    let expected = signer.n_operation + 1;
    if tx.sequence() != expected {
        return Err(format!(
            "Invalid n_operation {} for account {signer_no} (expected {expected})",
            tx.sequence()
        ));
    }

    let fee = tx.fee();
    let fee_paid = paid(fee, "Fee")?;
    let balance = signer.balance;

    match tx.body() {
        TransactionBody::Transfer {
            target,
            amount,
            payload,
        } => {
            let target_no = target.number();
            if target_no == signer_no {
                return Err("Sender and target are the same account".to_string());
            }
            if !accounts.contains_key(&target_no) {
                return Err(format!("Target account {target_no} does not exist"));
            }
            let amount_paid = paid(*amount, "Amount")?;
            let total = amount.checked_add(fee).ok_or("Amount overflow")?;
            let remaining = balance
                .checked_sub(total)
                .ok_or_else(|| format!("Insufficient funds: {balance} < {total}"))?;
            let credited = accounts[&target_no]
                .balance
                .checked_add(*amount)
                .ok_or("Target balance overflow")?;

            if let Some(t) = accounts.get_mut(&target_no) {
                t.balance = credited;
            }
            let s = debit(accounts, signer_no, remaining);
            Ok(Applied {
                subtype: SUBTYPE_TRANSFER,
                amount: amount_paid,
                fee: fee_paid,
                signer_balance: s,
                payload: payload.clone(),
            })
        }
        TransactionBody::ChangeKey { target, new_key } => {
            if target.number() != signer_no {
                return Err(format!("Account {signer_no} cannot change the key of {target}"));
            }
            new_key
                .validate()
                .map_err(|e| format!("Invalid new public key: {e}"))?;
            let remaining = balance
                .checked_sub(fee)
                .ok_or_else(|| format!("Insufficient funds: {balance} < {fee}"))?;

            if let Some(s) = accounts.get_mut(&signer_no) {
                s.enc_pubkey = encode_key(new_key);
            }
            let s = debit(accounts, signer_no, remaining);
            Ok(Applied {
                subtype: SUBTYPE_CHANGE_KEY,
                amount: 0,
                fee: fee_paid,
                signer_balance: s,
                payload: Vec::new(),
            })
        }
        TransactionBody::PurchaseAccount {
            account,
            seller,
            price,
            new_key,
        } => {
            let account_no = account.number();
            if account_no == signer_no {
                return Err("An account cannot purchase itself".to_string());
            }
            let listed = accounts
                .get(&account_no)
                .filter(|a| a.is_for_sale() && !a.private_sale)
                .ok_or_else(|| format!("Account {account_no} is not for sale"))?;
            if listed.price != *price {
                return Err(format!(
                    "Price mismatch for account {account_no}: asked {}, offered {price}",
                    listed.price
                ));
            }
            let seller_no = seller.number();
            if listed.seller_account.map(|s| s.number()) != Some(seller_no) {
                return Err(format!("Account {seller_no} is not the seller of {account_no}"));
            }
            if !accounts.contains_key(&seller_no) {
                return Err(format!("Seller account {seller_no} does not exist"));
            }
            new_key
                .validate()
                .map_err(|e| format!("Invalid new public key: {e}"))?;
            let price_paid = paid(*price, "Price")?;
            let total = price.checked_add(fee).ok_or("Amount overflow")?;
            let remaining = balance
                .checked_sub(total)
                .ok_or_else(|| format!("Insufficient funds: {balance} < {total}"))?;
            let seller_balance = accounts[&seller_no]
                .balance
                .checked_add(*price)
                .ok_or("Seller balance overflow")?;

            if let Some(bought) = accounts.get_mut(&account_no) {
                bought.enc_pubkey = encode_key(new_key);
                bought.state = AccountState::Normal;
                bought.price = Amount::ZERO;
                bought.seller_account = None;
                bought.private_sale = false;
            }
            if let Some(s) = accounts.get_mut(&seller_no) {
                s.balance = seller_balance;
            }
            // Seller may be the signer; debit last so the credit is not lost.
            let s = debit(accounts, signer_no, remaining);
            Ok(Applied {
                subtype: SUBTYPE_PURCHASE,
                amount: price_paid,
                fee: fee_paid,
                signer_balance: s,
                payload: Vec::new(),
            })
        }
    }
}

/// Block timestamps are u32 seconds; clamp instead of wrapping.
fn block_time(unix_secs: i64) -> u32 {
    u32::try_from(unix_secs.max(0)).unwrap_or(u32::MAX)
}

/// Units the signer paid, as the node's negative signed amount.
fn paid(amount: Amount, what: &str) -> Result<i64, String> {
    i64::try_from(amount.units())
        .map(|units| -units)
        .map_err(|_| format!("{what} overflow: {amount}"))
}

/// Sets the signer's balance and bumps its operation counter.
fn debit(accounts: &mut BTreeMap<u32, AccountInfo>, signer: u32, remaining: Amount) -> Amount {
    match accounts.get_mut(&signer) {
        Some(s) => {
            s.balance = remaining;
            s.n_operation += 1;
            s.balance
        }
        None => remaining,
    }
}

fn page<T>(items: impl Iterator<Item = T>, start: Option<u32>, max: Option<u32>) -> Vec<T> {
    let max = match max {
        Some(0) | None => AccountFilter::DEFAULT_MAX,
        Some(m) => m,
    };
    items
        .skip(start.unwrap_or(0) as usize)
        .take(max as usize)
        .collect()
}

#[async_trait]
impl LedgerNode for InMemoryLedger {
    async fn get_account(&self, account: AccountNumber) -> Result<Option<AccountInfo>, NodeError> {
        Ok(self.account(account))
    }

    async fn find_accounts(&self, filter: &AccountFilter) -> Result<Vec<AccountInfo>, NodeError> {
        let state = self.state.read();
        let matching = state.accounts.values().filter(|a| filter.matches(a)).cloned();
        Ok(page(matching, Some(filter.start), Some(filter.max)))
    }

    async fn decode_pubkey(&self, enc_pubkey: &str) -> Result<PublicKey, NodeError> {
        decode_key(enc_pubkey).map_err(|e| NodeError::rpc(ErrorCode::InvalidPubKey, e.to_string()))
    }

    async fn encode_pubkey(&self, key: &PublicKey) -> Result<String, NodeError> {
        key.validate()
            .map_err(|e| NodeError::rpc(ErrorCode::InvalidPubKey, e.to_string()))?;
        Ok(encode_key(key))
    }

    async fn execute_operations(&self, raw: &[u8]) -> Result<Vec<OperationResult>, NodeError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let frame =
            decode_frame(raw).map_err(|e| NodeError::rpc(ErrorCode::InvalidData, e.to_string()))?;
        let tx = frame.transaction;

        if let Err(e) = verify_transaction(&tx) {
            return Ok(vec![OperationResult {
                op_type: tx.op_type().code(),
                account: tx.signer(),
                signer_account: tx.signer(),
                n_operation: tx.sequence(),
                errors: Some(e.to_string()),
                ..OperationResult::default()
            }]);
        }

        let ophash = TxHash::digest(raw).to_hex().to_uppercase();
        Ok(vec![self.apply(&tx, ophash)])
    }

    async fn find_operation(&self, ophash: &str) -> Result<Option<OperationResult>, NodeError> {
        let state = self.state.read();
        Ok(state
            .operations
            .iter()
            .find(|op| op.ophash.eq_ignore_ascii_case(ophash.trim()))
            .cloned())
    }

    async fn get_pendings(&self) -> Result<Vec<OperationResult>, NodeError> {
        let state = self.state.read();
        Ok(state
            .operations
            .iter()
            .rev()
            .filter(|op| op.maturation.is_none())
            .cloned()
            .collect())
    }

    async fn get_account_operations(
        &self,
        account: AccountNumber,
        start: Option<u32>,
        max: Option<u32>,
    ) -> Result<Vec<OperationResult>, NodeError> {
        let state = self.state.read();
        if !state.accounts.contains_key(&account.number()) {
            return Err(NodeError::rpc(
                ErrorCode::NotFound,
                format!("Account {account} not found"),
            ));
        }
        let ops = state
            .operations
            .iter()
            .rev()
            .filter(|op| op.involves(account))
            .cloned();
        Ok(page(ops, start, max))
    }

    fn account_checksum(&self, number: u32) -> Option<u8> {
        self.checksum.map(|f| f(number))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signatures::{public_key_from_secret, sign_hash};
    use crate::transaction::builder::TransactionBuilder;

    const ALICE: [u8; 32] = [0x0A; 32];
    const BOB: [u8; 32] = [0x0B; 32];

    fn key(secret: &[u8; 32]) -> PublicKey {
        public_key_from_secret(CurveType::Secp256k1, secret).unwrap()
    }

    fn ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::new();
        let mut alice = AccountInfo::new(
            AccountNumber::new(1),
            encode_key(&key(&ALICE)),
            Amount::from_units(1_000_000),
        );
        alice.n_operation = 5;
        ledger.insert_account(alice);
        ledger.insert_account(AccountInfo::new(
            AccountNumber::new(2),
            encode_key(&key(&BOB)),
            Amount::ZERO,
        ));
        ledger
    }

    fn signed_transfer(sequence: u32, amount: u64) -> Vec<u8> {
        let tx = TransactionBuilder::new(AccountNumber::new(1), key(&ALICE))
            .sequence(sequence)
            .fee(Amount::from_units(1))
            .transfer(AccountNumber::new(2), Amount::from_units(amount), Vec::new())
            .unwrap();
        let sig = sign_hash(CurveType::Secp256k1, &ALICE, &tx.hash()).unwrap();
        tx.with_signature(sig).wire_bytes()
    }

    #[test]
    fn encoded_key_roundtrip() {
        let k = key(&ALICE);
        let enc = encode_key(&k);
        assert!(enc.starts_with("CA022000"));
        assert_eq!(decode_key(&enc).unwrap(), k);
        assert!(decode_key("CA02").is_err());
    }

    #[tokio::test]
    async fn transfer_moves_funds_and_bumps_sequence() {
        let ledger = ledger();
        let ops = ledger.execute_operations(&signed_transfer(6, 100_000)).await.unwrap();
        let op = &ops[0];

        assert_eq!(op.errors, None);
        assert_eq!(op.balance, Amount::from_units(899_999));
        assert_eq!(op.amount, -100_000);
        assert_eq!(op.ophash.len(), 64);

        let alice = ledger.account(AccountNumber::new(1)).unwrap();
        assert_eq!(alice.n_operation, 6);
        let bob = ledger.account(AccountNumber::new(2)).unwrap();
        assert_eq!(bob.balance, Amount::from_units(100_000));
    }

    #[tokio::test]
    async fn stale_sequence_is_rejected_with_node_error() {
        let ledger = ledger();
        let frame = signed_transfer(6, 10);
        assert_eq!(ledger.execute_operations(&frame).await.unwrap()[0].errors, None);

        let replay = ledger.execute_operations(&frame).await.unwrap();
        let reason = replay[0].errors.as_deref().unwrap();
        assert!(reason.contains("n_operation"), "{reason}");
        assert_eq!(ledger.submissions(), 2);
    }

    #[test]
    fn block_time_clamps_to_u32() {
        assert_eq!(block_time(1_700_000_000), 1_700_000_000);
        assert_eq!(block_time(i64::from(u32::MAX) + 1), u32::MAX);
        assert_eq!(block_time(-5), 0);
    }

    #[tokio::test]
    async fn fee_beyond_signed_range_is_rejected() {
        let ledger = ledger();
        let tx = TransactionBuilder::new(AccountNumber::new(1), key(&ALICE))
            .sequence(6)
            .fee(Amount::from_units(1u64 << 63))
            .transfer(AccountNumber::new(2), Amount::from_units(10), Vec::new())
            .unwrap();
        let sig = sign_hash(CurveType::Secp256k1, &ALICE, &tx.hash()).unwrap();

        let ops = ledger
            .execute_operations(&tx.with_signature(sig).wire_bytes())
            .await
            .unwrap();
        let reason = ops[0].errors.as_deref().unwrap();
        assert!(reason.starts_with("Fee overflow"), "{reason}");
        assert_eq!(ops[0].fee, 0);

        let alice = ledger.account(AccountNumber::new(1)).unwrap();
        assert_eq!(alice.balance, Amount::from_units(1_000_000));
        assert_eq!(alice.n_operation, 5);
    }

    #[tokio::test]
    async fn transfer_reports_fee_as_paid() {
        let ledger = ledger();
        let ops = ledger.execute_operations(&signed_transfer(6, 10)).await.unwrap();
        assert_eq!(ops[0].fee, -1);
    }

    #[tokio::test]
    async fn insufficient_funds_leave_state_untouched() {
        let ledger = ledger();
        let ops = ledger.execute_operations(&signed_transfer(6, 1_000_000)).await.unwrap();
        assert!(ops[0].errors.as_deref().unwrap().contains("Insufficient"));
        assert_eq!(ledger.account(AccountNumber::new(1)).unwrap().n_operation, 5);
    }

    #[tokio::test]
    async fn bad_signature_is_reported_not_applied() {
        let ledger = ledger();
        let mut frame = signed_transfer(6, 10);
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        let ops = ledger.execute_operations(&frame).await.unwrap();
        assert!(ops[0].errors.is_some());
        assert!(ledger.get_pendings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_frame_is_an_rpc_error() {
        let ledger = ledger();
        let err = ledger.execute_operations(&[1, 2, 3]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidData);
    }

    #[tokio::test]
    async fn sealing_moves_pending_into_history() {
        let ledger = ledger();
        ledger.execute_operations(&signed_transfer(6, 10)).await.unwrap();
        assert_eq!(ledger.get_pendings().await.unwrap().len(), 1);

        assert_eq!(ledger.seal_block(), 1);
        assert!(ledger.get_pendings().await.unwrap().is_empty());

        let history = ledger
            .get_account_operations(AccountNumber::new(2), None, None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].block, 1);
        assert_eq!(history[0].maturation, Some(0));

        let found = ledger.find_operation(&history[0].ophash.to_lowercase()).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn history_of_unknown_account_is_not_found() {
        let err = ledger()
            .get_account_operations(AccountNumber::new(99), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn seed_lists_priced_accounts() {
        let k = key(&ALICE);
        let seed: LedgerSeed = serde_json::from_value(serde_json::json!({
            "accounts": [{
                "account": "3",
                "publicKey": {"curveType": "secp256k1", "x": k.x_hex(), "y": k.y_hex()},
                "balance": 12.5,
                "price": "4.0",
                "sellerAccount": 1
            }]
        }))
        .unwrap();
        let ledger = InMemoryLedger::from_seed(seed).unwrap();
        let info = ledger.account(AccountNumber::new(3)).unwrap();
        assert!(info.is_for_sale());
        assert_eq!(info.price, Amount::from_units(40_000));
        assert_eq!(info.balance, Amount::from_units(125_000));
        assert_eq!(info.seller_account, Some(AccountNumber::new(1)));
    }
}
