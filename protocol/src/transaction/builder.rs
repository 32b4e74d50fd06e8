// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Transaction construction via the builder pattern.
//!
//! [`TransactionBuilder`] collects the fields every operation shares (signer,
//! signer key, sequence number, fee) and then finishes into one of the three
//! operation kinds. The result is an unsigned [`Transaction`].
//!
//! A `Transaction` never stores its own hash. [`Transaction::hash`] derives
//! it from the signable fields on every call, so the value that gets
//! verified at commit time is always the hash of the fields that get
//! submitted.

use thiserror::Error;

use super::encoding;
use super::types::{AccountNumber, Amount, OperationType};
use crate::config::MAX_PAYLOAD_LENGTH;
use crate::crypto::hash::TxHash;
use crate::crypto::keys::{PublicKey, Signature};

/// A transaction the builder refused to produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("payload is {len} bytes, the ledger accepts at most {max}")]
    PayloadTooLong { len: usize, max: usize },
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Fields specific to each operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionBody {
    /// Move coins from the signer to `target`.
    Transfer {
        target: AccountNumber,
        amount: Amount,
        payload: Vec<u8>,
    },
    /// Hand `target` over to `new_key`. The signer owns `target`.
    ChangeKey {
        target: AccountNumber,
        new_key: PublicKey,
    },
    /// Buy `account` from `seller` for `price`, paid by the signer, and
    /// assign it to `new_key`.
    PurchaseAccount {
        account: AccountNumber,
        seller: AccountNumber,
        price: Amount,
        new_key: PublicKey,
    },
}

/// A MicroCoin ledger operation.
///
/// Fields are private. Once built, only the signature can be attached, and
/// that goes through [`Transaction::with_signature`], which consumes the
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    signer: AccountNumber,
    sequence: u32,
    account_key: PublicKey,
    fee: Amount,
    body: TransactionBody,
    signature: Option<Signature>,
}

impl Transaction {
    pub(crate) fn from_parts(
        signer: AccountNumber,
        sequence: u32,
        account_key: PublicKey,
        fee: Amount,
        body: TransactionBody,
        signature: Option<Signature>,
    ) -> Self {
        Self {
            signer,
            sequence,
            account_key,
            fee,
            body,
            signature,
        }
    }

    /// Account that signs and pays the fee.
    pub fn signer(&self) -> AccountNumber {
        self.signer
    }

    /// Per-signer operation counter this transaction claims.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The signer's current key, as resolved from ledger state.
    pub fn account_key(&self) -> &PublicKey {
        &self.account_key
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    pub fn op_type(&self) -> OperationType {
        match self.body {
            TransactionBody::Transfer { .. } => OperationType::Transfer,
            TransactionBody::ChangeKey { .. } => OperationType::ChangeKey,
            TransactionBody::PurchaseAccount { .. } => OperationType::PurchaseAccount,
        }
    }

    /// Account on the receiving end: the transfer target, the account whose
    /// key changes, or the account being bought.
    pub fn target(&self) -> AccountNumber {
        match &self.body {
            TransactionBody::Transfer { target, .. } => *target,
            TransactionBody::ChangeKey { target, .. } => *target,
            TransactionBody::PurchaseAccount { account, .. } => *account,
        }
    }

    /// Coins moved by the operation. Zero for key changes.
    pub fn amount(&self) -> Amount {
        match &self.body {
            TransactionBody::Transfer { amount, .. } => *amount,
            TransactionBody::ChangeKey { .. } => Amount::ZERO,
            TransactionBody::PurchaseAccount { price, .. } => *price,
        }
    }

    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        encoding::signable_bytes(self)
    }

    /// Full frame for submission to the ledger node.
    pub fn wire_bytes(&self) -> Vec<u8> {
        encoding::wire_frame(self)
    }

    /// SHA-256 of [`Transaction::signable_bytes`], recomputed on every call.
    pub fn hash(&self) -> TxHash {
        TxHash::digest(&self.signable_bytes())
    }

    /// Attaches a signature, replacing any previous one.
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] values.
///
/// ```rust,no_run
/// use microcoin_protocol::crypto::{generate_secret, public_key_from_secret, CurveType};
/// use microcoin_protocol::transaction::{AccountNumber, Amount, TransactionBuilder};
///
/// let secret = generate_secret(CurveType::Secp256k1);
/// let key = public_key_from_secret(CurveType::Secp256k1, &secret).unwrap();
///
/// let tx = TransactionBuilder::new(AccountNumber::new(1), key)
///     .sequence(6)
///     .fee(Amount::from_units(1))
///     .transfer(AccountNumber::new(2), Amount::from_units(100_000), Vec::new())
///     .unwrap();
/// ```
pub struct TransactionBuilder {
    signer: AccountNumber,
    account_key: PublicKey,
    sequence: u32,
    fee: Amount,
}

impl TransactionBuilder {
    /// Starts a transaction signed by `signer` with its current key.
    ///
    /// Defaults: sequence 0, fee zero.
    pub fn new(signer: AccountNumber, account_key: PublicKey) -> Self {
        Self {
            signer,
            account_key,
            sequence: 0,
            fee: Amount::ZERO,
        }
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    /// Finishes as a coin transfer.
    pub fn transfer(
        self,
        target: AccountNumber,
        amount: Amount,
        payload: Vec<u8>,
    ) -> Result<Transaction, BuildError> {
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(BuildError::PayloadTooLong {
                len: payload.len(),
                max: MAX_PAYLOAD_LENGTH,
            });
        }
        Ok(self.finish(TransactionBody::Transfer {
            target,
            amount,
            payload,
        }))
    }

    /// Finishes as a key change on `target`.
    pub fn change_key(self, target: AccountNumber, new_key: PublicKey) -> Transaction {
        self.finish(TransactionBody::ChangeKey { target, new_key })
    }

    /// Finishes as an account purchase.
    pub fn purchase_account(
        self,
        account: AccountNumber,
        seller: AccountNumber,
        price: Amount,
        new_key: PublicKey,
    ) -> Transaction {
        self.finish(TransactionBody::PurchaseAccount {
            account,
            seller,
            price,
            new_key,
        })
    }

    fn finish(self, body: TransactionBody) -> Transaction {
        Transaction {
            signer: self.signer,
            sequence: self.sequence,
            account_key: self.account_key,
            fee: self.fee,
            body,
            signature: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
