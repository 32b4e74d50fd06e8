// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Signature verification for built transactions.
//!
//! [`verify_transaction`] is the last check before a frame leaves the
//! gateway. It hashes the transaction again from its current fields and
//! checks the attached signature against that fresh hash and the signer key
//! that was resolved from ledger state.

use thiserror::Error;

use super::builder::Transaction;
use super::types::AccountNumber;
use crate::crypto::hash::TxHash;
use crate::crypto::signatures::verify;

/// Reasons a transaction cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No signature has been attached.
    #[error("transaction is unsigned")]
    MissingSignature,

    /// The signature does not match the recomputed hash and signer key.
    #[error("signature does not verify against the key of account {signer}")]
    InvalidSignature { signer: AccountNumber },
}

/// Recomputes the hash of `tx` and checks its signature.
///
/// Returns the hash that was verified, which is the hash of exactly the
/// bytes that will be framed for submission.
pub fn verify_transaction(tx: &Transaction) -> Result<TxHash, VerificationError> {
    let signature = tx.signature().ok_or(VerificationError::MissingSignature)?;
    let hash = tx.hash();

    if !verify(&hash, signature, tx.account_key()) {
        return Err(VerificationError::InvalidSignature { signer: tx.signer() });
    }

    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{CurveType, Signature};
    use crate::crypto::signatures::{public_key_from_secret, sign_hash};
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::Amount;

    const SECRET: [u8; 32] = [0x42; 32];

    fn unsigned(amount: u64) -> Transaction {
        let key = public_key_from_secret(CurveType::Secp256k1, &SECRET).unwrap();
        TransactionBuilder::new(AccountNumber::new(1), key)
            .sequence(6)
            .fee(Amount::from_units(1))
            .transfer(AccountNumber::new(2), Amount::from_units(amount), Vec::new())
            .unwrap()
    }

    fn sign(tx: &Transaction) -> Signature {
        sign_hash(CurveType::Secp256k1, &SECRET, &tx.hash()).unwrap()
    }

    #[test]
    fn valid_signature_returns_hash() {
        let tx = unsigned(100_000);
        let expected = tx.hash();
        let sig = sign(&tx);
        assert_eq!(verify_transaction(&tx.with_signature(sig)), Ok(expected));
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        assert_eq!(
            verify_transaction(&unsigned(1)),
            Err(VerificationError::MissingSignature)
        );
    }

    #[test]
    fn mutated_amount_fails_verification() {
        let sig = sign(&unsigned(100_000));
        let tampered = unsigned(900_000).with_signature(sig);
        assert_eq!(
            verify_transaction(&tampered),
            Err(VerificationError::InvalidSignature {
                signer: AccountNumber::new(1)
            })
        );
    }

    #[test]
    fn signature_from_another_key_fails() {
        let tx = unsigned(5);
        let sig = sign_hash(CurveType::Secp256k1, &[0x43; 32], &tx.hash()).unwrap();
        assert!(verify_transaction(&tx.with_signature(sig)).is_err());
    }
}
