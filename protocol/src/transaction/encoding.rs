// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! Canonical byte encoding of operations.
//!
//! Two layouts share one field serializer:
//!
//! ```text
//! signable  = signer:u32 sequence:u32 <variant fields>
//! wire      = version:u32 type:u32 signable [R:32 S:32]
//! ```
//!
//! Integers are little-endian at their natural width. Keys are
//! `curve:u16 X:32 Y:32` with big-endian coordinates. The transfer payload
//! is `len:u16` followed by the bytes. Variant field order:
//!
//! ```text
//! Transfer         target:u32 amount:u64 fee:u64 payload signer_key
//! ChangeKey        target:u32 fee:u64 signer_key new_key
//! PurchaseAccount  account:u32 price:u64 fee:u64 seller:u32 signer_key new_key
//! ```
//!
//! Encoding cannot fail: the builder already rejected anything that would
//! not fit. Decoding is provided for the in-memory ledger and for tests.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

use super::builder::{Transaction, TransactionBody};
use super::types::{AccountNumber, Amount, OperationType};
use crate::config::{FRAME_HEADER_LENGTH, OPERATION_FRAME_VERSION};
use crate::crypto::keys::{CurveType, KeyError, PublicKey, Signature};

/// Errors from decoding a wire frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("frame truncated: needed {needed} more bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown operation type code {0}")]
    UnknownOperationType(u32),

    #[error("invalid key in frame: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("{0} unexpected bytes after the operation")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Canonical bytes covered by the signature.
pub fn signable_bytes(tx: &Transaction) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(256);
    put_signable(&mut buf, tx);
    buf.to_vec()
}

/// Header, signable bytes and, when present, `R || S`.
pub fn wire_frame(tx: &Transaction) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LENGTH + 320);
    buf.put_u32_le(OPERATION_FRAME_VERSION);
    buf.put_u32_le(tx.op_type().code());
    put_signable(&mut buf, tx);
    if let Some(sig) = tx.signature() {
        buf.put_slice(&sig.r);
        buf.put_slice(&sig.s);
    }
    buf.to_vec()
}

fn put_signable(buf: &mut BytesMut, tx: &Transaction) {
    buf.put_u32_le(tx.signer().number());
    buf.put_u32_le(tx.sequence());

    match tx.body() {
        TransactionBody::Transfer {
            target,
            amount,
            payload,
        } => {
            buf.put_u32_le(target.number());
            buf.put_u64_le(amount.units());
            buf.put_u64_le(tx.fee().units());
            // Builder caps the payload well below u16::MAX.
            buf.put_u16_le(payload.len() as u16);
            buf.put_slice(payload);
            put_key(buf, tx.account_key());
        }
        TransactionBody::ChangeKey { target, new_key } => {
            buf.put_u32_le(target.number());
            buf.put_u64_le(tx.fee().units());
            put_key(buf, tx.account_key());
            put_key(buf, new_key);
        }
        TransactionBody::PurchaseAccount {
            account,
            seller,
            price,
            new_key,
        } => {
            buf.put_u32_le(account.number());
            buf.put_u64_le(price.units());
            buf.put_u64_le(tx.fee().units());
            buf.put_u32_le(seller.number());
            put_key(buf, tx.account_key());
            put_key(buf, new_key);
        }
    }
}

fn put_key(buf: &mut BytesMut, key: &PublicKey) {
    buf.put_u16_le(key.curve.id());
    buf.put_slice(&key.x);
    buf.put_slice(&key.y);
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A wire frame split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub version: u32,
    pub op_type: OperationType,
    pub transaction: Transaction,
}

/// Parses a wire frame. Checksums are not part of the frame, so decoded
/// account numbers carry none.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedFrame, EncodingError> {
    let mut r = Reader(frame);

    let version = r.u32()?;
    if version != OPERATION_FRAME_VERSION {
        return Err(EncodingError::UnsupportedVersion(version));
    }
    let code = r.u32()?;
    let op_type = OperationType::from_code(code).ok_or(EncodingError::UnknownOperationType(code))?;

    let signer = r.account()?;
    let sequence = r.u32()?;

    let (account_key, fee, body) = match op_type {
        OperationType::Transfer => {
            let target = r.account()?;
            let amount = r.amount()?;
            let fee = r.amount()?;
            let len = r.u16()? as usize;
            let payload = r.take(len)?.to_vec();
            let key = r.key()?;
            (
                key,
                fee,
                TransactionBody::Transfer {
                    target,
                    amount,
                    payload,
                },
            )
        }
        OperationType::ChangeKey => {
            let target = r.account()?;
            let fee = r.amount()?;
            let key = r.key()?;
            let new_key = r.key()?;
            (key, fee, TransactionBody::ChangeKey { target, new_key })
        }
        OperationType::PurchaseAccount => {
            let account = r.account()?;
            let price = r.amount()?;
            let fee = r.amount()?;
            let seller = r.account()?;
            let key = r.key()?;
            let new_key = r.key()?;
            (
                key,
                fee,
                TransactionBody::PurchaseAccount {
                    account,
                    seller,
                    price,
                    new_key,
                },
            )
        }
    };

    let signature = match r.0.remaining() {
        0 => None,
        64 => {
            let mut raw = [0u8; 64];
            r.0.copy_to_slice(&mut raw);
            Some(Signature::from_bytes(&raw))
        }
        n => return Err(EncodingError::TrailingBytes(n)),
    };

    Ok(DecodedFrame {
        version,
        op_type,
        transaction: Transaction::from_parts(signer, sequence, account_key, fee, body, signature),
    })
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn need(&self, n: usize) -> Result<(), EncodingError> {
        if self.0.remaining() < n {
            return Err(EncodingError::Truncated {
                needed: n,
                remaining: self.0.remaining(),
            });
        }
        Ok(())
    }

    fn u16(&mut self) -> Result<u16, EncodingError> {
        self.need(2)?;
        Ok(self.0.get_u16_le())
    }

    fn u32(&mut self) -> Result<u32, EncodingError> {
        self.need(4)?;
        Ok(self.0.get_u32_le())
    }

    fn u64(&mut self) -> Result<u64, EncodingError> {
        self.need(8)?;
        Ok(self.0.get_u64_le())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EncodingError> {
        self.need(n)?;
        let data: &'a [u8] = self.0;
        let (head, tail) = data.split_at(n);
        self.0 = tail;
        Ok(head)
    }

    fn account(&mut self) -> Result<AccountNumber, EncodingError> {
        self.u32().map(AccountNumber::new)
    }

    fn amount(&mut self) -> Result<Amount, EncodingError> {
        self.u64().map(Amount::from_units)
    }

    fn key(&mut self) -> Result<PublicKey, EncodingError> {
        let curve = CurveType::from_id(self.u16()?)?;
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(self.take(32)?);
        y.copy_from_slice(self.take(32)?);
        Ok(PublicKey::new(curve, x, y))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signatures::public_key_from_secret;
    use crate::transaction::builder::TransactionBuilder;

    fn key(byte: u8) -> PublicKey {
        public_key_from_secret(CurveType::Secp256k1, &[byte; 32]).unwrap()
    }

    fn transfer(payload: &[u8]) -> Transaction {
        TransactionBuilder::new(AccountNumber::new(1), key(1))
            .sequence(6)
            .fee(Amount::from_units(1))
            .transfer(AccountNumber::new(2), Amount::from_units(100_000), payload.to_vec())
            .unwrap()
    }

    #[test]
    fn transfer_layout_is_fixed() {
        let tx = transfer(b"hi");
        let bytes = signable_bytes(&tx);

        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &6u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..20], &100_000u64.to_le_bytes());
        assert_eq!(&bytes[20..28], &1u64.to_le_bytes());
        assert_eq!(&bytes[28..30], &2u16.to_le_bytes());
        assert_eq!(&bytes[30..32], b"hi");
        assert_eq!(&bytes[32..34], &714u16.to_le_bytes());
        assert_eq!(&bytes[34..66], &tx.account_key().x);
        assert_eq!(&bytes[66..98], &tx.account_key().y);
        assert_eq!(bytes.len(), 98);
    }

    #[test]
    fn wire_frame_has_header_then_signable() {
        let tx = transfer(b"");
        let frame = wire_frame(&tx);
        assert_eq!(&frame[0..4], &1u32.to_le_bytes());
        assert_eq!(&frame[4..8], &1u32.to_le_bytes());
        assert_eq!(&frame[8..], signable_bytes(&tx).as_slice());
    }

    #[test]
    fn signed_frame_ends_with_r_and_s() {
        let sig = Signature::new([0xAA; 32], [0xBB; 32]);
        let tx = transfer(b"").with_signature(sig);
        let frame = wire_frame(&tx);
        let tail = &frame[frame.len() - 64..];
        assert_eq!(&tail[..32], &[0xAA; 32]);
        assert_eq!(&tail[32..], &[0xBB; 32]);
    }

    #[test]
    fn header_codes_follow_operation_type() {
        let change = TransactionBuilder::new(AccountNumber::new(1), key(1))
            .change_key(AccountNumber::new(1), key(2));
        let purchase = TransactionBuilder::new(AccountNumber::new(1), key(1)).purchase_account(
            AccountNumber::new(8),
            AccountNumber::new(3),
            Amount::from_units(7),
            key(2),
        );
        assert_eq!(&wire_frame(&change)[4..8], &7u32.to_le_bytes());
        assert_eq!(&wire_frame(&purchase)[4..8], &6u32.to_le_bytes());
    }

    #[test]
    fn decode_recovers_every_variant() {
        let txs = vec![
            transfer(b"payload bytes"),
            TransactionBuilder::new(AccountNumber::new(4), key(1))
                .sequence(2)
                .fee(Amount::from_units(3))
                .change_key(AccountNumber::new(4), key(2)),
            TransactionBuilder::new(AccountNumber::new(9), key(3))
                .sequence(11)
                .purchase_account(
                    AccountNumber::new(8),
                    AccountNumber::new(3),
                    Amount::from_units(50_000),
                    key(4),
                ),
        ];

        for tx in txs {
            let decoded = decode_frame(&wire_frame(&tx)).unwrap();
            assert_eq!(decoded.version, OPERATION_FRAME_VERSION);
            assert_eq!(decoded.op_type, tx.op_type());
            assert_eq!(decoded.transaction, tx);
            assert_eq!(decoded.transaction.hash(), tx.hash());
        }
    }

    #[test]
    fn decode_keeps_signature() {
        let sig = Signature::new([1; 32], [2; 32]);
        let tx = transfer(b"x").with_signature(sig);
        let decoded = decode_frame(&wire_frame(&tx)).unwrap();
        assert_eq!(decoded.transaction.signature(), Some(&sig));
    }

    #[test]
    fn decode_rejects_bad_frames() {
        let frame = wire_frame(&transfer(b""));

        assert!(matches!(
            decode_frame(&frame[..frame.len() - 1]),
            Err(EncodingError::Truncated { .. })
        ));

        let mut extra = frame.clone();
        extra.push(0);
        assert_eq!(decode_frame(&extra), Err(EncodingError::TrailingBytes(1)));

        let mut bad_type = frame.clone();
        bad_type[4] = 2;
        assert_eq!(
            decode_frame(&bad_type),
            Err(EncodingError::UnknownOperationType(2))
        );

        let mut bad_version = frame;
        bad_version[0] = 9;
        assert_eq!(
            decode_frame(&bad_version),
            Err(EncodingError::UnsupportedVersion(9))
        );
    }
}
