// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Start / Commit Orchestration
//!
//! The two externally visible steps of every ledger-mutating operation.
//!
//! ```text
//!  start:   request ──build──▶ Built ──hash──▶ HashReady          (no submission)
//!  commit:  request ──build──▶ Built ──attach sig──▶ Signed
//!                     ──recompute hash + verify──▶ Submitted ──▶ Confirmed | Rejected
//! ```
//!
//! Nothing is kept between the two calls. `commit` rebuilds the transaction
//! from current ledger state and verifies the signature against the hash of
//! exactly those fields, so a signature over stale or altered fields never
//! reaches the node.
//!
//! ## Outcomes
//!
//! - Local failures before signing (bad account, key, amount) are `Err`.
//! - A signature that does not verify is `Rejected` with `InvalidSignature`,
//!   and the node is not contacted.
//! - A node-reported error, including a stale sequence number lost to a
//!   concurrent commit, is `Rejected` with the node's text verbatim.

use tracing::{debug, info, warn};

use super::builder::Transaction;
use super::request::OperationRequest;
use super::verification::verify_transaction;
use crate::crypto::hash::TxHash;
use crate::crypto::keys::SignatureInput;
use crate::error::{ApiError, ErrorCode, ProtocolError};
use crate::ledger::{LedgerNode, OperationResult};

/// Result of the `start` step.
#[derive(Debug, Clone)]
pub struct Started {
    pub transaction: Transaction,
    /// The value the client must sign.
    pub hash: TxHash,
}

/// Accepted by the node.
#[derive(Debug, Clone)]
pub struct Confirmed {
    pub transaction: Transaction,
    pub hash: TxHash,
    pub result: OperationResult,
}

/// Terminal state of the `commit` step.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Confirmed(Confirmed),
    Rejected(ApiError),
}

impl CommitOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// Builds the transaction and returns its hash. Never submits.
pub async fn start(
    node: &dyn LedgerNode,
    request: &OperationRequest,
) -> Result<Started, ProtocolError> {
    let transaction = request.build(node).await?;
    let hash = transaction.hash();
    debug!(
        signer = %transaction.signer(),
        sequence = transaction.sequence(),
        op_type = %transaction.op_type(),
        hash = %hash,
        "operation hash ready"
    );
    Ok(Started { transaction, hash })
}

/// Rebuilds, verifies and submits a signed operation.
///
/// `client_hash` is the hash the client signed, if it sent one back. It is
/// only used to explain a rejection; verification always runs against the
/// freshly computed hash.
pub async fn commit(
    node: &dyn LedgerNode,
    request: &OperationRequest,
    client_hash: Option<TxHash>,
    signature: Option<&SignatureInput>,
) -> Result<CommitOutcome, ProtocolError> {
    let signature = signature.ok_or(ProtocolError::MissingSignature)?;
    let transaction = request.build(node).await?;
    let hash = transaction.hash();
    debug!(
        signer = %transaction.signer(),
        sequence = transaction.sequence(),
        op_type = %transaction.op_type(),
        hash = %hash,
        "operation rebuilt for commit"
    );

    let stale = client_hash.is_some_and(|h| h != hash);
    let signature = match signature.parse() {
        Ok(sig) => sig,
        Err(e) => {
            debug!(error = %e, "signature is not well formed");
            return Ok(reject(&transaction, &hash, signature_rejection(stale)));
        }
    };

    let transaction = transaction.with_signature(signature);
    if verify_transaction(&transaction).is_err() {
        return Ok(reject(&transaction, &hash, signature_rejection(stale)));
    }
    debug!(
        signer = %transaction.signer(),
        sequence = transaction.sequence(),
        op_type = %transaction.op_type(),
        hash = %hash,
        "signature verified, submitting"
    );

    let frame = transaction.wire_bytes();
    let results = match node.execute_operations(&frame).await {
        Ok(results) => results,
        Err(e) => return Ok(reject(&transaction, &hash, ApiError::from(ProtocolError::Node(e)))),
    };

    let Some(result) = results.into_iter().next() else {
        let err = ApiError::new(
            ErrorCode::InternalError,
            "node returned no operation result",
            ApiError::from_code(ErrorCode::InternalError).help,
        );
        return Ok(reject(&transaction, &hash, err));
    };

    if let Some(reason) = result.errors.clone() {
        let help = ApiError::from_code(ErrorCode::InvalidOperation).help;
        return Ok(reject(
            &transaction,
            &hash,
            ApiError::new(ErrorCode::InvalidOperation, reason, help),
        ));
    }

    info!(
        signer = %transaction.signer(),
        sequence = transaction.sequence(),
        op_type = %transaction.op_type(),
        hash = %hash,
        ophash = %result.ophash,
        "operation confirmed"
    );
    Ok(CommitOutcome::Confirmed(Confirmed {
        transaction,
        hash,
        result,
    }))
}

fn signature_rejection(stale: bool) -> ApiError {
    let mut err = ApiError::from_code(ErrorCode::InvalidSignature);
    if stale {
        err.help = "The transaction changed since it was started, or the account's operation \
                    number moved on after an earlier commit. Re-sending a committed operation \
                    needs a fresh start: start it again and sign the new hash"
            .to_string();
    }
    err
}

fn reject(transaction: &Transaction, hash: &TxHash, err: ApiError) -> CommitOutcome {
    warn!(
        signer = %transaction.signer(),
        sequence = transaction.sequence(),
        op_type = %transaction.op_type(),
        hash = %hash,
        code = %err.error_code,
        reason = %err.message,
        "operation rejected"
    );
    CommitOutcome::Rejected(err)
}
