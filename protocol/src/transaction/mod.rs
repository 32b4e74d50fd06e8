// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Transaction Module
//!
//! Construction, canonical encoding, verification and commit of MicroCoin
//! ledger operations. Every coin transfer, key change and account purchase
//! is represented as a [`Transaction`].
//!
//! ## Architecture
//!
//! ```text
//! types.rs        - AccountNumber, Amount, OperationType
//! builder.rs      - Fluent TransactionBuilder for unsigned transactions
//! encoding.rs     - Signable bytes, wire frames and frame decoding
//! verification.rs - Signature check against the recomputed hash
//! request.rs      - Client requests and ledger-state resolution
//! commit.rs       - The start → sign → commit orchestrator
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Start**: [`start`] builds the transaction from current account state
//!    and returns its hash. Nothing is submitted.
//! 2. **Sign**: the client signs the hash with the account's private key,
//!    outside the gateway.
//! 3. **Commit**: [`commit`] rebuilds, runs [`verify_transaction`] and
//!    submits the wire frame to the ledger node.
//!
//! ## Design Decisions
//!
//! - The hash is SHA-256 of the signable encoding and is never stored; it
//!   is derived from the fields whenever it is needed.
//! - All amounts are `u64` units of 1/10 000 coin. Decimal input is
//!   truncated to four places exactly once, at the request boundary.
//! - The signer's key, sequence number and purchase price always come from
//!   the ledger, never from the client.

pub mod builder;
pub mod commit;
pub mod encoding;
pub mod request;
pub mod types;
pub mod verification;

pub use builder::{BuildError, Transaction, TransactionBody, TransactionBuilder};
pub use commit::{commit, start, CommitOutcome, Confirmed, Started};
pub use encoding::{decode_frame, DecodedFrame, EncodingError};
pub use request::{
    ChangeKeyRequest, OperationRequest, PurchaseAccountRequest, Signed, TransferRequest,
};
pub use types::{AccountNumber, Amount, OperationType, ValueError};
pub use verification::{verify_transaction, VerificationError};
