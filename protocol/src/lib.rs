// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MicroCoin Protocol - Core Library
//!
//! Everything a gateway needs to turn a client's request into a signed
//! operation the MicroCoin ledger will accept, without ever holding a
//! private key.
//!
//! The gateway is a thin, stateless layer. The ledger node owns account
//! state and is the only arbiter of what gets applied. This crate makes
//! sure that what reaches the node is exactly what the client signed.
//!
//! ## Architecture
//!
//! - **crypto**: SHA-256 hashes, secp256k1/secp256r1 keys and ECDSA
//!   verification.
//! - **transaction**: canonical encoding, builders, and the
//!   start → sign → commit orchestrator.
//! - **ledger**: the [`ledger::LedgerNode`] seam, a JSON-RPC client and an
//!   in-memory ledger.
//! - **query**: read-only account and operation lookups.
//! - **error**: the error taxonomy shared with the node.
//! - **config**: protocol constants.
//!
//! ## Design Philosophy
//!
//! 1. The signer's key and sequence number come from the ledger, never
//!    from the request.
//! 2. The hash is recomputed right before verification. A signature only
//!    counts for the fields that are about to be submitted.
//! 3. Money is fixed-point. Decimal input is converted once, at the edge.

pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod query;
pub mod transaction;

pub use error::{ApiError, ErrorCode, ProtocolError};
