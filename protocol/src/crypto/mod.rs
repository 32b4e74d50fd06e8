// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Cryptographic Primitives
//!
//! Everything the gateway needs to check that a client really signed the
//! operation it is about to submit:
//!
//! - **SHA-256** for the transaction hash, the value clients sign.
//! - **ECDSA** over secp256k1 and secp256r1 for account keys.
//!
//! Nothing here is hand-rolled. Curve arithmetic comes from the RustCrypto
//! `k256` and `p256` crates; this module only fixes the byte layouts the
//! ledger node expects.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{sha256_array, TxHash};
pub use keys::{CurveType, KeyError, PublicKey, PublicKeyInput, Signature, SignatureInput};
pub use signatures::{generate_secret, public_key_from_secret, sign_hash, verify};
