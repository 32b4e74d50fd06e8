// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Protocol Configuration & Constants
//!
//! Every magic number the gateway shares with the ledger node lives here.
//! These values are dictated by the node's wire format, so changing any of
//! them means every operation we frame will be rejected upstream.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Fixed-point money
// ---------------------------------------------------------------------------

/// Number of decimal places in a coin amount.
pub const AMOUNT_DECIMALS: u32 = 4;

/// Multiplier from coin amounts to the ledger's integer unit.
/// `1.0000` coins == `10_000` units.
pub const AMOUNT_SCALE: u64 = 10_000;

// ---------------------------------------------------------------------------
// Wire frame
// ---------------------------------------------------------------------------

/// First word of every submitted frame.
pub const OPERATION_FRAME_VERSION: u32 = 1;

/// Operation type code for a coin transfer.
pub const OP_TYPE_TRANSFER: u32 = 1;

/// Operation type code for buying an account listed for sale.
pub const OP_TYPE_PURCHASE_ACCOUNT: u32 = 6;

/// Operation type code for a signed change of the owner key.
pub const OP_TYPE_CHANGE_KEY: u32 = 7;

/// Size of the frame header: version word + type code, both u32.
pub const FRAME_HEADER_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Width of an encoded public key coordinate (big-endian, left-padded).
pub const COORDINATE_LENGTH: usize = 32;

/// Width of each ECDSA signature component (R and S).
pub const SIGNATURE_COMPONENT_LENGTH: usize = 32;

/// Digest length of the transaction hash (SHA-256).
pub const HASH_LENGTH: usize = 32;

/// Node curve identifier for secp256k1.
pub const CURVE_ID_SECP256K1: u16 = 714;

/// Node curve identifier for secp256r1 (prime256v1).
pub const CURVE_ID_SECP256R1: u16 = 415;

// ---------------------------------------------------------------------------
// Operation limits
// ---------------------------------------------------------------------------

/// Largest opaque payload the node accepts on a transfer.
pub const MAX_PAYLOAD_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Networking defaults
// ---------------------------------------------------------------------------

/// JSON-RPC endpoint of a locally running ledger node.
pub const DEFAULT_NODE_RPC_URL: &str = "http://127.0.0.1:4003";

/// Port the gateway serves its REST/WebSocket API on.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Port the gateway serves Prometheus metrics on.
pub const DEFAULT_METRICS_PORT: u16 = 9742;

/// Upper bound on a single ledger node RPC round trip.
pub const NODE_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest JSON-RPC response body we are willing to buffer.
pub const NODE_RPC_PAYLOAD_LIMIT: usize = 16 * 1024 * 1024;

/// Protocol version string reported by the gateway.
pub const PROTOCOL_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_matches_decimals() {
        assert_eq!(AMOUNT_SCALE, 10u64.pow(AMOUNT_DECIMALS));
    }

    #[test]
    fn op_type_codes_are_distinct() {
        let codes = [OP_TYPE_TRANSFER, OP_TYPE_PURCHASE_ACCOUNT, OP_TYPE_CHANGE_KEY];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
