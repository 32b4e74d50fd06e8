// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Key and Signature Types
//!
//! The ledger node identifies keys by a curve id plus two affine
//! coordinates, and signatures by their raw `(R, S)` scalars. Both travel
//! as hex strings in client requests, often with leading zeros stripped,
//! so every component is left-padded to its fixed 32-byte width before it
//! is used.
//!
//! Client-supplied hex is kept in the `*Input` types until a builder
//! parses it. That way a malformed key surfaces as `InvalidPubKey` from
//! the protocol rather than as a JSON rejection from the transport.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{
    COORDINATE_LENGTH, CURVE_ID_SECP256K1, CURVE_ID_SECP256R1, SIGNATURE_COMPONENT_LENGTH,
};

/// Errors from parsing keys and signatures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("unknown curve id: {0}")]
    UnknownCurveId(u16),

    #[error("{field} is not a hex string of at most 64 digits")]
    InvalidHex { field: &'static str },

    #[error("public key is not a point on {0}")]
    NotOnCurve(CurveType),

    #[error("secret key is not a valid {0} scalar")]
    InvalidSecretKey(CurveType),

    #[error("signing failed: {0}")]
    SigningFailed(String),
}

// ---------------------------------------------------------------------------
// CurveType
// ---------------------------------------------------------------------------

/// Elliptic curves the ledger node accepts for account keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CurveType {
    Secp256k1,
    Secp256r1,
}

impl CurveType {
    /// The node's numeric curve identifier.
    pub fn id(self) -> u16 {
        match self {
            Self::Secp256k1 => CURVE_ID_SECP256K1,
            Self::Secp256r1 => CURVE_ID_SECP256R1,
        }
    }

    /// Looks up a curve by the node's numeric identifier.
    pub fn from_id(id: u16) -> Result<Self, KeyError> {
        match id {
            CURVE_ID_SECP256K1 => Ok(Self::Secp256k1),
            CURVE_ID_SECP256R1 => Ok(Self::Secp256r1),
            other => Err(KeyError::UnknownCurveId(other)),
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => write!(f, "secp256k1"),
            Self::Secp256r1 => write!(f, "secp256r1"),
        }
    }
}

impl FromStr for CurveType {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secp256k1" => Ok(Self::Secp256k1),
            "secp256r1" | "prime256v1" | "p256" | "p-256" => Ok(Self::Secp256r1),
            _ => Err(KeyError::UnsupportedCurve(s.to_string())),
        }
    }
}

impl TryFrom<String> for CurveType {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurveType> for String {
    fn from(curve: CurveType) -> Self {
        curve.to_string()
    }
}

// ---------------------------------------------------------------------------
// Fixed-width hex
// ---------------------------------------------------------------------------

/// Decodes up to 64 hex digits into a big-endian 32-byte array, left-padding
/// with zeros. Empty strings, odd garbage and over-long values are rejected.
fn parse_component(s: &str, field: &'static str) -> Result<[u8; 32], KeyError> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.len() > COORDINATE_LENGTH * 2 {
        return Err(KeyError::InvalidHex { field });
    }
    let padded = format!("{:0>64}", trimmed);
    let mut out = [0u8; COORDINATE_LENGTH];
    hex::decode_to_slice(&padded, &mut out).map_err(|_| KeyError::InvalidHex { field })?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// An account key as the ledger node stores it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    pub curve: CurveType,
    pub x: [u8; COORDINATE_LENGTH],
    pub y: [u8; COORDINATE_LENGTH],
}

impl PublicKey {
    pub fn new(curve: CurveType, x: [u8; 32], y: [u8; 32]) -> Self {
        Self { curve, x, y }
    }

    /// Parses hex coordinates, left-padding each to 32 bytes.
    pub fn from_hex(curve: CurveType, x: &str, y: &str) -> Result<Self, KeyError> {
        Ok(Self {
            curve,
            x: parse_component(x, "x")?,
            y: parse_component(y, "y")?,
        })
    }

    /// SEC1 uncompressed point: `0x04 || X || Y`.
    pub fn sec1_uncompressed(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = 0x04;
        out[1..33].copy_from_slice(&self.x);
        out[33..].copy_from_slice(&self.y);
        out
    }

    /// Builds a key from a SEC1 uncompressed point.
    pub fn from_sec1_uncompressed(curve: CurveType, point: &[u8]) -> Result<Self, KeyError> {
        if point.len() != 65 || point[0] != 0x04 {
            return Err(KeyError::NotOnCurve(curve));
        }
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&point[1..33]);
        y.copy_from_slice(&point[33..]);
        Ok(Self { curve, x, y })
    }

    /// Rejects coordinates that do not describe a point on the key's curve.
    pub fn validate(&self) -> Result<(), KeyError> {
        let sec1 = self.sec1_uncompressed();
        let on_curve = match self.curve {
            CurveType::Secp256k1 => k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).is_ok(),
            CurveType::Secp256r1 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1).is_ok(),
        };
        if on_curve {
            Ok(())
        } else {
            Err(KeyError::NotOnCurve(self.curve))
        }
    }

    pub fn x_hex(&self) -> String {
        hex::encode(self.x)
    }

    pub fn y_hex(&self) -> String {
        hex::encode(self.y)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}, {}, {})", self.curve, self.x_hex(), self.y_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PublicKeyInput::from(self).serialize(serializer)
    }
}

/// Public key as it appears in request and response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInput {
    pub curve_type: String,
    pub x: String,
    pub y: String,
}

impl PublicKeyInput {
    /// Parses and validates the key. The point must lie on the named curve.
    pub fn parse(&self) -> Result<PublicKey, KeyError> {
        let curve: CurveType = self.curve_type.parse()?;
        let key = PublicKey::from_hex(curve, &self.x, &self.y)?;
        key.validate()?;
        Ok(key)
    }
}

impl From<&PublicKey> for PublicKeyInput {
    fn from(key: &PublicKey) -> Self {
        Self {
            curve_type: key.curve.to_string(),
            x: key.x_hex(),
            y: key.y_hex(),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Raw ECDSA signature scalars, each big-endian and 32 bytes wide.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub r: [u8; SIGNATURE_COMPONENT_LENGTH],
    pub s: [u8; SIGNATURE_COMPONENT_LENGTH],
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Self { r, s }
    }

    /// Parses hex R and S, left-padding each to 32 bytes.
    pub fn from_hex(r: &str, s: &str) -> Result<Self, KeyError> {
        Ok(Self {
            r: parse_component(r, "r")?,
            s: parse_component(s, "s")?,
        })
    }

    /// `R || S`, the layout both the wire frame and the ECDSA crates use.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(r={}, s={})", hex::encode(self.r), hex::encode(self.s))
    }
}

/// Signature as it appears in a commit request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInput {
    pub r: String,
    pub s: String,
}

impl SignatureInput {
    pub fn parse(&self) -> Result<Signature, KeyError> {
        Signature::from_hex(&self.r, &self.s)
    }
}

impl From<&Signature> for SignatureInput {
    fn from(sig: &Signature) -> Self {
        Self {
            r: hex::encode(sig.r),
            s: hex::encode(sig.s),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // Generator point of secp256k1.
    const K1_GX: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const K1_GY: &str = "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";

    #[test]
    fn curve_names_are_case_insensitive() {
        assert_eq!("SECP256K1".parse::<CurveType>().unwrap(), CurveType::Secp256k1);
        assert_eq!("prime256v1".parse::<CurveType>().unwrap(), CurveType::Secp256r1);
        assert!("secp384k1".parse::<CurveType>().is_err());
    }

    #[test]
    fn curve_ids_roundtrip() {
        for curve in [CurveType::Secp256k1, CurveType::Secp256r1] {
            assert_eq!(CurveType::from_id(curve.id()).unwrap(), curve);
        }
        assert_eq!(CurveType::from_id(1), Err(KeyError::UnknownCurveId(1)));
    }

    #[test]
    fn short_coordinates_are_left_padded() {
        let key = PublicKey::from_hex(CurveType::Secp256k1, "ab", "1").unwrap();
        let mut x = [0u8; 32];
        x[31] = 0xab;
        let mut y = [0u8; 32];
        y[31] = 0x01;
        assert_eq!(key.x, x);
        assert_eq!(key.y, y);
    }

    #[test]
    fn overlong_coordinate_is_rejected() {
        let long = "0".repeat(66);
        assert_eq!(
            PublicKey::from_hex(CurveType::Secp256k1, &long, "1"),
            Err(KeyError::InvalidHex { field: "x" })
        );
    }

    #[test]
    fn non_hex_coordinate_is_rejected() {
        assert!(PublicKey::from_hex(CurveType::Secp256k1, "zz", "1").is_err());
        assert!(PublicKey::from_hex(CurveType::Secp256k1, "", "1").is_err());
    }

    #[test]
    fn generator_point_validates() {
        let key = PublicKey::from_hex(CurveType::Secp256k1, K1_GX, K1_GY).unwrap();
        assert!(key.validate().is_ok());
    }

    #[test]
    fn off_curve_point_fails_validation() {
        let key = PublicKey::from_hex(CurveType::Secp256k1, K1_GX, "01").unwrap();
        assert_eq!(key.validate(), Err(KeyError::NotOnCurve(CurveType::Secp256k1)));
    }

    #[test]
    fn key_input_parse_validates() {
        let input = PublicKeyInput {
            curve_type: "secp256k1".into(),
            x: K1_GX.into(),
            y: K1_GY.into(),
        };
        let key = input.parse().unwrap();
        assert_eq!(PublicKeyInput::from(&key), input);
    }

    #[test]
    fn signature_bytes_are_r_then_s() {
        let sig = Signature::from_hex("01", "02").unwrap();
        let bytes = sig.to_bytes();
        assert_eq!(bytes[31], 0x01);
        assert_eq!(bytes[63], 0x02);
        assert_eq!(Signature::from_bytes(&bytes), sig);
    }
}
