// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # ECDSA Signatures
//!
//! Verification of client signatures over a [`TxHash`], plus a signing
//! helper for wallets and tests.
//!
//! The hash is already a digest, so both directions use the prehash APIs
//! of `k256` and `p256`. Nothing is hashed a second time.
//!
//! ## Failure mode
//!
//! [`verify`] answers yes or no. A signature whose scalars are zero or out
//! of range, or a key that is not on its curve, is simply "no". The caller
//! maps that to an authentication failure without learning why.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::rngs::OsRng;

use super::hash::TxHash;
use super::keys::{CurveType, KeyError, PublicKey, Signature};

/// Verify `signature` over `hash` with `key`.
///
/// High-S signatures are normalised first, so either form of a valid
/// signature is accepted.
pub fn verify(hash: &TxHash, signature: &Signature, key: &PublicKey) -> bool {
    let sec1 = key.sec1_uncompressed();
    let raw = signature.to_bytes();

    match key.curve {
        CurveType::Secp256k1 => {
            use k256::ecdsa::{Signature as K1Signature, VerifyingKey};
            let Ok(vk) = VerifyingKey::from_sec1_bytes(&sec1) else {
                return false;
            };
            let Ok(sig) = K1Signature::from_slice(&raw) else {
                return false;
            };
            let sig = sig.normalize_s().unwrap_or(sig);
            vk.verify_prehash(hash.as_bytes(), &sig).is_ok()
        }
        CurveType::Secp256r1 => {
            use p256::ecdsa::{Signature as R1Signature, VerifyingKey};
            let Ok(vk) = VerifyingKey::from_sec1_bytes(&sec1) else {
                return false;
            };
            let Ok(sig) = R1Signature::from_slice(&raw) else {
                return false;
            };
            let sig = sig.normalize_s().unwrap_or(sig);
            vk.verify_prehash(hash.as_bytes(), &sig).is_ok()
        }
    }
}

/// Sign `hash` with a raw 32-byte secret scalar.
///
/// The gateway itself never holds private keys. This exists for wallets
/// built on the protocol crate and for tests.
pub fn sign_hash(curve: CurveType, secret: &[u8], hash: &TxHash) -> Result<Signature, KeyError> {
    let bytes: Vec<u8> = match curve {
        CurveType::Secp256k1 => {
            let key = k256::ecdsa::SigningKey::from_slice(secret)
                .map_err(|_| KeyError::InvalidSecretKey(curve))?;
            let sig: k256::ecdsa::Signature = key
                .sign_prehash(hash.as_bytes())
                .map_err(|e| KeyError::SigningFailed(e.to_string()))?;
            sig.to_bytes().to_vec()
        }
        CurveType::Secp256r1 => {
            let key = p256::ecdsa::SigningKey::from_slice(secret)
                .map_err(|_| KeyError::InvalidSecretKey(curve))?;
            let sig: p256::ecdsa::Signature = key
                .sign_prehash(hash.as_bytes())
                .map_err(|e| KeyError::SigningFailed(e.to_string()))?;
            sig.to_bytes().to_vec()
        }
    };

    let mut raw = [0u8; 64];
    raw.copy_from_slice(&bytes);
    Ok(Signature::from_bytes(&raw))
}

/// Derive the public key for a raw secret scalar.
pub fn public_key_from_secret(curve: CurveType, secret: &[u8]) -> Result<PublicKey, KeyError> {
    match curve {
        CurveType::Secp256k1 => {
            let key = k256::ecdsa::SigningKey::from_slice(secret)
                .map_err(|_| KeyError::InvalidSecretKey(curve))?;
            let point = key.verifying_key().to_encoded_point(false);
            PublicKey::from_sec1_uncompressed(curve, point.as_bytes())
        }
        CurveType::Secp256r1 => {
            let key = p256::ecdsa::SigningKey::from_slice(secret)
                .map_err(|_| KeyError::InvalidSecretKey(curve))?;
            let point = key.verifying_key().to_encoded_point(false);
            PublicKey::from_sec1_uncompressed(curve, point.as_bytes())
        }
    }
}

/// Generate a fresh secret scalar from the OS RNG.
pub fn generate_secret(curve: CurveType) -> [u8; 32] {
    let bytes = match curve {
        CurveType::Secp256k1 => k256::ecdsa::SigningKey::random(&mut OsRng).to_bytes(),
        CurveType::Secp256r1 => p256::ecdsa::SigningKey::random(&mut OsRng).to_bytes(),
    };
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair(curve: CurveType) -> ([u8; 32], PublicKey) {
        let secret = generate_secret(curve);
        let public = public_key_from_secret(curve, &secret).unwrap();
        (secret, public)
    }

    #[test]
    fn sign_then_verify_on_both_curves() {
        for curve in [CurveType::Secp256k1, CurveType::Secp256r1] {
            let (secret, public) = keypair(curve);
            let hash = TxHash::digest(b"transfer 10 coins");
            let sig = sign_hash(curve, &secret, &hash).unwrap();
            assert!(verify(&hash, &sig, &public), "{curve} roundtrip failed");
        }
    }

    #[test]
    fn flipped_signature_byte_fails() {
        let (secret, public) = keypair(CurveType::Secp256k1);
        let hash = TxHash::digest(b"payload");
        let sig = sign_hash(CurveType::Secp256k1, &secret, &hash).unwrap();

        for index in [0usize, 31, 32, 63] {
            let mut raw = sig.to_bytes();
            raw[index] ^= 0x01;
            assert!(!verify(&hash, &Signature::from_bytes(&raw), &public));
        }
    }

    #[test]
    fn flipped_hash_byte_fails() {
        let (secret, public) = keypair(CurveType::Secp256r1);
        let hash = TxHash::digest(b"payload");
        let sig = sign_hash(CurveType::Secp256r1, &secret, &hash).unwrap();

        let mut bytes = *hash.as_bytes();
        bytes[7] ^= 0x80;
        assert!(!verify(&TxHash::from_bytes(bytes), &sig, &public));
    }

    #[test]
    fn wrong_key_fails() {
        let (secret, _) = keypair(CurveType::Secp256k1);
        let (_, other) = keypair(CurveType::Secp256k1);
        let hash = TxHash::digest(b"payload");
        let sig = sign_hash(CurveType::Secp256k1, &secret, &hash).unwrap();
        assert!(!verify(&hash, &sig, &other));
    }

    #[test]
    fn zero_signature_is_false_not_panic() {
        let (_, public) = keypair(CurveType::Secp256k1);
        let hash = TxHash::digest(b"payload");
        let sig = Signature::new([0u8; 32], [0u8; 32]);
        assert!(!verify(&hash, &sig, &public));
    }

    #[test]
    fn off_curve_key_is_false_not_panic() {
        let (secret, public) = keypair(CurveType::Secp256k1);
        let hash = TxHash::digest(b"payload");
        let sig = sign_hash(CurveType::Secp256k1, &secret, &hash).unwrap();
        let mut broken = public;
        broken.y[31] ^= 0x01;
        assert!(!verify(&hash, &sig, &broken));
    }

    #[test]
    fn high_s_form_is_accepted() {
        use k256::elliptic_curve::ff::PrimeField;

        let (secret, public) = keypair(CurveType::Secp256k1);
        let hash = TxHash::digest(b"malleable");
        let sig = sign_hash(CurveType::Secp256k1, &secret, &hash).unwrap();

        let s = k256::Scalar::from_repr(k256::FieldBytes::clone_from_slice(&sig.s)).unwrap();
        let mut high_s = [0u8; 32];
        high_s.copy_from_slice(&(-s).to_repr());
        let high = Signature::new(sig.r, high_s);
        assert!(verify(&hash, &high, &public));
    }

    #[test]
    fn invalid_secret_is_rejected() {
        let hash = TxHash::digest(b"x");
        assert_eq!(
            sign_hash(CurveType::Secp256k1, &[0u8; 32], &hash),
            Err(KeyError::InvalidSecretKey(CurveType::Secp256k1))
        );
    }
}
