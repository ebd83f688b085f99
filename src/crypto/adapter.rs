//! Crypto Primitives Adapter (SPEC_FULL.md §4.7).
//!
//! Thin, stateless wrappers around RustCrypto-ecosystem crates. No engine
//! keeps a `PrivateKey`/`PublicKey` beyond the call that borrowed it.

use crate::crypto::keys::{DigestAlg, PrivateKey, PublicKey};
use crate::error::CoreError;
use ed25519_dalek::Signature as Ed25519Signature;
use p256::ecdsa::Signature as P256Signature;
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use sha2::{Digest as _, Sha256};
use sha3::Sha3_256;
use signature::{Signer, Verifier};

/// Compute a digest over `data` using the requested hash family.
pub fn digest(alg: DigestAlg, data: &[u8]) -> Vec<u8> {
    match alg {
        DigestAlg::Sha256 => Sha256::digest(data).to_vec(),
        DigestAlg::Sha3_256 => Sha3_256::digest(data).to_vec(),
    }
}

/// Sign `data` with `key`, returning raw signature bytes (no ASN.1/DER
/// wrapping — fixed-width `r||s` for ECDSA, raw 64 bytes for Ed25519, the
/// modulus-sized PKCS#1v1.5 block for RSA).
pub fn sign(key: &PrivateKey, data: &[u8]) -> Result<Vec<u8>, CoreError> {
    match key {
        PrivateKey::Rsa(sk) => {
            let signing_key = RsaSigningKey::<Sha256>::new((**sk).clone());
            let sig = signing_key
                .try_sign(data)
                .map_err(|e| CoreError::CryptoFailure(format!("RSA signing failed: {e}")))?;
            Ok(sig.to_vec())
        }
        PrivateKey::EcdsaP256(sk) => {
            let sig: P256Signature = sk
                .try_sign(data)
                .map_err(|e| CoreError::CryptoFailure(format!("ECDSA signing failed: {e}")))?;
            Ok(sig.to_bytes().to_vec())
        }
        PrivateKey::Ed25519(sk) => {
            let sig: Ed25519Signature = sk.sign(data);
            Ok(sig.to_bytes().to_vec())
        }
    }
}

/// Verify `signature_bytes` over `data` with `key`. Returns `false` on any
/// malformed-signature or mismatch condition — callers needing the reason
/// should prefer the engine-level `try_verify` functions, which log it.
pub fn verify(key: &PublicKey, data: &[u8], signature_bytes: &[u8]) -> bool {
    match key {
        PublicKey::Rsa(pk) => {
            let Ok(sig) = RsaSignature::try_from(signature_bytes) else {
                return false;
            };
            let verifying_key = RsaVerifyingKey::<Sha256>::new((**pk).clone());
            verifying_key.verify(data, &sig).is_ok()
        }
        PublicKey::EcdsaP256(pk) => {
            let Ok(sig) = P256Signature::try_from(signature_bytes) else {
                return false;
            };
            pk.verify(data, &sig).is_ok()
        }
        PublicKey::Ed25519(pk) => {
            let Ok(sig) = Ed25519Signature::try_from(signature_bytes) else {
                return false;
            };
            pk.verify(data, &sig).is_ok()
        }
    }
}

/// Record a verification failure's concrete reason without widening the
/// public `bool`-returning contract (SPEC_FULL.md §7).
pub fn log_verify_failure(context: &str, err: &CoreError) {
    tracing::debug!(context, error = %err, "signature verification rejected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey;
    use ed25519_dalek::SigningKey as Ed25519SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn ed25519_round_trip() {
        let sk = Ed25519SigningKey::generate(&mut OsRng);
        let key = PrivateKey::Ed25519(Box::new(sk));
        let pk = key.public_key();

        let sig = sign(&key, b"hello world").unwrap();
        assert!(verify(&pk, b"hello world", &sig));
        assert!(!verify(&pk, b"tampered", &sig));
    }

    #[test]
    fn digest_is_deterministic() {
        let a = digest(DigestAlg::Sha256, b"abc");
        let b = digest(DigestAlg::Sha256, b"abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
