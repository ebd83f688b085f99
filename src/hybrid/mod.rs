//! Hybrid detached-hash signature engine (SPEC_FULL.md §4.5).
//!
//! Signs only a digest of the canonicalized message; the digest travels in
//! `AppHdr.MsgDgst`, while the signature bytes over that digest may be kept
//! off-message entirely and are always supplied out-of-band by the caller.

use crate::canon::json;
use crate::crypto::{self, DigestAlg, PrivateKey, PublicKey};
use crate::error::{CoreError, MessageFormat};
use crate::json_tree::{find_apphdr, find_apphdr_mut};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

pub struct HybridDigestEngine {
    digest_alg: DigestAlg,
}

impl HybridDigestEngine {
    pub fn new(digest_alg: DigestAlg) -> Self {
        HybridDigestEngine { digest_alg }
    }

    /// SHA-256 (or configured family) over caller-supplied canonical bytes.
    /// The caller runs canonicalization in the appropriate mode first.
    pub fn digest(&self, canonical_bytes: &[u8]) -> Vec<u8> {
        crypto::digest(self.digest_alg, canonical_bytes)
    }

    pub fn sign_digest(&self, digest: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        crypto::sign(private_key, digest)
    }

    /// Insert `base64(digest)` into `AppHdr.MsgDgst`, overwriting any prior
    /// value.
    pub fn embed(&self, value: &Value, digest: &[u8]) -> Result<Value, CoreError> {
        let mut out = value.clone();
        let apphdr = find_apphdr_mut(&mut out)?;
        apphdr["MsgDgst"] = Value::String(STANDARD.encode(digest));
        Ok(out)
    }

    /// Read `AppHdr.MsgDgst` back out as raw digest bytes.
    pub fn extract(&self, value: &Value) -> Result<Vec<u8>, CoreError> {
        let apphdr = find_apphdr(value)?;
        let encoded = apphdr
            .get("MsgDgst")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidFormat {
                format: MessageFormat::Json,
                reason: "AppHdr.MsgDgst is absent or not a string".to_string(),
            })?;
        STANDARD
            .decode(encoded)
            .map_err(|e| CoreError::InvalidFormat { format: MessageFormat::Json, reason: e.to_string() })
    }

    /// Recompute the digest over the message with `MsgDgst` excluded,
    /// confirm it matches the embedded digest, then verify `signature`
    /// (supplied out-of-band, never itself carried in the message) over
    /// that freshly computed digest.
    pub fn verify_digest_signature(&self, value: &Value, public_key: &PublicKey, signature: &[u8]) -> bool {
        match self.try_verify(value, public_key, signature) {
            Ok(outcome) => outcome,
            Err(err) => {
                crypto::adapter::log_verify_failure("hybrid_verify", &err);
                false
            }
        }
    }

    fn try_verify(&self, value: &Value, public_key: &PublicKey, signature: &[u8]) -> Result<bool, CoreError> {
        let embedded_digest = self.extract(value)?;

        let canonical = json::canonicalize_for_digest(value)?;
        let recomputed_digest = self.digest(&canonical);
        if recomputed_digest != embedded_digest {
            return Err(CoreError::ReferenceMismatch(
                "recomputed digest does not match AppHdr.MsgDgst".to_string(),
            ));
        }

        if !crypto::verify(public_key, &recomputed_digest, signature) {
            return Err(CoreError::CryptoFailure("signature bytes did not verify over the digest".to_string()));
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey as Key;
    use rsa::RsaPrivateKey;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "BizMsgEnvlp": {
                "Header": {"AppHdr": {"BizMsgIdr": "BMI123"}},
                "Body": {"Document": {"FIToFICstmrCdtTrf": {"GrpHdr": {"MsgId": "TEST123456789"}}}}
            }
        })
    }

    fn key_pair() -> (Key, crate::crypto::PublicKey) {
        let mut rng = rand::thread_rng();
        let sk = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let key = Key::Rsa(Box::new(sk));
        let pk = key.public_key();
        (key, pk)
    }

    #[test]
    fn digest_sign_embed_verify_round_trip() {
        let engine = HybridDigestEngine::new(DigestAlg::Sha256);
        let (sk, pk) = key_pair();
        let value = sample();

        let canonical = json::canonicalize_for_digest(&value).unwrap();
        let digest = engine.digest(&canonical);
        let signature = engine.sign_digest(&digest, &sk).unwrap();
        let embedded = engine.embed(&value, &digest).unwrap();

        assert!(engine.verify_digest_signature(&embedded, &pk, &signature));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let engine = HybridDigestEngine::new(DigestAlg::Sha256);
        let (sk, _pk) = key_pair();
        let (_other_sk, other_pk) = key_pair();
        let value = sample();

        let canonical = json::canonicalize_for_digest(&value).unwrap();
        let digest = engine.digest(&canonical);
        let signature = engine.sign_digest(&digest, &sk).unwrap();
        let embedded = engine.embed(&value, &digest).unwrap();

        assert!(!engine.verify_digest_signature(&embedded, &other_pk, &signature));
    }

    #[test]
    fn tampering_after_embed_is_rejected() {
        let engine = HybridDigestEngine::new(DigestAlg::Sha256);
        let (sk, pk) = key_pair();
        let value = sample();

        let canonical = json::canonicalize_for_digest(&value).unwrap();
        let digest = engine.digest(&canonical);
        let signature = engine.sign_digest(&digest, &sk).unwrap();
        let mut embedded = engine.embed(&value, &digest).unwrap();
        embedded["BizMsgEnvlp"]["Body"]["Document"]["FIToFICstmrCdtTrf"]["GrpHdr"]["MsgId"] = json!("MODIFIED");

        assert!(!engine.verify_digest_signature(&embedded, &pk, &signature));
    }
}
