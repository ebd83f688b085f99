//! Detached JWS (RFC 7515) signature engine over RFC 8785-canonicalized
//! JSON payloads (SPEC_FULL.md §4.4).
//!
//! The compact JWS lives in `AppHdr.Signature` rather than being carried
//! fully detached, so a signed message stays self-contained while
//! canonicalization still excludes the slot before hashing.

use crate::canon::json;
use crate::crypto::{self, AlgorithmTag, PrivateKey, PublicKey};
use crate::error::{CoreError, MessageFormat};
use crate::json_tree::{find_apphdr, find_apphdr_mut};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::Value;

/// Stateless JWS engine. No configuration record is needed: unlike XMLDSig
/// there is no namespace/prefix surface to parameterize, only the
/// algorithm, which is carried per-call via the key.
pub struct JwsEngine;

impl JwsEngine {
    pub fn new() -> Self {
        JwsEngine
    }

    /// Produce a compact JWS (`header.payload.signature`) over the
    /// RFC-8785 canonicalization of `json` with any `Signature` property
    /// removed at every level first.
    pub fn sign(&self, value: &Value, private_key: &PrivateKey) -> Result<String, CoreError> {
        let span = tracing::info_span!("jws_sign", alg = ?private_key.algorithm());
        let _guard = span.enter();

        let alg = private_key.algorithm();
        let header = format!(r#"{{"alg":"{}","typ":"JOSE"}}"#, alg.jose_alg());
        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());

        let payload_bytes = json::canonicalize_for_signing(value)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_bytes);

        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_bytes = crypto::sign(private_key, signing_input.as_bytes())?;
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature_bytes);

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Place a compact JWS into `AppHdr.Signature`, overwriting any prior
    /// value (JSON has no "ambiguous slot" failure mode — object keys are
    /// unique by construction).
    pub fn embed(&self, value: &Value, compact_jws: &str) -> Result<Value, CoreError> {
        let mut out = value.clone();
        let apphdr = find_apphdr_mut(&mut out)?;
        apphdr["Signature"] = Value::String(compact_jws.to_string());
        Ok(out)
    }

    /// Read the compact JWS from `AppHdr.Signature`.
    pub fn extract(&self, value: &Value) -> Result<String, CoreError> {
        let apphdr = find_apphdr(value)?;
        apphdr
            .get("Signature")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CoreError::InvalidFormat {
                format: MessageFormat::Json,
                reason: "AppHdr.Signature is absent or not a string".to_string(),
            })
    }

    /// Verify: extract the JWS, recompute the canonical payload (signature
    /// slot removed) and confirm it matches the JWS's own payload segment,
    /// then verify the signature bytes.
    pub fn verify(&self, signed: &Value, public_key: &PublicKey) -> bool {
        match self.try_verify(signed, public_key) {
            Ok(outcome) => outcome,
            Err(err) => {
                crypto::adapter::log_verify_failure("jws_verify", &err);
                false
            }
        }
    }

    fn try_verify(&self, signed: &Value, public_key: &PublicKey) -> Result<bool, CoreError> {
        let compact = self.extract(signed)?;
        let mut parts = compact.split('.');
        let (header_b64, payload_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(CoreError::InvalidFormat {
                    format: MessageFormat::Json,
                    reason: "compact JWS does not have exactly three dot-separated parts".to_string(),
                })
            }
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| CoreError::InvalidFormat { format: MessageFormat::Json, reason: e.to_string() })?;
        let header: Value = serde_json::from_slice(&header_bytes)
            .map_err(|e| CoreError::InvalidFormat { format: MessageFormat::Json, reason: e.to_string() })?;
        let alg_str = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::InvalidFormat {
                format: MessageFormat::Json,
                reason: "JOSE header missing alg".to_string(),
            })?;
        let alg = AlgorithmTag::from_jose_alg(alg_str).ok_or_else(|| CoreError::UnsupportedAlgorithm(alg_str.to_string()))?;
        if alg != public_key.algorithm() {
            return Err(CoreError::UnsupportedAlgorithm(format!(
                "JOSE alg {alg_str} does not match provided key's algorithm"
            )));
        }

        let expected_payload_bytes = json::canonicalize_for_signing(signed)?;
        let expected_payload_b64 = URL_SAFE_NO_PAD.encode(&expected_payload_bytes);
        if expected_payload_b64 != payload_b64 {
            return Err(CoreError::ReferenceMismatch(
                "JWS payload does not match the current canonicalized message".to_string(),
            ));
        }

        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| CoreError::CryptoFailure(format!("JWS signature segment is not valid base64url: {e}")))?;

        if !crypto::verify(public_key, signing_input.as_bytes(), &signature_bytes) {
            return Err(CoreError::CryptoFailure("signature bytes did not verify".to_string()));
        }

        Ok(true)
    }
}

impl Default for JwsEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey as Key;
    use p256::ecdsa::SigningKey as P256SigningKey;
    use rand::rngs::OsRng;
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
        let sk = P256SigningKey::random(&mut OsRng);
        let key = Key::EcdsaP256(Box::new(sk));
        let pk = key.public_key();
        (key, pk)
    }

    #[test]
    fn sign_embed_verify_round_trip() {
        let engine = JwsEngine::new();
        let (sk, pk) = key_pair();
        let value = sample();

        let compact = engine.sign(&value, &sk).unwrap();
        let signed = engine.embed(&value, &compact).unwrap();

        assert_eq!(engine.extract(&signed).unwrap(), compact);
        assert!(engine.verify(&signed, &pk));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let engine = JwsEngine::new();
        let (sk, _pk) = key_pair();
        let (_other_sk, other_pk) = key_pair();
        let value = sample();

        let compact = engine.sign(&value, &sk).unwrap();
        let signed = engine.embed(&value, &compact).unwrap();
        assert!(!engine.verify(&signed, &other_pk));
    }

    #[test]
    fn tampering_is_rejected() {
        let engine = JwsEngine::new();
        let (sk, pk) = key_pair();
        let value = sample();

        let compact = engine.sign(&value, &sk).unwrap();
        let mut signed = engine.embed(&value, &compact).unwrap();
        signed["BizMsgEnvlp"]["Body"]["Document"]["FIToFICstmrCdtTrf"]["GrpHdr"]["MsgId"] = json!("MODIFIED");
        assert!(!engine.verify(&signed, &pk));
    }

    #[test]
    fn removing_signature_slot_restores_original_canonical_bytes() {
        let engine = JwsEngine::new();
        let (sk, _pk) = key_pair();
        let value = sample();

        let before = json::canonicalize_for_signing(&value).unwrap();
        let compact = engine.sign(&value, &sk).unwrap();
        let signed = engine.embed(&value, &compact).unwrap();
        let after = json::canonicalize_for_signing(&signed).unwrap();

        assert_eq!(before, after);
    }
}
