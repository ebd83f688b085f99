//! S5: hybrid detached-hash happy path over the matched pacs.008 JSON
//! sample — digest embedded in `AppHdr.MsgDgst`, signature kept separate.

use ed25519_dalek::SigningKey as Ed25519SigningKey;
use pacs_sig_core::canon::json;
use pacs_sig_core::crypto::keys::PrivateKey;
use pacs_sig_core::crypto::DigestAlg;
use pacs_sig_core::hybrid::HybridDigestEngine;
use rand::rngs::OsRng;
use serde_json::Value;

const SAMPLE_JSON: &str = include_str!("fixtures/pacs008_sample.json");

#[test]
fn s5_hybrid_digest_round_trip() {
    let value: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
    let sk_raw = Ed25519SigningKey::generate(&mut OsRng);
    let sk = PrivateKey::Ed25519(Box::new(sk_raw));
    let pk = sk.public_key();

    let engine = HybridDigestEngine::new(DigestAlg::Sha256);

    let canonical = json::canonicalize_for_digest(&value).unwrap();
    let digest = engine.digest(&canonical);
    let signature = engine.sign_digest(&digest, &sk).unwrap();

    let with_digest = engine.embed(&value, &digest).unwrap();
    assert!(with_digest["BizMsgEnvlp"]["Header"]["AppHdr"]["MsgDgst"].is_string());

    let extracted = engine.extract(&with_digest).unwrap();
    assert_eq!(extracted, digest);

    assert!(engine.verify_digest_signature(&with_digest, &pk, &signature));
}

#[test]
fn s5_tampering_after_digest_embed_is_rejected() {
    let value: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
    let sk_raw = Ed25519SigningKey::generate(&mut OsRng);
    let sk = PrivateKey::Ed25519(Box::new(sk_raw));
    let pk = sk.public_key();

    let engine = HybridDigestEngine::new(DigestAlg::Sha256);
    let canonical = json::canonicalize_for_digest(&value).unwrap();
    let digest = engine.digest(&canonical);
    let signature = engine.sign_digest(&digest, &sk).unwrap();
    let mut with_digest = engine.embed(&value, &digest).unwrap();

    with_digest["BizMsgEnvlp"]["Body"]["Document"]["FIToFICstmrCdtTrf"]["GrpHdr"]["MsgId"] =
        serde_json::json!("MODIFIED");

    assert!(!engine.verify_digest_signature(&with_digest, &pk, &signature));
}
