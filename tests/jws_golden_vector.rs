//! S4: JWS happy path over the matched pacs.008 JSON sample, plus the
//! signature-exclusion check (removing the slot restores pre-signing
//! canonical bytes).

use p256::ecdsa::SigningKey as P256SigningKey;
use pacs_sig_core::canon::json;
use pacs_sig_core::crypto::keys::PrivateKey;
use pacs_sig_core::jws::JwsEngine;
use rand::rngs::OsRng;
use serde_json::Value;

const SAMPLE_JSON: &str = include_str!("fixtures/pacs008_sample.json");

fn sample() -> Value {
    serde_json::from_str(SAMPLE_JSON).unwrap()
}

fn es256_pair() -> (PrivateKey, pacs_sig_core::crypto::PublicKey) {
    let sk = P256SigningKey::random(&mut OsRng);
    let key = PrivateKey::EcdsaP256(Box::new(sk));
    let pk = key.public_key();
    (key, pk)
}

#[test]
fn s4_jws_happy_path_and_signature_exclusion() {
    let value = sample();
    let (sk, pk) = es256_pair();
    let engine = JwsEngine::new();

    let before_signing = json::canonicalize_for_signing(&value).unwrap();

    let compact = engine.sign(&value, &sk).unwrap();
    assert_eq!(compact.split('.').count(), 3, "compact JWS has three dot-separated parts");

    let signed = engine.embed(&value, &compact).unwrap();
    assert!(engine.verify(&signed, &pk));

    let after_removing_slot = json::canonicalize_for_signing(&signed).unwrap();
    assert_eq!(before_signing, after_removing_slot);
}
