//! Pluggable key material for the Crypto Primitives Adapter (SPEC_FULL.md §4.7).
//!
//! `PrivateKey`/`PublicKey` are tagged enums over the three initial algorithm
//! families. A post-quantum family is added the same way these three were:
//! a new variant here, a new [`AlgorithmTag`], and a new arm in
//! `crypto::adapter::{sign, verify}`.

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Signing key, borrowed by an engine for the duration of one call and never
/// retained (SPEC_FULL.md §3 Lifecycle).
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
    EcdsaP256(Box<P256SigningKey>),
    Ed25519(Box<Ed25519SigningKey>),
}

/// Verification key.
#[derive(Clone)]
pub enum PublicKey {
    Rsa(Box<RsaPublicKey>),
    EcdsaP256(Box<P256VerifyingKey>),
    Ed25519(Box<Ed25519VerifyingKey>),
}

impl PrivateKey {
    pub fn algorithm(&self) -> AlgorithmTag {
        match self {
            PrivateKey::Rsa(_) => AlgorithmTag::RsaSha256,
            PrivateKey::EcdsaP256(_) => AlgorithmTag::EcdsaP256Sha256,
            PrivateKey::Ed25519(_) => AlgorithmTag::Ed25519,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(sk) => PublicKey::Rsa(Box::new(sk.to_public_key())),
            PrivateKey::EcdsaP256(sk) => PublicKey::EcdsaP256(Box::new(*sk.verifying_key())),
            PrivateKey::Ed25519(sk) => PublicKey::Ed25519(Box::new(sk.verifying_key())),
        }
    }
}

impl PublicKey {
    pub fn algorithm(&self) -> AlgorithmTag {
        match self {
            PublicKey::Rsa(_) => AlgorithmTag::RsaSha256,
            PublicKey::EcdsaP256(_) => AlgorithmTag::EcdsaP256Sha256,
            PublicKey::Ed25519(_) => AlgorithmTag::Ed25519,
        }
    }
}

/// One algorithm family, spanning both signature carriers (JOSE `alg` header
/// and XMLDSig `SignatureMethod`) so the two never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmTag {
    RsaSha256,
    EcdsaP256Sha256,
    Ed25519,
}

const XMLDSIG_RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
const XMLDSIG_ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
const XMLDSIG_ED25519: &str = "http://www.w3.org/2021/04/xmldsig-more#eddsa-ed25519";

impl AlgorithmTag {
    pub fn jose_alg(self) -> &'static str {
        match self {
            AlgorithmTag::RsaSha256 => "RS256",
            AlgorithmTag::EcdsaP256Sha256 => "ES256",
            AlgorithmTag::Ed25519 => "EdDSA",
        }
    }

    pub fn from_jose_alg(alg: &str) -> Option<Self> {
        match alg {
            "RS256" => Some(AlgorithmTag::RsaSha256),
            "ES256" => Some(AlgorithmTag::EcdsaP256Sha256),
            "EdDSA" => Some(AlgorithmTag::Ed25519),
            _ => None,
        }
    }

    pub fn xmldsig_signature_method(self) -> &'static str {
        match self {
            AlgorithmTag::RsaSha256 => XMLDSIG_RSA_SHA256,
            AlgorithmTag::EcdsaP256Sha256 => XMLDSIG_ECDSA_SHA256,
            AlgorithmTag::Ed25519 => XMLDSIG_ED25519,
        }
    }

    pub fn from_xmldsig_signature_method(uri: &str) -> Option<Self> {
        match uri {
            XMLDSIG_RSA_SHA256 => Some(AlgorithmTag::RsaSha256),
            XMLDSIG_ECDSA_SHA256 => Some(AlgorithmTag::EcdsaP256Sha256),
            XMLDSIG_ED25519 => Some(AlgorithmTag::Ed25519),
            _ => None,
        }
    }
}

/// Hash families usable by the Hybrid Digest Engine (SPEC_FULL.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlg {
    Sha256,
    Sha3_256,
}
