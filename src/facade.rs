//! Strategy Facade (SPEC_FULL.md §4.6): one uniform `sign`/`verify` surface
//! over the three signature strategies, keyed by tag. Stateless and
//! thread-safe — every call constructs its own throwaway engine.

use crate::canon::json as canon_json;
use crate::crypto::{DigestAlg, PrivateKey, PublicKey};
use crate::error::CoreError;
use crate::hybrid::HybridDigestEngine;
use crate::jws::JwsEngine;
use crate::message::Message;
use crate::xmldsig::{XmlDsigConfig, XmlSignatureEngine};

/// head.001.001.02 namespace used to locate AppHdr for the XMLDSig strategy.
pub const HEAD_001_NAMESPACE: &str = "urn:iso:std:iso:20022:tech:xsd:head.001.001.02";

/// Selects one of the three signature strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTag {
    XmlDSig,
    JsonJws,
    HybridDetachedHash,
}

/// A signed message, plus — for [`StrategyTag::HybridDetachedHash`] only —
/// the signature bytes, which travel out-of-band rather than inside the
/// message (SPEC_FULL.md §4.5).
#[derive(Debug, Clone)]
pub struct SignedMessage {
    pub message: Message,
    pub detached_signature: Option<Vec<u8>>,
}

/// Stateless, thread-safe entry point over the three strategies.
pub struct StrategyFacade;

impl StrategyFacade {
    pub fn sign(message: &Message, strategy: StrategyTag, private_key: &PrivateKey) -> Result<SignedMessage, CoreError> {
        match strategy {
            StrategyTag::XmlDSig => {
                let bytes = message.as_xml_bytes()?;
                let engine = XmlSignatureEngine::new(XmlDsigConfig::pacs008_default(
                    HEAD_001_NAMESPACE,
                    private_key.algorithm(),
                ));
                let signed = engine.sign(bytes, private_key)?;
                Ok(SignedMessage {
                    message: Message::Xml(signed),
                    detached_signature: None,
                })
            }
            StrategyTag::JsonJws => {
                let value = message.as_json_value()?;
                let engine = JwsEngine::new();
                let compact = engine.sign(value, private_key)?;
                let embedded = engine.embed(value, &compact)?;
                Ok(SignedMessage {
                    message: Message::Json(embedded),
                    detached_signature: None,
                })
            }
            StrategyTag::HybridDetachedHash => {
                let value = message.as_json_value()?;
                let engine = HybridDigestEngine::new(DigestAlg::Sha256);
                let canonical = canon_json::canonicalize_for_digest(value)?;
                let digest = engine.digest(&canonical);
                let signature = engine.sign_digest(&digest, private_key)?;
                let embedded = engine.embed(value, &digest)?;
                Ok(SignedMessage {
                    message: Message::Json(embedded),
                    detached_signature: Some(signature),
                })
            }
        }
    }

    /// Returns `false` for any internal failure — mismatched message
    /// format, missing detached signature, wrong key, tampering — without
    /// a side channel distinguishing them (SPEC_FULL.md §7).
    pub fn verify(signed: &SignedMessage, strategy: StrategyTag, public_key: &PublicKey) -> bool {
        match strategy {
            StrategyTag::XmlDSig => {
                let Ok(bytes) = signed.message.as_xml_bytes() else {
                    return false;
                };
                let engine = XmlSignatureEngine::new(XmlDsigConfig::pacs008_default(
                    HEAD_001_NAMESPACE,
                    public_key.algorithm(),
                ));
                engine.verify(bytes, public_key)
            }
            StrategyTag::JsonJws => {
                let Ok(value) = signed.message.as_json_value() else {
                    return false;
                };
                JwsEngine::new().verify(value, public_key)
            }
            StrategyTag::HybridDetachedHash => {
                let Ok(value) = signed.message.as_json_value() else {
                    return false;
                };
                let Some(signature) = &signed.detached_signature else {
                    return false;
                };
                HybridDigestEngine::new(DigestAlg::Sha256).verify_digest_signature(value, public_key, signature)
            }
        }
    }
}
