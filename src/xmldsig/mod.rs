//! Enveloped XMLDSig-style signature engine (SPEC_FULL.md §4.3).
//!
//! Builds a `<Signature>` element whose `Reference` targets the enveloping
//! document root (`URI=""`) with the enveloped-signature transform followed
//! by C14N 1.1, exactly as an XMLDSig Core 1.1 enveloped signature is
//! structured. The engine holds no mutable state beyond its configuration
//! record and is `Send + Sync`.

use crate::canon::xml::{self, XmlAttribute, XmlNode};
use crate::crypto::{self, AlgorithmTag, DigestAlg, PrivateKey, PublicKey};
use crate::error::CoreError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
const C14N11_URI: &str = "http://www.w3.org/2006/12/xml-c14n11";
const ENVELOPED_SIGNATURE_URI: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
const SHA256_DIGEST_URI: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
const STABLE_ID: &str = "SignedDocument";

/// One XMLDSig `Transform` algorithm URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    EnvelopedSignature,
    C14n11,
}

impl Transform {
    fn uri(self) -> &'static str {
        match self {
            Transform::EnvelopedSignature => ENVELOPED_SIGNATURE_URI,
            Transform::C14n11 => C14N11_URI,
        }
    }
}

/// Caller-constructed configuration (SPEC_FULL.md §4.3, Design Note §9):
/// replaces an implicit global signature-factory configuration with an
/// explicit record threaded into the engine at construction time.
#[derive(Debug, Clone)]
pub struct XmlDsigConfig {
    pub default_prefix: String,
    /// AppHdr's namespace (head.001), used for namespace-qualified lookup
    /// before falling back to an un-namespaced search.
    pub apphdr_namespace: Option<String>,
    pub digest_alg: DigestAlg,
    pub signature_alg: AlgorithmTag,
    pub transform_chain: Vec<Transform>,
}

impl XmlDsigConfig {
    /// `ds`-prefixed, SHA-256, enveloped + C14N 1.1 default for pacs.008
    /// messages carrying a head.001 AppHdr.
    pub fn pacs008_default(apphdr_namespace: impl Into<String>, signature_alg: AlgorithmTag) -> Self {
        XmlDsigConfig {
            default_prefix: "ds".to_string(),
            apphdr_namespace: Some(apphdr_namespace.into()),
            digest_alg: DigestAlg::Sha256,
            signature_alg,
            transform_chain: vec![Transform::EnvelopedSignature, Transform::C14n11],
        }
    }
}

/// Stateless engine over one [`XmlDsigConfig`]. `Send + Sync` by construction
/// (no interior mutability, no cached parser).
pub struct XmlSignatureEngine {
    config: XmlDsigConfig,
}

impl XmlSignatureEngine {
    pub fn new(config: XmlDsigConfig) -> Self {
        XmlSignatureEngine { config }
    }

    /// Locate AppHdr by namespace-qualified lookup first, falling back to an
    /// un-namespaced search.
    fn find_apphdr<'a>(&self, tree: &'a XmlNode) -> Option<&'a XmlNode> {
        if let Some(ns) = &self.config.apphdr_namespace {
            if let Some(found) = tree.find(Some(ns.as_str()), "AppHdr") {
                return Some(found);
            }
        }
        tree.find(None, "AppHdr")
    }

    /// Build, embed, and return a new document with one `<Signature>` child
    /// of AppHdr. Fails with [`CoreError::AmbiguousSignature`] if AppHdr
    /// already carries a signature slot.
    pub fn sign(&self, doc: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>, CoreError> {
        let span = tracing::info_span!("xmldsig_sign", alg = ?self.config.signature_alg);
        let _guard = span.enter();

        let tree = xml::parse(doc)?;
        let apphdr = self
            .find_apphdr(&tree)
            .ok_or(CoreError::AppHdrNotFound { format: crate::error::MessageFormat::Xml })?;

        let mut existing = Vec::new();
        apphdr.find_all(Some(DS_NS), "Signature", &mut existing);
        if !existing.is_empty() {
            return Err(CoreError::AmbiguousSignature { count: existing.len() });
        }

        let rooted = tree.with_stable_id(STABLE_ID);
        let reference_digest = crypto::digest(self.config.digest_alg, &xml::canonicalize(&rooted));
        let digest_value_b64 = STANDARD.encode(reference_digest);

        let signed_info = build_signed_info(&self.config, &digest_value_b64);
        let signed_info_bytes = xml::canonicalize(&signed_info);
        let signature_bytes = crypto::sign(private_key, &signed_info_bytes)?;
        let signature_value_b64 = STANDARD.encode(signature_bytes);

        let signature_node = XmlNode::Element {
            prefix: Some(self.config.default_prefix.clone()),
            local_name: "Signature".to_string(),
            namespace: Some(DS_NS.to_string()),
            namespace_decls: vec![(Some(self.config.default_prefix.clone()), DS_NS.to_string())],
            attributes: Vec::new(),
            children: vec![
                signed_info,
                leaf(&self.config.default_prefix, DS_NS, "SignatureValue", &signature_value_b64),
            ],
        };

        let signed = rooted
            .with_child_appended(self.config.apphdr_namespace.as_deref(), "AppHdr", signature_node.clone())
            .or_else(|| rooted.with_child_appended(None, "AppHdr", signature_node))
            .ok_or(CoreError::AppHdrNotFound { format: crate::error::MessageFormat::Xml })?;

        Ok(xml::canonicalize(&signed))
    }

    /// Verify a signed document. Collapses every internal failure to
    /// `false`, logging the discarded reason (SPEC_FULL.md §7).
    pub fn verify(&self, doc: &[u8], public_key: &PublicKey) -> bool {
        match self.try_verify(doc, public_key) {
            Ok(outcome) => outcome,
            Err(err) => {
                crypto::adapter::log_verify_failure("xmldsig_verify", &err);
                false
            }
        }
    }

    fn try_verify(&self, doc: &[u8], public_key: &PublicKey) -> Result<bool, CoreError> {
        let tree = xml::parse(doc)?;
        let apphdr = self
            .find_apphdr(&tree)
            .ok_or(CoreError::AppHdrNotFound { format: crate::error::MessageFormat::Xml })?;

        let mut signatures = Vec::new();
        apphdr.find_all(Some(DS_NS), "Signature", &mut signatures);
        let signature = match signatures.len() {
            0 => return Err(CoreError::ReferenceMismatch("no Signature element present".to_string())),
            1 => signatures[0],
            n => return Err(CoreError::AmbiguousSignature { count: n }),
        };

        let signed_info = signature
            .find(Some(DS_NS), "SignedInfo")
            .ok_or_else(|| CoreError::InvalidFormat {
                format: crate::error::MessageFormat::Xml,
                reason: "Signature element missing SignedInfo".to_string(),
            })?;
        let signature_method_uri = signed_info
            .find(Some(DS_NS), "SignatureMethod")
            .and_then(|n| n.attr("Algorithm"))
            .ok_or_else(|| CoreError::InvalidFormat {
                format: crate::error::MessageFormat::Xml,
                reason: "SignedInfo missing SignatureMethod".to_string(),
            })?;
        let algorithm = AlgorithmTag::from_xmldsig_signature_method(signature_method_uri)
            .ok_or_else(|| CoreError::UnsupportedAlgorithm(signature_method_uri.to_string()))?;
        if algorithm != public_key.algorithm() {
            return Err(CoreError::UnsupportedAlgorithm(format!(
                "SignatureMethod {signature_method_uri} does not match provided key's algorithm"
            )));
        }

        let digest_value = signed_info
            .find(Some(DS_NS), "DigestValue")
            .map(XmlNode::text_content)
            .ok_or_else(|| CoreError::InvalidFormat {
                format: crate::error::MessageFormat::Xml,
                reason: "Reference missing DigestValue".to_string(),
            })?;
        let signature_value = signature
            .find(Some(DS_NS), "SignatureValue")
            .map(XmlNode::text_content)
            .ok_or_else(|| CoreError::InvalidFormat {
                format: crate::error::MessageFormat::Xml,
                reason: "Signature missing SignatureValue".to_string(),
            })?;

        let stripped = tree.without_element(DS_NS, "Signature");
        let recomputed_digest = crypto::digest(self.config.digest_alg, &xml::canonicalize(&stripped));
        let recomputed_digest_b64 = STANDARD.encode(recomputed_digest);
        if recomputed_digest_b64 != digest_value {
            return Err(CoreError::ReferenceMismatch("digest over current document does not match DigestValue".to_string()));
        }

        let signed_info_bytes = xml::canonicalize(signed_info);
        let signature_bytes = STANDARD
            .decode(signature_value.trim())
            .map_err(|e| CoreError::CryptoFailure(format!("SignatureValue is not valid base64: {e}")))?;

        if !crypto::verify(public_key, &signed_info_bytes, &signature_bytes) {
            return Err(CoreError::CryptoFailure("signature bytes did not verify".to_string()));
        }

        Ok(true)
    }
}

fn build_signed_info(config: &XmlDsigConfig, digest_value_b64: &str) -> XmlNode {
    let prefix = &config.default_prefix;

    let transforms = XmlNode::Element {
        prefix: Some(prefix.clone()),
        local_name: "Transforms".to_string(),
        namespace: Some(DS_NS.to_string()),
        namespace_decls: Vec::new(),
        attributes: Vec::new(),
        children: config
            .transform_chain
            .iter()
            .map(|t| with_attr(prefix, "Transform", "Algorithm", t.uri()))
            .collect(),
    };

    let reference = XmlNode::Element {
        prefix: Some(prefix.clone()),
        local_name: "Reference".to_string(),
        namespace: Some(DS_NS.to_string()),
        namespace_decls: Vec::new(),
        attributes: vec![XmlAttribute {
            prefix: None,
            local_name: "URI".to_string(),
            namespace: None,
            value: String::new(),
        }],
        children: vec![
            transforms,
            with_attr(prefix, "DigestMethod", "Algorithm", SHA256_DIGEST_URI),
            leaf(prefix, DS_NS, "DigestValue", digest_value_b64),
        ],
    };

    XmlNode::Element {
        prefix: Some(prefix.clone()),
        local_name: "SignedInfo".to_string(),
        namespace: Some(DS_NS.to_string()),
        namespace_decls: Vec::new(),
        attributes: Vec::new(),
        children: vec![
            with_attr(prefix, "CanonicalizationMethod", "Algorithm", C14N11_URI),
            with_attr(prefix, "SignatureMethod", "Algorithm", config.signature_alg.xmldsig_signature_method()),
            reference,
        ],
    }
}

fn leaf(prefix: &str, namespace: &str, local_name: &str, text: &str) -> XmlNode {
    XmlNode::Element {
        prefix: Some(prefix.to_string()),
        local_name: local_name.to_string(),
        namespace: Some(namespace.to_string()),
        namespace_decls: Vec::new(),
        attributes: Vec::new(),
        children: vec![XmlNode::Text(text.to_string())],
    }
}

fn with_attr(prefix: &str, local_name: &str, attr_name: &str, attr_value: &str) -> XmlNode {
    XmlNode::Element {
        prefix: Some(prefix.to_string()),
        local_name: local_name.to_string(),
        namespace: Some(DS_NS.to_string()),
        namespace_decls: Vec::new(),
        attributes: vec![XmlAttribute {
            prefix: None,
            local_name: attr_name.to_string(),
            namespace: None,
            value: attr_value.to_string(),
        }],
        children: Vec::new(),
    }
}
