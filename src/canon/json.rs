//! RFC 8785 JSON Canonicalization Scheme (SPEC_FULL.md §4.1).
//!
//! Uses `serde_jcs`, which guarantees lexicographic key ordering, no
//! insignificant whitespace, UTF-8 encoding, and IEEE 754 number
//! normalization (`1.0` → `1`).

use crate::error::{CoreError, MessageFormat};
use serde_json::Value;

/// Canonicalize a JSON value as-is (no signature-slot stripping).
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CoreError> {
    serde_jcs::to_vec(value).map_err(|e| CoreError::InvalidFormat {
        format: MessageFormat::Json,
        reason: format!("failed to canonicalize: {e}"),
    })
}

/// Canonicalize for signing/verification: remove any `Signature` property at
/// every level first (SPEC_FULL.md §4.1, §4.3), so the signature can never
/// be computed over itself.
pub fn canonicalize_for_signing(value: &Value) -> Result<Vec<u8>, CoreError> {
    let stripped = strip_property(value, "Signature");
    canonicalize(&stripped)
}

/// Canonicalize for hybrid digesting: remove any `MsgDgst` property at every
/// level first, so the digest can never be computed over its own carrier.
pub fn canonicalize_for_digest(value: &Value) -> Result<Vec<u8>, CoreError> {
    let stripped = strip_property(value, "MsgDgst");
    canonicalize(&stripped)
}

/// Recursively remove the `Signature` key from every object in the tree.
pub fn strip_signature_property(value: &Value) -> Value {
    strip_property(value, "Signature")
}

/// Recursively remove `key` from every object in the tree.
pub fn strip_property(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                if k == key {
                    continue;
                }
                out.insert(k.clone(), strip_property(v, key));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| strip_property(v, key)).collect()),
        other => other.clone(),
    }
}

/// Parse UTF-8 bytes as a JSON message tree.
pub fn parse(bytes: &[u8]) -> Result<Value, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::InvalidFormat {
        format: MessageFormat::Json,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_ordering() {
        let input = json!({"z": 3, "b": 2, "a": 1, "m": 4});
        let canonical = canonicalize(&input).unwrap();
        assert_eq!(canonical, br#"{"a":1,"b":2,"m":4,"z":3}"#);
    }

    #[test]
    fn array_order_preserved() {
        let input = json!({"array": [3, 1, 2]});
        let canonical = canonicalize(&input).unwrap();
        assert_eq!(canonical, br#"{"array":[3,1,2]}"#);
    }

    #[test]
    fn strips_signature_at_every_level() {
        let input = json!({
            "AppHdr": {"Signature": "abc.def.ghi", "Fr": "BANKAAA"},
            "Document": {"nested": {"Signature": "should-not-appear"}}
        });
        let stripped = strip_signature_property(&input);
        assert!(stripped.get("AppHdr").unwrap().get("Signature").is_none());
        assert!(stripped["Document"]["nested"].get("Signature").is_none());
        assert_eq!(stripped["AppHdr"]["Fr"], "BANKAAA");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let input = json!({"b": 2, "a": 1});
        let once = canonicalize(&input).unwrap();
        let reparsed: Value = serde_json::from_slice(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }
}
