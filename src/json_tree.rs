//! Shared JSON-tree lookup (SPEC_FULL.md §4.4, §4.5): the JWS and Hybrid
//! Digest engines both need to find and update the single `AppHdr` object
//! wherever it sits in the message tree. One depth-first search, owned and
//! mutable variants, used by both rather than re-implemented per engine.

use crate::error::{CoreError, MessageFormat};
use serde_json::Value;

/// Depth-first search for the first object value under `key`, including `value` itself.
pub fn find_by_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|v| find_by_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_by_key(v, key)),
        _ => None,
    }
}

pub fn find_by_key_mut<'a>(value: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => {
            if map.contains_key(key) {
                return map.get_mut(key);
            }
            map.values_mut().find_map(|v| find_by_key_mut(v, key))
        }
        Value::Array(items) => items.iter_mut().find_map(|v| find_by_key_mut(v, key)),
        _ => None,
    }
}

pub fn find_apphdr(value: &Value) -> Result<&Value, CoreError> {
    find_by_key(value, "AppHdr").ok_or(CoreError::AppHdrNotFound { format: MessageFormat::Json })
}

pub fn find_apphdr_mut(value: &mut Value) -> Result<&mut Value, CoreError> {
    find_by_key_mut(value, "AppHdr").ok_or(CoreError::AppHdrNotFound { format: MessageFormat::Json })
}
