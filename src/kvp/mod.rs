//! Cross-format Key-Value-Pair extractor (SPEC_FULL.md §4.2): the oracle
//! used to assert semantic equivalence between XML and JSON forms of the
//! same message. Engines never call this internally; it exists for tests
//! and for callers asserting cross-format equivalence.

pub mod json;
pub mod keymap;
pub mod xml;

use crate::error::CoreError;
use std::collections::BTreeMap;

/// An unordered mapping from canonical business key to its string value.
/// Equality is plain map equality; insertion order carries no meaning.
pub type KvpSet = BTreeMap<String, String>;

/// Extract the business KVP set from raw XML bytes.
pub fn extract_xml(bytes: &[u8]) -> Result<KvpSet, CoreError> {
    xml::extract(bytes)
}

/// Extract the business KVP set from raw JSON bytes.
pub fn extract_json(bytes: &[u8]) -> Result<KvpSet, CoreError> {
    json::extract(bytes)
}

/// Apply the shared positional-suffix disambiguation rule: a canonical key
/// that occurs more than once along the tree gets `_0`, `_1`, … appended in
/// traversal order; a key occurring exactly once is left bare. Both format
/// extractors accumulate in traversal order and call this at the end, so
/// the same input shape always yields the same suffixing in either format.
fn finalize(pairs: Vec<(String, String)>) -> KvpSet {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (key, _) in &pairs {
        *counts.entry(key.as_str()).or_insert(0) += 1;
    }

    let mut next_index: BTreeMap<String, usize> = BTreeMap::new();
    let mut out = KvpSet::new();
    for (key, value) in pairs {
        if counts[key.as_str()] > 1 {
            let index = next_index.entry(key.clone()).or_insert(0);
            out.insert(format!("{key}_{index}"), value);
            *index += 1;
        } else {
            out.insert(key, value);
        }
    }
    out
}
