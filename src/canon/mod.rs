//! Canonicalization layer (SPEC_FULL.md §4.1): the two format-specific
//! serializers that every signature engine normalizes through before
//! hashing or signing.

pub mod json;
pub mod xml;

pub use xml::{XmlAttribute, XmlNode};
