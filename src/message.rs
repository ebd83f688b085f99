//! The tagged-union message type consumed by the Strategy Facade
//! (SPEC_FULL.md §3).

use crate::error::{CoreError, MessageFormat};
use serde_json::Value;

/// A message in either of the two representations this crate signs.
/// Messages are immutable inputs: every engine returns a new `Message`
/// rather than mutating the one it was given.
#[derive(Debug, Clone)]
pub enum Message {
    Xml(Vec<u8>),
    Json(Value),
}

impl Message {
    pub fn as_xml_bytes(&self) -> Result<&[u8], CoreError> {
        match self {
            Message::Xml(bytes) => Ok(bytes),
            Message::Json(_) => Err(CoreError::InvalidFormat {
                format: MessageFormat::Xml,
                reason: "expected an XML message but found a JSON message".to_string(),
            }),
        }
    }

    pub fn as_json_value(&self) -> Result<&Value, CoreError> {
        match self {
            Message::Json(value) => Ok(value),
            Message::Xml(_) => Err(CoreError::InvalidFormat {
                format: MessageFormat::Json,
                reason: "expected a JSON message but found an XML message".to_string(),
            }),
        }
    }
}
