//! Cross-format signing core for ISO 20022 pacs.008/head.001 messages.
//!
//! Three signature strategies share a canonicalization layer and a
//! cross-format KVP extractor that serves as the oracle for semantic
//! equivalence between a message's XML and JSON forms:
//!
//! - [`xmldsig`]: enveloped XMLDSig-style signatures over XML.
//! - [`jws`]: detached JWS carried in an `AppHdr.Signature` slot over
//!   RFC 8785-canonicalized JSON.
//! - [`hybrid`]: a signed digest carried in `AppHdr.MsgDgst`, with the
//!   signature itself free to travel off-message.
//!
//! [`facade::StrategyFacade`] is the single stateless entry point over all
//! three; [`kvp`] is consulted by callers (and this crate's own tests) to
//! assert that two representations of the same payment agree.

pub mod canon;
pub mod crypto;
pub mod error;
pub mod facade;
pub mod hybrid;
pub mod json_tree;
pub mod jws;
pub mod kvp;
pub mod message;
pub mod xmldsig;

pub use error::{CoreError, CoreResult, MessageFormat};
pub use facade::{SignedMessage, StrategyFacade, StrategyTag};
pub use message::Message;
