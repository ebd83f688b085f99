//! Error taxonomy (see SPEC_FULL.md §7).
//!
//! Every fallible public function returns `Result<T, CoreError>`. The three
//! `verify` entry points (XML, JWS, Hybrid) never return `CoreError` directly —
//! they collapse it to `bool` per the no-side-channel requirement, logging the
//! discarded reason at `debug` level via [`crate::crypto::adapter::log_verify_failure`].

use std::fmt;

/// Which message representation an operation was working with when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Xml,
    Json,
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFormat::Xml => write!(f, "XML"),
            MessageFormat::Json => write!(f, "JSON"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{format} input is not well-formed or does not match the expected ISO 20022 envelope: {reason}")]
    InvalidFormat {
        format: MessageFormat,
        reason: String,
    },

    #[error("AppHdr element could not be located in the {format} message")]
    AppHdrNotFound { format: MessageFormat },

    #[error("{count} signature slot(s) already populated; exactly one signature slot is allowed")]
    AmbiguousSignature { count: usize },

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(String),

    #[error("XMLDSig reference could not be resolved or its transform chain failed: {0}")]
    ReferenceMismatch(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
