//! Fixed ISO 20022 tag-to-canonical-business-key mapping (SPEC_FULL.md §4.2).
//!
//! Consulted by both the XML and JSON extractors so the two formats can
//! never independently decide what a given leaf means.

/// Structural element/property names that never become a KVP key;
/// traversal continues into their children regardless.
pub const STRUCTURAL_ELEMENT_NAMES: &[&str] = &[
    "BizMsgEnvlp",
    "Header",
    "Body",
    "Document",
    "AppHdr",
    "FIToFICstmrCdtTrf",
    "GrpHdr",
    "CdtTrfTxInf",
];

pub fn is_structural(name: &str) -> bool {
    STRUCTURAL_ELEMENT_NAMES.contains(&name)
}

/// One mapping rule: a path suffix (ancestor tag names ending at the leaf
/// itself) to a canonical business key. `is_currency_amount` marks leaves
/// that carry a companion currency code and must expand into two KVPs
/// (`..._Amount`, `..._Currency`) instead of one.
struct KeyRule {
    path_suffix: &'static [&'static str],
    canonical: &'static str,
    is_currency_amount: bool,
}

const RULES: &[KeyRule] = &[
    KeyRule {
        path_suffix: &["Fr", "FIId", "FinInstnId", "LEI"],
        canonical: "From_LEI",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["To", "FIId", "FinInstnId", "LEI"],
        canonical: "To_LEI",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["BizMsgIdr"],
        canonical: "BusinessMessageIdentifier",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["MsgDefIdr"],
        canonical: "MessageDefinitionIdentifier",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["GrpHdr", "MsgId"],
        canonical: "GroupHeader_MessageId",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["GrpHdr", "CtrlSum"],
        canonical: "GroupHeader_ControlSum",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["GrpHdr", "IntrBkSttlmDt"],
        canonical: "GroupHeader_InterbankSettlementDate",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["PmtId", "EndToEndId"],
        canonical: "Payment_EndToEndId",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["PmtId", "UETR"],
        canonical: "Payment_UETR",
        is_currency_amount: false,
    },
    KeyRule {
        path_suffix: &["CdtTrfTxInf", "IntrBkSttlmAmt"],
        canonical: "Payment_InterbankSettlementAmount",
        is_currency_amount: true,
    },
];

/// Look up the canonical key for a leaf reached via `path` (root-to-leaf
/// element/property name sequence, leaf last). Matches the longest
/// configured suffix, so `Fr`/`To` disambiguation for `LEI` falls out of
/// the ancestor context rather than needing a special case in either
/// extractor.
pub fn lookup(path: &[&str]) -> Option<(&'static str, bool)> {
    RULES
        .iter()
        .filter(|rule| path.ends_with(rule.path_suffix))
        .max_by_key(|rule| rule.path_suffix.len())
        .map(|rule| (rule.canonical, rule.is_currency_amount))
}
