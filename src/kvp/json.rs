//! JSON-side Key-Value-Pair extractor (SPEC_FULL.md §4.2).

use super::keymap;
use crate::canon::json as canon_json;
use crate::error::CoreError;
use serde_json::{Map, Value};

pub fn extract(bytes: &[u8]) -> Result<super::KvpSet, CoreError> {
    let value = canon_json::parse(bytes)?;
    let mut pairs = Vec::new();
    let mut path: Vec<&str> = Vec::new();
    walk(&value, &mut path, &mut pairs);
    Ok(super::finalize(pairs))
}

fn walk<'a>(value: &'a Value, path: &mut Vec<&'a str>, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            if is_currency_amount_object(map) {
                if let Some((canonical, true)) = keymap::lookup(path) {
                    if let Some(ccy) = map.get("Ccy").and_then(Value::as_str) {
                        pairs.push((format!("{canonical}_Currency"), ccy.to_string()));
                    }
                    if let Some(amt) = map.get("Amt") {
                        pairs.push((format!("{canonical}_Amount"), scalar_to_string(amt)));
                    }
                    return;
                }
            }
            for (key, child) in map {
                if key == "Signature" {
                    continue;
                }
                path.push(key.as_str());
                walk(child, path, pairs);
                path.pop();
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, path, pairs);
            }
        }
        Value::Null => {}
        scalar => {
            if let Some((canonical, _)) = keymap::lookup(path) {
                pairs.push((canonical.to_string(), scalar_to_string(scalar)));
            }
        }
    }
}

/// A `{"Amt": ..., "Ccy": ...}` object is the JSON rendering of an XML
/// currency-amount leaf (attribute + text content collapsed into siblings).
fn is_currency_amount_object(map: &Map<String, Value>) -> bool {
    map.len() == 2 && map.contains_key("Amt") && map.contains_key("Ccy")
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "BizMsgEnvlp": {
                "Header": {
                    "AppHdr": {
                        "Fr": {"FIId": {"FinInstnId": {"LEI": "AAAA00AA000"}}},
                        "To": {"FIId": {"FinInstnId": {"LEI": "BBBB00BB000"}}},
                        "BizMsgIdr": "BMI123",
                        "MsgDefIdr": "pacs.008.001.09"
                    }
                },
                "Body": {
                    "Document": {
                        "FIToFICstmrCdtTrf": {
                            "GrpHdr": {
                                "MsgId": "TEST123456789",
                                "CtrlSum": "100.00",
                                "IntrBkSttlmDt": "2026-07-28"
                            },
                            "CdtTrfTxInf": {
                                "PmtId": {"EndToEndId": "E2E-1", "UETR": "uetr-1"},
                                "IntrBkSttlmAmt": {"Amt": "100.00", "Ccy": "USD"}
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn extracts_expected_business_keys() {
        let value = sample();
        let bytes = serde_json::to_vec(&value).unwrap();
        let kvp = extract(&bytes).unwrap();
        assert_eq!(kvp.get("From_LEI").unwrap(), "AAAA00AA000");
        assert_eq!(kvp.get("To_LEI").unwrap(), "BBBB00BB000");
        assert_eq!(kvp.get("Payment_InterbankSettlementAmount_Amount").unwrap(), "100.00");
        assert_eq!(kvp.get("Payment_InterbankSettlementAmount_Currency").unwrap(), "USD");
    }

    #[test]
    fn signature_property_is_ignored() {
        let mut value = sample();
        value["BizMsgEnvlp"]["Header"]["AppHdr"]["Signature"] = json!("abc.def.ghi");
        let bytes = serde_json::to_vec(&value).unwrap();
        let kvp = extract(&bytes).unwrap();
        assert!(!kvp.values().any(|v| v == "abc.def.ghi"));
    }
}
