//! XML-side Key-Value-Pair extractor (SPEC_FULL.md §4.2).

use super::keymap;
use crate::canon::xml::{self, XmlNode};
use crate::error::CoreError;

pub fn extract(xml: &[u8]) -> Result<super::KvpSet, CoreError> {
    let tree = xml::parse(xml)?;
    let mut pairs = Vec::new();
    let mut path: Vec<&str> = Vec::new();
    walk(&tree, &mut path, &mut pairs);
    Ok(super::finalize(pairs))
}

fn walk<'a>(node: &'a XmlNode, path: &mut Vec<&'a str>, pairs: &mut Vec<(String, String)>) {
    let (local_name, children) = match node {
        XmlNode::Element {
            local_name,
            children,
            ..
        } => (local_name.as_str(), children),
        _ => return,
    };

    path.push(local_name);

    if keymap::is_structural(local_name) {
        for child in children {
            walk(child, path, pairs);
        }
        path.pop();
        return;
    }

    if node.is_leaf_element() {
        if let Some((canonical, is_currency_amount)) = keymap::lookup(path) {
            if is_currency_amount {
                if let Some(ccy) = node.attr("Ccy") {
                    pairs.push((format!("{canonical}_Currency"), ccy.to_string()));
                }
                pairs.push((format!("{canonical}_Amount"), node.text_content()));
            } else {
                pairs.push((canonical.to_string(), node.text_content()));
            }
        }
        path.pop();
        return;
    }

    for child in children {
        walk(child, path, pairs);
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"<BizMsgEnvlp xmlns="urn:iso:std:iso:20022:tech:xsd:pacs.008.001.09">
        <Header xmlns:h="urn:iso:std:iso:20022:tech:xsd:head.001.001.02">
            <h:AppHdr>
                <h:Fr><h:FIId><h:FinInstnId><h:LEI>AAAA00AA000</h:LEI></h:FinInstnId></h:FIId></h:Fr>
                <h:To><h:FIId><h:FinInstnId><h:LEI>BBBB00BB000</h:LEI></h:FinInstnId></h:FIId></h:To>
                <h:BizMsgIdr>BMI123</h:BizMsgIdr>
                <h:MsgDefIdr>pacs.008.001.09</h:MsgDefIdr>
            </h:AppHdr>
        </Header>
        <Body>
            <Document>
                <FIToFICstmrCdtTrf>
                    <GrpHdr>
                        <MsgId>TEST123456789</MsgId>
                        <CtrlSum>100.00</CtrlSum>
                        <IntrBkSttlmDt>2026-07-28</IntrBkSttlmDt>
                    </GrpHdr>
                    <CdtTrfTxInf>
                        <PmtId>
                            <EndToEndId>E2E-1</EndToEndId>
                            <UETR>uetr-1</UETR>
                        </PmtId>
                        <IntrBkSttlmAmt Ccy="USD">100.00</IntrBkSttlmAmt>
                    </CdtTrfTxInf>
                </FIToFICstmrCdtTrf>
            </Document>
        </Body>
    </BizMsgEnvlp>"#;

    #[test]
    fn extracts_expected_business_keys() {
        let kvp = extract(SAMPLE).unwrap();
        assert_eq!(kvp.get("From_LEI").unwrap(), "AAAA00AA000");
        assert_eq!(kvp.get("To_LEI").unwrap(), "BBBB00BB000");
        assert_eq!(kvp.get("BusinessMessageIdentifier").unwrap(), "BMI123");
        assert_eq!(kvp.get("GroupHeader_MessageId").unwrap(), "TEST123456789");
        assert_eq!(kvp.get("Payment_EndToEndId").unwrap(), "E2E-1");
        assert_eq!(kvp.get("Payment_UETR").unwrap(), "uetr-1");
        assert_eq!(kvp.get("Payment_InterbankSettlementAmount_Amount").unwrap(), "100.00");
        assert_eq!(kvp.get("Payment_InterbankSettlementAmount_Currency").unwrap(), "USD");
    }

    #[test]
    fn structural_names_never_appear_as_keys() {
        let kvp = extract(SAMPLE).unwrap();
        for name in keymap::STRUCTURAL_ELEMENT_NAMES {
            assert!(!kvp.contains_key(*name));
        }
    }
}
