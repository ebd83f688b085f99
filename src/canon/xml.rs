//! XML C14N 1.1 (exclusive, comments removed) canonicalizer (SPEC_FULL.md §4.1).
//!
//! Parses into an owned, tagged-variant tree (`XmlNode`) rather than walking
//! parser events ad hoc at every call site — this is the Design Note §9
//! re-architecture of "dynamic DOM walking with runtime type checks" into an
//! exhaustively-matchable tree. One tree is built and discarded per call; no
//! parser state is cached across calls.

use crate::error::{CoreError, MessageFormat};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// W3C XML namespace for `xml:` attributes (never subject to xmlns resolution).
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An attribute, with its namespace prefix resolved against the scope active
/// at the point it was declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

/// One node of the owned XML tree. Exhaustive match, no runtime type checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element {
        prefix: Option<String>,
        local_name: String,
        namespace: Option<String>,
        /// Namespace declarations introduced at this element (prefix, uri);
        /// `prefix = None` denotes the default namespace.
        namespace_decls: Vec<(Option<String>, String)>,
        attributes: Vec<XmlAttribute>,
        children: Vec<XmlNode>,
    },
    Text(String),
    Comment(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<(&str, Option<&str>, &[XmlNode])> {
        match self {
            XmlNode::Element {
                local_name,
                namespace,
                children,
                ..
            } => Some((local_name.as_str(), namespace.as_deref(), children.as_slice())),
            _ => None,
        }
    }

    pub fn local_name(&self) -> Option<&str> {
        match self {
            XmlNode::Element { local_name, .. } => Some(local_name.as_str()),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            XmlNode::Element { namespace, .. } => namespace.as_deref(),
            _ => None,
        }
    }

    pub fn children(&self) -> &[XmlNode] {
        match self {
            XmlNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// An element is a leaf for KVP-extraction purposes when none of its
    /// children are themselves elements.
    pub fn is_leaf_element(&self) -> bool {
        self.children()
            .iter()
            .all(|c| !matches!(c, XmlNode::Element { .. }))
    }

    /// Concatenated text content of direct `Text` children.
    pub fn text_content(&self) -> String {
        self.children()
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// An unprefixed attribute by local name (namespace does not apply to
    /// unprefixed attributes per the XML Namespaces spec).
    pub fn attr(&self, local_name: &str) -> Option<&str> {
        match self {
            XmlNode::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.prefix.is_none() && a.local_name == local_name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    pub fn attr_any_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<&str> {
        match self {
            XmlNode::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.namespace.as_deref() == namespace && a.local_name == local_name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Depth-first search for the first descendant (including self) element
    /// matching `namespace` (if given) and `local_name`.
    pub fn find<'a>(&'a self, namespace: Option<&str>, local_name: &str) -> Option<&'a XmlNode> {
        if let XmlNode::Element {
            local_name: ln,
            namespace: ns,
            ..
        } = self
        {
            let ns_ok = match namespace {
                Some(want) => ns.as_deref() == Some(want),
                None => true,
            };
            if ns_ok && ln == local_name {
                return Some(self);
            }
        }
        for child in self.children() {
            if let Some(found) = child.find(namespace, local_name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_all<'a>(&'a self, namespace: Option<&str>, local_name: &str, out: &mut Vec<&'a XmlNode>) {
        if let XmlNode::Element {
            local_name: ln,
            namespace: ns,
            ..
        } = self
        {
            let ns_ok = match namespace {
                Some(want) => ns.as_deref() == Some(want),
                None => true,
            };
            if ns_ok && ln == local_name {
                out.push(self);
            }
        }
        for child in self.children() {
            child.find_all(namespace, local_name, out);
        }
    }

    /// Return a clone of this tree with every direct-or-nested element whose
    /// (namespace, local_name) matches removed — used to strip `ds:Signature`
    /// before computing a reference digest (enveloped-signature transform).
    pub fn without_element(&self, namespace: &str, local_name: &str) -> XmlNode {
        match self {
            XmlNode::Element {
                prefix,
                local_name: ln,
                namespace: ns,
                namespace_decls,
                attributes,
                children,
            } => XmlNode::Element {
                prefix: prefix.clone(),
                local_name: ln.clone(),
                namespace: ns.clone(),
                namespace_decls: namespace_decls.clone(),
                attributes: attributes.clone(),
                children: children
                    .iter()
                    .filter(|c| {
                        !matches!(c, XmlNode::Element { local_name: cl, namespace: cns, .. }
                            if cl == local_name && cns.as_deref() == Some(namespace))
                    })
                    .map(|c| c.without_element(namespace, local_name))
                    .collect(),
            },
            other => other.clone(),
        }
    }

    /// Insert `child` as the last child of the first descendant element
    /// matching `namespace`/`local_name`. Returns `None` if not found.
    pub fn with_child_appended(&self, namespace: Option<&str>, local_name: &str, child: XmlNode) -> Option<XmlNode> {
        match self {
            XmlNode::Element {
                prefix,
                local_name: ln,
                namespace: ns,
                namespace_decls,
                attributes,
                children,
            } => {
                let ns_ok = match namespace {
                    Some(want) => ns.as_deref() == Some(want),
                    None => true,
                };
                if ns_ok && ln == local_name {
                    let mut new_children = children.clone();
                    new_children.push(child);
                    return Some(XmlNode::Element {
                        prefix: prefix.clone(),
                        local_name: ln.clone(),
                        namespace: ns.clone(),
                        namespace_decls: namespace_decls.clone(),
                        attributes: attributes.clone(),
                        children: new_children,
                    });
                }
                for (i, c) in children.iter().enumerate() {
                    if let Some(updated) = c.with_child_appended(namespace, local_name, child.clone()) {
                        let mut new_children = children.clone();
                        new_children[i] = updated;
                        return Some(XmlNode::Element {
                            prefix: prefix.clone(),
                            local_name: ln.clone(),
                            namespace: ns.clone(),
                            namespace_decls: namespace_decls.clone(),
                            attributes: attributes.clone(),
                            children: new_children,
                        });
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Return a clone with an `Id` attribute added to this element if absent.
    pub fn with_stable_id(&self, id: &str) -> XmlNode {
        match self {
            XmlNode::Element {
                prefix,
                local_name,
                namespace,
                namespace_decls,
                attributes,
                children,
            } => {
                let mut attrs = attributes.clone();
                if !attrs.iter().any(|a| a.local_name == "Id") {
                    attrs.push(XmlAttribute {
                        prefix: None,
                        local_name: "Id".to_string(),
                        namespace: None,
                        value: id.to_string(),
                    });
                }
                XmlNode::Element {
                    prefix: prefix.clone(),
                    local_name: local_name.clone(),
                    namespace: namespace.clone(),
                    namespace_decls: namespace_decls.clone(),
                    attributes: attrs,
                    children: children.clone(),
                }
            }
            other => other.clone(),
        }
    }
}

/// A partially-built element, pushed on `stack` between its `Start` and
/// matching `End` event.
struct OpenElement {
    prefix: Option<String>,
    local_name: String,
    namespace: Option<String>,
    namespace_decls: Vec<(Option<String>, String)>,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlNode>,
}

/// Split a raw start/empty-tag's attributes into namespace declarations and
/// ordinary attributes, resolve the element's own namespace against the
/// scope formed by merging those declarations onto the parent scope, and
/// push the new scope / open frame.
fn open_element(
    reader: &Reader<&[u8]>,
    e: &quick_xml::events::BytesStart<'_>,
    scope_stack: &mut Vec<HashMap<Option<String>, String>>,
) -> Result<OpenElement, CoreError> {
    let raw_name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let (raw_prefix, raw_local) = split_qname(&raw_name);

    let mut new_decls = Vec::new();
    let mut raw_attrs: Vec<(String, String)> = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| CoreError::InvalidFormat {
            format: MessageFormat::Xml,
            reason: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map(|v| v.to_string())
            .unwrap_or_default();
        if key == "xmlns" {
            new_decls.push((None, value));
        } else if let Some(p) = key.strip_prefix("xmlns:") {
            new_decls.push((Some(p.to_string()), value));
        } else {
            raw_attrs.push((key, value));
        }
    }

    let mut scope = scope_stack.last().cloned().unwrap_or_default();
    for (p, uri) in &new_decls {
        scope.insert(p.clone(), uri.clone());
    }

    let element_ns = if raw_prefix == "xml" {
        Some(XML_NS.to_string())
    } else {
        scope.get(&raw_prefix_key(&raw_prefix)).cloned()
    };

    let mut attributes = Vec::new();
    for (key, value) in raw_attrs {
        let (p, local) = split_qname(&key);
        let ns = if p.is_empty() {
            None
        } else if p == "xml" {
            Some(XML_NS.to_string())
        } else {
            scope.get(&Some(p.clone())).cloned()
        };
        attributes.push(XmlAttribute {
            prefix: if p.is_empty() { None } else { Some(p) },
            local_name: local,
            namespace: ns,
            value,
        });
    }

    let prefix = if raw_prefix.is_empty() { None } else { Some(raw_prefix) };
    scope_stack.push(scope);

    Ok(OpenElement {
        prefix,
        local_name: raw_local,
        namespace: element_ns,
        namespace_decls: new_decls,
        attributes,
        children: Vec::new(),
    })
}

/// Attach a finished node to its parent's children, or set it as `root` if
/// the stack is now empty.
fn attach(stack: &mut [OpenElement], root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}

/// Parse well-formed XML bytes into an owned tree rooted at the document
/// element. Namespace declarations are resolved against a scope stack built
/// during descent; comments are dropped immediately (C14N removes them).
pub fn parse(xml: &[u8]) -> Result<XmlNode, CoreError> {
    let text = std::str::from_utf8(xml).map_err(|e| CoreError::InvalidFormat {
        format: MessageFormat::Xml,
        reason: format!("not valid UTF-8: {e}"),
    })?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut scope_stack: Vec<HashMap<Option<String>, String>> = vec![HashMap::new()];
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| CoreError::InvalidFormat {
            format: MessageFormat::Xml,
            reason: e.to_string(),
        })?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                let open = open_element(&reader, &e, &mut scope_stack)?;
                stack.push(open);
            }
            Event::Empty(e) => {
                let open = open_element(&reader, &e, &mut scope_stack)?;
                scope_stack.pop();
                let node = XmlNode::Element {
                    prefix: open.prefix,
                    local_name: open.local_name,
                    namespace: open.namespace,
                    namespace_decls: open.namespace_decls,
                    attributes: open.attributes,
                    children: open.children,
                };
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let open = stack.pop().ok_or_else(|| CoreError::InvalidFormat {
                    format: MessageFormat::Xml,
                    reason: "unmatched closing tag".to_string(),
                })?;
                scope_stack.pop();
                let node = XmlNode::Element {
                    prefix: open.prefix,
                    local_name: open.local_name,
                    namespace: open.namespace,
                    namespace_decls: open.namespace_decls,
                    attributes: open.attributes,
                    children: open.children,
                };
                attach(&mut stack, &mut root, node);
            }
            Event::Text(t) => {
                let text = t.decode().map_err(|e| CoreError::InvalidFormat {
                    format: MessageFormat::Xml,
                    reason: e.to_string(),
                })?;
                if !text.is_empty() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.to_string()));
                    }
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t.into_inner()).to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Comment(_) => {
                // C14N with comments removed: drop entirely, never enters the tree.
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| CoreError::InvalidFormat {
        format: MessageFormat::Xml,
        reason: "no root element".to_string(),
    })
}

fn raw_prefix_key(p: &str) -> Option<String> {
    if p.is_empty() {
        None
    } else {
        Some(p.to_string())
    }
}

fn split_qname(qname: &str) -> (String, String) {
    match qname.split_once(':') {
        Some((p, l)) => (p.to_string(), l.to_string()),
        None => (String::new(), qname.to_string()),
    }
}

/// Parse then canonicalize in one step.
pub fn canonicalize_bytes(xml: &[u8]) -> Result<Vec<u8>, CoreError> {
    let tree = parse(xml)?;
    Ok(canonicalize(&tree))
}

/// The namespace bindings in effect at a point in the output tree: the
/// default namespace (if any) and the URI each prefix is currently bound
/// to. Threaded down the recursion so each declaration can be compared
/// against what an ancestor already rendered, rather than against what the
/// input happened to declare at that exact element.
#[derive(Clone, Default)]
struct NsScope {
    default_ns: Option<String>,
    prefixes: std::collections::BTreeMap<String, String>,
}

impl NsScope {
    fn default_is(&self, ns: Option<&str>) -> bool {
        self.default_ns.as_deref() == ns
    }

    fn prefix_is(&self, prefix: &str, ns: &str) -> bool {
        self.prefixes.get(prefix).map(String::as_str) == Some(ns)
    }
}

/// Serialize a tree to exclusive C14N 1.1 bytes: explicit open/close tags
/// (never self-closing), attributes sorted by (namespace, local name), and
/// comments excluded (they were already dropped at parse time).
///
/// Namespace declarations are minimized per C14N 1.1 §2.1: a declaration is
/// emitted only at the first element (in document order) whose own name or
/// an attribute's name actually requires that prefix/default binding and
/// the binding isn't already in scope from an ancestor. The element's own
/// `namespace_decls` (what the input happened to declare at that node) is
/// not copied to the output — two inputs that bind the same prefix to the
/// same URI at different depths must canonicalize identically.
pub fn canonicalize(node: &XmlNode) -> Vec<u8> {
    let mut out = Vec::new();
    write_node(node, &mut out, &NsScope::default());
    out
}

fn write_node(node: &XmlNode, out: &mut Vec<u8>, scope: &NsScope) {
    match node {
        XmlNode::Comment(_) => {}
        XmlNode::Text(s) => out.extend_from_slice(escape_text(s).as_bytes()),
        XmlNode::Element {
            prefix,
            local_name,
            namespace,
            attributes,
            children,
            ..
        } => {
            let qname = qualified_name(prefix.as_deref(), local_name);
            out.push(b'<');
            out.extend_from_slice(qname.as_bytes());

            let mut new_scope = scope.clone();
            let mut decls: Vec<(Option<String>, String)> = Vec::new();

            match prefix {
                None => {
                    if !scope.default_is(namespace.as_deref()) {
                        let value = namespace.clone().unwrap_or_default();
                        new_scope.default_ns = namespace.clone();
                        decls.push((None, value));
                    }
                }
                Some(p) if p == "xml" => {}
                Some(p) => {
                    if let Some(ns) = namespace {
                        if !scope.prefix_is(p, ns) {
                            new_scope.prefixes.insert(p.clone(), ns.clone());
                            decls.push((Some(p.clone()), ns.clone()));
                        }
                    }
                }
            }

            let mut attrs: Vec<&XmlAttribute> = attributes.iter().collect();
            attrs.sort_by(|a, b| {
                let ns_a = a.namespace.as_deref().unwrap_or("");
                let ns_b = b.namespace.as_deref().unwrap_or("");
                ns_a.cmp(ns_b).then_with(|| a.local_name.cmp(&b.local_name))
            });

            for attr in &attrs {
                if let Some(p) = &attr.prefix {
                    if p == "xml" {
                        continue;
                    }
                    if let Some(ns) = &attr.namespace {
                        if !new_scope.prefix_is(p, ns) {
                            new_scope.prefixes.insert(p.clone(), ns.clone());
                            decls.push((Some(p.clone()), ns.clone()));
                        }
                    }
                }
            }

            decls.sort_by(|a, b| match (&a.0, &b.0) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => x.cmp(y),
            });
            for (p, uri) in &decls {
                out.push(b' ');
                match p {
                    None => out.extend_from_slice(b"xmlns"),
                    Some(p) => {
                        out.extend_from_slice(b"xmlns:");
                        out.extend_from_slice(p.as_bytes());
                    }
                }
                out.extend_from_slice(b"=\"");
                out.extend_from_slice(escape_attr(uri).as_bytes());
                out.push(b'"');
            }

            for attr in attrs {
                let qname = qualified_name(attr.prefix.as_deref(), &attr.local_name);
                out.push(b' ');
                out.extend_from_slice(qname.as_bytes());
                out.extend_from_slice(b"=\"");
                out.extend_from_slice(escape_attr(&attr.value).as_bytes());
                out.push(b'"');
            }
            out.push(b'>');

            for child in children {
                write_node(child, out, &new_scope);
            }

            out.extend_from_slice(b"</");
            out.extend_from_slice(qname.as_bytes());
            out.push(b'>');
        }
    }
}

fn qualified_name(prefix: Option<&str>, local_name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local_name}"),
        None => local_name.to_string(),
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('\r', "&#xD;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
        .replace('\t', "&#x9;")
        .replace('\n', "&#xA;")
        .replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_element() {
        let xml = br#"<root xmlns="urn:test" a="1"><child>text</child></root>"#;
        let tree = parse(xml).unwrap();
        let (local, ns, children) = tree.as_element().unwrap();
        assert_eq!(local, "root");
        assert_eq!(ns, Some("urn:test"));
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn comments_are_dropped() {
        let xml = br#"<root><!-- a comment --><child/></root>"#;
        let tree = parse(xml).unwrap();
        let canonical = canonicalize(&tree);
        assert!(!String::from_utf8_lossy(&canonical).contains("comment"));
    }

    #[test]
    fn empty_elements_become_explicit_tags() {
        let xml = br#"<root><child/></root>"#;
        let tree = parse(xml).unwrap();
        let canonical = String::from_utf8(canonicalize(&tree)).unwrap();
        assert_eq!(canonical, "<root><child></child></root>");
    }

    #[test]
    fn attributes_sorted_lexicographically() {
        let xml = br#"<root z="1" a="2"/>"#;
        let tree = parse(xml).unwrap();
        let canonical = String::from_utf8(canonicalize(&tree)).unwrap();
        assert_eq!(canonical, r#"<root a="2" z="1"></root>"#);
    }

    #[test]
    fn namespace_prefix_round_trip() {
        let xml = br#"<ns:root xmlns:ns="urn:test"><ns:child>1</ns:child></ns:root>"#;
        let tree = parse(xml).unwrap();
        let canonical = String::from_utf8(canonicalize(&tree)).unwrap();
        assert_eq!(canonical, r#"<ns:root xmlns:ns="urn:test"><ns:child>1</ns:child></ns:root>"#);
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let xml = br#"<root b="2" a="1"><x>hi</x></root>"#;
        let once = canonicalize_bytes(xml).unwrap();
        let twice = canonicalize_bytes(xml).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unused_namespace_declaration_is_dropped() {
        let xml = br#"<root xmlns:unused="urn:unused"><child>1</child></root>"#;
        let tree = parse(xml).unwrap();
        let canonical = String::from_utf8(canonicalize(&tree)).unwrap();
        assert_eq!(canonical, "<root><child>1</child></root>");
    }

    #[test]
    fn same_binding_declared_at_different_depths_canonicalizes_identically() {
        let declared_on_parent = br#"<root xmlns:h="urn:h"><outer><h:leaf>1</h:leaf></outer></root>"#;
        let declared_on_leaf = br#"<root><outer><h:leaf xmlns:h="urn:h">1</h:leaf></outer></root>"#;

        let a = canonicalize_bytes(declared_on_parent).unwrap();
        let b = canonicalize_bytes(declared_on_leaf).unwrap();
        assert_eq!(a, b, "declaration depth must not affect canonical bytes");
        assert_eq!(
            String::from_utf8(a).unwrap(),
            r#"<root><outer><h:leaf xmlns:h="urn:h">1</h:leaf></outer></root>"#
        );
    }

    #[test]
    fn without_element_strips_signature() {
        let xml = br#"<root><a>1</a><ds:Signature xmlns:ds="urn:ds">sig</ds:Signature></root>"#;
        let tree = parse(xml).unwrap();
        let stripped = tree.without_element("urn:ds", "Signature");
        assert!(stripped.find(Some("urn:ds"), "Signature").is_none());
        assert!(stripped.find(None, "a").is_some());
    }

    #[test]
    fn with_stable_id_adds_attribute_once() {
        let xml = br#"<root><child/></root>"#;
        let tree = parse(xml).unwrap();
        let with_id = tree.with_stable_id("sig-1");
        assert_eq!(with_id.attr("Id"), Some("sig-1"));
        let again = with_id.with_stable_id("sig-2");
        assert_eq!(again.attr("Id"), Some("sig-1"));
    }
}
