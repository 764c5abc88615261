//! Arena-backed XML element tree with resolved namespaces.

use crate::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// Handle to an element owned by a [`Document`].
///
/// A handle records which document created it; handing it to any other
/// document (including one parsed later into the same owner) resolves to
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    document: u64,
    index: usize,
}

/// A child of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(NodeId),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Element {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
    /// Raw attributes as written, including `xmlns` declarations.
    attributes: Vec<(String, String)>,
    content: Vec<Content>,
    parent: Option<NodeId>,
}

impl Element {
    fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }
}

/// An ordered XML tree with a single root element.
///
/// The document owns every element; callers hold [`NodeId`] handles that
/// stay valid for the lifetime of the document (elements are never removed).
/// Read accessors treat a handle from another document as absent.
#[derive(Debug, Clone)]
pub struct Document {
    id: u64,
    elements: Vec<Element>,
    root: NodeId,
}

impl Document {
    /// Create a document holding only a root element that declares
    /// `namespace` as its default namespace.
    pub fn new_with_root(local: &str, namespace: Option<&str>) -> Self {
        let attributes = namespace
            .map(|ns| vec![("xmlns".to_string(), ns.to_string())])
            .unwrap_or_default();
        let root = Element {
            prefix: None,
            local: local.to_string(),
            namespace: namespace.map(str::to_string),
            attributes,
            content: Vec::new(),
            parent: None,
        };
        let id = NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed);
        Self {
            id,
            elements: vec![root],
            root: NodeId {
                document: id,
                index: 0,
            },
        }
    }

    /// Parse XML text into a document.
    pub fn parse(text: &str) -> Result<Self> {
        let document = NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed);
        let mut reader = Reader::from_str(text);
        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut scopes: Vec<Vec<(String, String)>> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| Error::Parse(format!("{} at byte {}", e, reader.buffer_position())))?;
            match event {
                Event::Start(start) => {
                    let id = open_element(document, &mut elements, &mut scopes, &start, stack.last().copied())?;
                    attach(&mut elements, &mut root, stack.last().copied(), id)?;
                    stack.push(id);
                }
                Event::Empty(start) => {
                    let id = open_element(document, &mut elements, &mut scopes, &start, stack.last().copied())?;
                    attach(&mut elements, &mut root, stack.last().copied(), id)?;
                    scopes.pop();
                }
                Event::End(_) => {
                    stack.pop();
                    scopes.pop();
                }
                Event::Text(text) => {
                    let value = text.unescape()?;
                    if value.trim().is_empty() {
                        continue;
                    }
                    match stack.last() {
                        Some(parent) => elements[parent.index]
                            .content
                            .push(Content::Text(value.into_owned())),
                        None => {
                            return Err(Error::Parse(
                                "text content outside the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::CData(data) => {
                    let value = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| Error::Parse(e.to_string()))?;
                    if let Some(parent) = stack.last() {
                        elements[parent.index].content.push(Content::Text(value));
                    }
                }
                Event::Comment(comment) => {
                    if let Some(parent) = stack.last() {
                        let value = String::from_utf8_lossy(&comment).into_owned();
                        elements[parent.index].content.push(Content::Comment(value));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(Error::Parse(format!(
                "unclosed element <{}>",
                elements[open.index].qualified_name()
            )));
        }
        let root = root.ok_or_else(|| Error::Parse("document has no root element".to_string()))?;

        debug!("Parsed XML document with {} elements", elements.len());
        Ok(Self {
            id: document,
            elements,
            root,
        })
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` was handed out by this document.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: NodeId) -> Option<&Element> {
        if id.document == self.id {
            self.elements.get(id.index)
        } else {
            None
        }
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    fn get_mut(&mut self, id: NodeId) -> &mut Element {
        assert_eq!(id.document, self.id, "node handle from another document");
        &mut self.elements[id.index]
    }

    /// Local name; empty for a handle from another document.
    pub fn local_name(&self, id: NodeId) -> &str {
        self.get(id).map(|e| e.local.as_str()).unwrap_or_default()
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.prefix.as_deref()
    }

    /// Resolved namespace URI of the element, if any.
    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.namespace.as_deref()
    }

    /// Name as written, `prefix:local` or just `local`.
    pub fn qualified_name(&self, id: NodeId) -> String {
        self.get(id).map(Element::qualified_name).unwrap_or_default()
    }

    /// Value of the attribute with exactly this name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All attributes in source order.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.get(id)
            .into_iter()
            .flat_map(|e| e.attributes.iter())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Set an attribute, replacing the value in place when it already exists.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let attributes = &mut self.get_mut(id).attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn content(&self, id: NodeId) -> &[Content] {
        self.get(id).map(|e| e.content.as_slice()).unwrap_or_default()
    }

    /// Element children in document order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.content(id).iter().filter_map(|c| match c {
            Content::Element(child) => Some(*child),
            _ => None,
        })
    }

    /// Concatenated direct text children.
    pub fn text(&self, id: NodeId) -> String {
        self.content(id)
            .iter()
            .filter_map(|c| match c {
                Content::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All descendant elements in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).collect();
        pending.reverse();
        while let Some(next) = pending.pop() {
            out.push(next);
            let mut children: Vec<NodeId> = self.children(next).collect();
            children.reverse();
            pending.extend(children);
        }
        out
    }

    /// Descendants whose local name matches, regardless of namespace.
    pub fn descendants_by_local_name(&self, id: NodeId, local: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.local_name(*d) == local)
            .collect()
    }

    /// Position of every element in document order.
    pub(crate) fn document_positions(&self) -> HashMap<NodeId, usize> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect()
    }

    /// Append a new last child element. It inherits the parent's prefix and
    /// namespace, so it serializes unqualified under a default namespace and
    /// is visible to namespace-scoped queries straight away.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this document.
    pub fn append_element(&mut self, parent: NodeId, local: &str) -> NodeId {
        let id = NodeId {
            document: self.id,
            index: self.elements.len(),
        };
        let (prefix, namespace) = {
            let p = self.get_mut(parent);
            (p.prefix.clone(), p.namespace.clone())
        };
        self.elements.push(Element {
            prefix,
            local: local.to_string(),
            namespace,
            attributes: Vec::new(),
            content: Vec::new(),
            parent: Some(parent),
        });
        self.get_mut(parent).content.push(Content::Element(id));
        id
    }

    /// Serialize with two-space indentation and an XML declaration.
    pub fn to_xml(&self) -> Result<String> {
        self.write(Writer::new_with_indent(Vec::new(), b' ', 2))
    }

    /// Serialize without any added whitespace.
    pub fn to_xml_compact(&self) -> Result<String> {
        self.write(Writer::new(Vec::new()))
    }

    fn write(&self, mut writer: Writer<Vec<u8>>) -> Result<String> {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        self.write_element(&mut writer, self.root)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Other(e.to_string()))
    }

    fn write_element(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let element = &self.elements[id.index];
        let name = element.qualified_name();
        let mut start = BytesStart::new(name.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if element.content.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }

        writer.write_event(Event::Start(start)).map_err(write_error)?;
        for child in &element.content {
            match child {
                Content::Element(child) => self.write_element(writer, *child)?,
                Content::Text(text) => writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_error)?,
                Content::Comment(comment) => writer
                    .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
                    .map_err(write_error)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(name.as_str())))
            .map_err(write_error)
    }
}

fn write_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Other(format!("failed to write XML: {}", e))
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn resolve_prefix(scopes: &[Vec<(String, String)>], prefix: &str) -> Option<String> {
    if prefix == "xml" {
        return Some(XML_NAMESPACE.to_string());
    }
    scopes
        .iter()
        .rev()
        .flat_map(|scope| scope.iter())
        .find(|(bound, _)| bound == prefix)
        .map(|(_, uri)| uri.clone())
}

fn open_element(
    document: u64,
    elements: &mut Vec<Element>,
    scopes: &mut Vec<Vec<(String, String)>>,
    start: &BytesStart<'_>,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    let qname = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Parse(e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    let mut bindings = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            bindings.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            bindings.push((prefix.to_string(), value.clone()));
        }
        attributes.push((key, value));
    }
    scopes.push(bindings);

    let (prefix, local) = split_qname(&qname);
    let namespace = match prefix {
        Some(p) => Some(
            resolve_prefix(scopes, p)
                .ok_or_else(|| Error::Parse(format!("unbound namespace prefix '{}'", p)))?,
        ),
        None => resolve_prefix(scopes, "").filter(|uri| !uri.is_empty()),
    };

    let id = NodeId {
        document,
        index: elements.len(),
    };
    elements.push(Element {
        prefix: prefix.map(str::to_string),
        local: local.to_string(),
        namespace,
        attributes,
        content: Vec::new(),
        parent,
    });
    Ok(id)
}

fn attach(
    elements: &mut [Element],
    root: &mut Option<NodeId>,
    parent: Option<NodeId>,
    id: NodeId,
) -> Result<()> {
    match parent {
        Some(parent) => elements[parent.index].content.push(Content::Element(id)),
        None if root.is_none() => *root = Some(id),
        None => return Err(Error::Parse("multiple root elements".to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:descriptor xmlns:d="urn:test:descriptor" bundleId="demo">
  <d:class localId="Thing">
    <label key="thing" inDefaultLocale="Thing &amp; Co"/>
    <!-- plural follows -->
    <d:pluralLabel key="things" inDefaultLocale="Things"/>
  </d:class>
  <note xmlns="urn:test:other">free <![CDATA[text]]></note>
</d:descriptor>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root();
        assert_eq!(doc.local_name(root), "descriptor");
        assert_eq!(doc.prefix(root), Some("d"));
        assert_eq!(doc.namespace(root), Some("urn:test:descriptor"));
        assert_eq!(doc.attribute(root, "bundleId"), Some("demo"));

        let children: Vec<NodeId> = doc.children(root).collect();
        assert_eq!(children.len(), 2);
        let class = children[0];
        let label = doc.children(class).next().unwrap();
        assert_eq!(doc.local_name(label), "label");
        assert_eq!(doc.namespace(label), None);
        assert_eq!(doc.attribute(label, "inDefaultLocale"), Some("Thing & Co"));

        let note = children[1];
        assert_eq!(doc.namespace(note), Some("urn:test:other"));
        assert_eq!(doc.text(note), "free text");
    }

    #[test]
    fn test_comments_are_kept_in_order() {
        let doc = Document::parse(SAMPLE).unwrap();
        let class = doc.children(doc.root()).next().unwrap();
        assert!(matches!(doc.content(class)[1], Content::Comment(_)));
    }

    #[test]
    fn test_descendants_by_local_name_ignores_namespace() {
        let doc = Document::parse(SAMPLE).unwrap();
        let labels = doc.descendants_by_local_name(doc.root(), "label");
        let plurals = doc.descendants_by_local_name(doc.root(), "pluralLabel");
        assert_eq!(labels.len(), 1);
        assert_eq!(plurals.len(), 1);
    }

    #[test]
    fn test_malformed_input_is_a_parse_error() {
        for bad in [
            "<a><b></a>",
            "<a>",
            "",
            "<a/><b/>",
            "<p:a/>",
            "<a x='1' x='2'/>",
        ] {
            let err = Document::parse(bad).unwrap_err();
            assert!(matches!(err, Error::Parse(_)), "{:?} gave {:?}", bad, err);
        }
    }

    #[test]
    fn test_append_element_inherits_namespace() {
        let mut doc = Document::new_with_root("doc", Some("urn:flow"));
        let child = doc.append_element(doc.root(), "assets");
        assert_eq!(doc.namespace(child), Some("urn:flow"));
        assert_eq!(doc.parent(child), Some(doc.root()));
        doc.set_attribute(child, "n", "1");
        doc.set_attribute(child, "n", "2");
        assert_eq!(doc.attributes(child).collect::<Vec<_>>(), vec![("n", "2")]);
    }

    #[test]
    fn test_handle_from_other_document_is_absent() {
        let mut first = Document::new_with_root("doc", Some("urn:flow"));
        let root = first.root();
        let mut last = root;
        for _ in 0..4 {
            last = first.append_element(root, "asset");
        }
        first.set_attribute(last, "ID", "a4");

        let second = Document::parse(
            r#"<doc xmlns="urn:flow"><a/><b/><c/><d/><e ID="x"/></doc>"#,
        )
        .unwrap();
        assert!(first.contains(last));
        assert!(!second.contains(last));
        assert!(!second.contains(first.root()));
        assert_eq!(second.attribute(last, "ID"), None);
        assert_eq!(second.local_name(last), "");
        assert_eq!(second.parent(last), None);
        assert_eq!(second.children(root).count(), 0);
        assert!(second.content(last).is_empty());
    }

    #[test]
    fn test_serialize_reparses_to_same_structure() {
        let doc = Document::parse(SAMPLE).unwrap();
        let xml = doc.to_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("Thing &amp; Co"));

        let again = Document::parse(&xml).unwrap();
        assert_eq!(
            again.descendants(again.root()).len(),
            doc.descendants(doc.root()).len()
        );
        assert_eq!(again.to_xml().unwrap(), xml);
    }

    #[test]
    fn test_compact_output_has_no_indentation() {
        let mut doc = Document::new_with_root("doc", Some("urn:flow"));
        doc.append_element(doc.root(), "assets");
        let xml = doc.to_xml_compact().unwrap();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><doc xmlns="urn:flow"><assets/></doc>"#
        );
    }
}
