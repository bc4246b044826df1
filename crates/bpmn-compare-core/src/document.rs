/// Owned XML element tree used by the comparison engine.
///
/// Documents are parsed once with `roxmltree` and copied into an owned,
/// immutable tree so that matching and diffing never hold borrows into the
/// source text. Names are compared by `(namespace URI, local name)`; the
/// prefix a document happens to use is kept only for building XPath
/// locations that point back into that document.
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Namespace of the BPMN 2.0 semantic model.
pub const BPMN_MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

/// Namespace of XML Schema instance attributes (`xsi:schemaLocation`, ...).
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

// ---------------------------------------------------------------------------
// QName
// ---------------------------------------------------------------------------

/// A namespace-qualified XML name.
///
/// Equality and hashing consider only the namespace URI and the local name.
#[derive(Debug, Clone)]
pub struct QName {
    /// Namespace URI, if the name is in a namespace.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local: String,
    /// Prefix used in the source document, if any.
    pub prefix: Option<String>,
}

impl QName {
    /// Creates a name with no namespace and no prefix.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
            prefix: None,
        }
    }

    /// Returns the name as written in the source document (`prefix:local`).
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", self.local),
            Some(_) | None => self.local.clone(),
        }
    }

    /// Returns the prefix-independent form of the name: `local` when
    /// un-namespaced, `{namespace}local` otherwise.
    pub fn expanded(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{{{namespace}}}{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local == other.local
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

// ---------------------------------------------------------------------------
// Element tree
// ---------------------------------------------------------------------------

/// A single attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Attribute name.
    pub name: QName,
    /// Attribute value with entity references resolved.
    pub value: String,
}

/// An element with its attributes, direct text content and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element name.
    pub name: QName,
    /// Attributes in document order. Namespace declarations are not included.
    pub attributes: Vec<XmlAttribute>,
    /// Concatenated direct text children, `None` when there are none.
    pub text: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// 1-based line of the start tag.
    pub line: u32,
}

impl Element {
    /// Returns the value of the un-namespaced attribute `local`, if present.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.namespace.is_none() && a.name.local == local)
            .map(|a| a.value.as_str())
    }

    /// Returns the attribute with the given qualified name, if present.
    pub fn attribute_by_name(&self, name: &QName) -> Option<&XmlAttribute> {
        self.attributes.iter().find(|a| &a.name == name)
    }

    /// Returns `true` if the element has no child elements.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Visits this element and all of its descendants in document order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Element)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The document (root) element.
    pub root: Element,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// The input is not well-formed XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    /// Parser message.
    pub message: String,
    /// 1-based line of the error.
    pub line: u32,
    /// 1-based column of the error.
    pub column: u32,
}

impl From<roxmltree::Error> for ParseError {
    fn from(e: roxmltree::Error) -> Self {
        let pos = e.pos();
        Self {
            message: e.to_string(),
            line: pos.row,
            column: pos.col,
        }
    }
}

/// Parses `xml` into an owned [`Document`].
///
/// DTDs are rejected by the underlying parser; BPMN interchange files never
/// carry one.
///
/// # Errors
///
/// Returns [`ParseError`] with the position of the first syntax error.
pub fn parse_document(xml: &str) -> Result<Document, ParseError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = convert(&doc, doc.root_element());
    Ok(Document { root })
}

fn convert(doc: &roxmltree::Document<'_>, node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = qname(node, tag.namespace(), tag.name());

    let attributes = node
        .attributes()
        .map(|attr| XmlAttribute {
            name: qname(node, attr.namespace(), attr.name()),
            value: attr.value().to_owned(),
        })
        .collect();

    let mut text = String::new();
    let mut children = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(convert(doc, child));
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }

    Element {
        name,
        attributes,
        text: if text.is_empty() { None } else { Some(text) },
        children,
        line: doc.text_pos_at(node.range().start).row,
    }
}

fn qname(scope: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> QName {
    let prefix = namespace.and_then(|uri| scope.lookup_prefix(uri));
    QName {
        namespace: namespace.map(str::to_owned),
        local: local.to_owned(),
        prefix: prefix.map(str::to_owned),
    }
}
