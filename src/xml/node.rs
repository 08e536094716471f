//! Arena node model for parsed markup documents.
//!
//! Nodes are stored in a flat arena owned by [`crate::xml::Document`]; a
//! `NodeId` is a compact index into it and is only meaningful against the
//! document it came from.

/// Compact node identifier (index into the document arena).
pub type NodeId = u32;

/// A node in the arena: parent link plus kind-specific payload.
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (None for the synthetic document root and for
    /// detached nodes).
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// Kind-specific payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Named element with ordered children.
    Element(ElementData),
    /// Raw text run. Significant for formatting even when domain logic
    /// ignores it; also used for processing instructions and DOCTYPE
    /// declarations, which round-trip as opaque bytes.
    Text(String),
    /// Comment, stored with its `<!--`/`-->` delimiters.
    Comment(String),
}

/// Payload of an element node.
///
/// `attr_raw` holds the raw bytes between the tag name and the closing `>`
/// (including any leading whitespace) so serialization reproduces attribute
/// spacing exactly as authored.
#[derive(Debug, Clone)]
pub struct ElementData {
    pub name: String,
    pub attr_raw: String,
    pub self_closing: bool,
    pub children: Vec<NodeId>,
}

impl Node {
    /// Create an element node.
    pub fn element(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Node {
            parent,
            kind: NodeKind::Element(ElementData {
                name: name.into(),
                attr_raw: String::new(),
                self_closing: false,
                children: Vec::new(),
            }),
        }
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>, parent: Option<NodeId>) -> Self {
        Node {
            parent,
            kind: NodeKind::Text(content.into()),
        }
    }

    /// Create a comment node (content includes delimiters).
    pub fn comment(content: impl Into<String>, parent: Option<NodeId>) -> Self {
        Node {
            parent,
            kind: NodeKind::Comment(content.into()),
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, NodeKind::Comment(_))
    }

    /// Element payload, if this is an element.
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable element payload, if this is an element.
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Text content, if this is a text node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(content) => Some(content),
            _ => None,
        }
    }
}

/// True when `text` contains only spaces, tabs, carriage returns and
/// newlines. Empty text counts as whitespace.
pub fn is_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}
