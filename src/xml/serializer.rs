//! Serialization back to text.
//!
//! Walks the arena emitting every node's original bytes; for any subtree
//! untouched by a mutation the output is byte-identical to the input.

use crate::xml::node::{Node, NodeId, NodeKind};

/// Serialize the children of `root` into `out`.
pub(crate) fn serialize_children(nodes: &[Node], root: NodeId, out: &mut String) {
    if let Some(data) = nodes[root as usize].as_element() {
        for child in &data.children {
            serialize_node(nodes, *child, out);
        }
    }
}

fn serialize_node(nodes: &[Node], id: NodeId, out: &mut String) {
    match &nodes[id as usize].kind {
        NodeKind::Text(content) | NodeKind::Comment(content) => out.push_str(content),
        NodeKind::Element(data) => {
            out.push('<');
            out.push_str(&data.name);
            out.push_str(&data.attr_raw);
            if data.self_closing {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &data.children {
                    serialize_node(nodes, *child, out);
                }
                out.push_str("</");
                out.push_str(&data.name);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::xml::Document;

    fn roundtrip(input: &str) {
        let doc = Document::parse(input).unwrap();
        assert_eq!(doc.serialize(), input);
    }

    #[test]
    fn roundtrip_simple() {
        roundtrip("<a><b>text</b></a>");
    }

    #[test]
    fn roundtrip_formatting_preserved() {
        roundtrip("<root>\n  <child  attr=\"v\" >\n    mixed text\n  </child>\n\t<other/>\n</root>\n");
    }

    #[test]
    fn roundtrip_comments_and_declarations() {
        roundtrip("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- header -->\n<a><!--inner--></a>\n");
    }

    #[test]
    fn roundtrip_self_closing_variants() {
        roundtrip("<p><a/><b /><c x='1'/></p>");
    }
}
