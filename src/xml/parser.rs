//! Format-preserving markup parser.
//!
//! Single pass over the input, splitting it into element, text and comment
//! nodes without normalizing anything: attribute bytes, whitespace runs,
//! comments, processing instructions and DOCTYPE declarations are all kept
//! verbatim so the serializer can reproduce the document exactly.

use crate::xml::errors::ParseError;
use crate::xml::node::{Node, NodeId};

/// Parse `text` into an arena. Returns the node list and the id of the
/// synthetic root element (empty name) whose children are the top-level
/// nodes of the document.
pub(crate) fn parse(text: &str) -> Result<(Vec<Node>, NodeId), ParseError> {
    let mut nodes: Vec<Node> = Vec::new();
    let root: NodeId = 0;
    nodes.push(Node::element("", None));

    // Open-element stack: (node id, tag name, offset of '<').
    let mut stack: Vec<(NodeId, String, usize)> = vec![];
    let mut pos = 0;
    let bytes = text.as_bytes();

    while pos < text.len() {
        let parent = stack.last().map(|(id, _, _)| *id).unwrap_or(root);

        let lt = match text[pos..].find('<') {
            Some(rel) => pos + rel,
            None => {
                push_child(&mut nodes, parent, Node::text(&text[pos..], Some(parent)));
                break;
            }
        };

        if lt > pos {
            push_child(&mut nodes, parent, Node::text(&text[pos..lt], Some(parent)));
        }

        if text[lt..].starts_with("<!--") {
            let end = text[lt..]
                .find("-->")
                .ok_or(ParseError::UnterminatedComment { offset: lt })?;
            let comment_end = lt + end + 3;
            push_child(
                &mut nodes,
                parent,
                Node::comment(&text[lt..comment_end], Some(parent)),
            );
            pos = comment_end;
        } else if text[lt..].starts_with("<!") || text[lt..].starts_with("<?") {
            // DOCTYPE / processing instruction: kept as an opaque text run.
            let end = text[lt..].find('>').ok_or(ParseError::MalformedTag {
                offset: lt,
                message: "unterminated declaration".to_string(),
            })?;
            let decl_end = lt + end + 1;
            push_child(
                &mut nodes,
                parent,
                Node::text(&text[lt..decl_end], Some(parent)),
            );
            pos = decl_end;
        } else if text[lt..].starts_with("</") {
            let end = text[lt..].find('>').ok_or(ParseError::MalformedTag {
                offset: lt,
                message: "unterminated closing tag".to_string(),
            })?;
            let name = text[lt + 2..lt + end].trim();
            match stack.pop() {
                Some((_, open_name, _)) if open_name == name => {}
                Some((_, open_name, _)) => {
                    return Err(ParseError::MismatchedTag {
                        expected: open_name,
                        found: name.to_string(),
                        offset: lt,
                    });
                }
                None => {
                    return Err(ParseError::UnexpectedClosingTag {
                        tag: name.to_string(),
                        offset: lt,
                    });
                }
            }
            pos = lt + end + 1;
        } else {
            let (name, attr_raw, self_closing, tag_end) = scan_open_tag(text, bytes, lt)?;
            let mut node = Node::element(name.clone(), Some(parent));
            if let Some(data) = node.as_element_mut() {
                data.attr_raw = attr_raw;
                data.self_closing = self_closing;
            }
            let id = push_child(&mut nodes, parent, node);
            if !self_closing {
                stack.push((id, name, lt));
            }
            pos = tag_end;
        }
    }

    if let Some((_, name, offset)) = stack.pop() {
        return Err(ParseError::UnclosedTag { tag: name, offset });
    }

    Ok((nodes, root))
}

/// Scan an open tag starting at `lt` (the '<'). Returns the tag name, the
/// raw attribute bytes, whether the tag self-closes, and the byte offset
/// just past the closing '>'.
fn scan_open_tag(
    text: &str,
    bytes: &[u8],
    lt: usize,
) -> Result<(String, String, bool, usize), ParseError> {
    let mut i = lt + 1;
    while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n' | b'>' | b'/') {
        i += 1;
    }
    let name = &text[lt + 1..i];
    if name.is_empty() {
        return Err(ParseError::MalformedTag {
            offset: lt,
            message: "missing tag name".to_string(),
        });
    }

    // Scan to the closing '>', skipping over quoted attribute values.
    let attr_start = i;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    let self_closing = i > attr_start && bytes[i - 1] == b'/';
                    let attr_end = if self_closing { i - 1 } else { i };
                    return Ok((
                        name.to_string(),
                        text[attr_start..attr_end].to_string(),
                        self_closing,
                        i + 1,
                    ));
                }
                _ => {}
            },
        }
        i += 1;
    }

    Err(ParseError::MalformedTag {
        offset: lt,
        message: "unterminated tag".to_string(),
    })
}

fn push_child(nodes: &mut Vec<Node>, parent: NodeId, node: Node) -> NodeId {
    let id = nodes.len() as NodeId;
    nodes.push(node);
    if let Some(data) = nodes[parent as usize].as_element_mut() {
        data.children.push(id);
    }
    id
}
