//! Document facade: parse/serialize plus the mutation primitives.
//!
//! A `Document` owns the whole tree exclusively; `NodeId` handles are
//! non-owning and valid only against the document they came from. Every
//! mutation is localized: bytes outside the touched span serialize exactly
//! as they were parsed.

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::query::{self, FindOptions, PathQuery};
use crate::value::Value;
use crate::xml::errors::{ParseError, XmlError};
use crate::xml::node::{is_whitespace, Node, NodeId, NodeKind};
use crate::xml::{parser, serializer};

/// Options for `set` key translation.
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Separator character in value-map keys that stands in for `.` in
    /// tag names (patch files cannot comfortably spell dotted keys).
    pub separator: char,
    /// Keep the separator verbatim instead of translating it.
    pub keep_separator: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        SetOptions {
            separator: '_',
            keep_separator: false,
        }
    }
}

/// One step of an `ensure_section` walk.
#[derive(Debug, Clone, Default)]
pub struct SectionStep {
    /// Sibling tag to anchor after when this step has to be created.
    pub after: Option<String>,
    /// Default content seeded into the step when it has to be created.
    pub defaults: Option<Value>,
}

/// A parsed markup document.
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse a document. Fails only on malformed nesting; everything the
    /// parser accepts round-trips byte-exactly through [`serialize`].
    ///
    /// [`serialize`]: Document::serialize
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (nodes, root) = parser::parse(text)?;
        Ok(Document { nodes, root })
    }

    /// Serialize back to text. Exact inverse of `parse` when no mutation
    /// occurred.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        serializer::serialize_children(&self.nodes, self.root, &mut out);
        out
    }

    /// The synthetic root element whose children are the document's
    /// top-level nodes.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Tag name of an element (empty for text/comment nodes).
    pub fn name(&self, id: NodeId) -> &str {
        self.node(id)
            .as_element()
            .map(|data| data.name.as_str())
            .unwrap_or("")
    }

    /// Ordered children of an element (empty for leaves).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .as_element()
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    /// First element child with the given tag name.
    pub fn child_by_name(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.node(child).is_element() && self.name(child) == name)
    }

    /// Concatenated text-leaf content of an element's direct children.
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            if let Some(text) = self.node(child).as_text() {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace the element's text content, creating a text leaf if none
    /// existed. Non-text children are left untouched.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        let text_children: Vec<NodeId> = self
            .children(id)
            .iter()
            .copied()
            .filter(|&child| self.node(child).is_text())
            .collect();

        match text_children.split_first() {
            Some((&first, rest)) => {
                if let NodeKind::Text(content) = &mut self.nodes[first as usize].kind {
                    text.clone_into(content);
                }
                for &extra in rest {
                    self.detach(id, extra);
                }
            }
            None => {
                let leaf = self.alloc(Node::text(text, Some(id)));
                if let Some(data) = self.nodes[id as usize].as_element_mut() {
                    if data.self_closing {
                        data.self_closing = false;
                        data.attr_raw = data.attr_raw.trim_end().to_string();
                    }
                    data.children.push(leaf);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Locator entry points
    // ------------------------------------------------------------------

    /// First element matching `path`, searched from the document root.
    pub fn find_element(
        &self,
        path: &str,
        silent: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<NodeId> {
        let query = PathQuery::parse(path);
        query::find_element(self, self.root, &query, silent, sink)
    }

    /// All elements matching `path`, searched from the document root.
    pub fn find_elements(
        &self,
        path: &str,
        opts: FindOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<NodeId> {
        let query = PathQuery::parse(path);
        query::find_elements(self, self.root, &query, opts, sink)
    }

    /// `find_element` scoped to a subtree.
    pub fn find_element_in(
        &self,
        start: NodeId,
        path: &str,
        silent: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<NodeId> {
        let query = PathQuery::parse(path);
        query::find_element(self, start, &query, silent, sink)
    }

    // ------------------------------------------------------------------
    // Mutation primitives
    // ------------------------------------------------------------------

    /// Create an empty child element named `tag` under `parent`.
    ///
    /// Placement: each name in `after` is tried in order; the new element
    /// is inserted immediately following the last sibling matching the
    /// first name found present. When none is present it is appended as
    /// the last child. The insertion carries its own indentation and line
    /// break runs, derived from the surrounding style, so neighbors keep
    /// their bytes.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        tag: &str,
        after: &[&str],
    ) -> Result<NodeId, XmlError> {
        if !self.node(parent).is_element() {
            return Err(XmlError::NotAnElement(parent));
        }

        let parent_indent = self.leading_indent(parent).unwrap_or_default();
        let child_indent = self.child_indent(parent, &parent_indent);

        let element = self.alloc(Node::element(tag, Some(parent)));
        let lead = self.alloc(Node::text(format!("\n{child_indent}"), Some(parent)));

        let anchor = after.iter().find_map(|name| {
            self.children(parent)
                .iter()
                .rposition(|&child| self.node(child).is_element() && self.name(child) == *name)
        });

        let trailer = match anchor {
            Some(_) => None,
            None => {
                let tail_is_ws = self
                    .children(parent)
                    .last()
                    .and_then(|&last| self.node(last).as_text())
                    .is_some_and(is_whitespace);
                if tail_is_ws {
                    None
                } else {
                    Some(self.alloc(Node::text(format!("\n{parent_indent}"), Some(parent))))
                }
            }
        };

        let data = self.nodes[parent as usize]
            .as_element_mut()
            .ok_or(XmlError::NotAnElement(parent))?;
        if data.self_closing {
            data.self_closing = false;
            data.attr_raw = data.attr_raw.trim_end().to_string();
        }

        match anchor {
            Some(idx) => {
                data.children.insert(idx + 1, lead);
                data.children.insert(idx + 2, element);
            }
            None => {
                // Append, keeping any trailing whitespace run (which holds
                // the closing tag's indentation) at the end.
                let at = if trailer.is_none() && !data.children.is_empty() {
                    data.children.len() - 1
                } else {
                    data.children.len()
                };
                data.children.insert(at, lead);
                data.children.insert(at + 1, element);
                if let Some(trailer) = trailer {
                    data.children.push(trailer);
                }
            }
        }

        Ok(element)
    }

    /// Recursively reconcile `element`'s children against a value map.
    ///
    /// Keys present in `defaults` are processed first so canonical child
    /// ordering is stable, then keys found only in `values`. A missing
    /// child is created and seeded from its default; the value (scalar,
    /// sequence, or map) is then applied on top. A value whose shape the
    /// target cannot take fails for that key only and is reported through
    /// the sink; sibling keys are still processed.
    pub fn set(
        &mut self,
        element: NodeId,
        values: &Value,
        defaults: Option<&Value>,
        opts: &SetOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), XmlError> {
        if !self.node(element).is_element() {
            return Err(XmlError::NotAnElement(element));
        }

        let Value::Map(values_map) = values else {
            sink.report(Diagnostic::UnsupportedShape {
                key: self.name(element).to_string(),
                element: self.name(element).to_string(),
                message: format!(
                    "a {} cannot be applied as the element's own content",
                    values.shape()
                ),
            });
            return Ok(());
        };
        let defaults_map = defaults.and_then(Value::as_map);

        let mut keys: Vec<&String> = defaults_map
            .map(|map| map.keys().collect())
            .unwrap_or_default();
        for key in values_map.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        for key in keys {
            let tag = translate_key(key, opts);
            let default_for_key = defaults_map.and_then(|map| map.get(key));

            let child = match self.child_by_name(element, &tag) {
                Some(child) => child,
                None => {
                    let child = self.create_child(element, &tag, &[])?;
                    if let Some(default) = default_for_key {
                        self.apply_value(child, key, default, None, opts, sink)?;
                    }
                    child
                }
            };

            if let Some(value) = values_map.get(key) {
                self.apply_value(child, key, value, default_for_key, opts, sink)?;
            }
        }

        Ok(())
    }

    fn apply_value(
        &mut self,
        child: NodeId,
        key: &str,
        value: &Value,
        default_for_key: Option<&Value>,
        opts: &SetOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), XmlError> {
        match value {
            Value::Scalar(text) => {
                let has_element_children = self
                    .children(child)
                    .iter()
                    .any(|&c| self.node(c).is_element());
                if has_element_children {
                    sink.report(Diagnostic::UnsupportedShape {
                        key: key.to_string(),
                        element: self.name(child).to_string(),
                        message: "scalar value onto an element with child elements".to_string(),
                    });
                    return Ok(());
                }
                self.set_text(child, text);
            }
            Value::Sequence(items) => {
                let tag = translate_key(key, opts);
                self.fill(child, &tag, items, true, sink)?;
            }
            Value::Map(map) => {
                if map.is_empty() {
                    return Ok(());
                }
                let has_element_children = self
                    .children(child)
                    .iter()
                    .any(|&c| self.node(c).is_element());
                if !has_element_children && !is_whitespace(&self.text(child)) {
                    sink.report(Diagnostic::UnsupportedShape {
                        key: key.to_string(),
                        element: self.name(child).to_string(),
                        message: "map value onto a text leaf".to_string(),
                    });
                    return Ok(());
                }
                self.set(child, value, default_for_key, opts, sink)?;
            }
        }
        Ok(())
    }

    /// Rebuild `element`'s child list: optionally clear it, then append one
    /// `tag`-named child per item, each populated via `set`.
    pub fn fill(
        &mut self,
        element: NodeId,
        tag: &str,
        items: &[Value],
        clear: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), XmlError> {
        if !self.node(element).is_element() {
            return Err(XmlError::NotAnElement(element));
        }
        if clear {
            if let Some(data) = self.nodes[element as usize].as_element_mut() {
                data.children.clear();
            }
        }
        for item in items {
            let child = self.create_child(element, tag, &[])?;
            match item {
                Value::Scalar(text) => self.set_text(child, text),
                Value::Map(_) => self.set(child, item, None, &SetOptions::default(), sink)?,
                Value::Sequence(_) => {
                    sink.report(Diagnostic::UnsupportedShape {
                        key: tag.to_string(),
                        element: tag.to_string(),
                        message: "nested sequence in fill items".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Remove elements matched by `path`, searched from the document root.
    /// Returns whether anything was removed.
    pub fn remove(
        &mut self,
        path: &str,
        all: bool,
        silent: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> bool {
        let root = self.root;
        self.remove_from(root, path, all, silent, sink)
    }

    /// `remove` scoped to a subtree.
    ///
    /// The path's final segment selects the children to delete under the
    /// element its parent path locates. Each deletion takes a whole span:
    /// the element plus its adjacent comments and same-line whitespace, so
    /// the element's private indentation and trailing newline go with it
    /// and no orphaned blank line is left behind.
    pub fn remove_from(
        &mut self,
        start: NodeId,
        path: &str,
        all: bool,
        silent: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> bool {
        let (parent_query, last) = PathQuery::parse(path).split_last();
        let Some(last) = last else {
            if !silent {
                sink.report(Diagnostic::RemovalNotFound {
                    path: path.to_string(),
                });
            }
            return false;
        };

        let parent = if parent_query.segments.is_empty() {
            Some(start)
        } else {
            // Parent lookup is always silent; the removal outcome carries
            // the diagnostic.
            query::find_element(self, start, &parent_query, true, sink)
        };

        let mut removed = false;
        if let Some(parent) = parent {
            let matches: Vec<NodeId> = self
                .children(parent)
                .iter()
                .copied()
                .filter(|&child| {
                    self.node(child).is_element() && query::segment_matches(self, child, &last)
                })
                .collect();

            let targets: &[NodeId] = if all {
                &matches
            } else {
                &matches[..matches.len().min(1)]
            };

            for &target in targets {
                self.remove_span(parent, target);
                removed = true;
            }
        }

        if !removed && !silent {
            sink.report(Diagnostic::RemovalNotFound {
                path: path.to_string(),
            });
        }
        removed
    }

    /// Walk `dotted_path` from the document root, creating any missing
    /// segment (anchored and seeded per its step spec). Returns the deepest
    /// element. Idempotent: once the chain exists this is a pure lookup.
    pub fn ensure_section(
        &mut self,
        dotted_path: &str,
        steps: &[SectionStep],
        sink: &mut dyn DiagnosticSink,
    ) -> Result<NodeId, XmlError> {
        let mut current = self.root;
        for (index, segment) in dotted_path
            .split('.')
            .filter(|s| !s.is_empty())
            .enumerate()
        {
            current = match self.child_by_name(current, segment) {
                Some(existing) => existing,
                None => {
                    let step = steps.get(index);
                    let after: Vec<&str> = step
                        .and_then(|s| s.after.as_deref())
                        .into_iter()
                        .collect();
                    let created = self.create_child(current, segment, &after)?;
                    if let Some(defaults) = step.and_then(|s| s.defaults.as_ref()) {
                        self.set(created, defaults, None, &SetOptions::default(), sink)?;
                    }
                    created
                }
            };
        }
        Ok(current)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(data) = self.nodes[parent as usize].as_element_mut() {
            data.children.retain(|&c| c != child);
        }
    }

    /// Indentation of `id` itself: the run after the last line break in the
    /// whitespace text immediately preceding it.
    fn leading_indent(&self, id: NodeId) -> Option<String> {
        let parent = self.node(id).parent?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|&c| c == id)?;
        let prev = *siblings.get(idx.checked_sub(1)?)?;
        let text = self.node(prev).as_text()?;
        let tail = &text[text.rfind('\n')? + 1..];
        is_whitespace(tail).then(|| tail.to_string())
    }

    /// Indentation for a new child of `parent`: reuse the style of the last
    /// indented element child, else one level deeper than the parent.
    fn child_indent(&self, parent: NodeId, parent_indent: &str) -> String {
        self.children(parent)
            .iter()
            .rev()
            .filter(|&&c| self.node(c).is_element())
            .find_map(|&c| self.leading_indent(c))
            .unwrap_or_else(|| format!("{parent_indent}  "))
    }

    /// Delete `target` and its private formatting as one contiguous span.
    ///
    /// Backward: consume comments and whitespace runs without a line break;
    /// at a text run containing one, the span starts right after its last
    /// line break (the indentation tail is cut off). Forward symmetric: at
    /// a text run with a line break the span ends at that break, the run
    /// keeps what follows it.
    fn remove_span(&mut self, parent: NodeId, target: NodeId) {
        let children = self.children(parent).to_vec();
        let Some(idx) = children.iter().position(|&c| c == target) else {
            return;
        };

        let mut start = idx;
        let mut back_trunc: Option<(NodeId, String)> = None;
        for j in (0..idx).rev() {
            match &self.node(children[j]).kind {
                NodeKind::Comment(_) => start = j,
                NodeKind::Text(text) if !text.contains('\n') && is_whitespace(text) => start = j,
                NodeKind::Text(text) if text.contains('\n') => {
                    let keep = &text[..text.rfind('\n').unwrap_or(0) + 1];
                    if keep.len() < text.len() {
                        back_trunc = Some((children[j], keep.to_string()));
                    }
                    break;
                }
                _ => break,
            }
        }

        let mut end = idx;
        let mut fwd_trunc: Option<(NodeId, String)> = None;
        for j in idx + 1..children.len() {
            match &self.node(children[j]).kind {
                NodeKind::Comment(_) => end = j,
                NodeKind::Text(text) if !text.contains('\n') && is_whitespace(text) => end = j,
                NodeKind::Text(text) if text.contains('\n') => {
                    let rest = &text[text.find('\n').map(|k| k + 1).unwrap_or(0)..];
                    if rest.is_empty() {
                        end = j;
                    } else {
                        fwd_trunc = Some((children[j], rest.to_string()));
                    }
                    break;
                }
                _ => break,
            }
        }

        for (id, content) in back_trunc.into_iter().chain(fwd_trunc) {
            if let NodeKind::Text(text) = &mut self.nodes[id as usize].kind {
                *text = content;
            }
        }

        let doomed: Vec<NodeId> = children[start..=end].to_vec();
        if let Some(data) = self.nodes[parent as usize].as_element_mut() {
            data.children.retain(|c| !doomed.contains(c));
        }
    }
}

fn translate_key(key: &str, opts: &SetOptions) -> String {
    if opts.keep_separator {
        key.to_string()
    } else {
        key.replace(opts.separator, ".")
    }
}
