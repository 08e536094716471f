//! Node locator: depth-first matching of path segments against the tree.
//!
//! Keeps an explicit stack of partial-match candidates. Until a candidate
//! has consumed its first segment it may also descend without matching,
//! which gives every path its search-anywhere semantics; after that,
//! segments consume strict child steps only. Candidates are pushed in
//! reverse child order so they pop in document order.

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::query::path::{Condition, PathQuery, Segment};
use crate::xml::{Document, NodeId};

/// Options for a locate call.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    /// Collect every match instead of stopping at the first.
    pub all: bool,
    /// Suppress the `PathNotFound` diagnostic on an empty result.
    pub silent: bool,
}

struct Candidate {
    element: NodeId,
    /// Index of the next segment to consume.
    next: usize,
    /// Tag names consumed so far, for the partial-match diagnostic.
    history: Vec<String>,
}

/// Find elements under `start` matching `query`.
///
/// With `all` false the result has at most one element (the document-order
/// first match). With `all` true it contains every element reachable via a
/// path satisfying the query, without duplicates.
pub fn find_elements(
    doc: &Document,
    start: NodeId,
    query: &PathQuery,
    opts: FindOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<NodeId> {
    if query.segments.is_empty() {
        return vec![start];
    }

    let mut results: Vec<NodeId> = Vec::new();
    let mut best: Vec<String> = Vec::new();

    let mut stack = vec![Candidate {
        element: start,
        next: 0,
        history: Vec::new(),
    }];

    while let Some(cand) = stack.pop() {
        if cand.history.len() > best.len() {
            best = cand.history.clone();
        }

        if cand.next == query.segments.len() {
            if !results.contains(&cand.element) {
                results.push(cand.element);
            }
            if !opts.all {
                break;
            }
            continue;
        }

        let segment = &query.segments[cand.next];
        let anywhere = cand.next == 0;

        for &child in doc.children(cand.element).iter().rev() {
            if !doc.node(child).is_element() {
                continue;
            }
            // Descend-without-consuming candidates sit below the matching
            // candidate for the same child, so the match pops first.
            if anywhere {
                stack.push(Candidate {
                    element: child,
                    next: 0,
                    history: Vec::new(),
                });
            }
            if segment_matches(doc, child, segment) {
                let mut history = cand.history.clone();
                history.push(doc.name(child).to_string());
                stack.push(Candidate {
                    element: child,
                    next: cand.next + 1,
                    history,
                });
            }
        }
    }

    if results.is_empty() && !opts.silent {
        sink.report(Diagnostic::PathNotFound {
            path: query.raw.clone(),
            rewritten: query.rewritten(),
            longest_match: best.join("/"),
        });
    }

    results
}

/// `find_elements` with `all` false, unwrapped to the single match.
pub fn find_element(
    doc: &Document,
    start: NodeId,
    query: &PathQuery,
    silent: bool,
    sink: &mut dyn DiagnosticSink,
) -> Option<NodeId> {
    find_elements(
        doc,
        start,
        query,
        FindOptions { all: false, silent },
        sink,
    )
    .into_iter()
    .next()
}

/// A child matches a segment when its tag equals the segment's tag and
/// every condition holds.
pub(crate) fn segment_matches(doc: &Document, element: NodeId, segment: &Segment) -> bool {
    doc.name(element) == segment.tag
        && segment
            .conditions
            .iter()
            .all(|cond| condition_holds(doc, element, cond))
}

/// A condition holds when the element has a descendant leaf with the
/// condition's tag whose text equals the condition's value.
fn condition_holds(doc: &Document, element: NodeId, cond: &Condition) -> bool {
    let mut stack: Vec<NodeId> = doc
        .children(element)
        .iter()
        .rev()
        .copied()
        .filter(|&id| doc.node(id).is_element())
        .collect();

    while let Some(id) = stack.pop() {
        if doc.name(id) == cond.tag && doc.text(id) == cond.value {
            return true;
        }
        for &child in doc.children(id).iter().rev() {
            if doc.node(child).is_element() {
                stack.push(child);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{CollectedSink, NullSink};

    fn doc(input: &str) -> Document {
        Document::parse(input).unwrap()
    }

    #[test]
    fn finds_first_in_document_order() {
        let doc = doc("<r><a><x>1</x></a><b><x>2</x></b></r>");
        let query = PathQuery::parse("//x");
        let found = find_element(&doc, doc.root(), &query, false, &mut NullSink).unwrap();
        assert_eq!(doc.text(found), "1");
    }

    #[test]
    fn all_matches_without_duplicates() {
        let doc = doc("<r><a><x/></a><x/><b><c><x/></c></b></r>");
        let query = PathQuery::parse("//x");
        let found = find_elements(
            &doc,
            doc.root(),
            &query,
            FindOptions {
                all: true,
                silent: false,
            },
            &mut NullSink,
        );
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn multi_segment_chain() {
        let doc = doc("<r><a><b><c/></b></a><b><c/></b></r>");
        let query = PathQuery::parse("//a/b/c");
        let found = find_elements(
            &doc,
            doc.root(),
            &query,
            FindOptions {
                all: true,
                silent: false,
            },
            &mut NullSink,
        );
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn condition_selects_by_leaf_text() {
        let doc = doc(
            "<r><Config><Name>Foo</Name><V>1</V></Config>\
             <Config><Name>Bar</Name><V>2</V></Config></r>",
        );
        let query = PathQuery::parse("//Config[Name='Foo']");
        let found = find_element(&doc, doc.root(), &query, false, &mut NullSink).unwrap();
        let v = doc.child_by_name(found, "V").unwrap();
        assert_eq!(doc.text(v), "1");
    }

    #[test]
    fn condition_matches_deep_descendant_leaf() {
        let doc = doc("<r><Config><Meta><Id>7</Id></Meta></Config></r>");
        let query = PathQuery::parse("//Config[Id='7']");
        assert!(find_element(&doc, doc.root(), &query, false, &mut NullSink).is_some());
    }

    #[test]
    fn exact_count_for_satisfying_elements() {
        // Exactly two elements satisfy the chain+condition; each returned once.
        let doc = doc(
            "<r><g><item><k>y</k></item></g>\
             <g><item><k>n</k></item><item><k>y</k></item></g></r>",
        );
        let query = PathQuery::parse("//g/item[k='y']");
        let found = find_elements(
            &doc,
            doc.root(),
            &query,
            FindOptions {
                all: true,
                silent: false,
            },
            &mut NullSink,
        );
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn not_found_reports_longest_partial() {
        let doc = doc("<r><a><b/></a></r>");
        let query = PathQuery::parse("a/b/c");
        let mut sink = CollectedSink::new();
        let found = find_elements(
            &doc,
            doc.root(),
            &query,
            FindOptions {
                all: false,
                silent: false,
            },
            &mut sink,
        );
        assert!(found.is_empty());
        assert_eq!(sink.diags.len(), 1);
        match &sink.diags[0] {
            Diagnostic::PathNotFound {
                rewritten,
                longest_match,
                ..
            } => {
                assert_eq!(rewritten.as_deref(), Some("//a/b/c"));
                assert_eq!(longest_match, "a/b");
            }
            other => panic!("unexpected diagnostic: {other:?}"),
        }
    }

    #[test]
    fn silent_suppresses_diagnostic() {
        let doc = doc("<r/>");
        let query = PathQuery::parse("//missing");
        let mut sink = CollectedSink::new();
        let found = find_element(&doc, doc.root(), &query, true, &mut sink);
        assert!(found.is_none());
        assert!(sink.diags.is_empty());
    }

    #[test]
    fn empty_query_matches_start() {
        let doc = doc("<r/>");
        let query = PathQuery::parse("//");
        let found = find_elements(
            &doc,
            doc.root(),
            &query,
            FindOptions::default(),
            &mut NullSink,
        );
        assert_eq!(found, vec![doc.root()]);
    }
}
