//! Path query parsing.
//!
//! The supported language is a narrow, practically-used subset: `/`, `//`,
//! tag names, and bracketed equality conditions joined by the literal word
//! `and`. A path without a leading `/` or `//` is searched anywhere
//! (implicit `//` rewrite); a single leading `/` is treated identically to
//! `//` rather than as a root anchor. Unsupported predicate syntax is not
//! rejected, it degrades to a best-effort split.

use std::fmt;

/// An equality test `tag = value` against a named descendant leaf's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub tag: String,
    pub value: String,
}

/// One `/`-delimited path component: a tag name plus conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tag: String,
    pub conditions: Vec<Condition>,
}

impl Segment {
    pub fn named(tag: impl Into<String>) -> Self {
        Segment {
            tag: tag.into(),
            conditions: Vec::new(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if !self.conditions.is_empty() {
            write!(f, "[")?;
            for (i, cond) in self.conditions.iter().enumerate() {
                if i > 0 {
                    write!(f, " and ")?;
                }
                write!(f, "{}='{}'", cond.tag, cond.value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// A parsed path query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    pub segments: Vec<Segment>,
    /// The path as the caller wrote it.
    pub raw: String,
    /// True when the caller's path had no `/`/`//` prefix and was rewritten
    /// to search anywhere.
    pub implicit: bool,
}

impl PathQuery {
    /// Parse a path string. Never fails: malformed predicate syntax
    /// degrades rather than erroring.
    pub fn parse(path: &str) -> Self {
        let raw = path.to_string();
        let (rest, implicit) = if let Some(stripped) = path.strip_prefix("//") {
            (stripped, false)
        } else if let Some(stripped) = path.strip_prefix('/') {
            // Single '/' behaves exactly like '//': the engine has no
            // strict root-anchored form.
            (stripped, false)
        } else {
            (path, true)
        };

        let segments = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect();

        PathQuery {
            segments,
            raw,
            implicit,
        }
    }

    /// The rewritten form reported in diagnostics when the original path
    /// lacked an explicit prefix.
    pub fn rewritten(&self) -> Option<String> {
        self.implicit.then(|| format!("//{}", self.raw))
    }

    /// Split off the final segment, leaving the parent path. Used by
    /// removal, which locates the parent and then scans its children.
    pub fn split_last(mut self) -> (PathQuery, Option<Segment>) {
        let last = self.segments.pop();
        (self, last)
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//")?;
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

fn parse_segment(raw: &str) -> Segment {
    let (tag, cond_raw) = match raw.find('[') {
        Some(open) => {
            let inner = raw[open + 1..].trim_end_matches(']');
            (&raw[..open], Some(inner))
        }
        None => (raw, None),
    };

    let mut conditions = Vec::new();
    if let Some(inner) = cond_raw {
        // Best-effort split on the literal word "and"; `!=`, `or`,
        // wildcards and functions are out of scope and fall through.
        for part in inner.split(" and ") {
            if let Some((cond_tag, cond_value)) = part.split_once('=') {
                conditions.push(Condition {
                    tag: cond_tag.trim().to_string(),
                    value: strip_quotes(cond_value.trim()).to_string(),
                });
            }
        }
    }

    Segment {
        tag: tag.trim().to_string(),
        conditions,
    }
}

/// Strip one pair of surrounding single or double quotes, if present.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' && last == b'\'') || (first == b'"' && last == b'"') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_segments() {
        let query = PathQuery::parse("//Mission/Config");
        assert!(!query.implicit);
        assert_eq!(query.segments.len(), 2);
        assert_eq!(query.segments[0].tag, "Mission");
        assert_eq!(query.segments[1].tag, "Config");
    }

    #[test]
    fn implicit_prefix_rewrite() {
        let query = PathQuery::parse("Mission/Config");
        assert!(query.implicit);
        assert_eq!(query.rewritten(), Some("//Mission/Config".to_string()));
        assert_eq!(query.segments.len(), 2);
    }

    #[test]
    fn single_slash_behaves_like_double() {
        let single = PathQuery::parse("/Mission/Config");
        let double = PathQuery::parse("//Mission/Config");
        assert_eq!(single.segments, double.segments);
        assert!(!single.implicit);
        assert_eq!(single.rewritten(), None);
    }

    #[test]
    fn conditions_with_quotes() {
        let query = PathQuery::parse("//Config[Name='Foo' and Id=\"7\"]");
        let conds = &query.segments[0].conditions;
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].tag, "Name");
        assert_eq!(conds[0].value, "Foo");
        assert_eq!(conds[1].tag, "Id");
        assert_eq!(conds[1].value, "7");
    }

    #[test]
    fn unquoted_condition_value() {
        let query = PathQuery::parse("//Config[Id=7]");
        assert_eq!(query.segments[0].conditions[0].value, "7");
    }

    #[test]
    fn malformed_predicate_degrades() {
        // No '=' inside the bracket: the condition is dropped, the tag
        // still matches.
        let query = PathQuery::parse("//Config[contains(Name)]");
        assert_eq!(query.segments[0].tag, "Config");
        assert!(query.segments[0].conditions.is_empty());
    }

    #[test]
    fn split_last_peels_final_segment() {
        let (parent, last) = PathQuery::parse("//a/b/c[Id='1']").split_last();
        assert_eq!(parent.segments.len(), 2);
        let last = last.unwrap();
        assert_eq!(last.tag, "c");
        assert_eq!(last.conditions.len(), 1);
    }

    #[test]
    fn display_roundtrip() {
        let query = PathQuery::parse("a/b[Name='x']");
        assert_eq!(query.to_string(), "//a/b[Name='x']");
    }
}
