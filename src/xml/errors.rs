use thiserror::Error;

/// Errors from parsing a markup document.
///
/// Parse failures are fatal: the caller must not proceed with a partially
/// built tree. Everything downstream of a successful parse degrades
/// gracefully through the diagnostic sink instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unclosed tag <{tag}> opened at byte {offset}")]
    UnclosedTag { tag: String, offset: usize },

    #[error("mismatched closing tag at byte {offset}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("closing tag </{tag}> at byte {offset} has no matching open tag")]
    UnexpectedClosingTag { tag: String, offset: usize },

    #[error("malformed tag at byte {offset}: {message}")]
    MalformedTag { offset: usize, message: String },

    #[error("unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },
}

/// Errors from mutation primitives.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("node {0} is not an element")]
    NotAnElement(crate::xml::NodeId),

    #[error("value shape not supported for key '{key}': {message}")]
    UnsupportedShape { key: String, message: String },
}
