//! Format-preserving markup tree: parser, serializer, and mutation API.

pub mod document;
pub mod errors;
pub mod node;

mod parser;
mod serializer;

pub use document::{Document, SectionStep, SetOptions};
pub use errors::{ParseError, XmlError};
pub use node::{ElementData, Node, NodeId, NodeKind};
