//! Format-preserving patcher for game configuration markup.
//!
//! The pipeline: parse a config document into a [`Document`], locate
//! targets with constrained path queries, mutate them with localized
//! primitives (`set`, `remove`, `create_child`, `fill`, `ensure_section`),
//! and serialize. Every byte outside a touched region survives verbatim,
//! so diffs against hand-maintained files stay reviewable.
//!
//! Patches themselves are declarative TOML files; see [`patch`] for the
//! schema, loader, and applicator.

pub mod diag;
pub mod patch;
pub mod query;
pub mod value;
pub mod xml;

pub use diag::{CollectedSink, Diagnostic, DiagnosticSink, NullSink, Severity, SymbolNames};
pub use patch::{apply_patches, check_patches, ApplicationError, PatchConfig, PatchResult};
pub use query::{FindOptions, PathQuery};
pub use value::Value;
pub use xml::{Document, NodeId, ParseError, SectionStep, SetOptions, XmlError};
