//! Declarative patch files: TOML schema, loader, and applicator.

pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_patches, check_patches, ApplicationError, PatchResult};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{Metadata, Operation, PatchConfig, PatchDefinition, StepSpec, ValidationError};
