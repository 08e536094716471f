use crate::value::Value;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            }
            if patch.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: Some(patch.id.clone()),
                    field: "file",
                });
            }

            match &patch.operation {
                Operation::Set { path, values, .. } => {
                    if path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.path",
                        });
                    }
                    if !matches!(values, Value::Map(_)) {
                        issues.push(ValidationIssue::InvalidCombo {
                            patch_id: Some(patch.id.clone()),
                            message: "set values must be a table of child tags".to_string(),
                        });
                    }
                }
                Operation::Remove { path, .. } => {
                    if path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.path",
                        });
                    }
                }
                Operation::CreateChild { path, tag, .. } => {
                    if path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.path",
                        });
                    }
                    if tag.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.tag",
                        });
                    }
                }
                Operation::Fill { path, tag, .. } => {
                    if path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.path",
                        });
                    }
                    if tag.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.tag",
                        });
                    }
                }
                Operation::EnsureSection { section, .. } => {
                    if section.trim().is_empty() {
                        issues.push(ValidationIssue::MissingField {
                            patch_id: Some(patch.id.clone()),
                            field: "operation.section",
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Resolve patch file paths relative to the workspace root.
    #[serde(default)]
    pub workspace_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    pub file: String,
    pub operation: Operation,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Operation {
    /// Reconcile the matched element's children against a value table.
    Set {
        path: String,
        values: Value,
        #[serde(default)]
        defaults: Option<Value>,
        #[serde(default)]
        separator: Option<char>,
        #[serde(default)]
        keep_separator: bool,
        /// Apply to every match instead of the first.
        #[serde(default)]
        all: bool,
    },
    /// Delete matched elements together with their private formatting.
    Remove {
        path: String,
        #[serde(default)]
        all: bool,
    },
    /// Create an empty child under the matched parent, optionally anchored
    /// and populated.
    CreateChild {
        path: String,
        tag: String,
        #[serde(default)]
        after: Vec<String>,
        #[serde(default)]
        values: Option<Value>,
    },
    /// Rebuild the matched element's child list from a sequence of items.
    Fill {
        path: String,
        tag: String,
        #[serde(default)]
        items: Vec<Value>,
        #[serde(default = "default_true")]
        clear: bool,
    },
    /// Walk a dotted chain from the document root, creating missing links.
    EnsureSection {
        section: String,
        #[serde(default)]
        steps: Vec<StepSpec>,
        #[serde(default)]
        values: Option<Value>,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StepSpec {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub defaults: Option<Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch config contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}
