//! Patch applicator: loads target documents, applies patch operations, and
//! reports per-patch results with idempotency checks.
//!
//! Patches are grouped by target file so each document is parsed and
//! written once. A patch whose application leaves the document bytes
//! unchanged reports `AlreadyApplied`; running the same patch set twice is
//! always safe.

use crate::diag::{CollectedSink, NullSink};
use crate::patch::schema::{Operation, PatchConfig, PatchDefinition};
use crate::query::FindOptions;
use crate::xml::{Document, ParseError, SectionStep, SetOptions, XmlError};
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of applying a single patch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// The document changed and was written back.
    Applied { file: PathBuf },
    /// The document already carried the patch's effect.
    AlreadyApplied { file: PathBuf },
    /// The operation could not take effect (target missing, shape rejected).
    Failed { file: PathBuf, reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file } => write!(f, "Applied patch to {}", file.display()),
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            PatchResult::Failed { file, reason } => {
                write!(f, "Failed on {}: {}", file.display(), reason)
            }
        }
    }
}

/// Errors during patch application.
#[derive(Debug)]
pub enum ApplicationError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The target document does not parse; nothing was touched.
    Parse {
        path: PathBuf,
        source: ParseError,
    },
    Xml(XmlError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Parse { path, source } => {
                write!(f, "cannot parse {}: {}", path.display(), source)
            }
            ApplicationError::Xml(e) => write!(f, "mutation error: {e}"),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Parse { source, .. } => Some(source),
            ApplicationError::Xml(e) => Some(e),
        }
    }
}

impl From<XmlError> for ApplicationError {
    fn from(e: XmlError) -> Self {
        ApplicationError::Xml(e)
    }
}

/// Apply a patch configuration to a workspace.
///
/// Returns one result per patch, keyed by patch id. Patches are grouped
/// by target file; mutated files are rewritten atomically.
pub fn apply_patches(
    config: &PatchConfig,
    workspace_root: &Path,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    run_patches(config, workspace_root, true)
}

/// Evaluate patch status without touching the workspace.
///
/// Result semantics mirror [`apply_patches`]: `Applied` means "would
/// apply".
pub fn check_patches(
    config: &PatchConfig,
    workspace_root: &Path,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    run_patches(config, workspace_root, false)
}

fn run_patches(
    config: &PatchConfig,
    workspace_root: &Path,
    write: bool,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    let mut patches_by_file: IndexMap<PathBuf, Vec<&PatchDefinition>> = IndexMap::new();
    for patch in &config.patches {
        let path = if config.meta.workspace_relative {
            workspace_root.join(&patch.file)
        } else {
            PathBuf::from(&patch.file)
        };
        patches_by_file.entry(path).or_default().push(patch);
    }

    let mut all_results = Vec::new();

    for (file_path, patches) in patches_by_file {
        let content = match fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(source) => {
                fan_out_io_error(&mut all_results, &patches, &file_path, &source);
                continue;
            }
        };

        let mut doc = match Document::parse(&content) {
            Ok(doc) => doc,
            Err(source) => {
                for patch in &patches {
                    all_results.push((
                        patch.id.clone(),
                        Err(ApplicationError::Parse {
                            path: file_path.clone(),
                            source: source.clone(),
                        }),
                    ));
                }
                continue;
            }
        };

        let mut file_results = Vec::new();
        let mut snapshot = content.clone();
        for patch in &patches {
            match apply_one(&mut doc, patch) {
                Ok(failure) => {
                    let after = doc.serialize();
                    let result = match failure {
                        Some(reason) => PatchResult::Failed {
                            file: file_path.clone(),
                            reason,
                        },
                        None if after != snapshot => PatchResult::Applied {
                            file: file_path.clone(),
                        },
                        None => PatchResult::AlreadyApplied {
                            file: file_path.clone(),
                        },
                    };
                    snapshot = after;
                    file_results.push((patch.id.clone(), Ok(result)));
                }
                Err(e) => file_results.push((patch.id.clone(), Err(e))),
            }
        }

        if write && snapshot != content {
            if let Err(source) = atomic_write(&file_path, snapshot.as_bytes()) {
                fan_out_io_error(&mut all_results, &patches, &file_path, &source);
                continue;
            }
        }
        all_results.extend(file_results);
    }

    all_results
}

/// Apply one operation to an in-memory document. `Ok(Some(reason))` is a
/// soft failure: the patch did not take effect but sibling patches and
/// files proceed.
fn apply_one(
    doc: &mut Document,
    patch: &PatchDefinition,
) -> Result<Option<String>, ApplicationError> {
    match &patch.operation {
        Operation::Set {
            path,
            values,
            defaults,
            separator,
            keep_separator,
            all,
        } => {
            let mut sink = CollectedSink::new();
            let targets = doc.find_elements(
                path,
                FindOptions {
                    all: *all,
                    silent: false,
                },
                &mut sink,
            );
            if targets.is_empty() {
                return Ok(Some(render_diags(&sink, path)));
            }
            let opts = SetOptions {
                separator: separator.unwrap_or('_'),
                keep_separator: *keep_separator,
            };
            for element in targets {
                doc.set(element, values, defaults.as_ref(), &opts, &mut sink)?;
            }
            Ok(sink.has_errors().then(|| render_diags(&sink, path)))
        }
        Operation::Remove { path, all } => {
            // "Nothing to remove" is the already-applied state, not a
            // failure.
            let _removed = doc.remove(path, *all, true, &mut NullSink);
            Ok(None)
        }
        Operation::CreateChild {
            path,
            tag,
            after,
            values,
        } => {
            let mut sink = CollectedSink::new();
            let Some(parent) = doc.find_element(path, false, &mut sink) else {
                return Ok(Some(render_diags(&sink, path)));
            };
            if doc.child_by_name(parent, tag).is_some() {
                return Ok(None);
            }
            let anchors: Vec<&str> = after.iter().map(String::as_str).collect();
            let child = doc.create_child(parent, tag, &anchors)?;
            if let Some(values) = values {
                doc.set(child, values, None, &SetOptions::default(), &mut sink)?;
            }
            Ok(sink.has_errors().then(|| render_diags(&sink, path)))
        }
        Operation::Fill {
            path,
            tag,
            items,
            clear,
        } => {
            let mut sink = CollectedSink::new();
            let Some(element) = doc.find_element(path, false, &mut sink) else {
                return Ok(Some(render_diags(&sink, path)));
            };
            doc.fill(element, tag, items, *clear, &mut sink)?;
            Ok(sink.has_errors().then(|| render_diags(&sink, path)))
        }
        Operation::EnsureSection {
            section,
            steps,
            values,
        } => {
            let mut sink = CollectedSink::new();
            let steps: Vec<SectionStep> = steps
                .iter()
                .map(|step| SectionStep {
                    after: step.after.clone(),
                    defaults: step.defaults.clone(),
                })
                .collect();
            let element = doc.ensure_section(section, &steps, &mut sink)?;
            if let Some(values) = values {
                doc.set(element, values, None, &SetOptions::default(), &mut sink)?;
            }
            Ok(sink.has_errors().then(|| render_diags(&sink, section)))
        }
    }
}

fn render_diags(sink: &CollectedSink, fallback_path: &str) -> String {
    if sink.diags.is_empty() {
        return format!("no element matches {fallback_path}");
    }
    sink.diags
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn fan_out_io_error(
    results: &mut Vec<(String, Result<PatchResult, ApplicationError>)>,
    patches: &[&PatchDefinition],
    path: &Path,
    source: &std::io::Error,
) {
    let kind = source.kind();
    let msg = source.to_string();
    for patch in patches {
        results.push((
            patch.id.clone(),
            Err(ApplicationError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(kind, msg.clone()),
            }),
        ));
    }
}

/// Atomic file write: tempfile in the same directory, fsync, rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "path has no parent directory",
        )
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::loader::load_from_str;

    const UNITS: &str = "<Units>\n  <Unit>\n    <Name>Grunt</Name>\n    <Health>100</Health>\n  </Unit>\n  <Unit>\n    <Name>Scout</Name>\n    <Health>60</Health>\n  </Unit>\n</Units>\n";

    fn workspace_with(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("units.xml");
        fs::write(&file, content).unwrap();
        (dir, file)
    }

    #[test]
    fn apply_set_patch_then_rerun_is_already_applied() {
        let (dir, file) = workspace_with(UNITS);
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "buff-grunt"
file = "units.xml"
operation = { type = "set", path = "//Unit[Name='Grunt']", values = { Health = "150" } }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::Applied { .. }
        ));
        let written = fs::read_to_string(&file).unwrap();
        assert!(written.contains("<Health>150</Health>"));
        assert!(written.contains("<Health>60</Health>"), "other unit untouched");

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::AlreadyApplied { .. }
        ));
    }

    #[test]
    fn check_patches_never_writes() {
        let (dir, file) = workspace_with(UNITS);
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "buff"
file = "units.xml"
operation = { type = "set", path = "//Unit[Name='Scout']", values = { Health = "90" } }
"#,
        )
        .unwrap();

        let results = check_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::Applied { .. }
        ));
        assert_eq!(fs::read_to_string(&file).unwrap(), UNITS);
    }

    #[test]
    fn missing_target_is_a_soft_failure() {
        let (dir, file) = workspace_with(UNITS);
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "ghost"
file = "units.xml"
operation = { type = "set", path = "//Unit[Name='Titan']", values = { Health = "1" } }

[[patches]]
id = "real"
file = "units.xml"
operation = { type = "set", path = "//Unit[Name='Scout']", values = { Health = "75" } }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        match results[0].1.as_ref().unwrap() {
            PatchResult::Failed { reason, .. } => {
                assert!(reason.contains("Titan"), "reason names the path: {reason}")
            }
            other => panic!("unexpected result: {other}"),
        }
        assert!(matches!(
            results[1].1.as_ref().unwrap(),
            PatchResult::Applied { .. }
        ));
        assert!(fs::read_to_string(&file).unwrap().contains("<Health>75</Health>"));
    }

    #[test]
    fn remove_of_absent_element_counts_as_already_applied() {
        let (dir, _file) = workspace_with(UNITS);
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "drop"
file = "units.xml"
operation = { type = "remove", path = "//Unit[Name='Titan']" }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::AlreadyApplied { .. }
        ));
    }

    #[test]
    fn create_child_does_not_duplicate_on_rerun() {
        let (dir, file) = workspace_with(UNITS);
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "give-armor"
file = "units.xml"

[patches.operation]
type = "create-child"
path = "//Unit[Name='Grunt']"
tag = "Armor"
values = { Rating = "3" }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::Applied { .. }
        ));
        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::AlreadyApplied { .. }
        ));
        assert_eq!(
            fs::read_to_string(&file).unwrap().matches("<Armor>").count(),
            1
        );
    }

    #[test]
    fn unreadable_file_reports_io_error_per_patch() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "a"
file = "missing.xml"
operation = { type = "remove", path = "//x" }

[[patches]]
id = "b"
file = "missing.xml"
operation = { type = "remove", path = "//y" }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        assert_eq!(results.len(), 2);
        for (_, result) in &results {
            assert!(matches!(
                result.as_ref().unwrap_err(),
                ApplicationError::Io { .. }
            ));
        }
    }

    #[test]
    fn ensure_section_patch_is_idempotent() {
        let (dir, file) = workspace_with("<Mission>\n</Mission>\n");
        let config = load_from_str(
            r#"
[meta]
workspace_relative = true

[[patches]]
id = "options"
file = "units.xml"

[patches.operation]
type = "ensure-section"
section = "Mission.Options"
values = { Difficulty = "hard" }
"#,
        )
        .unwrap();

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::Applied { .. }
        ));
        let once = fs::read_to_string(&file).unwrap();
        assert!(once.contains("<Difficulty>hard</Difficulty>"));

        let results = apply_patches(&config, dir.path());
        assert!(matches!(
            results[0].1.as_ref().unwrap(),
            PatchResult::AlreadyApplied { .. }
        ));
        assert_eq!(fs::read_to_string(&file).unwrap(), once);
    }
}
