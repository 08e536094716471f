use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use markup_patcher::patch::{
    apply_patches, check_patches, load_from_path, PatchResult,
};
use similar::{ChangeTag, TextDiff};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "markup-patcher")]
#[command(about = "Format-preserving patcher for game configuration markup", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patches to a game config root
    Apply {
        /// Path to the config root (defaults to MARKUP_PATCHER_ROOT or cwd)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Specific patch file to apply (otherwise applies all in patches/)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check status of patches without applying
    Status {
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Verify that all patches are already applied
    Verify {
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List available patches
    List {
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            root,
            patches,
            dry_run,
            diff,
        } => cmd_apply(root, patches, dry_run, diff),

        Commands::Status { root } => cmd_status(root),

        Commands::Verify { root } => cmd_verify(root),

        Commands::List { root } => cmd_list(root),
    }
}

/// Discover all .toml patch files in a patches/ directory.
///
/// Looks under `<root>/patches` first, then `./patches` relative to the
/// current working directory.
fn discover_patch_files(root: &Path) -> Result<Vec<PathBuf>> {
    let cwd_patches_dir = env::current_dir().ok().map(|cwd| cwd.join("patches"));
    let root_patches_dir = root.join("patches");

    let candidate_dirs: Vec<PathBuf> = std::iter::once(root_patches_dir)
        .chain(cwd_patches_dir)
        .collect();

    for patches_dir in candidate_dirs {
        if !patches_dir.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&patches_dir).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();

        if !files.is_empty() {
            return Ok(files);
        }
    }

    anyhow::bail!(
        "No .toml patch files found in either ./patches or {}/patches",
        root.display()
    )
}

/// Resolve the config root: explicit flag, then MARKUP_PATCHER_ROOT, then
/// the current directory.
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return Ok(path.canonicalize()?);
    }

    if let Ok(env_path) = env::var("MARKUP_PATCHER_ROOT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!("Warning: MARKUP_PATCHER_ROOT is set but path doesn't exist: {env_path}")
                .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Show unified diff between original and modified content.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    root: Option<PathBuf>,
    patches: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;

    let patch_files = if let Some(path) = patches {
        vec![path]
    } else {
        discover_patch_files(&root)?
    };

    println!("Config root: {}", root.display());
    println!();

    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_failed = 0;

    for patch_file in patch_files {
        println!("Loading patches from {}...", patch_file.display());

        let config = load_from_path(&patch_file)?;

        // Capture target contents before applying, for diff output.
        let mut file_contents_before: HashMap<PathBuf, String> = HashMap::new();
        if show_diff {
            let target_files: HashSet<PathBuf> = config
                .patches
                .iter()
                .map(|p| {
                    if config.meta.workspace_relative {
                        root.join(&p.file)
                    } else {
                        PathBuf::from(&p.file)
                    }
                })
                .collect();
            for file_path in target_files {
                if let Ok(content) = fs::read_to_string(&file_path) {
                    file_contents_before.insert(file_path, content);
                }
            }
        }

        let results = if dry_run {
            println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
            check_patches(&config, &root)
        } else {
            apply_patches(&config, &root)
        };

        for (patch_id, result) in results {
            match result {
                Ok(PatchResult::Applied { ref file }) => {
                    let verb = if dry_run { "Would apply to" } else { "Applied to" };
                    println!("{} {}: {} {}", "✓".green(), patch_id, verb, file.display());
                    total_applied += 1;

                    if show_diff && !dry_run {
                        if let Some(before) = file_contents_before.get(file) {
                            if let Ok(after) = fs::read_to_string(file) {
                                if before != &after {
                                    display_diff(file, before, &after);
                                }
                            }
                        }
                    }
                }
                Ok(PatchResult::AlreadyApplied { file }) => {
                    println!(
                        "{} {}: Already applied to {}",
                        "⊙".yellow(),
                        patch_id,
                        file.display()
                    );
                    total_already_applied += 1;
                }
                Ok(PatchResult::Failed { file, reason }) => {
                    eprintln!("{} {}: Failed - {}", "✗".red(), patch_id, reason);
                    eprintln!("  File: {}", file.display());
                    total_failed += 1;
                }
                Err(e) => {
                    eprintln!("{} {}: Error - {}", "✗".red(), patch_id, e);
                    total_failed += 1;
                }
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} failed", format!("{}", total_failed).red());

    if total_failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let patch_files = discover_patch_files(&root)?;

    println!("{}", "Patch Status Report".bold());
    println!("Config root: {}", root.display());
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();

    for patch_file in patch_files {
        let config = load_from_path(&patch_file)?;
        let results = check_patches(&config, &root);

        for (patch_id, result) in results {
            match result {
                Ok(PatchResult::Applied { .. }) => {
                    not_applied.push((patch_id, "target found but not yet patched".to_string()));
                }
                Ok(PatchResult::AlreadyApplied { .. }) => {
                    applied.push(patch_id);
                }
                Ok(PatchResult::Failed { ref reason, .. }) => {
                    not_applied.push((patch_id, reason.clone()));
                }
                Err(ref e) => {
                    not_applied.push((patch_id, e.to_string()));
                }
            }
        }
    }

    if !applied.is_empty() {
        println!(
            "{} {} ({} patches)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} patches)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for (id, reason) in &not_applied {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_verify(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let patch_files = discover_patch_files(&root)?;

    println!("{}", "Verifying patches...".bold());
    println!("Config root: {}", root.display());
    println!();

    let mut verified = 0;
    let mut mismatch = 0;

    for patch_file in patch_files {
        let config = load_from_path(&patch_file)?;
        let results = check_patches(&config, &root);

        for (patch_id, result) in results {
            match result {
                Ok(PatchResult::AlreadyApplied { .. }) => {
                    println!("{} {}: Verified (already applied)", "✓".green(), patch_id);
                    verified += 1;
                }
                Ok(PatchResult::Applied { file }) => {
                    eprintln!("{} {}: MISMATCH", "✗".red(), patch_id);
                    eprintln!("  Expected: patch already applied");
                    eprintln!("  Found: patch not yet applied");
                    eprintln!("  Location: {}", file.display());
                    mismatch += 1;
                }
                Ok(PatchResult::Failed {
                    ref file,
                    ref reason,
                }) => {
                    eprintln!("{} {}: MISMATCH", "✗".red(), patch_id);
                    eprintln!("  Error: {}", reason);
                    eprintln!("  Location: {}", file.display());
                    mismatch += 1;
                }
                Err(ref e) => {
                    eprintln!("{} {}: MISMATCH", "✗".red(), patch_id);
                    eprintln!("  Error: {}", e);
                    mismatch += 1;
                }
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} verified", format!("{}", verified).green());
    println!("  {} mismatch", format!("{}", mismatch).red());

    if mismatch > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(root: Option<PathBuf>) -> Result<()> {
    let root = resolve_root(root)?;
    let patch_files = discover_patch_files(&root)?;

    for patch_file in patch_files {
        let config = load_from_path(&patch_file)?;
        let title = if config.meta.name.is_empty() {
            patch_file.display().to_string()
        } else {
            config.meta.name.clone()
        };
        println!("{} ({})", title.bold(), patch_file.display());
        if let Some(description) = &config.meta.description {
            println!("  {}", description.dimmed());
        }
        for patch in &config.patches {
            println!("  - {} -> {}", patch.id, patch.file);
        }
        println!();
    }

    Ok(())
}
