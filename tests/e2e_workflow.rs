//! End-to-end workflow through the CLI binary: discover patches, apply
//! them, verify, and re-apply to confirm idempotency.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

const MISSION: &str = "<Mission>\n  <Title>Beachhead</Title>\n  <Squad>\n    <Unit>rifleman</Unit>\n  </Squad>\n</Mission>\n";

fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(dir.path().join("mission.xml"), MISSION).unwrap();

    let patches_dir = dir.path().join("patches");
    fs::create_dir(&patches_dir).unwrap();
    fs::write(
        patches_dir.join("mission.toml"),
        r#"[meta]
name = "mission tweaks"
workspace_relative = true

[[patches]]
id = "rename-mission"
file = "mission.xml"
operation = { type = "set", path = "//Mission", values = { Title = "Second Wave" } }

[[patches]]
id = "restock-squad"
file = "mission.xml"

[patches.operation]
type = "fill"
path = "//Squad"
tag = "Unit"
items = ["rifleman", "medic"]

[[patches]]
id = "options"
file = "mission.xml"

[patches.operation]
type = "ensure-section"
section = "Mission.Options"
values = { Difficulty = "hard" }
"#,
    )
    .unwrap();

    dir
}

fn run(args: &[&str], dir: &TempDir) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_markup-patcher"))
        .args(args)
        .arg("--root")
        .arg(dir.path())
        .output()
        .expect("run binary")
}

#[test]
fn apply_verify_reapply() {
    let workspace = setup_workspace();

    let output = run(&["apply"], &workspace);
    assert!(output.status.success(), "apply failed: {output:?}");

    let mission = fs::read_to_string(workspace.path().join("mission.xml")).unwrap();
    assert!(mission.contains("<Title>Second Wave</Title>"));
    assert!(mission.contains("medic"));
    assert!(mission.contains("<Difficulty>hard</Difficulty>"));

    let output = run(&["verify"], &workspace);
    assert!(output.status.success(), "verify failed: {output:?}");

    let output = run(&["apply"], &workspace);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 already applied"), "stdout: {stdout}");
    assert_eq!(
        fs::read_to_string(workspace.path().join("mission.xml")).unwrap(),
        mission,
        "second apply must not change bytes"
    );
}

#[test]
fn dry_run_leaves_files_alone() {
    let workspace = setup_workspace();

    let output = run(&["apply", "--dry-run"], &workspace);
    assert!(output.status.success(), "dry run failed: {output:?}");
    assert_eq!(
        fs::read_to_string(workspace.path().join("mission.xml")).unwrap(),
        MISSION
    );
}

#[test]
fn status_and_list_report_patches() {
    let workspace = setup_workspace();

    let output = run(&["list"], &workspace);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mission tweaks"));
    assert!(stdout.contains("rename-mission"));

    let output = run(&["status"], &workspace);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NOT APPLIED"), "stdout: {stdout}");

    let output = run(&["apply"], &workspace);
    assert!(output.status.success());

    let output = run(&["status"], &workspace);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("APPLIED"), "stdout: {stdout}");
}

#[test]
fn verify_fails_before_apply() {
    let workspace = setup_workspace();

    let output = run(&["verify"], &workspace);
    assert!(
        !output.status.success(),
        "verify should exit nonzero while patches are pending"
    );
}
