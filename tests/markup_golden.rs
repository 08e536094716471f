use markup_patcher::patch::{apply_patches, load_from_str, PatchResult};
use std::fs;

fn load_fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|err| panic!("failed to load fixture {name}: {err}"))
}

#[test]
fn unit_rebalance_fixture() {
    let input = load_fixture("units.xml.input");
    let expected = load_fixture("units.xml.expected");
    let config = load_from_str(&load_fixture("units.toml")).expect("patch config");

    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("units.xml");
    fs::write(&target, &input).expect("write target");

    let results = apply_patches(&config, dir.path());
    for (id, result) in &results {
        assert!(
            matches!(result.as_ref().unwrap(), PatchResult::Applied { .. }),
            "patch {id} should apply: {result:?}"
        );
    }

    let output = fs::read_to_string(&target).expect("read output");
    assert_eq!(output, expected);

    // Second application is a no-op.
    let results = apply_patches(&config, dir.path());
    for (id, result) in &results {
        assert!(
            matches!(result.as_ref().unwrap(), PatchResult::AlreadyApplied { .. }),
            "patch {id} should already be applied: {result:?}"
        );
    }
    assert_eq!(fs::read_to_string(&target).expect("read output"), expected);
}

#[test]
fn untouched_bytes_survive_byte_exactly() {
    let input = load_fixture("units.xml.input");
    let config = load_from_str(
        r#"
[meta]
workspace_relative = true

[[patches]]
id = "scout-only"
file = "units.xml"
operation = { type = "set", path = "//Unit[Name='Scout']", values = { Stats_Health = "75" } }
"#,
    )
    .expect("patch config");

    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("units.xml");
    fs::write(&target, &input).expect("write target");

    let results = apply_patches(&config, dir.path());
    assert!(matches!(
        results[0].1.as_ref().unwrap(),
        PatchResult::Applied { .. }
    ));

    let output = fs::read_to_string(&target).expect("read output");
    // Everything before the Scout unit is untouched, including the odd
    // spacing of the Debug element after it.
    let grunt_block = "  <Unit>\n    <Name>Grunt</Name>\n    <Stats.Health>100</Stats.Health>\n    <Tags>\n      <Tags>infantry</Tags>\n    </Tags>\n  </Unit>\n";
    assert!(output.contains(grunt_block));
    assert!(output.contains("<Debug enabled=\"true\" />"));
    assert!(output.contains("<Stats.Health>75</Stats.Health>"));
}
