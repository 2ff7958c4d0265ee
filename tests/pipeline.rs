//! Whole-pipeline tests: a fake parser script stands in for aplparse.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use ada::hash::ContentHash;
use ada::oracle::{ParserOracle, TreeSource};
use ada::{differentiate_file, join_outputs, Error};

const SOURCE: &str = "\
⍝ two models
double←{2×⍵}

prod←{⍺×⍵}
";

/// Write an executable parser that knows the dfns used below.
fn fake_parser(dir: &Path) -> PathBuf {
    let path = dir.join("aplparse");
    let script = r#"#!/bin/sh
src=$(cat "$1")
case "$src" in
  'double←{2×⍵}') echo 'Assign(double,Lam(App2(Times,2,Omega)))' ;;
  'prod←{⍺×⍵}') echo 'Assign(prod,Lam(App2(Times,Alpha,Omega)))' ;;
  'wave←{3○⍵}') echo 'Assign(wave,Lam(App2(Circ,3,Omega)))' ;;
  *) echo "SYNTAX ERROR: $src" >&2; exit 2 ;;
esac
"#;
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_file_is_differentiated_through_the_parser() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = ParserOracle::new(fake_parser(dir.path()));
    let outcomes = differentiate_file(SOURCE, &oracle, true);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(
        join_outputs(&outcomes),
        "ddouble←{\n    ⍙1←2×⍵\n    ⍺←1+0×⍙1\n    ⍙dw←⍺×2\n    ⍙dw\n}\n\n\
dprod←{\n    ⍙a←⊃⍵\n    ⍙w←2⊃⍵\n    ⍙1←⍙a×⍙w\n    ⍺←1+0×⍙1\n    ⍙da←⍺×⍙w\n    ⍙dw←⍺×⍙a\n    ⍙da ⍙dw\n}"
    );
}

#[test]
fn test_repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = ParserOracle::new(fake_parser(dir.path()));
    let first = join_outputs(&differentiate_file(SOURCE, &oracle, true));
    let second = join_outputs(&differentiate_file(SOURCE, &oracle, true));
    assert_eq!(ContentHash::of(&first), ContentHash::of(&second));
}

#[test]
fn test_parser_errors_are_reported_per_dfn() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = ParserOracle::new(fake_parser(dir.path()));
    let outcomes = differentiate_file("bad←{⍵ ⍵}\ndouble←{2×⍵}\n", &oracle, true);
    match &outcomes[0].result {
        Err(Error::ParserFailed { status, stderr, .. }) => {
            assert_eq!(*status, Some(2));
            assert!(stderr.contains("SYNTAX ERROR"), "{}", stderr);
        }
        other => panic!("expected a parser failure, got {:?}", other),
    }
    assert!(outcomes[1].is_ok());
}

/// A parser that writes the path it was given next to itself, then exits
/// with `status`.
fn recording_parser(dir: &Path, status: u8) -> PathBuf {
    let path = dir.join(format!("record{}", status));
    let log = dir.join(format!("seen{}", status));
    let script = format!(
        "#!/bin/sh\nprintf '%s' \"$1\" > '{}'\necho 'Lam(Omega)'\nexit {}\n",
        log.display(),
        status
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn seen_input(dir: &Path, status: u8) -> PathBuf {
    PathBuf::from(fs::read_to_string(dir.join(format!("seen{}", status))).unwrap())
}

#[test]
fn test_parser_input_is_removed_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = ParserOracle::new(recording_parser(dir.path(), 0));
    assert_eq!(oracle.tree_string("f←{⍵}").unwrap(), "Lam(Omega)");
    let input = seen_input(dir.path(), 0);
    assert!(input.to_string_lossy().ends_with(".apl"), "{}", input.display());
    assert!(!input.exists(), "{} was left behind", input.display());
}

#[test]
fn test_parser_input_is_removed_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = ParserOracle::new(recording_parser(dir.path(), 3));
    match oracle.tree_string("f←{⍵}") {
        Err(Error::ParserFailed { status, .. }) => assert_eq!(status, Some(3)),
        other => panic!("expected a parser failure, got {:?}", other),
    }
    let input = seen_input(dir.path(), 3);
    assert!(!input.as_os_str().is_empty());
    assert!(!input.exists(), "{} was left behind", input.display());
}

// ─── Binary ────────────────────────────────────────────────────────

fn ada() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ada"))
}

#[test]
fn test_diff_writes_prefixed_file() {
    let dir = tempfile::tempdir().unwrap();
    let parser = fake_parser(dir.path());
    let input = dir.path().join("models.apl");
    fs::write(&input, SOURCE).unwrap();

    let status = ada()
        .arg("diff")
        .arg(&input)
        .arg("--parser")
        .arg(&parser)
        .status()
        .unwrap();
    assert!(status.success());
    let written = fs::read_to_string(dir.path().join("dmodels.apl")).unwrap();
    assert!(written.starts_with("ddouble←{"), "{}", written);
    assert!(written.contains("\n\ndprod←{"), "{}", written);
}

#[test]
fn test_diff_reads_ada_toml() {
    let dir = tempfile::tempdir().unwrap();
    fake_parser(dir.path());
    fs::write(
        dir.path().join("ada.toml"),
        "[parser]\npath = \"./aplparse\"\n\n[output]\nprefix = \"grad_\"\n",
    )
    .unwrap();
    let input = dir.path().join("models.apl");
    fs::write(&input, SOURCE).unwrap();

    let status = ada().arg("diff").arg(&input).status().unwrap();
    assert!(status.success());
    assert!(dir.path().join("grad_models.apl").exists());
}

#[test]
fn test_diff_fails_when_any_dfn_fails() {
    let dir = tempfile::tempdir().unwrap();
    let parser = fake_parser(dir.path());
    let input = dir.path().join("mixed.apl");
    fs::write(&input, "wave←{3○⍵}\ndouble←{2×⍵}\n").unwrap();

    let output = ada()
        .arg("diff")
        .arg(&input)
        .arg("--parser")
        .arg(&parser)
        .arg("--stdout")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.starts_with("ddouble←{"), "{}", stdout);
    assert!(stderr.contains("3○⍵"), "{}", stderr);
}

#[test]
fn test_hash_lists_each_derivative() {
    let dir = tempfile::tempdir().unwrap();
    let parser = fake_parser(dir.path());
    let input = dir.path().join("models.apl");
    fs::write(&input, SOURCE).unwrap();

    let output = ada()
        .arg("hash")
        .arg(&input)
        .arg("--parser")
        .arg(&parser)
        .arg("--full")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].trim_start().ends_with(" double"));
    assert_eq!(lines[0].split_whitespace().next().map(str::len), Some(64));
}
