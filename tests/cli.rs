use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;
use twat_text::runner::CommandSpec;
use twat_text::toolchain::{BuildConfig, DEFAULT_CONFIG_FILE, ToolSpec};

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).to_string()
}

/// A config whose external tools are all the `twat-text` binary, so the
/// build driver can be exercised without uv or git.
fn write_local_config(root: &Path, lint_tools: Vec<ToolSpec>) {
    let bin = env!("CARGO_BIN_EXE_twat-text");
    let mut config = BuildConfig::default();
    config.requirements.package_manager = CommandSpec::new(bin, ["--version"]);
    config.lint.tools = lint_tools;
    fs::write(
        root.join(DEFAULT_CONFIG_FILE),
        serde_yaml::to_string(&config).unwrap(),
    )
    .unwrap();
}

#[test]
fn process_with_defaults_succeeds() {
    let assert = Command::cargo_bin("twat-text")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .assert()
        .success();
    assert!(stdout_of(&assert).contains("Processing completed: {}"));
}

#[test]
fn process_with_config_and_data_succeeds() {
    Command::cargo_bin("twat-text")
        .expect("binary present")
        .args(["--debug", "--config", "name=test", "data1", "data2"])
        .assert()
        .success();
}

#[test]
fn malformed_config_exits_with_one() {
    let assert = Command::cargo_bin("twat-text")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .args(["--config", "broken"])
        .assert()
        .code(1);
    assert!(stdout_of(&assert).contains("Invalid config format"));
}

#[test]
fn version_flag_prints_package_version() {
    let assert = Command::cargo_bin("twat-text")
        .expect("binary present")
        .arg("--version")
        .assert()
        .success();
    assert_eq!(
        stdout_of(&assert).trim(),
        format!("twat-text {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn build_outside_checkout_fails() {
    let temp = tempdir().unwrap();
    let assert = Command::cargo_bin("twat-build")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .current_dir(temp.path())
        .arg("clean")
        .assert()
        .code(1);
    assert!(stdout_of(&assert).contains("Not in a git repository"));
}

#[test]
fn tag_without_version_fails_before_anything_runs() {
    let temp = tempdir().unwrap();
    let assert = Command::cargo_bin("twat-build")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .current_dir(temp.path())
        .arg("tag")
        .assert()
        .code(1);
    let stdout = stdout_of(&assert);
    assert!(stdout.contains("tag command requires a version argument"));
    assert!(!stdout.contains("Checking requirements"));
}

#[test]
fn invalid_build_config_fails() {
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();
    fs::write(
        temp.path().join(DEFAULT_CONFIG_FILE),
        "package:\n  build:\n    program: \"\"\n",
    )
    .unwrap();

    let assert = Command::cargo_bin("twat-build")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(temp.path())
        .arg("clean")
        .assert()
        .code(1);
    assert!(stdout_of(&assert).contains("package.build: program cannot be empty"));
}

#[test]
fn clean_command_removes_dist() {
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();
    fs::create_dir_all(temp.path().join("dist")).unwrap();
    fs::write(temp.path().join("dist/stale.whl"), b"stale").unwrap();
    write_local_config(temp.path(), BuildConfig::default().lint.tools);

    let assert = Command::cargo_bin("twat-build")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(temp.path())
        .args(["clean", "--print-metrics"])
        .assert()
        .success();

    assert!(stdout_of(&assert).contains("Stage clean took"));
    assert!(!temp.path().join("dist").exists());
    assert!(temp.path().join(".git").is_dir());
}

#[test]
fn lint_command_stops_at_failing_tool() {
    let temp = tempdir().unwrap();
    fs::create_dir(temp.path().join(".git")).unwrap();
    let bin = env!("CARGO_BIN_EXE_twat-text");
    write_local_config(
        temp.path(),
        vec![
            ToolSpec::new("Passing check", bin, ["ok"]),
            ToolSpec::new("Broken check", bin, ["--config", "broken"]),
            ToolSpec::new("Never reached", bin, ["unused"]),
        ],
    );

    let assert = Command::cargo_bin("twat-build")
        .expect("binary present")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(temp.path())
        .arg("lint")
        .assert()
        .code(1);
    let stdout = stdout_of(&assert);
    assert!(stdout.contains("Passing check passed"));
    assert!(stdout.contains("Broken check failed"));
    assert!(!stdout.contains("Running Never reached"));
}
