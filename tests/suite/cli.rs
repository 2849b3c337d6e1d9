//! The `tickbridge` binary end to end.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn tickbridge(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tickbridge"))
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "warn")
        .env_remove("TICKBRIDGE_CONFIG")
        .env_remove("TICKBRIDGE_TEST_DIR")
        .output()
        .unwrap()
}

fn write_config(dir: &Path, extra: &str) -> String {
    let path = dir.join("tickbridge.toml");
    fs::write(&path, format!("[host]\ntick_interval_ms = 2\n{extra}")).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn run_executes_demo_suites_and_prints_summary() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = tickbridge(dir.path(), &["run", "--config", &config]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Test run: 6, Failed: 0"), "stdout: {stdout}");
}

#[test]
fn list_marks_foreign_suites_as_skipped() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");

    let output = tickbridge(dir.path(), &["list", "--config", &config]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let offline = stdout
        .lines()
        .find(|line| line.starts_with("offline_checks"))
        .unwrap();
    assert!(offline.contains("skipped"));
    assert!(stdout.lines().any(|line| line.starts_with("thread_affinity") && line.contains("host-loop")));
}

#[test]
fn bad_config_is_a_harness_failure() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[discovery]\nmarker = \"\"\n");

    let output = tickbridge(dir.path(), &["run", "--config", &config]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn prepare_and_launch_runs_the_harness_in_the_test_dir() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        "[run]\ntest_dir = \"work/it\"\naccept_eula = true\nlog_to_file = true\n",
    );

    let output = tickbridge(dir.path(), &["prepare-and-launch", "--config", &config]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let test_dir = dir.path().join("work/it");
    assert_eq!(
        fs::read_to_string(test_dir.join("eula.txt")).unwrap(),
        "eula=true\n"
    );
    assert!(test_dir.join("tickbridge.log").is_file());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Test run: 6, Failed: 0"));
}
