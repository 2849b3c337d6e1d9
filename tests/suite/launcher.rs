//! Working-directory preparation and child process launch.

use std::ffi::OsString;
use std::fs;

use tempfile::TempDir;
use tickbridge_config::RunConfig;
use tickbridge_runner::{EULA_FILE, LaunchError, ProcessLauncher, prepare};

#[test]
fn nonzero_exit_becomes_child_failed() {
    let dir = TempDir::new().unwrap();
    let launcher = ProcessLauncher::new("/bin/sh", dir.path())
        .arg("-c")
        .arg("exit 3");

    let err = launcher.launch_and_wait(&[]).unwrap_err();
    assert!(matches!(err, LaunchError::ChildFailed { code: Some(3) }));
}

#[test]
fn child_starts_in_the_prepared_directory() {
    let base = TempDir::new().unwrap();
    let run = RunConfig::default()
        .with_test_dir("run/test")
        .with_accept_eula(true);
    let prepared = prepare(&run, base.path()).unwrap();

    let launcher = ProcessLauncher::new("/bin/sh", prepared.path())
        .arg("-c")
        .arg("test -f eula.txt && pwd > where.txt && echo \"$1\" > arg.txt")
        .arg("sh");

    let status = launcher.launch_and_wait(&[OsString::from("forwarded")]).unwrap();
    assert!(status.success());
    assert!(prepared.path().join(EULA_FILE).is_file());

    let reported = fs::read_to_string(prepared.path().join("where.txt")).unwrap();
    assert_eq!(
        fs::canonicalize(reported.trim()).unwrap(),
        fs::canonicalize(prepared.path()).unwrap()
    );
    let arg = fs::read_to_string(prepared.path().join("arg.txt")).unwrap();
    assert_eq!(arg.trim(), "forwarded");
}
