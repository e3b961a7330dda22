//! End-to-end tests for the devsync binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn devsync(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("devsync").unwrap();
    cmd.arg("--data-dir").arg(data_dir).env_remove("RUST_LOG");
    cmd
}

fn received_id(stdout: &[u8]) -> String {
    let text = String::from_utf8_lossy(stdout);
    text.split_whitespace()
        .skip_while(|w| *w != "Received")
        .nth(1)
        .expect("receive output names the interaction")
        .to_string()
}

#[test]
fn status_before_init() {
    let dir = tempdir().unwrap();
    devsync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT INITIALIZED"));
}

#[test]
fn receive_then_read_flow() {
    let dir = tempdir().unwrap();
    devsync(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized successfully"));

    let output = devsync(dir.path())
        .args(["receive", "hello", "--expires-in", "60"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let id = received_id(&output.stdout);

    devsync(dir.path())
        .args(["read", &id, "--at", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Expiration timer started at"));

    devsync(dir.path())
        .args(["read", &id, "--at", "2000", "--circumstance", "on-linked-device"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already read"));

    devsync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 unread, 1 expiring"));
}

#[test]
fn read_rejects_unknown_circumstance() {
    let dir = tempdir().unwrap();
    devsync(dir.path()).arg("init").assert().success();
    devsync(dir.path())
        .args(["read", "--through", "1", "--circumstance", "somewhere"])
        .assert()
        .failure();
}

#[test]
fn keys_resync_reports_handoff() {
    let dir = tempdir().unwrap();
    devsync(dir.path()).arg("init").assert().success();
    devsync(dir.path())
        .args(["keys", "--resync", "tablet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resync-requested(tablet)"))
        .stdout(predicate::str::contains("3 keys"));
}

#[test]
fn init_twice_fails() {
    let dir = tempdir().unwrap();
    devsync(dir.path()).arg("init").assert().success();
    devsync(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Already initialized"));
}
