use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Runs the binary against `root` with an isolated config home.
fn slotsave_cmd(root: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("slotsave").expect("binary exists");
    cmd.env("XDG_CONFIG_HOME", root.path().join("config"))
        .arg("--root")
        .arg(root.path());
    cmd
}

#[test]
fn slotsave_help_prints_usage() {
    Command::cargo_bin("slotsave")
        .expect("binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Inspect and maintain emulator save-state slots",
        ));
}

#[test]
fn list_on_fresh_root_shows_nine_empty_slots() {
    let root = TempDir::new().unwrap();

    let output = slotsave_cmd(&root).arg("list").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();

    assert_eq!(stdout.lines().count(), 9);
    assert!(stdout.lines().all(|line| line.ends_with("Empty")));
    assert!(root.path().join("saves").is_dir());
}

#[test]
fn import_then_export_round_trips_bytes() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("input.bin");
    let output = root.path().join("output.bin");
    fs::write(&input, [0u8, 1, 2, 3, 255]).unwrap();

    slotsave_cmd(&root)
        .args(["import", "4"])
        .arg(&input)
        .args(["--name", "Boss"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 5 bytes into slot 4"));

    slotsave_cmd(&root)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Boss"));

    slotsave_cmd(&root)
        .args(["export", "4"])
        .arg(&output)
        .assert()
        .success();

    assert_eq!(fs::read(&output).unwrap(), vec![0u8, 1, 2, 3, 255]);
}

#[test]
fn copy_and_rename_are_reported() {
    let root = TempDir::new().unwrap();
    let input = root.path().join("input.bin");
    fs::write(&input, b"state").unwrap();

    slotsave_cmd(&root)
        .args(["import", "1"])
        .arg(&input)
        .assert()
        .success();
    slotsave_cmd(&root)
        .args(["copy", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied slot 1 to slot 2"));
    slotsave_cmd(&root)
        .args(["rename", "2", "Backup"])
        .assert()
        .success();

    slotsave_cmd(&root)
        .args(["show", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Name:        Backup"));
}

#[test]
fn export_of_empty_slot_fails() {
    let root = TempDir::new().unwrap();

    slotsave_cmd(&root)
        .args(["export", "3"])
        .arg(root.path().join("out.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Slot 3 is empty"));
}

#[test]
fn out_of_range_slot_is_rejected() {
    let root = TempDir::new().unwrap();

    slotsave_cmd(&root)
        .args(["show", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 9"));
}

#[test]
fn migrate_dry_run_leaves_legacy_file() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("state"), b"legacy").unwrap();

    slotsave_cmd(&root)
        .args(["migrate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry-run: would migrate 6 bytes"));

    assert!(root.path().join("state").exists());
    assert!(!root.path().join("saves/slot_1/state.bin").exists());
}

#[test]
fn migrate_imports_legacy_file() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("state"), b"legacy").unwrap();

    slotsave_cmd(&root)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Migrated 6 bytes into slot 1"));

    assert!(!root.path().join("state").exists());
    assert_eq!(
        fs::read(root.path().join("saves/slot_1/state.bin")).unwrap(),
        b"legacy"
    );
}
