//! These tests are for config files that should be accepted.

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::util::benchmon_command;

#[test]
fn test_all_flags() {
    // The config allows running unprivileged, so the image check is what fails.
    let dir = tempfile::tempdir().unwrap();

    benchmon_command(&["-C", "./tests/valid_configs/all_flags.toml"])
        .arg(dir.path().join("missing.aci"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_empty_config() {
    benchmon_command(&["-C", "./tests/valid_configs/empty_config.toml"])
        .arg("--help")
        .assert()
        .success();
}
