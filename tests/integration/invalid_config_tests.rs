//! These tests are for testing some invalid config-file-specific options.

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::util::{benchmon_command, image_file};

#[test]
fn test_toml_mismatch_type() {
    benchmon_command(&["-C", "./tests/invalid_configs/toml_mismatch_type.toml"])
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid type"));
}

#[test]
fn test_broken_toml() {
    benchmon_command(&["-C", "./tests/invalid_configs/broken.toml"])
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file error"));
}

#[test]
fn test_invalid_duration() {
    benchmon_command(&["-C", "./tests/invalid_configs/invalid_duration.toml"])
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'duration' was set with an invalid value",
        ));
}

#[test]
fn test_zero_repetitions() {
    benchmon_command(&["-C", "./tests/invalid_configs/zero_repetitions.toml"])
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("'repetitions' must be at least 1"));
}

#[test]
fn test_argument_overrides_config() {
    // The config's duration is broken, but is never looked at.
    benchmon_command(&["-C", "./tests/invalid_configs/invalid_duration.toml"])
        .arg(image_file().path())
        .arg("-d")
        .arg("1s")
        .arg("-r")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'repetitions' must be at least 1"));
}

#[test]
fn test_missing_config() {
    benchmon_command(&["-C", "./tests/invalid_configs/does_not_exist.toml"])
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be read"));
}
