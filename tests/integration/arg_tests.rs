//! These tests are mostly here just to ensure that invalid results will be
//! caught when passing arguments, and that nothing is started or written when
//! they are.

use assert_cmd::prelude::*;
use predicates::prelude::*;

use crate::util::{image_file, is_empty_dir, no_cfg_benchmon_command};

#[test]
fn test_missing_image() {
    no_cfg_benchmon_command()
        .assert()
        .failure()
        .stderr(predicate::str::contains("required arguments"));
}

#[test]
fn test_too_many_images() {
    no_cfg_benchmon_command()
        .arg("first.aci")
        .arg("second.aci")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn test_invalid_duration() {
    let image = image_file();
    let output_dir = tempfile::tempdir().unwrap();

    no_cfg_benchmon_command()
        .arg(image.path())
        .arg("-d")
        .arg("abc")
        .arg("--to_file")
        .arg("-w")
        .arg(output_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "'--duration' was set with an invalid value",
        ));

    assert!(is_empty_dir(output_dir.path()));
}

#[test]
fn test_zero_duration() {
    no_cfg_benchmon_command()
        .arg(image_file().path())
        .arg("-d")
        .arg("0s")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'duration' must be greater than 0"));
}

#[test]
fn test_zero_repetitions() {
    no_cfg_benchmon_command()
        .arg(image_file().path())
        .arg("-r")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'repetitions' must be at least 1"));
}

#[test]
fn test_negative_repetitions() {
    no_cfg_benchmon_command()
        .arg(image_file().path())
        .arg("-r")
        .arg("-1")
        .assert()
        .failure();
}

#[test]
fn test_invalid_log_level() {
    no_cfg_benchmon_command()
        .arg(image_file().path())
        .arg("--log_level")
        .arg("loud")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_image_does_not_exist() {
    let dir = tempfile::tempdir().unwrap();

    no_cfg_benchmon_command()
        .arg(dir.path().join("missing.aci"))
        .arg("--allow_unprivileged")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[cfg(target_family = "unix")]
#[test]
fn test_needs_root() {
    // SAFETY: geteuid has no preconditions and can't fail.
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    no_cfg_benchmon_command()
        .arg(image_file().path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs to be run as root"));
}

#[test]
fn test_help() {
    no_cfg_benchmon_command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sampling Options"))
        .stdout(predicate::str::contains("--show_output"));
}
