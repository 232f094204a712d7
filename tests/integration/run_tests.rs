//! Full runs of benchmon against a stand-in runtime.
//!
//! The stand-in `rkt` is a symlink to `sh`, so `rkt run <IMAGE> ...` ends up
//! running the shell script called `run` in the working directory.

use std::{
    fs,
    os::unix::fs::symlink,
    path::Path,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::util::{image_file, is_empty_dir, no_cfg_benchmon_command};

/// A directory holding the stand-in runtime, and a `run` script doing `script`.
fn runtime(script: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    symlink("/bin/sh", dir.path().join("rkt")).unwrap();
    fs::write(dir.path().join("run"), script).unwrap();

    dir
}

fn benchmon(runtime: &Path, image: &Path) -> Command {
    let mut cmd = no_cfg_benchmon_command();
    cmd.current_dir(runtime)
        .arg(image)
        .arg("--allow_unprivileged")
        .arg("-p")
        .arg(runtime);

    cmd
}

fn files_ending_with(dir: &Path, suffix: &str) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(suffix))
        .collect()
}

#[test]
fn test_workload_exits_prematurely() {
    let runtime = runtime("exit 0\n");
    let image = image_file();

    benchmon(runtime.path(), image.path())
        .arg("-d")
        .arg("30s")
        .assert()
        .success()
        .stderr(predicate::str::contains("workload exited prematurely"))
        .stdout(predicate::str::contains("load average:"))
        .stdout(predicate::str::contains("workload stop time:"));
}

#[test]
fn test_results_are_written() {
    let runtime = runtime("sleep 30\n");
    let image = image_file();
    let output_dir = tempfile::tempdir().unwrap();

    benchmon(runtime.path(), image.path())
        .arg("-d")
        .arg("1s")
        .arg("-r")
        .arg("2")
        .arg("-f")
        .arg("-w")
        .arg(output_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("seconds alive").not());

    let interval = files_ending_with(
        output_dir.path(),
        "_stage1-coreos.aci_rkt_benchmark_interval.csv",
    );
    let summary = files_ending_with(
        output_dir.path(),
        "_stage1-coreos.aci_rkt_benchmark_summary.csv",
    );
    assert_eq!(interval.len(), 1);
    assert_eq!(summary.len(), 1);

    let summary = fs::read_to_string(output_dir.path().join(&summary[0])).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines[0], "Load1,Load5,Load15,StartTime,StopTime");
    assert_eq!(lines.len(), 3);

    let interval = fs::read_to_string(output_dir.path().join(&interval[0])).unwrap();
    assert!(interval.starts_with("Time,PID name,PID number,RSS,CPU\n"));
    assert!(interval.lines().count() > 1);
}

#[test]
fn test_verbose_and_summaries() {
    let runtime = runtime("sleep 30\n");
    let image = image_file();

    benchmon(runtime.path(), image.path())
        .arg("-v")
        .arg("-d")
        .arg("2s")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mem:"))
        .stdout(predicate::str::contains("seconds alive"));
}

#[test]
fn test_launch_failure() {
    let empty_runtime = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let image = image_file();

    benchmon(empty_runtime.path(), image.path())
        .arg("-f")
        .arg("-w")
        .arg(output_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to launch"));

    assert!(is_empty_dir(output_dir.path()));
}

#[test]
fn test_interrupt_stops_everything() {
    let runtime = runtime("sleep 60\n");
    let image = image_file();

    let mut child = benchmon(runtime.path(), image.path())
        .arg("-d")
        .arg("60s")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(1500));
    // SAFETY: the pid belongs to a child we have not reaped yet.
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGINT);
    }

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if start.elapsed() > Duration::from_secs(20) {
            child.kill().unwrap();
            panic!("benchmon did not stop after being interrupted");
        }
        thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(status.code(), Some(1));
}
