//! Linux-only process figures read from `/proc/<PID>/`.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
};

use super::{Bytes, Pid};

/// Returns the swapped out memory of a process in bytes, as reported by the
/// `VmSwap` line of `/proc/<PID>/status`. For documentation, see
/// <https://man7.org/linux/man-pages/man5/proc_pid_status.5.html>.
///
/// Kernel threads have no `VmSwap` line, in which case this returns 0.
pub(crate) fn swap_bytes(pid: Pid) -> io::Result<Bytes> {
    let mut path = PathBuf::from("/proc");
    path.push(pid.to_string());
    path.push("status");

    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if let Some(rest) = line.strip_prefix("VmSwap:") {
            return parse_kb_value(rest);
        }
    }

    Ok(0)
}

/// Parses a value like `"    1234 kB"` into bytes.
fn parse_kb_value(value: &str) -> io::Result<Bytes> {
    let mut parts = value.split_whitespace();
    let amount: u64 = parts
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidData))?;

    match parts.next() {
        Some("kB") | None => Ok(amount * 1024),
        Some(_) => Err(io::Error::from(io::ErrorKind::InvalidData)),
    }
}
