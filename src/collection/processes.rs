//! Types shared by everything that reads process data.
//!
//! For Linux, swap is read from `/proc` directly; every other figure is
//! handled by sysinfo.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod linux;
    }
}

cfg_if! {
    if #[cfg(target_family = "unix")] {
        pub mod unix;
    }
}

use std::time::Duration;

cfg_if! {
    if #[cfg(target_family = "windows")] {
        /// A Windows process ID.
        pub type Pid = usize;
    } else if #[cfg(target_family = "unix")] {
        /// A UNIX process ID.
        pub type Pid = libc::pid_t;
    }
}

pub type Bytes = u64;

/// A resolved process. The start time pins down *which* process a PID refers
/// to, since PIDs get recycled by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    /// The pid of the process.
    pub pid: Pid,

    /// When the process started, in seconds since the UNIX epoch.
    pub start_time: u64,
}

/// The raw, mostly cumulative figures read for one process at one point in
/// time. Turning the CPU time into a percentage needs a previous reading, which
/// is the sampler's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessUsage {
    /// The name of the process.
    pub name: String,

    /// Total CPU time spent by the process so far.
    pub cpu_time: Duration,

    /// Virtual memory.
    pub virtual_mem: Bytes,

    /// Resident set size.
    pub rss: Bytes,

    /// Swapped out memory. Always 0 where it can't be read.
    pub swap: Bytes,

    /// When the process started, in seconds since the UNIX epoch.
    pub start_time: u64,
}

/// One resource snapshot of one process, taken during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSample {
    /// The pid of the process.
    pub pid: Pid,

    /// The name of the process.
    pub name: String,

    /// CPU usage as a percentage of one core, since the previous sample of
    /// the same process.
    pub cpu_usage_percent: f64,

    /// Virtual memory.
    pub virtual_mem: Bytes,

    /// Resident set size.
    pub rss: Bytes,

    /// Swapped out memory.
    pub swap: Bytes,
}
