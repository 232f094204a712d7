//! Everything that talks to the OS about processes and load.
//!
//! The rest of the crate only sees the [`ProcessSource`] trait, so that tree
//! discovery, sampling and termination can be driven by a fake process table
//! in tests.

pub mod cpu;
pub mod error;
pub mod processes;
pub mod system;

use error::CollectionResult;
use processes::{Pid, ProcessHandle, ProcessUsage};

pub use system::SysinfoSource;

/// A queryable view of the process table.
///
/// Lookups work against the snapshot taken by the latest [`refresh`]; only
/// [`kill`] acts on the live system.
///
/// [`refresh`]: ProcessSource::refresh
/// [`kill`]: ProcessSource::kill
pub trait ProcessSource {
    /// Takes a fresh snapshot of the process table.
    fn refresh(&mut self) -> CollectionResult<()>;

    /// Resolves a PID into a handle, or [`NotFound`] if the process has exited
    /// or never existed.
    ///
    /// [`NotFound`]: error::CollectionError::NotFound
    fn resolve(&mut self, pid: Pid) -> CollectionResult<ProcessHandle>;

    /// Returns the direct children of a process. A leaf returns an empty list.
    fn children(&mut self, handle: &ProcessHandle) -> CollectionResult<Vec<Pid>>;

    /// Reads the current, raw usage figures of a process.
    fn usage(&mut self, handle: &ProcessHandle) -> CollectionResult<ProcessUsage>;

    /// Forcibly kills a process.
    fn kill(&mut self, pid: Pid) -> CollectionResult<()>;

    /// Whether the PID in `handle` still refers to the process it was resolved
    /// from, and not to a newer process that was given a recycled PID.
    fn is_same_process(&mut self, handle: &ProcessHandle) -> bool {
        self.resolve(handle.pid)
            .is_ok_and(|current| current.start_time == handle.start_time)
    }
}
