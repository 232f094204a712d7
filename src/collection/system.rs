//! The real [`ProcessSource`], backed by sysinfo.

use std::time::Duration;

use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use super::{
    error::{CollectionError, CollectionResult},
    processes::{Pid, ProcessHandle, ProcessUsage},
    ProcessSource,
};

#[inline]
fn to_sysinfo_pid(pid: Pid) -> sysinfo::Pid {
    sysinfo::Pid::from(pid as usize)
}

/// A wrapper around a sysinfo [`System`] that only ever refreshes processes.
#[derive(Debug)]
pub struct SysinfoSource {
    system: System,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Looks up a process in the current snapshot. Zombies and dead processes
    /// count as gone; they have exited and only their table entry remains.
    fn live_process(&self, pid: Pid) -> CollectionResult<&sysinfo::Process> {
        match self.system.process(to_sysinfo_pid(pid)) {
            Some(process)
                if !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) =>
            {
                Ok(process)
            }
            _ => Err(CollectionError::NotFound(pid)),
        }
    }
}

impl ProcessSource for SysinfoSource {
    fn refresh(&mut self) -> CollectionResult<()> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        Ok(())
    }

    fn resolve(&mut self, pid: Pid) -> CollectionResult<ProcessHandle> {
        let process = self.live_process(pid)?;

        Ok(ProcessHandle {
            pid,
            start_time: process.start_time(),
        })
    }

    fn children(&mut self, handle: &ProcessHandle) -> CollectionResult<Vec<Pid>> {
        let parent = to_sysinfo_pid(handle.pid);

        Ok(self
            .system
            .processes()
            .values()
            .filter(|process| process.parent() == Some(parent) && process.thread_kind().is_none())
            .map(|process| process.pid().as_u32() as Pid)
            .collect())
    }

    fn usage(&mut self, handle: &ProcessHandle) -> CollectionResult<ProcessUsage> {
        let process = self.live_process(handle.pid)?;

        cfg_if::cfg_if! {
            if #[cfg(target_os = "linux")] {
                let swap = match super::processes::linux::swap_bytes(handle.pid) {
                    Ok(swap) => swap,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        return Err(CollectionError::NotFound(handle.pid));
                    }
                    Err(err) => {
                        log::debug!("could not read swap for pid {}: {err}", handle.pid);
                        0
                    }
                };
            } else {
                let swap = 0;
            }
        }

        Ok(ProcessUsage {
            name: process.name().to_string_lossy().into_owned(),
            cpu_time: Duration::from_millis(process.accumulated_cpu_time()),
            virtual_mem: process.virtual_memory(),
            rss: process.memory(),
            swap,
            start_time: process.start_time(),
        })
    }

    fn kill(&mut self, pid: Pid) -> CollectionResult<()> {
        cfg_if::cfg_if! {
            if #[cfg(target_family = "unix")] {
                super::processes::unix::kill_process_given_pid(pid, libc::SIGKILL)
            } else {
                let process = self.live_process(pid)?;
                if process.kill() {
                    Ok(())
                } else {
                    Err(CollectionError::General(anyhow::anyhow!(
                        "the kill request for process {pid} was refused"
                    )))
                }
            }
        }
    }
}
