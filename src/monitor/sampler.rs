//! Per-tick sampling of every tracked process.

use std::time::{Duration, Instant};

use hashbrown::HashMap;

use super::tree::TrackedSet;
use crate::collection::{
    error::{CollectionError, CollectionResult},
    processes::{Pid, ProcessHandle, ProcessSample, ProcessUsage},
    ProcessSource,
};

/// The last CPU reading of a process, used as the baseline for the next one.
#[derive(Debug, Clone, Copy)]
struct CpuBaseline {
    cpu_time: Duration,
    read_at: Instant,
}

#[derive(Debug, Clone)]
struct CachedHandle {
    handle: ProcessHandle,
    baseline: Option<CpuBaseline>,
}

impl CachedHandle {
    fn new(handle: ProcessHandle) -> Self {
        Self {
            handle,
            baseline: None,
        }
    }

    /// Returns the CPU usage since the previous reading as a percentage of one
    /// core, and makes this reading the new baseline. The first reading of a
    /// handle has nothing to compare against and returns 0.
    fn cpu_percent(&mut self, cpu_time: Duration, now: Instant) -> f64 {
        let percent = match self.baseline {
            Some(prev) => {
                let wall = now.saturating_duration_since(prev.read_at).as_secs_f64();
                if wall > 0.0 {
                    cpu_time.saturating_sub(prev.cpu_time).as_secs_f64() / wall * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        self.baseline = Some(CpuBaseline {
            cpu_time,
            read_at: now,
        });

        percent
    }
}

/// Resolved handles by PID, kept across ticks so that the CPU baseline of each
/// process survives from one sample to the next.
///
/// A cache lives for exactly one repetition.
#[derive(Debug, Default)]
pub struct HandleCache {
    entries: HashMap<Pid, CachedHandle>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The handles of processes that were alive at their last sample.
    pub fn survivors(&self) -> Vec<ProcessHandle> {
        self.entries.values().map(|entry| entry.handle).collect()
    }

    /// Returns the cached handle for `pid`, resolving it on a miss.
    fn get_or_resolve<S: ProcessSource>(
        &mut self, source: &mut S, pid: Pid,
    ) -> CollectionResult<&mut CachedHandle> {
        if !self.entries.contains_key(&pid) {
            let handle = source.resolve(pid)?;
            self.entries.insert(pid, CachedHandle::new(handle));
        }

        self.entries
            .get_mut(&pid)
            .ok_or(CollectionError::NotFound(pid))
    }

    fn invalidate(&mut self, pid: Pid) {
        self.entries.remove(&pid);
    }
}

/// All samples of one process, in the order they were taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessHistory {
    samples: Vec<ProcessSample>,
}

impl ProcessHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: ProcessSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[ProcessSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl FromIterator<ProcessSample> for ProcessHistory {
    fn from_iter<T: IntoIterator<Item = ProcessSample>>(iter: T) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

/// Takes one snapshot of every tracked process per call.
#[derive(Debug, Default)]
pub struct Sampler {
    cache: HandleCache,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &HandleCache {
        &self.cache
    }

    /// Samples every PID in `tracked` once. Processes that can't be resolved or
    /// read are skipped for this tick, since they are most likely exiting.
    ///
    /// `now` should be the time of the source's latest refresh.
    pub fn sample_once<S: ProcessSource>(
        &mut self, source: &mut S, tracked: &TrackedSet, now: Instant,
    ) -> Vec<ProcessSample> {
        tracked
            .iter()
            .filter_map(|pid| match self.sample_pid(source, pid, now) {
                Ok(sample) => Some(sample),
                Err(CollectionError::NotFound(_)) => {
                    log::trace!("pid {pid} is gone, skipping it this tick");
                    None
                }
                Err(err) => {
                    log::warn!("failed to sample pid {pid}: {err}");
                    None
                }
            })
            .collect()
    }

    fn sample_pid<S: ProcessSource>(
        &mut self, source: &mut S, pid: Pid, now: Instant,
    ) -> CollectionResult<ProcessSample> {
        let handle = self.cache.get_or_resolve(source, pid)?.handle;
        let usage = source.usage(&handle).inspect_err(|err| {
            if err.is_not_found() {
                self.cache.invalidate(pid);
            }
        })?;

        let entry = self.cache.get_or_resolve(source, pid)?;

        // The PID was recycled by a new process, so the old baseline means
        // nothing for it.
        if usage.start_time != entry.handle.start_time {
            log::debug!("pid {pid} was reused, dropping its cached handle");
            *entry = CachedHandle::new(ProcessHandle {
                pid,
                start_time: usage.start_time,
            });
        }

        let cpu_usage_percent = entry.cpu_percent(usage.cpu_time, now);

        Ok(to_sample(pid, usage, cpu_usage_percent))
    }
}

fn to_sample(pid: Pid, usage: ProcessUsage, cpu_usage_percent: f64) -> ProcessSample {
    ProcessSample {
        pid,
        name: usage.name,
        cpu_usage_percent,
        virtual_mem: usage.virtual_mem,
        rss: usage.rss,
        swap: usage.swap,
    }
}
