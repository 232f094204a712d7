//! Folding a process history into summary statistics.

use indexmap::IndexMap;

use super::sampler::ProcessHistory;
use crate::collection::processes::{Bytes, Pid};

/// Summary statistics of one process over one repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub name: String,

    /// Arithmetic mean of the per-tick CPU percentages.
    pub average_cpu: f64,

    /// Arithmetic mean of the resident set size, truncated.
    pub average_rss: Bytes,

    /// The largest resident set size seen.
    pub peak_rss: Bytes,

    /// How many samples went into this summary. With a one second tick this is
    /// also how many seconds the process was seen alive.
    pub sample_count: usize,
}

/// Summarizes a history. An empty history has nothing to summarize and
/// returns `None`.
pub fn summarize(history: &ProcessHistory) -> Option<ProcessSummary> {
    let samples = history.samples();
    let first = samples.first()?;
    let count = samples.len();

    let (cpu_total, rss_total, peak_rss) = samples.iter().fold(
        (0.0_f64, 0_u128, 0),
        |(cpu_total, rss_total, peak_rss), sample| {
            (
                cpu_total + sample.cpu_usage_percent,
                rss_total + u128::from(sample.rss),
                peak_rss.max(sample.rss),
            )
        },
    );

    Some(ProcessSummary {
        pid: first.pid,
        name: first.name.clone(),
        average_cpu: cpu_total / count as f64,
        average_rss: (rss_total / count as u128) as Bytes,
        peak_rss,
        sample_count: count,
    })
}

/// Summarizes every history, in the order the processes were first seen.
/// Empty histories are left out.
pub fn summarize_all(histories: &IndexMap<Pid, ProcessHistory>) -> Vec<ProcessSummary> {
    histories.values().filter_map(summarize).collect()
}
