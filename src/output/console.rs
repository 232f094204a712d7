//! Human-readable reporting to the terminal.

use std::io::{self, Write};

use crate::{
    collection::processes::ProcessSample, monitor::session::SessionResult,
    utils::data_units::format_size,
};

/// Writes progress and results for the user to read.
#[derive(Debug)]
pub struct Console<W: Write> {
    out: W,
    verbose: bool,
    to_file: bool,
}

impl<W: Write> Console<W> {
    /// `verbose` enables the per-tick lines; `to_file` hides the per-process
    /// summaries, since those end up in the result files instead.
    pub fn new(out: W, verbose: bool, to_file: bool) -> Self {
        Self {
            out,
            verbose,
            to_file,
        }
    }

    /// Prints one line per sampled process, then a blank line.
    pub fn tick(&mut self, samples: &[ProcessSample]) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }

        for sample in samples {
            writeln!(
                self.out,
                "{}({}): Mem: {} CPU: {:.6}",
                sample.name,
                sample.pid,
                format_size(sample.rss),
                sample.cpu_usage_percent
            )?;
        }
        writeln!(self.out)?;

        self.out.flush()
    }

    pub fn repetition(&mut self, result: &SessionResult) -> io::Result<()> {
        if !self.to_file {
            for summary in &result.summaries {
                writeln!(
                    self.out,
                    "{}({}): seconds alive: {}  avg CPU: {:.6}%  avg Mem: {}  peak Mem: {}",
                    summary.name,
                    summary.pid,
                    summary.sample_count,
                    summary.average_cpu,
                    format_size(summary.average_rss),
                    format_size(summary.peak_rss)
                )?;
            }
        }

        match &result.load_avg {
            Some(load) => writeln!(
                self.out,
                "load average: Load1: {:.6} Load5: {:.6} Load15: {:.6}",
                load.one, load.five, load.fifteen
            )?,
            None => writeln!(self.out, "load average: unavailable")?,
        }
        writeln!(
            self.out,
            "workload start time: {}ns",
            result.start_latency.as_nanos()
        )?;
        writeln!(
            self.out,
            "workload stop time: {}ns",
            result.stop_latency.as_nanos()
        )?;

        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
