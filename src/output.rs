//! Reporting results, both to the terminal and to CSV files.

pub mod console;
pub mod csv;

use std::path::{Path, PathBuf};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use self::csv::CsvTable;
use crate::{
    collection::processes::{Bytes, Pid, ProcessSample},
    constants::{
        DEFAULT_RUNTIME, INTERVAL_CSV_HEADER, INTERVAL_CSV_SUFFIX, SUMMARY_CSV_HEADER,
        SUMMARY_CSV_SUFFIX,
    },
    monitor::session::SessionResult,
    utils::data_units::format_size,
};

/// One row of the interval table: a single process at a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord {
    pub time: OffsetDateTime,
    pub name: String,
    pub pid: Pid,
    pub rss: Bytes,
    pub cpu: f64,
}

impl IntervalRecord {
    pub fn new(time: OffsetDateTime, sample: &ProcessSample) -> Self {
        Self {
            time,
            name: sample.name.clone(),
            pid: sample.pid,
            rss: sample.rss,
            cpu: sample.cpu_usage_percent,
        }
    }
}

fn format_time(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| time.unix_timestamp().to_string())
}

/// Every sample of every repetition, one row each.
pub fn interval_table(records: &[IntervalRecord]) -> CsvTable {
    let mut table = CsvTable::new(&INTERVAL_CSV_HEADER);
    for record in records {
        table.push_row(vec![
            format_time(record.time),
            record.name.clone(),
            record.pid.to_string(),
            format_size(record.rss),
            format!("{:.1}", record.cpu),
        ]);
    }

    table
}

/// One row per repetition. Load averages that could not be read are left
/// blank.
pub fn summary_table(results: &[SessionResult]) -> CsvTable {
    let mut table = CsvTable::new(&SUMMARY_CSV_HEADER);
    for result in results {
        let (one, five, fifteen) = match &result.load_avg {
            Some(load) => (
                format!("{:.2}", load.one),
                format!("{:.2}", load.five),
                format!("{:.2}", load.fifteen),
            ),
            None => Default::default(),
        };

        table.push_row(vec![
            one,
            five,
            fifteen,
            result.start_latency.as_nanos().to_string(),
            result.stop_latency.as_nanos().to_string(),
        ]);
    }

    table
}

/// The prefix shared by both result files of one run, such as
/// `2024-01-02_03-04_stage1-coreos.aci_`.
pub fn file_prefix(now: OffsetDateTime, flavor: &str) -> String {
    format!(
        "{}-{:02}-{:02}_{:02}-{:02}_{flavor}_",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute()
    )
}

/// Writes both result tables into `output_dir`. A table that can't be written
/// is logged and skipped; the paths that were written are returned.
pub fn save_results(
    output_dir: &Path, flavor: &str, now: OffsetDateTime, records: &[IntervalRecord],
    results: &[SessionResult],
) -> Vec<PathBuf> {
    let prefix = file_prefix(now, flavor);
    let tables = [
        (INTERVAL_CSV_SUFFIX, interval_table(records)),
        (SUMMARY_CSV_SUFFIX, summary_table(results)),
    ];

    tables
        .into_iter()
        .filter_map(|(suffix, table)| {
            let path = output_dir.join(format!("{prefix}{DEFAULT_RUNTIME}_{suffix}"));
            match table.save(&path) {
                Ok(()) => {
                    log::info!("wrote {}", path.display());
                    Some(path)
                }
                Err(err) => {
                    log::error!("can't write to {}: {err}", path.display());
                    None
                }
            }
        })
        .collect()
}
