use std::time::Duration;

// Sampling
/// How often every tracked process is sampled.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_DURATION: &str = "10s";
pub const DEFAULT_REPETITIONS: u32 = 1;

/// The exit status used after an interrupt tore the workload down.
pub const INTERRUPTED_EXIT_CODE: i32 = 1;

// Workload
pub const DEFAULT_RUNTIME: &str = "rkt";
pub const DEFAULT_FLAVOR: &str = "stage1-coreos.aci";
pub const RUNTIME_NETWORK_ARG: &str = "--net=default-restricted";
pub const INSECURE_IMAGE_ARG: &str = "--insecure-options=image";
pub const POD_MANIFEST_KIND: &str = "PodManifest";

// Output
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp";
pub const INTERVAL_CSV_HEADER: [&str; 5] = ["Time", "PID name", "PID number", "RSS", "CPU"];
pub const SUMMARY_CSV_HEADER: [&str; 5] = ["Load1", "Load5", "Load15", "StartTime", "StopTime"];
pub const INTERVAL_CSV_SUFFIX: &str = "benchmark_interval.csv";
pub const SUMMARY_CSV_SUFFIX: &str = "benchmark_summary.csv";

// Config and logging
pub const DEFAULT_CONFIG_FILE_LOCATION: &str = "benchmon/benchmon.toml";
pub const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Warn;
