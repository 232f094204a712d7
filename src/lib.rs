//! A library for benchmon, a workload resource monitor. See [`start_benchmon`]
//! for the entry point, and [`monitor::session::Session`] for the core of it.

#![warn(rust_2018_idioms)]

pub mod collection;
pub mod constants;
pub mod launcher;
pub mod monitor;
pub mod options;
pub mod output;

pub mod utils {
    pub mod data_units;
    pub mod logging;
}

use std::io;

use anyhow::Context;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    collection::SysinfoSource,
    launcher::runtime_launcher,
    monitor::{interrupt, session::Session},
    options::BenchOptions,
    output::{console::Console, save_results},
};

/// Runs a whole benchmarking session with already validated options.
pub fn start_benchmon(options: &BenchOptions) -> anyhow::Result<()> {
    // The local offset can only be read safely while there is a single thread.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let launcher = runtime_launcher(options).with_context(|| {
        format!("Unable to read the image at '{}'.", options.image.display())
    })?;
    let interrupts = interrupt::install()?;

    let console = Console::new(io::stdout(), options.verbose, options.to_file);
    let mut session = Session::new(
        options.session_config(),
        launcher,
        SysinfoSource::new(),
        console,
    )
    .with_interrupts(interrupts);

    let outcome = session.run()?;

    if options.to_file {
        let now = OffsetDateTime::now_utc().to_offset(offset);
        save_results(
            &options.output_dir,
            &options.flavor(),
            now,
            &outcome.intervals,
            &outcome.results,
        );
    }

    Ok(())
}
