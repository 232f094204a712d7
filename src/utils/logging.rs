use std::path::Path;

use time::{format_description::BorrowedFormatItem, macros::format_description};

// The weird "[[[" is because we need to escape a bracket ("[[") to show one "[".
// See https://time-rs.github.io/book/api/format-description.html
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[[[year]-[month]-[day]][[[hour]:[minute]:[second][subsecond digits:9]]"
);

/// Sets up the global logger. Messages always go to stderr, and are also
/// appended to `log_file` if one is given.
pub fn init_logger(
    min_level: log::LevelFilter, log_file: Option<&Path>,
) -> Result<(), fern::InitError> {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            // Note we aren't using local time since it only works on single-threaded processes.
            let offset = time::OffsetDateTime::now_utc();
            let timestamp = offset
                .format(TIMESTAMP_FORMAT)
                .unwrap_or_else(|_| offset.unix_timestamp().to_string());

            out.finish(format_args!(
                "{}[{}][{}] {}",
                timestamp,
                record.target(),
                record.level(),
                message
            ))
        })
        .level(min_level)
        .chain(std::io::stderr());

    let dispatch = match log_file {
        Some(path) => dispatch.chain(fern::log_file(path)?),
        None => dispatch,
    };

    dispatch.apply()?;

    Ok(())
}

/// Parses a log level name such as `debug` or `WARN`.
pub fn parse_level(level: &str) -> Option<log::LevelFilter> {
    level.parse().ok()
}
