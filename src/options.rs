//! How to create the [`BenchOptions`] from the arguments and the config file.

pub mod args;
pub mod config;
pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use self::{
    args::Args,
    config::{Config, ConfigFlags, StringOrNum},
    error::{OptionError, OptionResult},
};
use crate::{
    constants::*, launcher, monitor::session::SessionConfig, utils::logging::parse_level,
};

/// Everything a run of benchmon needs to know, after merging the arguments
/// with the config file and validating the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchOptions {
    pub image: PathBuf,
    pub duration: Duration,
    pub repetitions: u32,
    pub verbose: bool,
    pub show_output: bool,
    pub to_file: bool,
    pub output_dir: PathBuf,
    pub runtime_dir: Option<PathBuf>,
    pub stage1_path: Option<PathBuf>,
    pub allow_unprivileged: bool,
    pub log_file: Option<PathBuf>,
    pub log_level: log::LevelFilter,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            image: PathBuf::new(),
            duration: Duration::from_secs(10),
            repetitions: DEFAULT_REPETITIONS,
            verbose: false,
            show_output: false,
            to_file: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            runtime_dir: None,
            stage1_path: None,
            allow_unprivileged: false,
            log_file: None,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl BenchOptions {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            duration: self.duration,
            repetitions: self.repetitions,
            tick: TICK_INTERVAL,
            record_intervals: self.to_file,
        }
    }

    pub fn flavor(&self) -> String {
        launcher::flavor(self.stage1_path.as_deref())
    }
}

/// Parses, merges and validates everything, in this order: the config file,
/// the duration, the repetition count, privileges, and that the image exists.
/// Nothing is started before all of these pass.
pub fn get_options(args: Args) -> OptionResult<BenchOptions> {
    let config = read_config(args.other_args.config_location.as_deref())?;
    let options = init_options(args, &config)?;

    check_privileges(options.allow_unprivileged)?;
    check_image(&options.image)?;

    Ok(options)
}

/// Returns the path of the config file to use. An explicitly given location
/// always wins; otherwise, the default location is only used if a file exists
/// there.
pub fn get_config_path(config_location: Option<&Path>) -> Option<PathBuf> {
    if let Some(location) = config_location {
        return Some(location.to_path_buf());
    }

    let mut candidates = Vec::with_capacity(2);
    if cfg!(not(target_os = "windows")) {
        if let Some(home_path) = dirs::home_dir() {
            candidates.push(home_path.join(".config").join(DEFAULT_CONFIG_FILE_LOCATION));
        }
    }
    if let Some(config_path) = dirs::config_dir() {
        candidates.push(config_path.join(DEFAULT_CONFIG_FILE_LOCATION));
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Reads the config file, if there is one. A config file that was asked for
/// explicitly must exist.
pub fn read_config(config_location: Option<&Path>) -> OptionResult<Config> {
    let Some(path) = get_config_path(config_location) else {
        return Ok(Config::default());
    };

    let contents = fs::read_to_string(&path).map_err(|err| {
        OptionError::config(format!(
            "the config file at '{}' could not be read: {err}",
            path.display()
        ))
    })?;
    log::debug!("using the config file at {}", path.display());

    Ok(toml_edit::de::from_str(&contents)?)
}

/// Merges the arguments with the config file. Arguments win over the config
/// file, and the config file wins over the defaults.
pub fn init_options(args: Args, config: &Config) -> OptionResult<BenchOptions> {
    let default_flags = ConfigFlags::default();
    let flags = config.flags.as_ref().unwrap_or(&default_flags);
    let Args {
        image,
        sampling_args,
        workload_args,
        output_args,
        other_args,
    } = args;

    let duration = get_duration(sampling_args.duration, flags)?;
    let repetitions = get_repetitions(sampling_args.repetitions, flags)?;
    let log_level = get_log_level(other_args.log_level, flags)?;

    Ok(BenchOptions {
        image,
        duration,
        repetitions,
        verbose: output_args.verbose || flags.verbose.unwrap_or(false),
        show_output: workload_args.show_output || flags.show_output.unwrap_or(false),
        to_file: output_args.to_file || flags.to_file.unwrap_or(false),
        output_dir: output_args
            .output_dir
            .or_else(|| flags.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        runtime_dir: workload_args
            .runtime_dir
            .or_else(|| flags.runtime_dir.clone()),
        stage1_path: workload_args
            .stage1_path
            .or_else(|| flags.stage1_path.clone()),
        allow_unprivileged: workload_args.allow_unprivileged
            || flags.allow_unprivileged.unwrap_or(false),
        log_file: other_args.log_file.or_else(|| flags.log_file.clone()),
        log_level,
    })
}

fn try_parse_duration(value: &StringOrNum) -> Option<Duration> {
    match value {
        StringOrNum::String(value) => humantime::parse_duration(value.trim()).ok(),
        StringOrNum::Num(millis) => Some(Duration::from_millis(*millis)),
    }
}

fn get_duration(arg: Option<String>, flags: &ConfigFlags) -> OptionResult<Duration> {
    let duration = if let Some(arg) = arg {
        try_parse_duration(&StringOrNum::from(arg))
            .ok_or_else(|| OptionError::invalid_arg_value("duration"))?
    } else if let Some(value) = &flags.duration {
        try_parse_duration(value).ok_or_else(|| OptionError::invalid_config_value("duration"))?
    } else {
        humantime::parse_duration(DEFAULT_DURATION)
            .map_err(|err| OptionError::other(err.to_string()))?
    };

    if duration.is_zero() {
        return Err(OptionError::other(
            "'duration' must be greater than 0, please update your arguments or config file.",
        ));
    }

    Ok(duration)
}

fn get_repetitions(arg: Option<u32>, flags: &ConfigFlags) -> OptionResult<u32> {
    let repetitions = arg.or(flags.repetitions).unwrap_or(DEFAULT_REPETITIONS);

    if repetitions == 0 {
        return Err(OptionError::other(
            "'repetitions' must be at least 1, please update your arguments or config file.",
        ));
    }

    Ok(repetitions)
}

fn get_log_level(arg: Option<String>, flags: &ConfigFlags) -> OptionResult<log::LevelFilter> {
    if let Some(arg) = arg {
        parse_level(&arg).ok_or_else(|| OptionError::invalid_arg_value("log_level"))
    } else if let Some(level) = &flags.log_level {
        parse_level(level).ok_or_else(|| OptionError::invalid_config_value("log_level"))
    } else {
        Ok(DEFAULT_LOG_LEVEL)
    }
}

/// The runtime needs root, so refuse to go any further without it unless told
/// otherwise.
fn check_privileges(allow_unprivileged: bool) -> OptionResult<()> {
    if allow_unprivileged || is_privileged() {
        Ok(())
    } else {
        Err(OptionError::other(
            "benchmon needs to be run as root to launch the workload; pass '--allow_unprivileged' to skip this check.",
        ))
    }
}

#[cfg(target_family = "unix")]
fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and can't fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(target_family = "unix"))]
fn is_privileged() -> bool {
    true
}

fn check_image(image: &Path) -> OptionResult<()> {
    if image.is_file() {
        Ok(())
    } else {
        Err(OptionError::arg(format!(
            "'{}' does not exist or is not a file.",
            image.display()
        )))
    }
}
