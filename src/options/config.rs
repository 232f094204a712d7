use std::path::PathBuf;

use serde::Deserialize;

/// The contents of a config file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub flags: Option<ConfigFlags>,
}

/// A value that can be given as either a string or a plain number.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum StringOrNum {
    String(String),
    Num(u64),
}

impl From<String> for StringOrNum {
    fn from(value: String) -> Self {
        StringOrNum::String(value)
    }
}

/// The `[flags]` table. Every key mirrors the argument of the same name, and
/// an argument given on the command line always wins.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConfigFlags {
    pub(crate) verbose: Option<bool>,
    /// A human duration, or a number of milliseconds.
    pub(crate) duration: Option<StringOrNum>,
    pub(crate) repetitions: Option<u32>,
    pub(crate) show_output: Option<bool>,
    pub(crate) to_file: Option<bool>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) runtime_dir: Option<PathBuf>,
    pub(crate) stage1_path: Option<PathBuf>,
    pub(crate) allow_unprivileged: Option<bool>,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) log_level: Option<String>,
}
