//! Integration tests for benchmon.

mod util;

mod arg_tests;
mod invalid_config_tests;
mod valid_config_tests;

#[cfg(target_os = "linux")]
mod run_tests;
