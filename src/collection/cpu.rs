//! Data collection for the system load average.

use super::error::CollectionResult;

/// The 1, 5 and 15 minute system load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAvg {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Reads the system load average once.
#[cfg(target_family = "unix")]
pub fn get_load_avg() -> CollectionResult<LoadAvg> {
    // The API for sysinfo apparently wants you to call it like this, rather than
    // using a &System.
    let sysinfo::LoadAvg { one, five, fifteen } = sysinfo::System::load_average();

    Ok(LoadAvg { one, five, fifteen })
}

/// Reads the system load average once.
#[cfg(not(target_family = "unix"))]
pub fn get_load_avg() -> CollectionResult<LoadAvg> {
    Err(super::error::CollectionError::Unsupported)
}
