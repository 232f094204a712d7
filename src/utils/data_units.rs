pub const KIBI_LIMIT: u64 = 1024;
pub const MEBI_LIMIT: u64 = 1024 * 1024;
pub const GIBI_LIMIT: u64 = 1024 * 1024 * 1024;

/// Returns a human-readable size in units of 1024, truncated to a whole
/// number. Anything at or past a gibi is shown in `gB`.
#[inline]
pub fn format_size(bytes: u64) -> String {
    match bytes {
        b if b < KIBI_LIMIT => format!("{b} B"),
        b if b < MEBI_LIMIT => format!("{} kB", b / KIBI_LIMIT),
        b if b < GIBI_LIMIT => format!("{} mB", b / MEBI_LIMIT),
        b => format!("{} gB", b / GIBI_LIMIT),
    }
}
