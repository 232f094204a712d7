//! Unix-specific parts of process handling.

use anyhow::anyhow;

use super::Pid;
use crate::collection::error::{CollectionError, CollectionResult};

/// Sends `signal` to a process, given a PID, for unix.
///
/// A process that no longer exists is reported as [`CollectionError::NotFound`].
pub(crate) fn kill_process_given_pid(pid: Pid, signal: libc::c_int) -> CollectionResult<()> {
    // SAFETY: kill(2) has no memory safety requirements.
    let output = unsafe { libc::kill(pid, signal) };
    if output != 0 {
        // We had an error...
        let err_code = std::io::Error::last_os_error().raw_os_error();
        let err = match err_code {
            Some(libc::ESRCH) => return Err(CollectionError::NotFound(pid)),
            Some(libc::EPERM) => "the calling process does not have the permissions to terminate the target process(es).",
            Some(libc::EINVAL) => "an invalid signal was specified.",
            _ => "Unknown error occurred."
        };

        return if let Some(err_code) = err_code {
            Err(CollectionError::General(anyhow!(
                "Error code {err_code} - {err}"
            )))
        } else {
            Err(CollectionError::General(anyhow!("Error code ??? - {err}")))
        };
    }

    Ok(())
}
