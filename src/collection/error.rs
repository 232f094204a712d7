use super::processes::Pid;

/// An error to do with querying or signalling processes.
#[derive(Debug)]
pub enum CollectionError {
    /// The process does not exist (anymore). This is expected to happen all the
    /// time as processes in the tree exit, and is never fatal by itself.
    NotFound(Pid),

    /// A general error to propagate back up. A wrapper around [`anyhow::Error`].
    General(anyhow::Error),

    /// The collection is unsupported.
    Unsupported,
}

impl CollectionError {
    /// Returns `true` if this error only says that the process is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectionError::NotFound(_))
    }
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionError::NotFound(pid) => write!(f, "process {pid} does not exist"),
            CollectionError::General(err) => err.fmt(f),
            CollectionError::Unsupported => {
                write!(
                    f,
                    "benchmon does not support this type of data collection for this platform."
                )
            }
        }
    }
}

impl std::error::Error for CollectionError {}

/// A [`Result`] with the error type being a [`CollectionError`].
pub type CollectionResult<T> = Result<T, CollectionError>;
