use std::path::PathBuf;

/// Alias for `Result<T, Error>` as returned by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for temporary file operations.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A temporary file could not be created or renamed in the temp directory.
    #[error("unable to allocate a temporary file at {}", .path.display())]
    Allocation {
        /// The path that was being created (or renamed to).
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A caller-supplied name or extension violates the naming rules.
    #[error("invalid temporary file name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The target path is a directory, not a file.
    #[error("{} is a directory", .0.display())]
    IsDirectory(PathBuf),

    /// Content could not be written to the temporary file.
    #[error("unable to write to {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file could not be read or copied.
    #[error("unable to copy {} to {}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested image format is not supported.
    #[error("{0:?} is an invalid image format")]
    UnsupportedFormat(String),

    /// The image canvas could not be created or encoded.
    #[error("error creating temporary image: {reason}")]
    Encoding {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An I/O error occurred while querying a temporary file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason,
        }
    }

    #[cfg(feature = "image")]
    pub(crate) fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
            source: None,
        }
    }
}
