use std::path::PathBuf;
use thiserror::Error;

/// Errors from file selection and workspace discovery.
///
/// These are fatal to the current command: a malformed glob or a request
/// for a package that does not exist cannot be recovered into a sensible
/// file set. Recoverable conditions (VCS unavailable, pattern matched
/// nothing) surface as [`crate::SelectorWarning`]s instead.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workspace manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("unknown workspace package '{name}'; available packages: {}", available.join(", "))]
    UnknownPackage {
        name: String,
        available: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
