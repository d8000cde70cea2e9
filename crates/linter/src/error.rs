use std::path::PathBuf;
use thiserror::Error;

/// Fatal engine errors. Everything recoverable (a crashing rule, a bad
/// plugin, a corrupt cache) is handled in place and never reaches this
/// type.
#[derive(Debug, Error)]
pub enum LinterError {
    #[error(transparent)]
    Config(#[from] agentlint_config::ConfigError),

    #[error(transparent)]
    Workspace(#[from] agentlint_workspace::WorkspaceError),

    /// Rule ids are globally unique; a second registration under the
    /// same id is a configuration fault, not something to paper over.
    #[error("rule '{id}' is already registered")]
    DuplicateRule { id: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LinterError>;
