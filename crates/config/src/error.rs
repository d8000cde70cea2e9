use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors.
///
/// Everything in this enum aborts the whole run; recoverable problems
/// (plugin load failures, VCS hiccups, cache corruption) are handled
/// locally by their components and never reach this type.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unknown preset '{name}' referenced from {path}")]
    UnknownPreset { name: String, path: PathBuf },

    #[error("unresolvable extends target '{target}' referenced from {path}")]
    UnresolvableExtends { target: String, path: PathBuf },

    #[error("extends cycle detected: {chain}")]
    ExtendsCycle { chain: String },

    #[error("unknown rule '{rule}' in {path}{suggestion}")]
    UnknownRule {
        rule: String,
        path: PathBuf,
        suggestion: String,
    },

    #[error("invalid options for rule '{rule}' in {path}: {message}")]
    InvalidOptions {
        rule: String,
        path: PathBuf,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
