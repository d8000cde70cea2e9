//! Exit codes for the agentlint CLI.
//!
//! Distinct codes let scripts and CI distinguish "violations found" from
//! "could not complete the run at all".

/// Exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success - no error-severity violations
    Success = 0,
    /// The run completed and found error-severity violations
    LintError = 1,
    /// Configuration error (invalid config, bad rule options, duplicate rule id)
    ConfigError = 2,
    /// I/O error (workspace unreadable, write failure during fix)
    IoError = 3,
}

impl ExitCode {
    /// Exit the process with this exit code.
    pub fn exit(self) -> ! {
        std::process::exit(self as i32)
    }

    /// Get the numeric value of this exit code.
    #[must_use]
    #[allow(dead_code)]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::LintError => write!(f, "lint error"),
            Self::ConfigError => write!(f, "configuration error"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<&agentlint_linter::LinterError> for ExitCode {
    fn from(error: &agentlint_linter::LinterError) -> Self {
        use agentlint_linter::LinterError;
        match error {
            LinterError::Config(_) | LinterError::DuplicateRule { .. } => Self::ConfigError,
            LinterError::Workspace(_) | LinterError::Io { .. } => Self::IoError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::LintError.code(), 1);
        assert_eq!(ExitCode::ConfigError.code(), 2);
        assert_eq!(ExitCode::IoError.code(), 3);
    }
}
