use crate::{RuleContext, RuleMetadata};
use async_trait::async_trait;
use thiserror::Error;

/// A rule's validate failed outright.
///
/// Never fatal: the orchestrator converts it into one synthetic violation
/// attributed to the rule and moves on to the next rule.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuleError {
    pub message: String,
}

impl RuleError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RuleError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A single named check.
///
/// `validate` may suspend (file-existence probes, subprocess calls); the
/// orchestrator always awaits it, so synchronous rules simply return
/// without suspending. Violations go through [`RuleContext::report`].
#[async_trait]
pub trait Rule: Send + Sync {
    fn meta(&self) -> &RuleMetadata;

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError>;
}
