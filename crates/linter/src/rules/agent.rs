//! Rules for subagent markdown under `.claude/agents/`.

use crate::{Rule, RuleContext, RuleError, RuleMetadata, Violation};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;

/// Subagents must declare `name` and `description`; the runtime uses the
/// description to decide when to delegate.
pub struct AgentFrontmatter {
    meta: RuleMetadata,
}

impl AgentFrontmatter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "agent-frontmatter",
                "Agent frontmatter",
                "Agent definitions must declare name and description",
                ArtifactKind::Agent,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for AgentFrontmatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for AgentFrontmatter {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        match ctx.frontmatter() {
            Err(message) => {
                ctx.report(Violation::new(format!("invalid frontmatter: {message}")));
            }
            Ok(None) => {
                ctx.report(Violation::new("agent is missing a frontmatter block"));
            }
            Ok(Some(frontmatter)) => {
                for key in ["name", "description"] {
                    if frontmatter.get_str(key).is_none_or(str::is_empty) {
                        ctx.report(Violation::new(format!(
                            "frontmatter is missing required key '{key}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The `tools` key is a comma-separated list of tool names.
pub struct AgentToolsFormat {
    meta: RuleMetadata,
}

impl AgentToolsFormat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "agent-tools-format",
                "Agent tools format",
                "The agent 'tools' key must be a comma-separated list of tool names",
                ArtifactKind::Agent,
            )
            .recommended(),
        }
    }
}

impl Default for AgentToolsFormat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for AgentToolsFormat {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(Some(frontmatter)) = ctx.frontmatter() else {
            return Ok(());
        };
        let Some(tools) = frontmatter.get_str("tools").map(str::to_string) else {
            return Ok(());
        };
        let pattern = regex::Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$")
            .map_err(|e| RuleError::new(e.to_string()))?;

        for entry in tools.split(',') {
            let entry = entry.trim();
            if entry.is_empty() || !pattern.is_match(entry) {
                ctx.report(
                    Violation::new(format!("malformed tool name '{entry}' in 'tools'"))
                        .with_hint("use comma-separated tool names, e.g. 'Read, Grep, Bash'"),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn run(rule: &dyn Rule, content: &str) -> Vec<Violation> {
        let mut ctx = RuleContext::new(
            PathBuf::from(".claude/agents/reviewer.md"),
            Arc::from(content),
            ArtifactKind::Agent,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            None,
        );
        rule.validate(&mut ctx).await.unwrap();
        ctx.take_violations()
    }

    #[tokio::test]
    async fn test_required_keys() {
        let rule = AgentFrontmatter::new();
        assert_eq!(run(&rule, "just a body\n").await.len(), 1);
        let missing_description = "---\nname: reviewer\n---\nbody\n";
        assert_eq!(run(&rule, missing_description).await.len(), 1);
        let complete = "---\nname: reviewer\ndescription: Reviews PRs\n---\nbody\n";
        assert!(run(&rule, complete).await.is_empty());
    }

    #[tokio::test]
    async fn test_tools_list_validation() {
        let rule = AgentToolsFormat::new();
        let valid = "---\nname: r\ndescription: d\ntools: Read, Grep, Bash\n---\nbody\n";
        assert!(run(&rule, valid).await.is_empty());

        let invalid = "---\nname: r\ndescription: d\ntools: Read, , 9bad\n---\nbody\n";
        assert_eq!(run(&rule, invalid).await.len(), 2);
    }
}
