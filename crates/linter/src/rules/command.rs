//! Rules for slash-command markdown under `.claude/commands/`.

use crate::{Rule, RuleContext, RuleError, RuleMetadata, Violation};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;

/// Command frontmatter is optional, but when present it must parse and
/// `allowed-tools` must be a string or a list of strings.
pub struct CommandFrontmatterValid {
    meta: RuleMetadata,
}

impl CommandFrontmatterValid {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "command-frontmatter-valid",
                "Command frontmatter",
                "Command frontmatter must parse and use valid field shapes",
                ArtifactKind::Command,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for CommandFrontmatterValid {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for CommandFrontmatterValid {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        match ctx.frontmatter() {
            Err(message) => {
                ctx.report(Violation::new(format!("invalid frontmatter: {message}")));
            }
            Ok(None) => {}
            Ok(Some(frontmatter)) => {
                if let Some(tools) = frontmatter.data.get("allowed-tools") {
                    let valid = tools.is_string()
                        || tools
                            .as_sequence()
                            .is_some_and(|seq| seq.iter().all(serde_yaml::Value::is_string));
                    if !valid {
                        ctx.report(
                            Violation::new("'allowed-tools' must be a string or list of strings"),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// Commands without a description render with no help text in the
/// slash-command picker.
pub struct CommandDescription {
    meta: RuleMetadata,
}

impl CommandDescription {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "command-description",
                "Command description",
                "Commands should declare a description",
                ArtifactKind::Command,
            ),
        }
    }
}

impl Default for CommandDescription {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for CommandDescription {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(frontmatter) = ctx.frontmatter() else {
            return Ok(());
        };
        let has_description = frontmatter
            .as_ref()
            .and_then(|fm| fm.get_str("description"))
            .is_some_and(|d| !d.trim().is_empty());
        if !has_description {
            ctx.report(
                Violation::new("command has no description")
                    .with_hint("add a 'description' frontmatter key"),
            );
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
            PathBuf::from(".claude/commands/deploy.md"),
            Arc::from(content),
            ArtifactKind::Command,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            None,
        );
        rule.validate(&mut ctx).await.unwrap();
        ctx.take_violations()
    }

    #[tokio::test]
    async fn test_no_frontmatter_is_fine() {
        let rule = CommandFrontmatterValid::new();
        assert!(run(&rule, "Run the deploy script.\n").await.is_empty());
    }

    #[tokio::test]
    async fn test_allowed_tools_shapes() {
        let rule = CommandFrontmatterValid::new();
        let valid = "---\nallowed-tools: Bash(git status:*)\n---\nbody\n";
        assert!(run(&rule, valid).await.is_empty());

        let valid_list = "---\nallowed-tools:\n  - Read\n  - Bash\n---\nbody\n";
        assert!(run(&rule, valid_list).await.is_empty());

        let invalid = "---\nallowed-tools: 42\n---\nbody\n";
        assert_eq!(run(&rule, invalid).await.len(), 1);
    }

    #[tokio::test]
    async fn test_description_required() {
        let rule = CommandDescription::new();
        assert_eq!(run(&rule, "body only\n").await.len(), 1);
        assert!(run(&rule, "---\ndescription: Deploys the app\n---\nbody\n")
            .await
            .is_empty());
    }
}
