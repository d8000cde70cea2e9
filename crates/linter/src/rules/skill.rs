//! Rules for `SKILL.md` skill definitions.

use crate::{
    offset_to_position, Fix, OffsetRange, Rule, RuleContext, RuleError, RuleMetadata, TextEdit,
    Violation,
};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;
use serde_json::json;

/// A skill is unusable without frontmatter declaring `name` and
/// `description`; the loader skips it silently.
pub struct SkillFrontmatter {
    meta: RuleMetadata,
}

impl SkillFrontmatter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "skill-frontmatter",
                "Skill frontmatter",
                "SKILL.md must declare name and description in frontmatter",
                ArtifactKind::Skill,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for SkillFrontmatter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SkillFrontmatter {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        match ctx.frontmatter() {
            Err(message) => {
                ctx.report(Violation::new(format!("invalid frontmatter: {message}")));
            }
            Ok(None) => {
                ctx.report(
                    Violation::new("skill is missing a frontmatter block")
                        .with_hint("start the file with '---', name, description, '---'"),
                );
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

/// Skill names must be kebab-case and at most 64 characters. The fix
/// rewrites the name in place.
pub struct SkillNameFormat {
    meta: RuleMetadata,
}

impl SkillNameFormat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "skill-name-format",
                "Skill name format",
                "Skill names must be kebab-case, 64 characters or fewer",
                ArtifactKind::Skill,
            )
            .recommended()
            .fixable(),
        }
    }
}

impl Default for SkillNameFormat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SkillNameFormat {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(Some(frontmatter)) = ctx.frontmatter() else {
            return Ok(());
        };
        let Some(name) = frontmatter.get_str("name") else {
            return Ok(());
        };
        let name = name.to_string();

        let kebab = to_kebab_case(&name);
        if name.len() <= 64 && name == kebab {
            return Ok(());
        }

        let mut violation = if name.len() > 64 {
            Violation::new(format!("skill name is {} characters, max is 64", name.len()))
        } else {
            Violation::new(format!("skill name '{name}' is not kebab-case"))
        };

        // The fix replaces the value bytes on the frontmatter name line.
        let content = ctx.content().to_string();
        if let Some(range) = name_value_range(&content, &name) {
            let (line, _) = offset_to_position(&content, range.start);
            violation = violation.on_line(line).with_fix(Fix::new(
                format!("rename to '{}'", truncate(&kebab, 64)),
                vec![TextEdit::replace(range, truncate(&kebab, 64))],
            ));
        }
        ctx.report(violation);
        Ok(())
    }
}

/// Skill descriptions are injected into the model's tool-selection
/// prompt; overly long ones waste budget.
pub struct SkillDescriptionLength {
    meta: RuleMetadata,
}

impl SkillDescriptionLength {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "skill-description-length",
                "Skill description length",
                "Skill descriptions must stay under the configured length",
                ArtifactKind::Skill,
            )
            .options(
                json!({
                    "type": "object",
                    "properties": {
                        "maxLength": { "type": "integer", "minimum": 1 }
                    },
                    "additionalProperties": false
                }),
                json!({ "maxLength": 1024 }),
            ),
        }
    }
}

impl Default for SkillDescriptionLength {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SkillDescriptionLength {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let max_length = ctx.option_u64("maxLength").unwrap_or(1024) as usize;
        let Ok(Some(frontmatter)) = ctx.frontmatter() else {
            return Ok(());
        };
        if let Some(description) = frontmatter.get_str("description") {
            let actual = description.chars().count();
            if actual > max_length {
                ctx.report(Violation::new(format!(
                    "description is {actual} characters, exceeding the {max_length} limit"
                )));
            }
        }
        Ok(())
    }
}

/// The loader resolves skills by directory name; a mismatched
/// frontmatter name is confusing at best.
pub struct SkillDirectoryMatch {
    meta: RuleMetadata,
}

impl SkillDirectoryMatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "skill-directory-match",
                "Skill directory match",
                "The skill name should match its directory name",
                ArtifactKind::Skill,
            ),
        }
    }
}

impl Default for SkillDirectoryMatch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SkillDirectoryMatch {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(Some(frontmatter)) = ctx.frontmatter() else {
            return Ok(());
        };
        let Some(name) = frontmatter.get_str("name").map(str::to_string) else {
            return Ok(());
        };
        let directory = ctx
            .path()
            .parent()
            .and_then(std::path::Path::file_name)
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_string);

        if let Some(directory) = directory {
            if directory != name {
                ctx.report(Violation::new(format!(
                    "skill name '{name}' does not match directory '{directory}'"
                )));
            }
        }
        Ok(())
    }
}

fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = true;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && !last_dash && !out.is_empty() {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

fn truncate(input: &str, max: usize) -> String {
    input.chars().take(max).collect()
}

/// Byte range of the value in the frontmatter `name:` line.
fn name_value_range(content: &str, name: &str) -> Option<OffsetRange> {
    let pattern = regex::Regex::new(r"(?m)^name:\s*").ok()?;
    let found = pattern.find(content)?;
    let start = found.end();
    let rest = &content[start..];
    if rest.starts_with(name) {
        Some(OffsetRange::new(start, start + name.len()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn run_at(rule: &dyn Rule, path: &str, content: &str) -> Vec<Violation> {
        let mut ctx = RuleContext::new(
            PathBuf::from(path),
            Arc::from(content),
            ArtifactKind::Skill,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            None,
        );
        rule.validate(&mut ctx).await.unwrap();
        ctx.take_violations()
    }

    async fn run(rule: &dyn Rule, content: &str) -> Vec<Violation> {
        run_at(rule, ".claude/skills/review/SKILL.md", content).await
    }

    #[tokio::test]
    async fn test_missing_frontmatter_and_keys() {
        let rule = SkillFrontmatter::new();
        assert_eq!(run(&rule, "# No frontmatter\n").await.len(), 1);
        assert_eq!(run(&rule, "---\nname: review\n---\nbody\n").await.len(), 1);
        assert!(run(&rule, "---\nname: review\ndescription: Reviews code\n---\nbody\n")
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_name_format_fix_rewrites_value() {
        let rule = SkillNameFormat::new();
        let content = "---\nname: My Cool Skill\ndescription: d\n---\nbody\n";
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);

        let fix = violations[0].fix.as_ref().unwrap();
        assert_eq!(fix.edits[0].new_text, "my-cool-skill");
        let range = fix.edits[0].range;
        assert_eq!(&content[range.start..range.end], "My Cool Skill");
    }

    #[tokio::test]
    async fn test_kebab_name_passes() {
        let rule = SkillNameFormat::new();
        let content = "---\nname: code-review\ndescription: d\n---\nbody\n";
        assert!(run(&rule, content).await.is_empty());
    }

    #[tokio::test]
    async fn test_description_length_option() {
        let rule = SkillDescriptionLength::new();
        let long = "x".repeat(40);
        let content = format!("---\nname: a\ndescription: {long}\n---\nbody\n");
        let mut ctx = RuleContext::new(
            PathBuf::from("SKILL.md"),
            Arc::from(content.as_str()),
            ArtifactKind::Skill,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            Some(json!({ "maxLength": 10 })),
        );
        rule.validate(&mut ctx).await.unwrap();
        assert_eq!(ctx.take_violations().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_mismatch() {
        let rule = SkillDirectoryMatch::new();
        let content = "---\nname: other-name\ndescription: d\n---\nbody\n";
        let violations = run_at(&rule, ".claude/skills/review/SKILL.md", content).await;
        assert_eq!(violations.len(), 1);

        let content = "---\nname: review\ndescription: d\n---\nbody\n";
        assert!(run_at(&rule, ".claude/skills/review/SKILL.md", content)
            .await
            .is_empty());
    }

    #[test]
    fn test_to_kebab_case() {
        assert_eq!(to_kebab_case("My Cool Skill"), "my-cool-skill");
        assert_eq!(to_kebab_case("camelCaseName"), "camel-case-name");
        assert_eq!(to_kebab_case("already-kebab"), "already-kebab");
    }
}
