//! Rules for agent context files (`CLAUDE.md`, `AGENTS.md`).

use crate::{
    offset_to_position, Fix, OffsetRange, Rule, RuleContext, RuleError, RuleMetadata, TextEdit,
    Violation,
};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;
use serde_json::json;

/// Flags context files larger than the configured byte budget. Oversized
/// context files crowd out the conversation window, so this one defaults
/// to an error.
pub struct ContextFileSize {
    meta: RuleMetadata,
}

impl ContextFileSize {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "context-file-size",
                "Context file size",
                "Context files must stay under the configured byte budget",
                ArtifactKind::ContextFile,
            )
            .severity(Severity::Error)
            .recommended()
            .options(
                json!({
                    "type": "object",
                    "properties": {
                        "maxSize": { "type": "integer", "minimum": 1 }
                    },
                    "additionalProperties": false
                }),
                json!({ "maxSize": 40_000 }),
            ),
        }
    }
}

impl Default for ContextFileSize {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for ContextFileSize {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let max_size = ctx.option_u64("maxSize").unwrap_or(40_000) as usize;
        let actual = ctx.content().len();
        if actual > max_size {
            ctx.report(
                Violation::new(format!(
                    "context file is {actual} bytes, exceeding the {max_size} byte limit"
                ))
                .with_hint("split rarely-needed sections into separate referenced files"),
            );
        }
        Ok(())
    }
}

/// An empty context file is almost always a mistake.
pub struct ContextFileEmpty {
    meta: RuleMetadata,
}

impl ContextFileEmpty {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "context-file-empty",
                "Empty context file",
                "Context files must contain content",
                ArtifactKind::ContextFile,
            )
            .recommended(),
        }
    }
}

impl Default for ContextFileEmpty {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for ContextFileEmpty {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        if ctx.content().trim().is_empty() {
            ctx.report(
                Violation::new("context file is empty")
                    .with_hint("add project guidance or delete the file"),
            );
        }
        Ok(())
    }
}

/// Trailing whitespace, fixable by deletion. Exactly two trailing spaces
/// are a markdown hard line break and are left alone.
pub struct TrailingWhitespace {
    meta: RuleMetadata,
}

impl TrailingWhitespace {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "trailing-whitespace",
                "Trailing whitespace",
                "Lines must not end in whitespace",
                ArtifactKind::ContextFile,
            )
            .recommended()
            .fixable(),
        }
    }
}

impl Default for TrailingWhitespace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for TrailingWhitespace {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let content = ctx.content().to_string();
        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            let text = line.strip_suffix('\n').unwrap_or(line);
            let text = text.strip_suffix('\r').unwrap_or(text);
            let trimmed = text.trim_end_matches([' ', '\t']);
            let trailing = text.len() - trimmed.len();

            // A markdown hard break is exactly two trailing spaces.
            if trailing > 0 && text[trimmed.len()..] != *"  " {
                let start = offset + trimmed.len();
                let (line_number, _) = offset_to_position(&content, start);
                ctx.report(
                    Violation::new("trailing whitespace")
                        .on_line(line_number)
                        .with_fix(Fix::new(
                            "remove trailing whitespace",
                            vec![TextEdit::delete(OffsetRange::new(start, start + trailing))],
                        )),
                );
            }
            offset += line.len();
        }
        Ok(())
    }
}

/// Files must end with exactly one newline.
pub struct FinalNewline {
    meta: RuleMetadata,
}

impl FinalNewline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "final-newline",
                "Final newline",
                "Files must end with a newline",
                ArtifactKind::ContextFile,
            )
            .recommended()
            .fixable(),
        }
    }
}

impl Default for FinalNewline {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for FinalNewline {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let content = ctx.content();
        if !content.is_empty() && !content.ends_with('\n') {
            let end = content.len();
            ctx.report(
                Violation::new("file does not end with a newline").with_fix(Fix::new(
                    "append a final newline",
                    vec![TextEdit::insert(end, "\n")],
                )),
            );
        }
        Ok(())
    }
}

/// Context files should not carry a table-of-contents section; agents
/// read the whole file, and a TOC only spends the byte budget. Matches a
/// TOC heading anywhere in the body, on any line.
pub struct NoReferenceToc {
    meta: RuleMetadata,
}

impl NoReferenceToc {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "no-reference-toc",
                "No table of contents",
                "Context files should not include a table-of-contents section",
                ArtifactKind::ContextFile,
            )
            .recommended(),
        }
    }
}

impl Default for NoReferenceToc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for NoReferenceToc {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let pattern = regex::Regex::new(r"(?mi)^#{1,6}\s*(table of contents|contents|toc)\s*$")
            .map_err(|e| RuleError::new(e.to_string()))?;
        let content = ctx.content().to_string();
        if let Some(found) = pattern.find(&content) {
            let (line, column) = offset_to_position(&content, found.start());
            ctx.report(
                Violation::new("table-of-contents heading found")
                    .at(line, column)
                    .with_hint("remove the TOC; agents read the full file"),
            );
        }
        Ok(())
    }
}

/// Heading levels should increase one step at a time.
pub struct HeadingIncrement {
    meta: RuleMetadata,
}

impl HeadingIncrement {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "heading-increment",
                "Heading increment",
                "Heading levels should only increase by one at a time",
                ArtifactKind::ContextFile,
            ),
        }
    }
}

impl Default for HeadingIncrement {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for HeadingIncrement {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let content = ctx.content().to_string();
        let mut previous_level = 0usize;
        for (index, line) in content.lines().enumerate() {
            let level = line.bytes().take_while(|&b| b == b'#').count();
            if level == 0 || level > 6 || !line[level..].starts_with(' ') {
                continue;
            }
            if previous_level > 0 && level > previous_level + 1 {
                ctx.report(
                    Violation::new(format!(
                        "heading level jumps from {previous_level} to {level}"
                    ))
                    .on_line(index + 1),
                );
            }
            previous_level = level;
        }
        Ok(())
    }
}

/// Relative markdown links must point at files that exist. The existence
/// probes suspend, so this rule exercises the async half of the rule
/// contract.
pub struct BrokenLocalLinks {
    meta: RuleMetadata,
}

impl BrokenLocalLinks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "broken-local-links",
                "Broken local links",
                "Relative markdown links must resolve to existing files",
                ArtifactKind::ContextFile,
            ),
        }
    }
}

impl Default for BrokenLocalLinks {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for BrokenLocalLinks {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let link_pattern = regex::Regex::new(r"\[[^\]]*\]\(([^)#\s]+)[^)]*\)")
            .map_err(|e| RuleError::new(e.to_string()))?;
        let content = ctx.content().to_string();
        let base = ctx.path().parent().map(std::path::Path::to_path_buf);

        for capture in link_pattern.captures_iter(&content) {
            let Some(target) = capture.get(1) else {
                continue;
            };
            let href = target.as_str();
            if href.contains("://") || href.starts_with("mailto:") {
                continue;
            }

            let resolved = match &base {
                Some(dir) => dir.join(href),
                None => std::path::PathBuf::from(href),
            };
            let exists = tokio::fs::try_exists(&resolved).await.unwrap_or(false);
            if !exists {
                let (line, column) = offset_to_position(&content, target.start());
                ctx.report(
                    Violation::new(format!("link target '{href}' does not exist")).at(line, column),
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

    async fn run(rule: &dyn Rule, content: &str, options: Option<serde_json::Value>) -> Vec<Violation> {
        let mut ctx = RuleContext::new(
            PathBuf::from("/nonexistent/CLAUDE.md"),
            Arc::from(content),
            ArtifactKind::ContextFile,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            options,
        );
        rule.validate(&mut ctx).await.unwrap();
        ctx.take_violations()
    }

    #[tokio::test]
    async fn test_size_limit_respects_options() {
        let rule = ContextFileSize::new();
        let content = "x".repeat(100);

        let over = run(&rule, &content, Some(json!({ "maxSize": 50 }))).await;
        assert_eq!(over.len(), 1);

        let under = run(&rule, &content, Some(json!({ "maxSize": 200 }))).await;
        assert!(under.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file_flagged() {
        let rule = ContextFileEmpty::new();
        assert_eq!(run(&rule, "  \n\n", None).await.len(), 1);
        assert!(run(&rule, "# Project\n", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_whitespace_fix_spans_exact_bytes() {
        let rule = TrailingWhitespace::new();
        let violations = run(&rule, "clean\ndirty   \nclean\n", None).await;
        assert_eq!(violations.len(), 1);
        let fix = violations[0].fix.as_ref().unwrap();
        assert_eq!(fix.edits[0].range, OffsetRange::new(11, 14));
    }

    #[tokio::test]
    async fn test_hard_break_not_flagged() {
        let rule = TrailingWhitespace::new();
        assert!(run(&rule, "a hard break  \nnext\n", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_final_newline() {
        let rule = FinalNewline::new();
        assert_eq!(run(&rule, "no newline", None).await.len(), 1);
        assert!(run(&rule, "has newline\n", None).await.is_empty());
        assert!(run(&rule, "", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_toc_heading_matches_mid_document() {
        let rule = NoReferenceToc::new();
        let content = "# Project\n\n## Table of Contents\n\n- item\n";
        let violations = run(&rule, content, None).await;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, Some(3));
    }

    #[tokio::test]
    async fn test_toc_mention_in_prose_not_flagged() {
        let rule = NoReferenceToc::new();
        let content = "# Project\n\nThe table of contents lives elsewhere.\n";
        assert!(run(&rule, content, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_heading_increment() {
        let rule = HeadingIncrement::new();
        let violations = run(&rule, "# One\n### Three\n", None).await;
        assert_eq!(violations.len(), 1);
        assert!(run(&rule, "# One\n## Two\n### Three\n", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_broken_link_reported_external_skipped() {
        let rule = BrokenLocalLinks::new();
        let content = "[a](./missing.md) and [b](https://example.com/page)\n";
        let violations = run(&rule, content, None).await;
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("./missing.md"));
    }
}
