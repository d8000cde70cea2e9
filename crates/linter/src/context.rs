use crate::{parse_frontmatter, Frontmatter, Violation};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-rule, per-file validation context.
///
/// A fresh context is handed to each rule invocation. Parsed views of the
/// content (JSON, frontmatter) are memoized so rules on the same context
/// never re-parse; violations accumulate via [`RuleContext::report`].
pub struct RuleContext {
    path: PathBuf,
    content: Arc<str>,
    kind: ArtifactKind,
    rule_id: String,
    severity: Severity,
    options: Option<Value>,
    violations: Vec<Violation>,
    json: Option<Result<Arc<Value>, String>>,
    frontmatter: Option<Result<Option<Arc<Frontmatter>>, String>>,
}

impl RuleContext {
    #[must_use]
    pub fn new(
        path: PathBuf,
        content: Arc<str>,
        kind: ArtifactKind,
        rule_id: String,
        severity: Severity,
        options: Option<Value>,
    ) -> Self {
        Self {
            path,
            content,
            kind,
            rule_id,
            severity,
            options,
            violations: Vec::new(),
            json: None,
            frontmatter: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Resolved options: rule defaults deep-merged with user overrides,
    /// already schema-validated by the config resolver.
    #[must_use]
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    #[must_use]
    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.as_ref()?.get(key)?.as_u64()
    }

    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.as_ref()?.get(key)?.as_str()
    }

    #[must_use]
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.as_ref()?.get(key)?.as_bool()
    }

    /// Record a violation at the rule's resolved severity.
    pub fn report(&mut self, violation: Violation) {
        self.report_as(violation, self.severity);
    }

    /// Record a violation at an explicit severity. For rules that
    /// escalate conditionally; most rules use [`RuleContext::report`].
    pub fn report_as(&mut self, mut violation: Violation, severity: Severity) {
        violation.rule_id.clone_from(&self.rule_id);
        violation.severity = severity;
        self.violations.push(violation);
    }

    /// The content parsed as JSON, memoized across calls.
    pub fn json(&mut self) -> Result<Arc<Value>, String> {
        let content = Arc::clone(&self.content);
        self.json
            .get_or_insert_with(|| {
                serde_json::from_str::<Value>(&content)
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
    }

    /// The content's frontmatter, memoized across calls. `Ok(None)` when
    /// the file has no frontmatter block.
    pub fn frontmatter(&mut self) -> Result<Option<Arc<Frontmatter>>, String> {
        let content = Arc::clone(&self.content);
        self.frontmatter
            .get_or_insert_with(|| parse_frontmatter(&content).map(|fm| fm.map(Arc::new)))
            .clone()
    }

    #[must_use]
    pub fn take_violations(self) -> Vec<Violation> {
        self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(content: &str) -> RuleContext {
        RuleContext::new(
            PathBuf::from("CLAUDE.md"),
            Arc::from(content),
            ArtifactKind::ContextFile,
            "some-rule".to_string(),
            Severity::Error,
            None,
        )
    }

    #[test]
    fn test_report_attributes_rule_and_severity() {
        let mut ctx = context("hello\n");
        ctx.report(Violation::new("problem"));
        let violations = ctx.take_violations();
        assert_eq!(violations[0].rule_id, "some-rule");
        assert_eq!(violations[0].severity, Severity::Error);
    }

    #[test]
    fn test_report_as_overrides_severity() {
        let mut ctx = context("hello\n");
        ctx.report_as(Violation::new("escalated"), Severity::Warn);
        assert_eq!(ctx.take_violations()[0].severity, Severity::Warn);
    }

    #[test]
    fn test_json_is_memoized() {
        let mut ctx = context(r#"{"permissions": {}}"#);
        let first = ctx.json().unwrap();
        let second = ctx.json().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_frontmatter_parse_error_surfaces() {
        let mut ctx = context("---\n: [bad\n---\n");
        assert!(ctx.frontmatter().is_err());
    }
}
