use agentlint_config::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Byte offsets into a file's content, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetRange {
    pub start: usize,
    pub end: usize,
}

impl OffsetRange {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A single text replacement within a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: OffsetRange,
    pub new_text: String,
}

impl TextEdit {
    #[must_use]
    pub fn replace(range: OffsetRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    #[must_use]
    pub fn delete(range: OffsetRange) -> Self {
        Self {
            range,
            new_text: String::new(),
        }
    }

    #[must_use]
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            range: OffsetRange::new(offset, offset),
            new_text: text.into(),
        }
    }
}

/// A machine-applicable fix: a description plus the edits that realize it.
/// Edits within one fix must not overlap each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub description: String,
    pub edits: Vec<TextEdit>,
}

impl Fix {
    #[must_use]
    pub fn new(description: impl Into<String>, edits: Vec<TextEdit>) -> Self {
        Self {
            description: description.into(),
            edits,
        }
    }
}

/// One reported problem in one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Human guidance for resolving the violation by hand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Present only when the rule can repair the content itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}

impl Violation {
    /// Start a violation with just a message; the reporting context fills
    /// in rule id and resolved severity.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            rule_id: String::new(),
            severity: Severity::Warn,
            message: message.into(),
            line: None,
            column: None,
            fix_hint: None,
            fix: None,
        }
    }

    #[must_use]
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    #[must_use]
    pub fn on_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    /// Rules that escalate conditionally may pin a severity; otherwise
    /// the resolved config severity applies.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attribute the violation to a rule directly, bypassing a reporting
    /// context. Used for synthetic violations the engine creates itself.
    #[must_use]
    pub fn tagged(mut self, rule_id: &str) -> Self {
        self.rule_id = rule_id.to_string();
        self
    }

    #[must_use]
    pub fn is_fixable(&self) -> bool {
        self.fix.is_some()
    }
}

/// The outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub violations: Vec<Violation>,
    /// The content that was validated.
    pub source: String,
    /// Present only after fixing ran on this result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
}

impl LintResult {
    #[must_use]
    pub fn new(path: PathBuf, source: String, violations: Vec<Violation>) -> Self {
        Self {
            path,
            violations,
            source,
            fixed: None,
        }
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warn)
            .count()
    }

    #[must_use]
    pub fn fixable_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_fixable()).count()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Line (1-based) and column (1-based) of a byte offset.
#[must_use]
pub fn offset_to_position(content: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(content.len());
    let before = &content[..clamped];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(clamped + 1, |newline| clamped - newline);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_severity_and_fixability() {
        let result = LintResult::new(
            PathBuf::from("CLAUDE.md"),
            String::new(),
            vec![
                Violation::new("a").with_severity(Severity::Error),
                Violation::new("b").with_severity(Severity::Warn).with_fix(Fix::new(
                    "remove",
                    vec![TextEdit::delete(OffsetRange::new(0, 1))],
                )),
            ],
        );
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.fixable_count(), 1);
    }

    #[test]
    fn test_offset_to_position() {
        let content = "first\nsecond\n";
        assert_eq!(offset_to_position(content, 0), (1, 1));
        assert_eq!(offset_to_position(content, 6), (2, 1));
        assert_eq!(offset_to_position(content, 8), (2, 3));
    }

    #[test]
    fn test_range_overlap() {
        assert!(OffsetRange::new(0, 5).overlaps(&OffsetRange::new(4, 8)));
        assert!(!OffsetRange::new(0, 4).overlaps(&OffsetRange::new(4, 8)));
    }

    /// Snapshot test demonstrating insta for violation output
    #[test]
    fn test_violation_rendering_snapshot() {
        let violations = vec![
            Violation::new("missing final newline")
                .tagged("final-newline")
                .on_line(3),
            Violation::new("trailing whitespace")
                .tagged("trailing-whitespace")
                .at(2, 9)
                .with_severity(Severity::Error),
        ];
        let rendered: Vec<String> = violations
            .iter()
            .map(|v| format!("{:?} {} {}", v.severity, v.rule_id, v.message))
            .collect();
        insta::assert_snapshot!(rendered.join("\n"), @r"
        Warn final-newline missing final newline
        Error trailing-whitespace trailing whitespace
        ");
    }
}
