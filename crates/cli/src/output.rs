//! Result rendering: human-readable with colors, or JSON for tooling.

use crate::OutputFormat;
use agentlint_linter::{FixOutcome, LintResult, Severity, Violation};
use agentlint_workspace::SelectorWarning;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

/// Aggregate counts across a run.
#[derive(Debug, Default, Serialize)]
pub struct Totals {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
    pub fixable: usize,
}

impl Totals {
    #[must_use]
    pub fn tally(results: &[LintResult]) -> Self {
        let mut totals = Self {
            files: results.len(),
            ..Self::default()
        };
        for result in results {
            totals.errors += result.error_count();
            totals.warnings += result.warning_count();
            totals.fixable += result.fixable_count();
        }
        totals
    }
}

#[derive(Serialize)]
struct JsonViolation<'a> {
    rule: &'a str,
    severity: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
    fixable: bool,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    violations: Vec<JsonViolation<'a>>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    summary: &'a Totals,
}

/// Print selector warnings to stderr (never part of JSON output).
pub fn print_warnings(warnings: &[SelectorWarning]) {
    for warning in warnings {
        eprintln!("{} {warning}", "warning:".yellow().bold());
    }
}

/// Render the results of a run. Paths are shown relative to the
/// workspace root.
pub fn print_results(
    root: &Path,
    results: &[LintResult],
    totals: &Totals,
    format: OutputFormat,
    quiet: bool,
) {
    match format {
        OutputFormat::Json => print_json(root, results, totals),
        OutputFormat::Human => print_human(root, results, totals, quiet),
    }
}

fn print_json(root: &Path, results: &[LintResult], totals: &Totals) {
    let report = JsonReport {
        files: results
            .iter()
            .filter(|result| !result.violations.is_empty())
            .map(|result| JsonFile {
                path: display_path(root, &result.path),
                violations: result.violations.iter().map(json_violation).collect(),
            })
            .collect(),
        summary: totals,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(error) => eprintln!("failed to serialize report: {error}"),
    }
}

fn json_violation(violation: &Violation) -> JsonViolation<'_> {
    JsonViolation {
        rule: &violation.rule_id,
        severity: match violation.severity {
            Severity::Error => "error",
            Severity::Warn => "warn",
            Severity::Off => "off",
        },
        message: &violation.message,
        line: violation.line,
        column: violation.column,
        fixable: violation.is_fixable(),
    }
}

fn print_human(root: &Path, results: &[LintResult], totals: &Totals, quiet: bool) {
    for result in results {
        let shown: Vec<&Violation> = result
            .violations
            .iter()
            .filter(|v| !quiet || v.severity == Severity::Error)
            .collect();
        if shown.is_empty() {
            continue;
        }

        println!("{}", display_path(root, &result.path).bold().underline());
        for violation in shown {
            let severity = match violation.severity {
                Severity::Error => "error".red().bold(),
                Severity::Warn => "warn".yellow().bold(),
                Severity::Off => "off".dimmed(),
            };
            let position = match (violation.line, violation.column) {
                (Some(line), Some(column)) => format!("{line}:{column}"),
                (Some(line), None) => format!("{line}"),
                _ => String::new(),
            };
            let fixable = if violation.is_fixable() {
                " (fixable)".cyan().to_string()
            } else {
                String::new()
            };
            println!(
                "  {:<8} {:<7} {} {}{}",
                position.dimmed(),
                severity,
                violation.message,
                violation.rule_id.dimmed(),
                fixable
            );
        }
        println!();
    }

    if !quiet {
        print_summary(totals);
    }
}

fn print_summary(totals: &Totals) {
    if totals.errors == 0 && totals.warnings == 0 {
        println!(
            "{} {} file(s) checked, no problems found",
            "✓".green(),
            totals.files
        );
        return;
    }

    let problems = format!(
        "{} problem(s) ({} error(s), {} warning(s))",
        totals.errors + totals.warnings,
        totals.errors,
        totals.warnings
    );
    if totals.errors > 0 {
        println!("{} {problems}", "✗".red().bold());
    } else {
        println!("{} {problems}", "⚠".yellow().bold());
    }
    if totals.fixable > 0 {
        println!(
            "  {} of them fixable with {}",
            totals.fixable,
            "--fix".cyan()
        );
    }
}

/// Render a fix dry run: what would change, without writing.
pub fn print_dry_run(outcomes: &[FixOutcome], format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        #[derive(Serialize)]
        struct DryRunFile {
            path: String,
            fixes_applied: usize,
            remaining_violations: usize,
        }
        let files: Vec<DryRunFile> = outcomes
            .iter()
            .map(|outcome| DryRunFile {
                path: outcome.path.display().to_string(),
                fixes_applied: outcome.applied,
                remaining_violations: outcome.result.violations.len(),
            })
            .collect();
        if let Ok(json) = serde_json::to_string_pretty(&files) {
            println!("{json}");
        }
        return;
    }

    for outcome in outcomes {
        println!(
            "{} {} ({} fix(es))",
            "would fix".cyan(),
            outcome.path.display(),
            outcome.applied
        );
    }
    if outcomes.is_empty() {
        println!("{}", "nothing to fix".dimmed());
    }
}

/// One line per applied fix, after writing.
pub fn print_fixed(outcomes: &[FixOutcome]) {
    for outcome in outcomes.iter().filter(|o| o.changed()) {
        println!(
            "{} {} ({} fix(es))",
            "fixed".green(),
            outcome.path.display(),
            outcome.applied
        );
    }
}

/// Report plugin load failures without aborting anything.
pub fn print_plugin_failures(results: &[agentlint_linter::LoadResult]) {
    for result in results.iter().filter(|r| !r.is_success()) {
        if let Some(error) = &result.error {
            eprintln!(
                "{} plugin {} skipped: {error}",
                "warning:".yellow().bold(),
                result.path.display()
            );
        }
    }
}

/// Shorten a path for display, relative to the workspace root.
fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_is_root_relative() {
        let root = Path::new("/ws");
        assert_eq!(
            display_path(root, Path::new("/ws/pkg/CLAUDE.md")),
            "pkg/CLAUDE.md"
        );
        assert_eq!(
            display_path(root, Path::new("/elsewhere/CLAUDE.md")),
            "/elsewhere/CLAUDE.md"
        );
    }
}
