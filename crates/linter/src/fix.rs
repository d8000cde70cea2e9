use crate::{LintEngine, LintResult, TextEdit, Violation};
use std::path::PathBuf;
use std::sync::Arc;

/// Decides which fixable violations get applied.
#[derive(Clone)]
pub enum FixPolicy {
    /// Apply every violation that carries a machine-applicable fix.
    All,
    /// Apply only violations the predicate accepts.
    Predicate(Arc<dyn Fn(&Violation) -> bool + Send + Sync>),
}

impl FixPolicy {
    /// Restrict fixing to a set of rule ids.
    #[must_use]
    pub fn rules(ids: Vec<String>) -> Self {
        Self::Predicate(Arc::new(move |violation| ids.contains(&violation.rule_id)))
    }

    #[must_use]
    pub fn accepts(&self, violation: &Violation) -> bool {
        match self {
            Self::All => true,
            Self::Predicate(predicate) => predicate(violation),
        }
    }
}

/// The outcome of fixing one file: the rewritten content plus the
/// re-validation result over it.
#[derive(Debug)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub original: String,
    pub fixed: String,
    /// Fixes applied in this pass. Overlapping fixes are deferred; a
    /// later run picks them up against the rewritten content.
    pub applied: usize,
    /// Result of re-validating the fixed content.
    pub result: LintResult,
}

impl FixOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.applied > 0 && self.fixed != self.original
    }
}

/// Compute fixed content for every result with accepted fixable
/// violations, then re-validate each fixed file.
///
/// Application is strictly sequential per file: accepted edits are
/// sorted descending by start offset and applied against one evolving
/// copy of the content; an edit overlapping an already-applied one is
/// skipped for this pass. Nothing here touches disk — persisting is
/// [`write_fixed`], a separate explicit step.
pub async fn apply_fixes(
    engine: &Arc<LintEngine>,
    results: &[LintResult],
    policy: &FixPolicy,
) -> crate::Result<Vec<FixOutcome>> {
    let mut outcomes = Vec::new();

    for result in results {
        let accepted: Vec<&Violation> = result
            .violations
            .iter()
            .filter(|v| v.fix.is_some() && policy.accepts(v))
            .collect();
        if accepted.is_empty() {
            continue;
        }

        let (fixed, applied) = apply_edits(&result.source, &accepted);
        let config = engine.resolver().resolve(&result.path)?;
        let mut relint = engine.lint_content(&result.path, &fixed, &config).await;
        relint.fixed = Some(fixed.clone());

        outcomes.push(FixOutcome {
            path: result.path.clone(),
            original: result.source.clone(),
            fixed,
            applied,
            result: relint,
        });
    }
    Ok(outcomes)
}

/// Write each changed outcome back to its file.
pub fn write_fixed(outcomes: &[FixOutcome]) -> std::io::Result<usize> {
    let mut written = 0;
    for outcome in outcomes.iter().filter(|o| o.changed()) {
        std::fs::write(&outcome.path, &outcome.fixed)?;
        written += 1;
    }
    Ok(written)
}

/// Apply accepted fixes to one content snapshot. Edits are flattened,
/// sorted descending by start offset so earlier offsets stay valid, and
/// any edit overlapping one already applied is skipped.
fn apply_edits(source: &str, accepted: &[&Violation]) -> (String, usize) {
    let mut edits: Vec<&TextEdit> = accepted
        .iter()
        .filter_map(|v| v.fix.as_ref())
        .flat_map(|fix| fix.edits.iter())
        .filter(|edit| edit.range.start <= edit.range.end && edit.range.end <= source.len())
        .collect();
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start).then(b.range.end.cmp(&a.range.end)));

    let mut content = source.to_string();
    let mut applied = 0;
    let mut low_water = usize::MAX;

    for edit in edits {
        if edit.range.end > low_water {
            // Overlaps an edit already applied; defer to the next pass.
            continue;
        }
        content.replace_range(edit.range.start..edit.range.end, &edit.new_text);
        low_water = edit.range.start;
        applied += 1;
    }
    (content, applied)
}
