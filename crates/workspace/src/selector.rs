use crate::{vcs, ArtifactKind, Result, WorkspaceError};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Per-workspace ignore file, one glob pattern per line.
pub const IGNORE_FILE_NAME: &str = ".agentlintignore";

/// Directories never descended into during discovery.
const SKIP_DIRS: &[&str] = &["node_modules", ".git", "target", "dist", "build"];

/// Optional narrowing of the selection to VCS-changed files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChangedFilter {
    /// No VCS filtering.
    #[default]
    None,
    /// Staged, unstaged, and untracked files in the working tree.
    WorkingTree,
    /// Files changed since the given ref, plus untracked files.
    Since(String),
}

#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Ignore patterns beyond the workspace ignore file (typically the
    /// resolved config's `ignorePatterns`).
    pub ignore_patterns: Vec<String>,
    pub changed: ChangedFilter,
}

/// A recoverable selection problem. The run continues; these are shown
/// to the user alongside results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorWarning {
    NoMatches { pattern: String },
    Vcs { message: String },
    Package { name: String, message: String },
}

impl fmt::Display for SelectorWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatches { pattern } => {
                write!(f, "pattern '{pattern}' matched no files")
            }
            Self::Vcs { message } => {
                write!(f, "VCS filter unavailable, validating all selected files: {message}")
            }
            Self::Package { name, message } => {
                write!(f, "package '{name}' skipped: {message}")
            }
        }
    }
}

/// The outcome of file selection: a sorted, deduplicated file list plus
/// any recoverable warnings gathered along the way.
#[derive(Debug, Default)]
pub struct Selection {
    pub files: Vec<PathBuf>,
    pub warnings: Vec<SelectorWarning>,
}

/// Select the files a run should validate.
///
/// With no patterns, the workspace is walked and every recognized
/// artifact ([`ArtifactKind::detect`]) is selected. Patterns may be
/// globs, literal file paths, or directories (walked like the root).
#[tracing::instrument(skip(options))]
pub fn select(root: &Path, patterns: &[String], options: &SelectOptions) -> Result<Selection> {
    let mut warnings = Vec::new();
    let mut candidates: BTreeSet<PathBuf> = BTreeSet::new();

    if patterns.is_empty() {
        discover_artifacts(root, &mut candidates);
    } else {
        for pattern in patterns {
            let before = candidates.len();
            expand_pattern(root, pattern, &mut candidates)?;
            if candidates.len() == before {
                warnings.push(SelectorWarning::NoMatches {
                    pattern: pattern.clone(),
                });
            }
        }
    }

    let ignore = load_ignore_patterns(root, &options.ignore_patterns)?;
    candidates.retain(|path| !is_ignored(root, path, &ignore));

    match &options.changed {
        ChangedFilter::None => {}
        ChangedFilter::WorkingTree => {
            apply_vcs_filter(root, None, &mut candidates, &mut warnings);
        }
        ChangedFilter::Since(reference) => {
            apply_vcs_filter(root, Some(reference), &mut candidates, &mut warnings);
        }
    }

    tracing::debug!(
        selected = candidates.len(),
        warnings = warnings.len(),
        "file selection complete"
    );

    Ok(Selection {
        files: candidates.into_iter().collect(),
        warnings,
    })
}

/// Walk a directory and collect every recognized artifact file.
fn discover_artifacts(dir: &Path, out: &mut BTreeSet<PathBuf>) {
    let walker = WalkDir::new(dir).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIP_DIRS.contains(&name)))
    });

    for entry in walker.filter_map(std::result::Result::ok) {
        if entry.file_type().is_file() && ArtifactKind::detect(entry.path()).is_some() {
            out.insert(entry.path().to_path_buf());
        }
    }
}

fn expand_pattern(root: &Path, pattern: &str, out: &mut BTreeSet<PathBuf>) -> Result<()> {
    let literal = root.join(pattern);
    if literal.is_file() {
        out.insert(literal);
        return Ok(());
    }
    if literal.is_dir() {
        discover_artifacts(&literal, out);
        return Ok(());
    }

    // The glob crate has no brace support; expand {a,b} ourselves.
    for expanded in expand_braces(pattern) {
        let full_pattern = root.join(&expanded).display().to_string();
        let paths = glob::glob(&full_pattern).map_err(|e| WorkspaceError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        for entry in paths.filter_map(std::result::Result::ok) {
            if entry.is_file() {
                out.insert(entry);
            }
        }
    }
    Ok(())
}

fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close_rel) = pattern[open..].find('}') else {
        return vec![pattern.to_string()];
    };
    let close = open + close_rel;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    pattern[open + 1..close]
        .split(',')
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

fn load_ignore_patterns(root: &Path, extra: &[String]) -> Result<Vec<glob::Pattern>> {
    let mut raw: Vec<String> = Vec::new();

    let ignore_file = root.join(IGNORE_FILE_NAME);
    if ignore_file.is_file() {
        let content = std::fs::read_to_string(&ignore_file).map_err(|source| {
            WorkspaceError::Io {
                path: ignore_file.clone(),
                source,
            }
        })?;
        raw.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    raw.extend(extra.iter().cloned());

    raw.iter()
        .map(|pattern| {
            glob::Pattern::new(pattern).map_err(|e| WorkspaceError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// A pattern ignores a file when it matches the root-relative path or
/// the bare file name.
fn is_ignored(root: &Path, path: &Path, patterns: &[glob::Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    patterns.iter().any(|pattern| {
        pattern.matches_path(relative)
            || path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name))
    })
}

fn apply_vcs_filter(
    root: &Path,
    since: Option<&str>,
    candidates: &mut BTreeSet<PathBuf>,
    warnings: &mut Vec<SelectorWarning>,
) {
    match vcs::changed_files(root, since) {
        Ok(changed) => candidates.retain(|path| changed.contains(path)),
        Err(message) => {
            tracing::warn!(%message, "VCS filter degraded");
            warnings.push(SelectorWarning::Vcs { message });
        }
    }
}
