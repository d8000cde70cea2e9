use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files changed relative to the working tree (staged, unstaged, and
/// untracked), or relative to `since` when a ref is given. Paths are
/// returned absolute, rooted at `root`.
///
/// Errors are plain messages, never fatal: the selector catches them and
/// degrades to "no VCS filter" with a warning.
pub fn changed_files(root: &Path, since: Option<&str>) -> Result<BTreeSet<PathBuf>, String> {
    let mut files = BTreeSet::new();

    match since {
        Some(reference) => {
            for line in run_git(root, &["diff", "--name-only", reference])? {
                files.insert(root.join(line));
            }
            // Untracked files are changes too; diff against a ref misses them.
            for line in run_git(root, &["ls-files", "--others", "--exclude-standard"])? {
                files.insert(root.join(line));
            }
        }
        None => {
            for line in run_git(root, &["status", "--porcelain"])? {
                // Porcelain format: two status columns, a space, then the
                // path ("R" entries show "old -> new"; keep the new path).
                let path = line.get(3..).unwrap_or_default();
                let path = path.rsplit(" -> ").next().unwrap_or(path);
                if !path.is_empty() {
                    files.insert(root.join(path.trim_matches('"')));
                }
            }
        }
    }

    tracing::debug!(changed = files.len(), "VCS change set computed");
    Ok(files)
}

fn run_git(root: &Path, args: &[&str]) -> Result<Vec<String>, String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .map_err(|e| format!("failed to run git: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .filter(|l| !l.is_empty())
        .collect())
}
