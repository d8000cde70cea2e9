//! Fixture helpers for agentlint test suites.
//!
//! Builds throwaway workspaces with artifact files, config cascades, and
//! plugin manifests on disk, so tests read like the scenario they cover.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

/// A temporary workspace directory populated with fixture files.
///
/// Dropped with the value; keep it alive for the duration of the test.
pub struct TempWorkspace {
    root: tempfile::TempDir,
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TempWorkspace {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write a file at a workspace-relative path, creating parents.
    pub fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write an `.agentlintrc.json` in a workspace-relative directory
    /// (empty string for the root).
    pub fn config(&self, directory: &str, json: &serde_json::Value) -> PathBuf {
        let name = if directory.is_empty() {
            ".agentlintrc.json".to_string()
        } else {
            format!("{directory}/.agentlintrc.json")
        };
        self.file(&name, &serde_json::to_string_pretty(json).unwrap())
    }

    /// Write a plugin manifest in a workspace-relative directory and
    /// return the directory path.
    pub fn plugin(&self, directory: &str, manifest: &serde_json::Value) -> PathBuf {
        self.file(
            &format!("{directory}/agentlint-plugin.json"),
            &serde_json::to_string_pretty(manifest).unwrap(),
        );
        self.root.path().join(directory)
    }

    /// A minimal valid skill at `.claude/skills/<name>/SKILL.md`.
    pub fn skill(&self, name: &str, description: &str) -> PathBuf {
        self.file(
            &format!(".claude/skills/{name}/SKILL.md"),
            &format!("---\nname: {name}\ndescription: {description}\n---\n\nInstructions.\n"),
        )
    }

    /// A `.claude/settings.json` with the given body.
    pub fn settings(&self, json: &serde_json::Value) -> PathBuf {
        self.file(
            ".claude/settings.json",
            &serde_json::to_string_pretty(json).unwrap(),
        )
    }
}
