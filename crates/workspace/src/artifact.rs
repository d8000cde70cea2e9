use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The kinds of project-configuration artifacts agentlint validates.
///
/// Each kind maps to one validator namespace; a rule declares the kind it
/// applies to and only runs on files of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Agent context files: `CLAUDE.md`, `CLAUDE.local.md`, `AGENTS.md`.
    ContextFile,
    /// `.claude/settings.json` and `.claude/settings.local.json`.
    Settings,
    /// `SKILL.md` skill definitions.
    Skill,
    /// Slash-command markdown under `.claude/commands/`.
    Command,
    /// Subagent markdown under `.claude/agents/`.
    Agent,
}

impl ArtifactKind {
    /// Classify a path by name and location. Returns `None` for files
    /// agentlint does not validate.
    #[must_use]
    pub fn detect(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;

        match file_name {
            "CLAUDE.md" | "CLAUDE.local.md" | "AGENTS.md" => return Some(Self::ContextFile),
            "SKILL.md" => return Some(Self::Skill),
            "settings.json" | "settings.local.json" => {
                if parent_dir_is(path, ".claude") {
                    return Some(Self::Settings);
                }
                return None;
            }
            _ => {}
        }

        if path.extension().is_some_and(|ext| ext == "md") {
            if under_claude_subdir(path, "commands") {
                return Some(Self::Command);
            }
            if under_claude_subdir(path, "agents") {
                return Some(Self::Agent);
            }
        }

        None
    }

    /// All kinds, in a stable order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::ContextFile,
            Self::Settings,
            Self::Skill,
            Self::Command,
            Self::Agent,
        ]
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContextFile => "context-file",
            Self::Settings => "settings",
            Self::Skill => "skill",
            Self::Command => "command",
            Self::Agent => "agent",
        };
        write!(f, "{name}")
    }
}

fn parent_dir_is(path: &Path, name: &str) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|n| n == name)
}

/// True when the path sits anywhere under `.claude/<subdir>/` (commands
/// and agents may be nested one level deep for namespacing).
fn under_claude_subdir(path: &Path, subdir: &str) -> bool {
    let mut components = path.components().rev().skip(1).peekable();
    while let Some(component) = components.next() {
        if component.as_os_str() == subdir {
            return components
                .peek()
                .is_some_and(|parent| parent.as_os_str() == ".claude");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detects_context_files() {
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("proj/CLAUDE.md")),
            Some(ArtifactKind::ContextFile)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("AGENTS.md")),
            Some(ArtifactKind::ContextFile)
        );
    }

    #[test]
    fn test_detects_settings_only_under_claude_dir() {
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("proj/.claude/settings.json")),
            Some(ArtifactKind::Settings)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("proj/.claude/settings.local.json")),
            Some(ArtifactKind::Settings)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("proj/settings.json")),
            None
        );
    }

    #[test]
    fn test_detects_skills_commands_agents() {
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from(".claude/skills/review/SKILL.md")),
            Some(ArtifactKind::Skill)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from(".claude/commands/deploy.md")),
            Some(ArtifactKind::Command)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from(".claude/commands/ops/deploy.md")),
            Some(ArtifactKind::Command)
        );
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from(".claude/agents/reviewer.md")),
            Some(ArtifactKind::Agent)
        );
    }

    #[test]
    fn test_ignores_unrelated_files() {
        assert_eq!(ArtifactKind::detect(&PathBuf::from("README.md")), None);
        assert_eq!(ArtifactKind::detect(&PathBuf::from("src/main.rs")), None);
        assert_eq!(
            ArtifactKind::detect(&PathBuf::from("docs/commands/deploy.md")),
            None
        );
    }
}
