//! The agentlint validation engine.
//!
//! Holds the rule registry and plugin loader, the per-file validation
//! orchestrator with its content-addressed cache, and the auto-fix
//! applier. Rules check agent project-configuration artifacts: context
//! files, `.claude` settings, skills, commands, and subagents.

mod context;
mod diagnostics;
mod engine;
mod error;
mod fix;
mod frontmatter;
mod meta;
mod plugins;
mod registry;
pub mod rules;
mod traits;

pub use context::RuleContext;
pub use diagnostics::{offset_to_position, Fix, LintResult, OffsetRange, TextEdit, Violation};
pub use engine::{CancelFlag, LintEngine, LintEngineBuilder};
pub use error::{LinterError, Result};
pub use fix::{apply_fixes, write_fixed, FixOutcome, FixPolicy};
pub use frontmatter::{parse_frontmatter, Frontmatter};
pub use meta::RuleMetadata;
pub use plugins::{
    discover_plugins, DeclaredRule, LoadResult, ManifestResolver, PluginLoader, PluginManifest,
    PluginResolver, PLUGIN_MANIFEST,
};
pub use registry::RuleRegistry;
pub use traits::{Rule, RuleError};

pub use agentlint_config::Severity;
pub use agentlint_workspace::ArtifactKind;
