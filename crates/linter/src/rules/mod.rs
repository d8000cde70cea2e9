//! Built-in rules, grouped by the artifact kind they validate.

mod agent;
mod command;
mod context_file;
mod settings;
mod skill;

use crate::Rule;
use std::sync::Arc;

/// Every built-in rule, in registration order.
#[must_use]
pub fn all() -> Vec<Arc<dyn Rule>> {
    vec![
        // Context files
        Arc::new(context_file::ContextFileSize::new()),
        Arc::new(context_file::ContextFileEmpty::new()),
        Arc::new(context_file::TrailingWhitespace::new()),
        Arc::new(context_file::FinalNewline::new()),
        Arc::new(context_file::NoReferenceToc::new()),
        Arc::new(context_file::HeadingIncrement::new()),
        Arc::new(context_file::BrokenLocalLinks::new()),
        // Settings
        Arc::new(settings::SettingsValidJson::new()),
        Arc::new(settings::SettingsUnknownKeys::new()),
        Arc::new(settings::PermissionFormat::new()),
        Arc::new(settings::PermissionDuplicates::new()),
        Arc::new(settings::PermissionConflicts::new()),
        Arc::new(settings::HookEventNames::new()),
        Arc::new(settings::HookCommandEmpty::new()),
        Arc::new(settings::HookTimeoutRange::new()),
        // Skills
        Arc::new(skill::SkillFrontmatter::new()),
        Arc::new(skill::SkillNameFormat::new()),
        Arc::new(skill::SkillDescriptionLength::new()),
        Arc::new(skill::SkillDirectoryMatch::new()),
        // Commands
        Arc::new(command::CommandFrontmatterValid::new()),
        Arc::new(command::CommandDescription::new()),
        // Agents
        Arc::new(agent::AgentFrontmatter::new()),
        Arc::new(agent::AgentToolsFormat::new()),
    ]
}
