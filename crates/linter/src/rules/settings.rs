//! Rules for `.claude/settings.json` artifacts: permission lists and
//! hook definitions.

use crate::{Fix, OffsetRange, Rule, RuleContext, RuleError, RuleMetadata, TextEdit, Violation};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// Hook events Claude Code dispatches.
const HOOK_EVENTS: &[&str] = &[
    "PreToolUse",
    "PostToolUse",
    "UserPromptSubmit",
    "Notification",
    "Stop",
    "SubagentStop",
    "SessionStart",
    "SessionEnd",
    "PreCompact",
];

/// Settings files must parse as JSON before anything else can be said
/// about them.
pub struct SettingsValidJson {
    meta: RuleMetadata,
}

impl SettingsValidJson {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "settings-valid-json",
                "Valid settings JSON",
                "Settings files must be valid JSON",
                ArtifactKind::Settings,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for SettingsValidJson {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SettingsValidJson {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        if let Err(message) = ctx.json() {
            ctx.report(Violation::new(format!("settings file is not valid JSON: {message}")));
        }
        Ok(())
    }
}

/// Top-level keys the settings schema recognizes.
const SETTINGS_KEYS: &[&str] = &[
    "$schema",
    "permissions",
    "hooks",
    "env",
    "model",
    "statusLine",
    "outputStyle",
    "apiKeyHelper",
    "cleanupPeriodDays",
    "includeCoAuthoredBy",
    "enableAllProjectMcpServers",
    "enabledMcpjsonServers",
    "disabledMcpjsonServers",
    "forceLoginMethod",
];

/// Unrecognized top-level keys are usually typos that make a setting
/// silently inert.
pub struct SettingsUnknownKeys {
    meta: RuleMetadata,
}

impl SettingsUnknownKeys {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "settings-unknown-keys",
                "Unknown settings keys",
                "Settings files should only use recognized top-level keys",
                ArtifactKind::Settings,
            )
            .recommended(),
        }
    }
}

impl Default for SettingsUnknownKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for SettingsUnknownKeys {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let Some(object) = settings.as_object() else {
            return Ok(());
        };
        let unknown: Vec<String> = object
            .keys()
            .filter(|key| !SETTINGS_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();

        for key in unknown {
            ctx.report(
                Violation::new(format!("unknown top-level key '{key}'"))
                    .with_hint("unrecognized keys are ignored by the runtime"),
            );
        }
        Ok(())
    }
}

/// Permission entries must be `Tool` or `Tool(specifier)`. Entries that
/// are only off by surrounding whitespace carry a fix.
pub struct PermissionFormat {
    meta: RuleMetadata,
}

impl PermissionFormat {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "permission-format",
                "Permission entry format",
                "Permission entries must be a tool name with an optional specifier",
                ArtifactKind::Settings,
            )
            .severity(Severity::Error)
            .recommended()
            .fixable(),
        }
    }
}

impl Default for PermissionFormat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for PermissionFormat {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let pattern = regex::Regex::new(r"^[A-Z][A-Za-z0-9]*(\(.+\))?$")
            .map_err(|e| RuleError::new(e.to_string()))?;

        let mut bad = Vec::new();
        let mut trimmable = false;
        for list in ["allow", "deny", "ask"] {
            for entry in permission_entries(&settings, list) {
                if !pattern.is_match(&entry) {
                    let fixable = pattern.is_match(entry.trim());
                    trimmable |= fixable;
                    bad.push((list, entry, fixable));
                }
            }
        }
        if bad.is_empty() {
            return Ok(());
        }

        // One rewrite trims every whitespace-only offender at once.
        let trim_fix = if trimmable {
            let mut trimmed = (*settings).clone();
            if let Some(permissions) = trimmed.get_mut("permissions").and_then(Value::as_object_mut)
            {
                for list in ["allow", "deny", "ask"] {
                    if let Some(entries) = permissions.get_mut(list).and_then(Value::as_array_mut) {
                        for entry in entries.iter_mut() {
                            if let Some(text) = entry.as_str() {
                                if !pattern.is_match(text) && pattern.is_match(text.trim()) {
                                    *entry = Value::String(text.trim().to_string());
                                }
                            }
                        }
                    }
                }
            }
            let rewritten = serde_json::to_string_pretty(&trimmed)
                .map_err(|e| RuleError::new(e.to_string()))?
                + "\n";
            Some(Fix::new(
                "trim whitespace around permission entries",
                vec![TextEdit::replace(
                    OffsetRange::new(0, ctx.content().len()),
                    rewritten,
                )],
            ))
        } else {
            None
        };

        for (list, entry, fixable) in bad {
            let mut violation =
                Violation::new(format!("malformed permission entry '{entry}' in '{list}'"))
                    .with_hint("use 'Tool' or 'Tool(specifier)', e.g. 'Bash(npm run test:*)'");
            if fixable {
                if let Some(fix) = &trim_fix {
                    violation = violation.with_fix(fix.clone());
                }
            }
            ctx.report(violation);
        }
        Ok(())
    }
}

/// Duplicate entries within one permission list are noise; the fix
/// rewrites the file with duplicates removed, first occurrence kept.
pub struct PermissionDuplicates {
    meta: RuleMetadata,
}

impl PermissionDuplicates {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "permission-duplicates",
                "Duplicate permission entries",
                "Permission lists must not repeat entries",
                ArtifactKind::Settings,
            )
            .recommended()
            .fixable(),
        }
    }
}

impl Default for PermissionDuplicates {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for PermissionDuplicates {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };

        let mut duplicates_by_list = Vec::new();
        for list in ["allow", "deny", "ask"] {
            let entries = permission_entries(&settings, list);
            let mut seen = HashSet::new();
            let duplicates: Vec<String> = entries
                .into_iter()
                .filter(|entry| !seen.insert(entry.clone()))
                .collect();
            if !duplicates.is_empty() {
                duplicates_by_list.push((list, duplicates));
            }
        }
        if duplicates_by_list.is_empty() {
            return Ok(());
        }

        // One whole-file rewrite removes every duplicate at once.
        let mut deduped = (*settings).clone();
        if let Some(permissions) = deduped.get_mut("permissions").and_then(Value::as_object_mut) {
            for list in ["allow", "deny", "ask"] {
                if let Some(entries) = permissions.get_mut(list).and_then(Value::as_array_mut) {
                    let mut seen = HashSet::new();
                    entries.retain(|entry| {
                        entry
                            .as_str()
                            .is_none_or(|s| seen.insert(s.to_string()))
                    });
                }
            }
        }
        let rewritten = serde_json::to_string_pretty(&deduped)
            .map_err(|e| RuleError::new(e.to_string()))?
            + "\n";
        let full_range = OffsetRange::new(0, ctx.content().len());

        for (list, duplicates) in duplicates_by_list {
            ctx.report(
                Violation::new(format!(
                    "duplicate entries in '{list}': {}",
                    duplicates.join(", ")
                ))
                .with_fix(Fix::new(
                    "remove duplicate permission entries",
                    vec![TextEdit::replace(full_range, rewritten.clone())],
                )),
            );
        }
        Ok(())
    }
}

/// The same entry in both `allow` and `deny` is a contradiction the
/// runtime resolves silently; surface it instead.
pub struct PermissionConflicts {
    meta: RuleMetadata,
}

impl PermissionConflicts {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "permission-conflicts",
                "Conflicting permission entries",
                "An entry must not appear in both allow and deny",
                ArtifactKind::Settings,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for PermissionConflicts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for PermissionConflicts {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let allow: HashSet<String> = permission_entries(&settings, "allow").into_iter().collect();
        let mut conflicts: Vec<String> = permission_entries(&settings, "deny")
            .into_iter()
            .filter(|entry| allow.contains(entry))
            .collect();
        conflicts.sort();
        conflicts.dedup();

        for entry in conflicts {
            ctx.report(
                Violation::new(format!("'{entry}' appears in both allow and deny"))
                    .with_hint("keep the entry in exactly one list"),
            );
        }
        Ok(())
    }
}

/// Hook definitions must be keyed by events the runtime actually fires.
pub struct HookEventNames {
    meta: RuleMetadata,
}

impl HookEventNames {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "hook-event-names",
                "Hook event names",
                "Hooks must be keyed by known event names",
                ArtifactKind::Settings,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for HookEventNames {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for HookEventNames {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let Some(hooks) = settings.get("hooks").and_then(Value::as_object) else {
            return Ok(());
        };
        let unknown: Vec<String> = hooks
            .keys()
            .filter(|key| !HOOK_EVENTS.contains(&key.as_str()))
            .cloned()
            .collect();

        for event in unknown {
            ctx.report(
                Violation::new(format!("unknown hook event '{event}'"))
                    .with_hint(format!("known events: {}", HOOK_EVENTS.join(", "))),
            );
        }
        Ok(())
    }
}

/// A hook with an empty command silently does nothing when its event
/// fires.
pub struct HookCommandEmpty {
    meta: RuleMetadata,
}

impl HookCommandEmpty {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "hook-command-empty",
                "Empty hook commands",
                "Hook commands must be non-empty",
                ArtifactKind::Settings,
            )
            .severity(Severity::Error)
            .recommended(),
        }
    }
}

impl Default for HookCommandEmpty {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for HookCommandEmpty {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let Some(hooks) = settings.get("hooks").and_then(Value::as_object) else {
            return Ok(());
        };

        let mut empty = Vec::new();
        for (event, matchers) in hooks {
            let Some(matchers) = matchers.as_array() else {
                continue;
            };
            for matcher in matchers {
                let Some(entries) = matcher.get("hooks").and_then(Value::as_array) else {
                    continue;
                };
                for entry in entries {
                    let command = entry.get("command").and_then(Value::as_str);
                    if command.is_none_or(|c| c.trim().is_empty()) {
                        empty.push(event.clone());
                    }
                }
            }
        }
        for event in empty {
            ctx.report(Violation::new(format!(
                "hook under '{event}' has an empty command"
            )));
        }
        Ok(())
    }
}

/// Hook timeouts outside 1..=600 seconds either never fire or hang runs.
pub struct HookTimeoutRange {
    meta: RuleMetadata,
}

impl HookTimeoutRange {
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "hook-timeout-range",
                "Hook timeout range",
                "Hook timeouts must be between 1 and 600 seconds",
                ArtifactKind::Settings,
            )
            .recommended(),
        }
    }
}

impl Default for HookTimeoutRange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rule for HookTimeoutRange {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let Ok(settings) = ctx.json() else {
            return Ok(());
        };
        let Some(hooks) = settings.get("hooks").and_then(Value::as_object) else {
            return Ok(());
        };

        let mut bad = Vec::new();
        for (event, matchers) in hooks {
            let Some(matchers) = matchers.as_array() else {
                continue;
            };
            for matcher in matchers {
                let Some(entries) = matcher.get("hooks").and_then(Value::as_array) else {
                    continue;
                };
                for entry in entries {
                    if let Some(timeout) = entry.get("timeout").and_then(Value::as_i64) {
                        if !(1..=600).contains(&timeout) {
                            bad.push((event.clone(), timeout));
                        }
                    }
                }
            }
        }
        for (event, timeout) in bad {
            ctx.report(Violation::new(format!(
                "hook under '{event}' has timeout {timeout}, outside 1..=600 seconds"
            )));
        }
        Ok(())
    }
}

/// String entries of `permissions.<list>`, in order.
fn permission_entries(settings: &Value, list: &str) -> Vec<String> {
    settings
        .get("permissions")
        .and_then(|p| p.get(list))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    async fn run(rule: &dyn Rule, content: &str) -> Vec<Violation> {
        let mut ctx = RuleContext::new(
            PathBuf::from(".claude/settings.json"),
            Arc::from(content),
            ArtifactKind::Settings,
            rule.meta().id.clone(),
            rule.meta().default_severity,
            None,
        );
        rule.validate(&mut ctx).await.unwrap();
        ctx.take_violations()
    }

    #[tokio::test]
    async fn test_invalid_json_reported_once() {
        let rule = SettingsValidJson::new();
        assert_eq!(run(&rule, "{ not json").await.len(), 1);
        assert!(run(&rule, "{}").await.is_empty());
    }

    #[tokio::test]
    async fn test_permission_format() {
        let rule = PermissionFormat::new();
        let content = r#"{
            "permissions": {
                "allow": ["Bash(npm run build)", "Read"],
                "deny": ["bash", "Web Fetch"]
            }
        }"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_top_level_keys() {
        let rule = SettingsUnknownKeys::new();
        let content = r#"{"permissions": {}, "permisions": {}, "hooks": {}}"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("permisions"));
    }

    #[tokio::test]
    async fn test_permission_format_trims_whitespace_via_fix() {
        let rule = PermissionFormat::new();
        let content = r#"{"permissions": {"allow": [" Read", "bash"]}}"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 2);

        let trimmable = violations
            .iter()
            .find(|v| v.message.contains(" Read"))
            .unwrap();
        let fix = trimmable.fix.as_ref().unwrap();
        let fixed: Value = serde_json::from_str(&fix.edits[0].new_text).unwrap();
        assert_eq!(fixed["permissions"]["allow"][0], "Read");
        // 'bash' is not fixable by trimming, so it only carries a hint.
        let untrimmable = violations
            .iter()
            .find(|v| v.message.contains("bash"))
            .unwrap();
        assert!(untrimmable.fix.is_none());
    }

    #[tokio::test]
    async fn test_empty_hook_command() {
        let rule = HookCommandEmpty::new();
        let content = r#"{
            "hooks": {
                "PreToolUse": [
                    { "matcher": "Bash", "hooks": [{ "type": "command", "command": "  " }] }
                ]
            }
        }"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn test_permission_duplicates_fix_removes_them() {
        let rule = PermissionDuplicates::new();
        let content = r#"{"permissions": {"allow": ["Read", "Read", "Write"]}}"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);

        let fix = violations[0].fix.as_ref().unwrap();
        let fixed: Value = serde_json::from_str(&fix.edits[0].new_text).unwrap();
        assert_eq!(
            fixed["permissions"]["allow"],
            serde_json::json!(["Read", "Write"])
        );
    }

    #[tokio::test]
    async fn test_permission_conflicts() {
        let rule = PermissionConflicts::new();
        let content = r#"{"permissions": {"allow": ["Read"], "deny": ["Read", "Write"]}}"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("Read"));
    }

    #[tokio::test]
    async fn test_unknown_hook_event() {
        let rule = HookEventNames::new();
        let content = r#"{"hooks": {"PreToolUse": [], "OnSave": []}}"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("OnSave"));
    }

    #[tokio::test]
    async fn test_hook_timeout_bounds() {
        let rule = HookTimeoutRange::new();
        let content = r#"{
            "hooks": {
                "PreToolUse": [
                    { "matcher": "Bash", "hooks": [{ "type": "command", "command": "x", "timeout": 900 }] }
                ]
            }
        }"#;
        let violations = run(&rule, content).await;
        assert_eq!(violations.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_json_short_circuits_quietly() {
        // Format and hook rules stay silent; settings-valid-json owns it.
        assert!(run(&PermissionFormat::new(), "nope").await.is_empty());
        assert!(run(&HookEventNames::new(), "nope").await.is_empty());
    }
}
