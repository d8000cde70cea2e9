use crate::{
    offset_to_position, Rule, RuleContext, RuleError, RuleMetadata, RuleRegistry, Violation,
};
use agentlint_config::Severity;
use agentlint_workspace::ArtifactKind;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File name a plugin directory must contain.
pub const PLUGIN_MANIFEST: &str = "agentlint-plugin.json";

/// Prefix for plugin packages discovered in a dependency tree.
const PLUGIN_PACKAGE_PREFIX: &str = "agentlint-plugin-";

/// A plugin's declared content: identity plus the rules it contributes.
///
/// Plugins are declarative: each rule is a regex over file content. The
/// manifest is the "module" behind the resolution port; swapping in a
/// richer mechanism only means another [`PluginResolver`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub rules: Vec<DeclaredRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeclaredRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub kind: ArtifactKind,
    #[serde(default = "default_declared_severity")]
    pub severity: Severity,
    /// Regex matched against file content; each match is one violation.
    pub pattern: String,
    pub message: String,
}

fn default_declared_severity() -> Severity {
    Severity::Warn
}

/// Resolves a path to a plugin manifest. The resolution mechanism sits
/// behind this port; tests substitute their own.
pub trait PluginResolver: Send + Sync {
    fn resolve(&self, path: &Path) -> Result<PluginManifest, String>;
}

/// Reads `agentlint-plugin.json` from a file path or directory.
#[derive(Default)]
pub struct ManifestResolver;

impl PluginResolver for ManifestResolver {
    fn resolve(&self, path: &Path) -> Result<PluginManifest, String> {
        let manifest_path = if path.is_dir() {
            path.join(PLUGIN_MANIFEST)
        } else {
            path.to_path_buf()
        };
        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| format!("unreadable plugin manifest {}: {e}", manifest_path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("malformed plugin manifest {}: {e}", manifest_path.display()))
    }
}

/// The outcome of one plugin load attempt. Failures are descriptive and
/// non-fatal; a bad plugin never blocks built-in rules or other plugins.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub path: PathBuf,
    pub plugin_name: Option<String>,
    pub version: Option<String>,
    pub rules_added: usize,
    pub error: Option<String>,
}

impl LoadResult {
    fn failure(path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            path,
            plugin_name: None,
            version: None,
            rules_added: 0,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Loads plugins into a registry, memoizing results by resolved path so
/// the same plugin loads at most once per process.
pub struct PluginLoader {
    resolver: Box<dyn PluginResolver>,
    loaded: Mutex<HashMap<PathBuf, LoadResult>>,
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(Box::new(ManifestResolver))
    }

    #[must_use]
    pub fn with_resolver(resolver: Box<dyn PluginResolver>) -> Self {
        Self {
            resolver,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Load one plugin. Loading the same path twice returns the memoized
    /// result without touching the registry again.
    #[tracing::instrument(skip(self, registry), fields(plugin = %path.display()))]
    pub fn load(&self, registry: &mut RuleRegistry, path: &Path) -> LoadResult {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        {
            let loaded = self
                .loaded
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(previous) = loaded.get(&canonical) {
                tracing::debug!("plugin already loaded");
                return previous.clone();
            }
        }

        let result = self.load_uncached(registry, &canonical);
        if let Some(error) = &result.error {
            tracing::warn!(%error, "plugin load failed");
        } else {
            tracing::debug!(rules = result.rules_added, "plugin loaded");
        }

        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        loaded.insert(canonical, result.clone());
        result
    }

    /// Load every plugin discoverable from the given directories and the
    /// workspace dependency tree.
    pub fn load_all(
        &self,
        registry: &mut RuleRegistry,
        root: &Path,
        plugin_dirs: &[PathBuf],
    ) -> Vec<LoadResult> {
        discover_plugins(root, plugin_dirs)
            .iter()
            .map(|path| self.load(registry, path))
            .collect()
    }

    fn load_uncached(&self, registry: &mut RuleRegistry, path: &Path) -> LoadResult {
        let manifest = match self.resolver.resolve(path) {
            Ok(manifest) => manifest,
            Err(error) => return LoadResult::failure(path.to_path_buf(), error),
        };

        if let Err(error) = check_capabilities(&manifest) {
            return LoadResult::failure(path.to_path_buf(), error);
        }

        // Validate every declared rule before touching the registry;
        // a failed plugin must register nothing.
        let mut seen = std::collections::HashSet::new();
        let mut compiled = Vec::with_capacity(manifest.rules.len());
        for declared in &manifest.rules {
            if registry.get(&declared.id).is_some() || !seen.insert(declared.id.as_str()) {
                return LoadResult::failure(
                    path.to_path_buf(),
                    format!("rule id '{}' is already registered", declared.id),
                );
            }
            match RegexRule::compile(declared) {
                Ok(rule) => compiled.push(rule),
                Err(error) => return LoadResult::failure(path.to_path_buf(), error),
            }
        }

        let rules_added = compiled.len();
        for rule in compiled {
            if let Err(error) = registry.register(Arc::new(rule)) {
                return LoadResult::failure(path.to_path_buf(), error.to_string());
            }
        }

        LoadResult {
            path: path.to_path_buf(),
            plugin_name: Some(manifest.name),
            version: Some(manifest.version),
            rules_added,
            error: None,
        }
    }
}

/// The capability set a value must pass before being treated as a
/// plugin: a non-empty name, a semver version, and well-formed rules.
fn check_capabilities(manifest: &PluginManifest) -> Result<(), String> {
    if manifest.name.trim().is_empty() {
        return Err("plugin is missing a name".to_string());
    }
    let semver = regex::Regex::new(
        r"^\d+\.\d+\.\d+(-[0-9A-Za-z.\-]+)?(\+[0-9A-Za-z.\-]+)?$",
    )
    .map_err(|e| e.to_string())?;
    if !semver.is_match(&manifest.version) {
        return Err(format!("plugin version '{}' is not semver", manifest.version));
    }
    for declared in &manifest.rules {
        if declared.id.trim().is_empty() {
            return Err("plugin declares a rule with an empty id".to_string());
        }
        if declared.pattern.trim().is_empty() || declared.message.trim().is_empty() {
            return Err(format!(
                "plugin rule '{}' must declare a pattern and a message",
                declared.id
            ));
        }
    }
    Ok(())
}

/// Discovery sources, in order: explicit plugin directories, then
/// conventionally named packages in the dependency tree.
#[must_use]
pub fn discover_plugins(root: &Path, plugin_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in plugin_dirs {
        if dir.join(PLUGIN_MANIFEST).is_file() {
            found.push(dir.clone());
        }
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.filter_map(std::result::Result::ok) {
                let path = entry.path();
                if path.is_dir() && path.join(PLUGIN_MANIFEST).is_file() {
                    found.push(path);
                }
            }
        }
    }

    let node_modules = root.join("node_modules");
    if let Ok(entries) = std::fs::read_dir(&node_modules) {
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            let is_plugin_package = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(PLUGIN_PACKAGE_PREFIX));
            if is_plugin_package && path.join(PLUGIN_MANIFEST).is_file() {
                found.push(path);
            }
        }
    }

    found.sort();
    found.dedup();
    found
}

/// A plugin-contributed rule: every regex match in the content is one
/// violation.
struct RegexRule {
    meta: RuleMetadata,
    pattern: regex::Regex,
    message: String,
}

impl RegexRule {
    fn compile(declared: &DeclaredRule) -> Result<Self, String> {
        let pattern = regex::Regex::new(&declared.pattern)
            .map_err(|e| format!("plugin rule '{}' has an invalid pattern: {e}", declared.id))?;
        Ok(Self {
            meta: RuleMetadata::new(
                declared.id.clone(),
                declared.id.clone(),
                declared.description.clone(),
                declared.kind,
            )
            .severity(declared.severity),
            pattern,
            message: declared.message.clone(),
        })
    }
}

#[async_trait]
impl Rule for RegexRule {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        let content = ctx.content().to_string();
        for found in self.pattern.find_iter(&content) {
            let (line, column) = offset_to_position(&content, found.start());
            ctx.report(Violation::new(self.message.clone()).at(line, column));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_plugin(dir: &Path, json: &str) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(PLUGIN_MANIFEST);
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_valid_plugin_registers_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "team-rules",
                "version": "1.2.0",
                "rules": [
                    {
                        "id": "no-wip-markers",
                        "kind": "context-file",
                        "pattern": "WIP",
                        "message": "remove WIP markers before committing"
                    }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::new();
        let loader = PluginLoader::new();
        let result = loader.load(&mut registry, &path);

        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.plugin_name.as_deref(), Some("team-rules"));
        assert_eq!(result.rules_added, 1);
        assert!(registry.get("no-wip-markers").is_some());
    }

    #[test]
    fn test_missing_name_rejected_and_nothing_registered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "",
                "version": "1.0.0",
                "rules": [
                    { "id": "r", "kind": "skill", "pattern": "x", "message": "m" }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::new();
        let result = PluginLoader::new().load(&mut registry, &path);
        assert!(!result.is_success());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bad_semver_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{ "name": "p", "version": "latest", "rules": [] }"#,
        );

        let result = PluginLoader::new().load(&mut RuleRegistry::new(), &path);
        assert!(!result.is_success());
        assert!(result.error.as_ref().unwrap().contains("semver"));
    }

    #[test]
    fn test_missing_register_shape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(dir.path(), r#"{ "unexpected": true }"#);

        let result = PluginLoader::new().load(&mut RuleRegistry::new(), &path);
        assert!(!result.is_success());
    }

    #[test]
    fn test_second_load_is_memoized_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "p",
                "version": "1.0.0",
                "rules": [
                    { "id": "once", "kind": "settings", "pattern": "x", "message": "m" }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::new();
        let loader = PluginLoader::new();
        let first = loader.load(&mut registry, &path);
        let second = loader.load(&mut registry, &path);
        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rule_id_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "p",
                "version": "1.0.0",
                "rules": [
                    { "id": "context-file-size", "kind": "context-file", "pattern": "x", "message": "m" }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::with_builtins().unwrap();
        let before = registry.len();
        let result = PluginLoader::new().load(&mut registry, &path);
        assert!(!result.is_success());
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_invalid_pattern_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "p",
                "version": "1.0.0",
                "rules": [
                    { "id": "good-rule", "kind": "settings", "pattern": "x", "message": "m" },
                    { "id": "bad-rule", "kind": "settings", "pattern": "(", "message": "m" }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::new();
        let result = PluginLoader::new().load(&mut registry, &path);
        assert!(!result.is_success());
        assert!(result.error.as_ref().unwrap().contains("bad-rule"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_id_within_manifest_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plugin(
            dir.path(),
            r#"{
                "name": "p",
                "version": "1.0.0",
                "rules": [
                    { "id": "twice", "kind": "skill", "pattern": "x", "message": "m" },
                    { "id": "twice", "kind": "skill", "pattern": "y", "message": "m" }
                ]
            }"#,
        );

        let mut registry = RuleRegistry::new();
        let result = PluginLoader::new().load(&mut registry, &path);
        assert!(!result.is_success());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discovery_finds_dirs_and_node_modules() {
        let ws = tempfile::tempdir().unwrap();
        let plugin_dir = ws.path().join("lint-plugins/custom");
        write_plugin(&plugin_dir, r#"{ "name": "a", "version": "1.0.0" }"#);
        let package = ws.path().join("node_modules/agentlint-plugin-team");
        write_plugin(&package, r#"{ "name": "b", "version": "1.0.0" }"#);
        fs::create_dir_all(ws.path().join("node_modules/unrelated")).unwrap();

        let found = discover_plugins(ws.path(), &[ws.path().join("lint-plugins")]);
        assert_eq!(found.len(), 2);
    }
}
