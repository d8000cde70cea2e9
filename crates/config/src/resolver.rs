use crate::{
    deep_merge, find_config_in, load_config_file, CacheSettings, ConfigError, ConfigFile, Result,
    Severity,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Rule knowledge injected into the resolver.
///
/// The config crate is a leaf; rule metadata (known ids, option defaults
/// and schemas, preset membership) lives in the registry, which implements
/// this trait and is passed in at construction.
pub trait RuleInfoProvider: Send + Sync {
    /// All registered rule ids.
    fn known_rule_ids(&self) -> Vec<String>;

    /// JSON Schema (draft-7) for a rule's options, if the rule declares one.
    fn options_schema(&self, rule_id: &str) -> Option<Value>;

    /// Declared default options for a rule, if any.
    fn default_options(&self, rule_id: &str) -> Option<Value>;

    /// The rules a named preset enables, with their severities.
    /// Returns `None` for an unknown preset name.
    fn preset(&self, name: &str) -> Option<Vec<(String, Severity)>>;
}

/// Final configuration for one rule after the cascade has been folded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// The fully merged, per-file configuration.
///
/// Rules resolved to `off` are excluded entirely. The `rules` map is a
/// `BTreeMap` so the hash is deterministic for identical inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    rules: BTreeMap<String, ResolvedRule>,
    pub ignore_patterns: Vec<String>,
    pub cache: CacheSettings,
    pub plugin_dirs: Vec<PathBuf>,
    hash: String,
}

impl EffectiveConfig {
    fn new(
        rules: BTreeMap<String, ResolvedRule>,
        ignore_patterns: Vec<String>,
        cache: CacheSettings,
        plugin_dirs: Vec<PathBuf>,
    ) -> Self {
        // Only inputs that can change a lint outcome participate in the
        // hash: enabled rules (severity + options) and ignore patterns.
        // Cache location and plugin directories do not.
        #[derive(Serialize)]
        struct Hashed<'a> {
            rules: &'a BTreeMap<String, ResolvedRule>,
            ignore_patterns: &'a [String],
        }

        let canonical = serde_json::to_vec(&Hashed {
            rules: &rules,
            ignore_patterns: &ignore_patterns,
        })
        .unwrap_or_default();
        let hash = hex::encode(Sha256::digest(&canonical));

        Self {
            rules,
            ignore_patterns,
            cache,
            plugin_dirs,
            hash,
        }
    }

    /// Stable digest over everything that can change a lint outcome.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// True when the rule survived the cascade with `warn` or `error`.
    #[must_use]
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.rules.contains_key(rule_id)
    }

    /// Resolved severity for an enabled rule.
    #[must_use]
    pub fn severity(&self, rule_id: &str) -> Option<Severity> {
        self.rules.get(rule_id).map(|r| r.severity)
    }

    /// Resolved options for an enabled rule (defaults already folded in).
    #[must_use]
    pub fn options(&self, rule_id: &str) -> Option<&Value> {
        self.rules.get(rule_id).and_then(|r| r.options.as_ref())
    }

    /// Enabled rules in id order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&str, &ResolvedRule)> {
        self.rules.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Number of enabled rules.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.rules.len()
    }
}

/// A rule's state while the cascade is being folded.
#[derive(Debug, Clone)]
struct FoldedRule {
    severity: Severity,
    options: Option<Value>,
    /// Config file that last touched this rule, for error attribution.
    origin: PathBuf,
}

#[derive(Debug, Default)]
struct Fold {
    rules: BTreeMap<String, FoldedRule>,
    ignore_patterns: Vec<String>,
    cache: Option<CacheSettings>,
    plugin_dirs: Vec<PathBuf>,
    found_any: bool,
}

/// Resolves the config cascade for files under one workspace root.
///
/// Resolution is pure with respect to the filesystem state at first use:
/// loaded config files and per-directory results are memoized, so
/// repeated files in the same directory never re-walk the chain.
pub struct ConfigResolver {
    root: PathBuf,
    provider: Arc<dyn RuleInfoProvider>,
    dir_cache: Mutex<HashMap<PathBuf, Arc<EffectiveConfig>>>,
    file_cache: Mutex<HashMap<PathBuf, Arc<ConfigFile>>>,
}

impl ConfigResolver {
    /// Create a resolver rooted at the workspace root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, provider: Arc<dyn RuleInfoProvider>) -> Self {
        Self {
            root: root.into(),
            provider,
            dir_cache: Mutex::new(HashMap::new()),
            file_cache: Mutex::new(HashMap::new()),
        }
    }

    /// The workspace root this resolver walks from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop all memoized state, forcing a re-walk on next use.
    pub fn clear_cache(&self) {
        self.dir_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        self.file_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Resolve the effective configuration for a file.
    #[tracing::instrument(skip(self), fields(file = %file_path.display()))]
    pub fn resolve(&self, file_path: &Path) -> Result<Arc<EffectiveConfig>> {
        let dir = file_path.parent().unwrap_or(&self.root).to_path_buf();
        self.resolve_in(&dir)
    }

    /// Resolve the effective configuration for a directory. Memoized per
    /// directory for the life of the resolver.
    pub fn resolve_in(&self, dir: &Path) -> Result<Arc<EffectiveConfig>> {
        let dir = dir.to_path_buf();

        {
            let cache = self
                .dir_cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(resolved) = cache.get(&dir) {
                return Ok(Arc::clone(resolved));
            }
        }

        let resolved = Arc::new(self.resolve_dir(&dir)?);

        let mut cache = self
            .dir_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(dir, Arc::clone(&resolved));
        Ok(resolved)
    }

    fn resolve_dir(&self, dir: &Path) -> Result<EffectiveConfig> {
        let mut fold = Fold::default();
        let mut visiting = Vec::new();

        for chain_dir in self.chain_for(dir) {
            if let Some(config_path) = find_config_in(&chain_dir) {
                let config = self.load_cached(&config_path)?;
                self.fold_file(&mut fold, &config_path, &config, &mut visiting)?;
            }
        }

        // With no config anywhere in the chain, behave like an explicit
        // `extends: "recommended"` at the root.
        if !fold.found_any {
            if let Some(preset_rules) = self.provider.preset("recommended") {
                for (rule_id, severity) in preset_rules {
                    fold.rules.insert(
                        rule_id,
                        FoldedRule {
                            severity,
                            options: None,
                            origin: self.root.clone(),
                        },
                    );
                }
            }
        }

        self.finalize(fold)
    }

    /// Directories from the workspace root down to `dir`, inclusive.
    /// A directory outside the root resolves against itself alone.
    fn chain_for(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(rel) = dir.strip_prefix(&self.root) else {
            return vec![dir.to_path_buf()];
        };

        let mut chain = vec![self.root.clone()];
        let mut current = self.root.clone();
        for component in rel.components() {
            current = current.join(component);
            chain.push(current.clone());
        }
        chain
    }

    fn load_cached(&self, path: &Path) -> Result<Arc<ConfigFile>> {
        {
            let cache = self
                .file_cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(config) = cache.get(path) {
                return Ok(Arc::clone(config));
            }
        }

        let config = Arc::new(load_config_file(path)?);

        let mut cache = self
            .file_cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(path.to_path_buf(), Arc::clone(&config));
        Ok(config)
    }

    /// Fold one config file: extends first, then its own keys on top.
    fn fold_file(
        &self,
        fold: &mut Fold,
        path: &Path,
        config: &ConfigFile,
        visiting: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if visiting.contains(&path.to_path_buf()) {
            let mut chain: Vec<String> =
                visiting.iter().map(|p| p.display().to_string()).collect();
            chain.push(path.display().to_string());
            return Err(ConfigError::ExtendsCycle {
                chain: chain.join(" -> "),
            });
        }
        visiting.push(path.to_path_buf());

        fold.found_any = true;

        if let Some(extends) = &config.extends {
            for target in extends.targets() {
                self.fold_extends_target(fold, path, target, visiting)?;
            }
        }

        for (rule_id, entry) in &config.rules {
            self.check_known_rule(rule_id, path)?;
            let severity = entry.severity();
            let options = entry.options().cloned();

            match fold.rules.get_mut(rule_id) {
                Some(existing) => {
                    existing.severity = severity;
                    existing.options = match (&existing.options, &options) {
                        (Some(base), Some(overlay)) => Some(deep_merge(base, overlay)),
                        (None, Some(overlay)) => Some(overlay.clone()),
                        (prior, None) => prior.clone(),
                    };
                    existing.origin = path.to_path_buf();
                }
                None => {
                    fold.rules.insert(
                        rule_id.clone(),
                        FoldedRule {
                            severity,
                            options,
                            origin: path.to_path_buf(),
                        },
                    );
                }
            }
        }

        for pattern in &config.ignore_patterns {
            if !fold.ignore_patterns.contains(pattern) {
                fold.ignore_patterns.push(pattern.clone());
            }
        }

        if let Some(cache) = &config.cache {
            fold.cache = Some(cache.clone());
        }

        let config_dir = path.parent().unwrap_or(&self.root);
        for plugin_dir in &config.plugin_dirs {
            let resolved = if plugin_dir.is_absolute() {
                plugin_dir.clone()
            } else {
                config_dir.join(plugin_dir)
            };
            if !fold.plugin_dirs.contains(&resolved) {
                fold.plugin_dirs.push(resolved);
            }
        }

        visiting.pop();
        Ok(())
    }

    fn fold_extends_target(
        &self,
        fold: &mut Fold,
        from: &Path,
        target: &str,
        visiting: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let looks_like_path =
            target.starts_with("./") || target.starts_with("../") || target.ends_with(".json");

        if looks_like_path {
            let base = from.parent().unwrap_or(&self.root);
            let extend_path = base.join(target);
            if !extend_path.is_file() {
                return Err(ConfigError::UnresolvableExtends {
                    target: target.to_string(),
                    path: from.to_path_buf(),
                });
            }
            let config = self.load_cached(&extend_path)?;
            return self.fold_file(fold, &extend_path, &config, visiting);
        }

        // Named presets are terminal nodes in the extends graph.
        let Some(preset_rules) = self.provider.preset(target) else {
            return Err(ConfigError::UnknownPreset {
                name: target.to_string(),
                path: from.to_path_buf(),
            });
        };

        for (rule_id, severity) in preset_rules {
            match fold.rules.get_mut(&rule_id) {
                Some(existing) => existing.severity = severity,
                None => {
                    fold.rules.insert(
                        rule_id,
                        FoldedRule {
                            severity,
                            options: None,
                            origin: from.to_path_buf(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn check_known_rule(&self, rule_id: &str, path: &Path) -> Result<()> {
        let known = self.provider.known_rule_ids();
        if known.iter().any(|id| id == rule_id) {
            return Ok(());
        }

        let suggestion = known
            .iter()
            .map(|id| (id, strsim::jaro_winkler(rule_id, id)))
            .filter(|(_, score)| *score > 0.85)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| format!(" (did you mean '{id}'?)"))
            .unwrap_or_default();

        Err(ConfigError::UnknownRule {
            rule: rule_id.to_string(),
            path: path.to_path_buf(),
            suggestion,
        })
    }

    /// Turn the fold into an [`EffectiveConfig`]: drop `off` rules, merge
    /// user options over rule defaults, and validate against each rule's
    /// options schema.
    fn finalize(&self, fold: Fold) -> Result<EffectiveConfig> {
        let mut rules = BTreeMap::new();

        for (rule_id, folded) in fold.rules {
            if !folded.severity.is_enabled() {
                continue;
            }

            let defaults = self.provider.default_options(&rule_id);
            let options = match (defaults, folded.options) {
                (Some(defaults), Some(user)) => Some(deep_merge(&defaults, &user)),
                (Some(defaults), None) => Some(defaults),
                (None, user) => user,
            };

            if let Some(schema) = self.provider.options_schema(&rule_id) {
                let value = options.clone().unwrap_or_else(|| serde_json::json!({}));
                validate_options(&rule_id, &folded.origin, &schema, &value)?;
            }

            rules.insert(
                rule_id,
                ResolvedRule {
                    severity: folded.severity,
                    options,
                },
            );
        }

        Ok(EffectiveConfig::new(
            rules,
            fold.ignore_patterns,
            fold.cache.unwrap_or_default(),
            fold.plugin_dirs,
        ))
    }
}

fn validate_options(rule_id: &str, origin: &Path, schema: &Value, value: &Value) -> Result<()> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| ConfigError::InvalidOptions {
        rule: rule_id.to_string(),
        path: origin.to_path_buf(),
        message: format!("rule declares an invalid options schema: {e}"),
    })?;

    validator
        .validate(value)
        .map_err(|e| ConfigError::InvalidOptions {
            rule: rule_id.to_string(),
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
}
