use crate::{LinterError, Result, Rule};
use agentlint_config::{RuleInfoProvider, Severity};
use agentlint_workspace::ArtifactKind;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds every known rule, built-in and plugin-contributed, in
/// registration order.
///
/// Not ambient state: the registry is constructed explicitly, injected
/// into the engine, and [`RuleRegistry::clear`] gives tests a clean
/// slate.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    ids: HashMap<String, usize>,
}

impl RuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with every built-in rule.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for rule in crate::rules::all() {
            registry.register(rule)?;
        }
        Ok(registry)
    }

    /// Register a rule. Ids are globally unique; a duplicate is fatal.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<()> {
        let id = rule.meta().id.clone();
        if self.ids.contains_key(&id) {
            return Err(LinterError::DuplicateRule { id });
        }
        tracing::debug!(rule = %id, "rule registered");
        self.ids.insert(id, self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.ids.get(id).map(|&index| &self.rules[index])
    }

    /// Rules for one artifact kind, in registration order.
    pub fn by_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter().filter(move |rule| rule.meta().kind == kind)
    }

    /// All rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remove every rule. For test isolation.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.ids.clear();
    }
}

impl RuleInfoProvider for RuleRegistry {
    fn known_rule_ids(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.meta().id.clone()).collect()
    }

    fn options_schema(&self, rule_id: &str) -> Option<Value> {
        self.get(rule_id)?.meta().options_schema.clone()
    }

    fn default_options(&self, rule_id: &str) -> Option<Value> {
        self.get(rule_id)?.meta().default_options.clone()
    }

    fn preset(&self, name: &str) -> Option<Vec<(String, Severity)>> {
        let include: fn(&crate::RuleMetadata) -> bool = match name {
            "recommended" => |meta| meta.recommended && !meta.deprecated,
            "all" => |meta| !meta.deprecated,
            _ => return None,
        };
        Some(
            self.rules
                .iter()
                .map(|rule| rule.meta())
                .filter(|meta| include(meta))
                .map(|meta| (meta.id.clone(), meta.default_severity))
                .collect(),
        )
    }
}
