//! End-to-end engine behavior: caching, fault isolation, and the
//! fix-then-revalidate loop.

use agentlint_cache::CacheStore;
use agentlint_linter::{
    apply_fixes, ArtifactKind, FixPolicy, LintEngine, LintResult, Rule, RuleContext, RuleError,
    RuleMetadata, RuleRegistry, Severity, Violation,
};
use agentlint_test_utils::TempWorkspace;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts validate invocations so cache behavior is observable.
struct CountingRule {
    meta: RuleMetadata,
    calls: Arc<AtomicUsize>,
}

impl CountingRule {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            meta: RuleMetadata::new(
                "counting-rule",
                "Counting rule",
                "counts its invocations",
                ArtifactKind::ContextFile,
            ),
            calls,
        }
    }
}

#[async_trait]
impl Rule for CountingRule {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, ctx: &mut RuleContext) -> Result<(), RuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.content().contains("violate") {
            ctx.report(Violation::new("found the marker"));
        }
        Ok(())
    }
}

/// Always fails, to exercise rule isolation.
struct CrashingRule {
    meta: RuleMetadata,
}

impl CrashingRule {
    fn new() -> Self {
        Self {
            meta: RuleMetadata::new(
                "crashing-rule",
                "Crashing rule",
                "always fails",
                ArtifactKind::ContextFile,
            ),
        }
    }
}

#[async_trait]
impl Rule for CrashingRule {
    fn meta(&self) -> &RuleMetadata {
        &self.meta
    }

    async fn validate(&self, _ctx: &mut RuleContext) -> Result<(), RuleError> {
        Err(RuleError::new("intentional failure"))
    }
}

fn counting_setup(ws: &TempWorkspace) -> (Arc<LintEngine>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = RuleRegistry::with_builtins().unwrap();
    registry
        .register(Arc::new(CountingRule::new(Arc::clone(&calls))))
        .unwrap();

    let cache = Arc::new(CacheStore::<LintResult>::open(
        ws.path().join(".agentlint-cache.json"),
    ));
    let engine = LintEngine::builder(ws.path(), Arc::new(registry))
        .cache(cache)
        .build();
    (engine, calls)
}

#[tokio::test]
async fn test_cache_hit_skips_rule_execution() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "counting-rule": "warn" } }),
    );
    let file = ws.file("CLAUDE.md", "# Project, will violate\n");

    let (engine, calls) = counting_setup(&ws);

    let first = engine.lint_file(&file).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = engine.lint_file(&file).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second run must hit the cache");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_single_byte_change_invalidates() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "counting-rule": "warn" } }),
    );
    let file = ws.file("CLAUDE.md", "# Project a\n");

    let (engine, calls) = counting_setup(&ws);
    engine.lint_file(&file).await.unwrap();

    ws.file("CLAUDE.md", "# Project b\n");
    engine.lint_file(&file).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_config_change_invalidates() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "counting-rule": "warn" } }),
    );
    let file = ws.file("CLAUDE.md", "# Project\n");

    let (engine, calls) = counting_setup(&ws);
    engine.lint_files(vec![file.clone()]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Same content, different resolved severity: full cache miss even
    // through the persisted store.
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "counting-rule": "error" } }),
    );
    let (engine, calls) = counting_setup(&ws);
    engine.lint_files(vec![file]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_crashing_rule_is_isolated() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "crashing-rule": "error" } }),
    );
    // Violates context-file-empty alongside the crashing rule.
    let file = ws.file("CLAUDE.md", "");

    let mut registry = RuleRegistry::with_builtins().unwrap();
    registry.register(Arc::new(CrashingRule::new())).unwrap();
    let engine = LintEngine::builder(ws.path(), Arc::new(registry)).build();

    let results = engine.lint_files(vec![file]).await.unwrap();
    assert_eq!(results.len(), 1, "the file appears exactly once");

    let synthetic: Vec<_> = results[0]
        .violations
        .iter()
        .filter(|v| v.rule_id == "crashing-rule")
        .collect();
    assert_eq!(synthetic.len(), 1);
    assert!(synthetic[0].message.contains("intentional failure"));
    assert_eq!(synthetic[0].severity, Severity::Error);

    assert!(
        results[0].violations.iter().any(|v| v.rule_id == "context-file-empty"),
        "other rules still report normally"
    );
}

#[tokio::test]
async fn test_fix_never_introduces_new_violations() {
    let ws = TempWorkspace::new();
    let file = ws.file(
        "CLAUDE.md",
        "# Project\n\nsome text with trailing   \nmore text\t\nlast line",
    );

    let registry = Arc::new(RuleRegistry::with_builtins().unwrap());
    let engine = LintEngine::builder(ws.path(), registry).build();

    let before = engine.lint_file(&file).await.unwrap();
    let before_rules: std::collections::HashSet<_> =
        before.violations.iter().map(|v| v.rule_id.clone()).collect();

    let outcomes = apply_fixes(&engine, &[before], &FixPolicy::All).await.unwrap();
    let after = &outcomes[0].result;
    for violation in &after.violations {
        assert!(
            before_rules.contains(&violation.rule_id),
            "fix introduced new violation for '{}'",
            violation.rule_id
        );
    }
}

#[tokio::test]
async fn test_size_rule_scenario_end_to_end() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({
            "rules": { "context-file-size": ["error", { "maxSize": 40000 }] }
        }),
    );
    let oversized = "x".repeat(45_000) + "\n";
    let file = ws.file("CLAUDE.md", &oversized);

    let cache = Arc::new(CacheStore::<LintResult>::open(
        ws.path().join(".agentlint-cache.json"),
    ));
    let registry = Arc::new(RuleRegistry::with_builtins().unwrap());
    let engine = LintEngine::builder(ws.path(), registry)
        .cache(cache)
        .build();

    let over = engine.lint_file(&file).await.unwrap();
    let size_violations: Vec<_> = over
        .violations
        .iter()
        .filter(|v| v.rule_id == "context-file-size")
        .collect();
    assert_eq!(size_violations.len(), 1);
    assert_eq!(size_violations[0].severity, Severity::Error);

    // Shrink under the limit: content hash changes, cache misses, clean.
    let fitting = "x".repeat(39_990) + "\n";
    ws.file("CLAUDE.md", &fitting);
    let under = engine.lint_file(&file).await.unwrap();
    assert!(!under.violations.iter().any(|v| v.rule_id == "context-file-size"));
}

#[tokio::test]
async fn test_persisted_cache_survives_engine_restart() {
    let ws = TempWorkspace::new();
    ws.config(
        "",
        &json!({ "extends": "recommended", "rules": { "counting-rule": "warn" } }),
    );
    let file = ws.file("CLAUDE.md", "# Project\n");

    let (engine, calls) = counting_setup(&ws);
    engine.lint_files(vec![file.clone()]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A new engine over the same store must see the persisted entry.
    let (engine, calls) = counting_setup(&ws);
    engine.lint_files(vec![file]).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
