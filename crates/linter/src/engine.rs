use crate::{LintResult, LinterError, Result, RuleContext, RuleRegistry, Violation};
use agentlint_cache::{content_hash, CacheKey, CacheStore};
use agentlint_config::{ConfigResolver, EffectiveConfig, Severity};
use agentlint_workspace::ArtifactKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Set to request cancellation: the engine stops starting new files and
/// lets in-flight validations finish, so the cache only ever sees
/// complete results.
pub type CancelFlag = Arc<AtomicBool>;

const DEFAULT_CONCURRENCY: usize = 16;

/// The validation orchestrator.
///
/// Per file: resolve config, consult the cache, run every enabled rule
/// for the file's artifact kind in registration order, store the result
/// back. `lint_files` fans out across files up to a bounded concurrency;
/// rules within one file always run sequentially.
pub struct LintEngine {
    registry: Arc<RuleRegistry>,
    resolver: Arc<ConfigResolver>,
    cache: Option<Arc<CacheStore<LintResult>>>,
    concurrency: usize,
    cancel: CancelFlag,
}

pub struct LintEngineBuilder {
    root: PathBuf,
    registry: Arc<RuleRegistry>,
    cache: Option<Arc<CacheStore<LintResult>>>,
    concurrency: usize,
    cancel: CancelFlag,
}

impl LintEngineBuilder {
    #[must_use]
    pub fn cache(mut self, store: Arc<CacheStore<LintResult>>) -> Self {
        self.cache = Some(store);
        self
    }

    #[must_use]
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    #[must_use]
    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<LintEngine> {
        let provider: Arc<dyn agentlint_config::RuleInfoProvider> = Arc::clone(&self.registry) as _;
        Arc::new(LintEngine {
            resolver: Arc::new(ConfigResolver::new(self.root, provider)),
            registry: self.registry,
            cache: self.cache,
            concurrency: self.concurrency,
            cancel: self.cancel,
        })
    }
}

impl LintEngine {
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>, registry: Arc<RuleRegistry>) -> LintEngineBuilder {
        LintEngineBuilder {
            root: root.into(),
            registry,
            cache: None,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Validate one file, via the cache when possible.
    #[tracing::instrument(skip(self), fields(file = %path.display()))]
    pub async fn lint_file(&self, path: &Path) -> Result<LintResult> {
        let config = self.resolver.resolve(path)?;

        if self.is_ignored(path, &config) {
            tracing::debug!("file ignored by config");
            return Ok(LintResult::new(path.to_path_buf(), String::new(), Vec::new()));
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| LinterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let key = CacheKey::new(path, content_hash(&bytes), config.hash().to_string());
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key) {
                tracing::debug!("cache hit");
                return Ok(cached);
            }
        }

        let result = self.lint_content(path, &content, &config).await;

        if let Some(cache) = &self.cache {
            cache.insert(&key, result.clone());
        }
        Ok(result)
    }

    /// Run every enabled rule against in-memory content. No cache
    /// involvement; this is also the re-validation step after fixing.
    pub async fn lint_content(
        &self,
        path: &Path,
        content: &str,
        config: &EffectiveConfig,
    ) -> LintResult {
        let Some(kind) = ArtifactKind::detect(path) else {
            return LintResult::new(path.to_path_buf(), content.to_string(), Vec::new());
        };

        let shared: Arc<str> = Arc::from(content);
        let mut violations = Vec::new();

        for rule in self.registry.by_kind(kind) {
            let meta = rule.meta();
            if !config.is_enabled(&meta.id) {
                continue;
            }
            let severity = config.severity(&meta.id).unwrap_or(meta.default_severity);
            let options = config.options(&meta.id).cloned();

            let mut ctx = RuleContext::new(
                path.to_path_buf(),
                Arc::clone(&shared),
                kind,
                meta.id.clone(),
                severity,
                options,
            );
            match rule.validate(&mut ctx).await {
                Ok(()) => violations.extend(ctx.take_violations()),
                Err(error) => {
                    // One crashing rule never takes down the file.
                    tracing::warn!(rule = %meta.id, %error, "rule execution failed");
                    violations.push(
                        Violation::new(format!("rule '{}' failed: {error}", meta.id))
                            .with_severity(Severity::Error)
                            .tagged(&meta.id),
                    );
                }
            }
        }

        LintResult::new(path.to_path_buf(), content.to_string(), violations)
    }

    /// Validate many files with bounded fan-out. Results come back
    /// sorted by path. The persisted cache is flushed once at the end.
    pub async fn lint_files(self: &Arc<Self>, files: Vec<PathBuf>) -> Result<Vec<LintResult>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(PathBuf, Result<LintResult>)> = JoinSet::new();

        for file in files {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::info!("cancellation requested, not starting new files");
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let engine = Arc::clone(self);
            tasks.spawn(async move {
                let result = engine.lint_file(&file).await;
                drop(permit);
                (file, result)
            });
        }

        let mut results = Vec::new();
        let mut fatal = None;
        while let Some(joined) = tasks.join_next().await {
            let Ok((path, outcome)) = joined else {
                tracing::warn!("lint task panicked");
                continue;
            };
            match outcome {
                Ok(result) => results.push(result),
                // An unreadable file degrades to a per-file error result.
                Err(LinterError::Io { path: _, source }) => {
                    results.push(LintResult::new(
                        path.clone(),
                        String::new(),
                        vec![Violation::new(format!("could not read file: {source}"))
                            .with_severity(Severity::Error)
                            .tagged("file-unreadable")],
                    ));
                }
                Err(error) => fatal = Some(error),
            }
        }
        if let Some(error) = fatal {
            return Err(error);
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));

        if let Some(cache) = &self.cache {
            if let Err(error) = cache.persist() {
                tracing::warn!(%error, "failed to persist cache");
            }
        }
        Ok(results)
    }

    /// Drop all cached results, forcing full re-validation.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    fn is_ignored(&self, path: &Path, config: &EffectiveConfig) -> bool {
        let relative = path.strip_prefix(self.resolver.root()).unwrap_or(path);
        config.ignore_patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches_path(relative))
                .unwrap_or(false)
        })
    }
}
