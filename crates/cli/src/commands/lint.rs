//! The `agentlint lint` command: select files, run the engine, report.

use crate::exit_code::ExitCode;
use crate::output::{self, Totals};
use crate::OutputFormat;
use agentlint_cache::CacheStore;
use agentlint_config::{
    find_config_in, load_config_file, CacheSettings, ConfigFile, ConfigResolver, RuleInfoProvider,
};
use agentlint_linter::{
    apply_fixes, write_fixed, CancelFlag, FixPolicy, LintEngine, LintResult, PluginLoader,
    RuleRegistry,
};
use agentlint_workspace::{
    discover_packages, find_package, select, ChangedFilter, SelectOptions, Selection,
    SelectorWarning,
};
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Args)]
pub struct LintArgs {
    /// Files, directories, or glob patterns to validate. Defaults to
    /// every recognized artifact under the root.
    pub patterns: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Apply available fixes and write the files back
    #[arg(long, conflicts_with = "fix_dry_run")]
    pub fix: bool,

    /// Show what --fix would change without writing anything
    #[arg(long, conflicts_with = "fix")]
    pub fix_dry_run: bool,

    /// Only apply fixes from these rules (implies --fix unless dry-run)
    #[arg(long, value_name = "RULE", value_delimiter = ',')]
    pub fix_rule: Vec<String>,

    /// Only validate files changed in the working tree
    #[arg(long, conflicts_with = "since")]
    pub changed: bool,

    /// Only validate files changed since the given git ref
    #[arg(long, value_name = "REF")]
    pub since: Option<String>,

    /// Restrict the run to one workspace package by name
    #[arg(long, value_name = "NAME", conflicts_with = "workspaces")]
    pub workspace: Option<String>,

    /// Run across every discovered workspace package
    #[arg(long)]
    pub workspaces: bool,

    /// Skip the result cache entirely for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Drop all cached results before the run
    #[arg(long)]
    pub clear_cache: bool,

    /// Maximum number of files validated concurrently
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

pub async fn run(root: &Path, args: LintArgs, quiet: bool) -> ExitCode {
    match run_inner(root, args, quiet).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::IoError
        }
    }
}

async fn run_inner(root: &Path, args: LintArgs, quiet: bool) -> anyhow::Result<ExitCode> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot resolve root {}", root.display()))?;

    // The root config file is read once up front, before full resolution:
    // plugin rules must be registered before the resolver can judge which
    // rule ids are known.
    let root_config = match find_config_in(&root).map(|path| load_config_file(&path)) {
        Some(Ok(config)) => Some(config),
        Some(Err(error)) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::ConfigError);
        }
        None => None,
    };

    let registry = match build_registry(&root, root_config.as_ref()) {
        Ok(registry) => registry,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::ConfigError);
        }
    };

    // Cache settings and ignore patterns come from the resolved effective
    // config, so values set through `extends` chains apply too.
    let provider: Arc<dyn RuleInfoProvider> = Arc::clone(&registry) as _;
    let resolver = ConfigResolver::new(&root, provider);
    let effective = match resolver.resolve_in(&root) {
        Ok(effective) => effective,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::ConfigError);
        }
    };
    let cache = open_cache(&root, &effective.cache, &args)?;

    let cancel: CancelFlag = Arc::new(AtomicBool::new(false));
    let ctrl_c_flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing in-flight files");
            ctrl_c_flag.store(true, Ordering::SeqCst);
        }
    });

    let mut builder = LintEngine::builder(&root, registry).cancel_flag(cancel);
    if let Some(store) = cache {
        builder = builder.cache(store);
    }
    if let Some(limit) = args.concurrency {
        builder = builder.concurrency(limit);
    }
    let engine = builder.build();

    let selection = match select_files(&root, &effective.ignore_patterns, &args) {
        Ok(selection) => selection,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::ConfigError);
        }
    };
    output::print_warnings(&selection.warnings);

    let results = match engine.lint_files(selection.files).await {
        Ok(results) => results,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::from(&error));
        }
    };

    if args.fix || args.fix_dry_run || !args.fix_rule.is_empty() {
        return fix_flow(&root, &engine, &results, &args, quiet).await;
    }

    let totals = Totals::tally(&results);
    output::print_results(&root, &results, &totals, args.format, quiet);
    Ok(if totals.errors > 0 {
        ExitCode::LintError
    } else {
        ExitCode::Success
    })
}

fn build_registry(
    root: &Path,
    root_config: Option<&ConfigFile>,
) -> agentlint_linter::Result<Arc<RuleRegistry>> {
    let mut registry = RuleRegistry::with_builtins()?;

    let plugin_dirs: Vec<PathBuf> = root_config
        .map(|config| config.plugin_dirs.clone())
        .unwrap_or_default();
    let loader = PluginLoader::new();
    let load_results = loader.load_all(&mut registry, root, &plugin_dirs);
    output::print_plugin_failures(&load_results);
    for result in load_results.iter().filter(|r| r.is_success()) {
        tracing::debug!(
            plugin = result.plugin_name.as_deref().unwrap_or("?"),
            rules = result.rules_added,
            "plugin loaded"
        );
    }

    Ok(Arc::new(registry))
}

fn open_cache(
    root: &Path,
    settings: &CacheSettings,
    args: &LintArgs,
) -> anyhow::Result<Option<Arc<CacheStore<LintResult>>>> {
    let store_path = settings.store_path(root);

    if args.clear_cache {
        let store: CacheStore<LintResult> = CacheStore::open(&store_path);
        store
            .remove_file()
            .with_context(|| format!("cannot clear cache at {}", store_path.display()))?;
    }

    if args.no_cache || !settings.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(CacheStore::open(store_path))))
}

fn select_files(
    root: &Path,
    ignore_patterns: &[String],
    args: &LintArgs,
) -> agentlint_workspace::Result<Selection> {
    let changed = if let Some(reference) = &args.since {
        ChangedFilter::Since(reference.clone())
    } else if args.changed {
        ChangedFilter::WorkingTree
    } else {
        ChangedFilter::None
    };
    let options = SelectOptions {
        ignore_patterns: ignore_patterns.to_vec(),
        changed,
    };

    if let Some(name) = &args.workspace {
        let package = find_package(root, name)?;
        return select(&package.root, &args.patterns, &options);
    }

    if args.workspaces {
        let mut merged = Selection::default();
        for package in discover_packages(root)? {
            match select(&package.root, &args.patterns, &options) {
                Ok(mut selection) => {
                    merged.files.append(&mut selection.files);
                    merged.warnings.append(&mut selection.warnings);
                }
                Err(error) => {
                    merged.warnings.push(SelectorWarning::Package {
                        name: package.name.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }
        merged.files.sort();
        merged.files.dedup();
        return Ok(merged);
    }

    select(root, &args.patterns, &options)
}

async fn fix_flow(
    root: &Path,
    engine: &Arc<LintEngine>,
    results: &[LintResult],
    args: &LintArgs,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let policy = if args.fix_rule.is_empty() {
        FixPolicy::All
    } else {
        FixPolicy::rules(args.fix_rule.clone())
    };

    let outcomes = match apply_fixes(engine, results, &policy).await {
        Ok(outcomes) => outcomes,
        Err(error) => {
            eprintln!("error: {error}");
            return Ok(ExitCode::from(&error));
        }
    };

    if args.fix_dry_run {
        output::print_dry_run(&outcomes, args.format);
        return Ok(ExitCode::Success);
    }

    let written = write_fixed(&outcomes).context("cannot write fixed files")?;
    output::print_fixed(&outcomes);
    tracing::debug!(written, "fixes written");

    // Report the post-fix state: fixed files replaced by their re-lint
    // result, untouched files kept as-is.
    let mut final_results: Vec<LintResult> = Vec::with_capacity(results.len());
    for result in results {
        match outcomes.iter().find(|o| o.path == result.path) {
            Some(outcome) => final_results.push(outcome.result.clone()),
            None => final_results.push(result.clone()),
        }
    }
    let totals = Totals::tally(&final_results);
    output::print_results(root, &final_results, &totals, args.format, quiet);
    Ok(if totals.errors > 0 {
        ExitCode::LintError
    } else {
        ExitCode::Success
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn default_args() -> LintArgs {
        LintArgs {
            patterns: Vec::new(),
            format: OutputFormat::Human,
            fix: false,
            fix_dry_run: false,
            fix_rule: Vec::new(),
            changed: false,
            since: None,
            workspace: None,
            workspaces: true,
            no_cache: false,
            clear_cache: false,
            concurrency: None,
        }
    }

    fn make_package(root: &Path, dir: &str, name: &str) {
        let pkg = root.join(dir);
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            format!(r#"{{ "name": "{name}" }}"#),
        )
        .unwrap();
        fs::write(pkg.join("CLAUDE.md"), "# context\n").unwrap();
    }

    #[test]
    fn test_workspaces_selection_covers_every_package() {
        let ws = tempfile::tempdir().unwrap();
        fs::write(
            ws.path().join("package.json"),
            r#"{ "workspaces": ["packages/*"] }"#,
        )
        .unwrap();
        make_package(ws.path(), "packages/app", "app");
        make_package(ws.path(), "packages/lib", "lib");

        let selection = select_files(ws.path(), &[], &default_args()).unwrap();
        assert!(selection
            .files
            .iter()
            .any(|p| p.ends_with("packages/app/CLAUDE.md")));
        assert!(selection
            .files
            .iter()
            .any(|p| p.ends_with("packages/lib/CLAUDE.md")));
        assert!(selection.warnings.is_empty());
    }

    #[test]
    fn test_workspaces_package_failure_becomes_warning() {
        let ws = tempfile::tempdir().unwrap();
        fs::write(
            ws.path().join("package.json"),
            r#"{ "workspaces": ["packages/*"] }"#,
        )
        .unwrap();
        make_package(ws.path(), "packages/app", "app");
        make_package(ws.path(), "packages/lib", "lib");

        let mut args = default_args();
        args.patterns = vec!["[".to_string()];
        let selection = select_files(ws.path(), &[], &args).unwrap();
        assert!(selection.files.is_empty());
        assert_eq!(selection.warnings.len(), 2);
        assert!(selection
            .warnings
            .iter()
            .all(|w| matches!(w, SelectorWarning::Package { .. })));
    }
}
