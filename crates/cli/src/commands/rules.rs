//! The `agentlint rules` command: list what the registry knows.

use crate::exit_code::ExitCode;
use crate::OutputFormat;
use agentlint_linter::{ArtifactKind, RuleRegistry, Severity};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

#[derive(Args)]
pub struct RulesArgs {
    /// Only list rules for one artifact kind
    /// (context-file, settings, skill, command, agent)
    #[arg(long, value_name = "KIND")]
    pub kind: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct RuleRow<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    kind: String,
    default_severity: Severity,
    recommended: bool,
    fixable: bool,
    deprecated: bool,
    introduced_in: &'a str,
}

pub fn run(args: RulesArgs) -> ExitCode {
    let registry = match RuleRegistry::with_builtins() {
        Ok(registry) => registry,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::ConfigError;
        }
    };

    let kind = match args.kind.as_deref().map(parse_kind) {
        Some(Ok(kind)) => Some(kind),
        Some(Err(message)) => {
            eprintln!("error: {message}");
            return ExitCode::ConfigError;
        }
        None => None,
    };

    let rows: Vec<RuleRow<'_>> = registry
        .iter()
        .map(|rule| rule.meta())
        .filter(|meta| kind.is_none_or(|k| meta.kind == k))
        .map(|meta| RuleRow {
            id: &meta.id,
            name: &meta.name,
            description: &meta.description,
            kind: meta.kind.to_string(),
            default_severity: meta.default_severity,
            recommended: meta.recommended,
            fixable: meta.fixable,
            deprecated: meta.deprecated,
            introduced_in: &meta.introduced_in,
        })
        .collect();

    match args.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{json}"),
            Err(error) => {
                eprintln!("error: {error}");
                return ExitCode::IoError;
            }
        },
        OutputFormat::Human => {
            for row in &rows {
                let mut flags = Vec::new();
                if row.recommended {
                    flags.push("recommended".green().to_string());
                }
                if row.fixable {
                    flags.push("fixable".cyan().to_string());
                }
                if row.deprecated {
                    flags.push("deprecated".red().to_string());
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                println!(
                    "{}  {}{}",
                    row.id.bold(),
                    format!("({})", row.kind).dimmed(),
                    flags
                );
                println!("  {}", row.description);
            }
            println!("{} rule(s)", rows.len());
        }
    }

    ExitCode::Success
}

fn parse_kind(value: &str) -> Result<ArtifactKind, String> {
    ArtifactKind::all()
        .iter()
        .copied()
        .find(|kind| kind.to_string() == value)
        .ok_or_else(|| {
            let known: Vec<String> = ArtifactKind::all().iter().map(ToString::to_string).collect();
            format!("unknown artifact kind '{value}', expected one of: {}", known.join(", "))
        })
}
