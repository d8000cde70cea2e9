//! `agentlint` command-line interface.

mod commands;
mod exit_code;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use exit_code::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentlint")]
#[command(about = "Lint agent project-configuration artifacts", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root to operate in (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<std::path::PathBuf>,

    /// Force colored output even when stdout is not a terminal
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable colored output
    #[arg(long, global = true, conflicts_with = "color")]
    no_color: bool,

    /// Only report errors, suppress warnings and the summary
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate artifacts and report violations
    Lint(commands::lint::LintArgs),
    /// List the rules the current registry knows about
    Rules(commands::rules::RulesArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable output
    Human,
    /// Machine-readable JSON on stdout
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn configure_colors(force: bool, disable: bool) {
    if disable || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    } else if force
        || std::env::var_os("CLICOLOR_FORCE").is_some_and(|v| v != "0")
        || std::env::var("CLICOLOR").is_ok_and(|v| v == "1")
    {
        colored::control::set_override(true);
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    configure_colors(cli.color, cli.no_color);

    let root = match cli.root {
        Some(root) => root,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(error) => {
                eprintln!("error: cannot determine working directory: {error}");
                ExitCode::IoError.exit();
            }
        },
    };

    let code = match cli.command {
        Commands::Lint(args) => commands::lint::run(&root, args, cli.quiet).await,
        Commands::Rules(args) => commands::rules::run(args),
    };
    code.exit();
}
