//! # sentinel-cli
//!
//! Command-line front end for the Sentinel policy builder.
//!
//! - `sentinel tools [--search]`: browse the tool catalog
//! - `sentinel classes`: taint class reference
//! - `sentinel templates`: list rule templates and their rule ids
//! - `sentinel relevant --tool ...`: rules worth considering for a tool set
//! - `sentinel compile ...`: compile a selection into a policy file
//! - `sentinel import <file>`: inspect a previously compiled policy file

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentinel_policy::BuilderConfig;
use tracing_subscriber::EnvFilter;

/// Sentinel policy builder: assemble and compile tool-use security policies.
#[derive(Parser)]
#[command(name = "sentinel", version, about)]
struct Cli {
    /// Project root holding `sentinel.toml` and `presets/` (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Reject malformed rules instead of dropping them (overrides config).
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tools in the catalog.
    Tools {
        /// Filter by name, description or taint class.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the taint class reference.
    Classes,
    /// List rule templates and their rules.
    Templates,
    /// Show the rules relevant to a tool selection.
    Relevant(commands::compile::SelectionArgs),
    /// Compile a selection into a policy file.
    Compile {
        #[command(flatten)]
        selection: commands::compile::SelectionArgs,
        #[command(flatten)]
        output: commands::compile::OutputArgs,
    },
    /// Re-read a compiled policy file and print the selection it restores.
    Import {
        /// Policy file (JSON or YAML).
        file: PathBuf,
    },
}

/// Used when `RUST_LOG` is unset or blank.
const DEFAULT_LOG_DIRECTIVES: &str = "sentinel_policy=info,sentinel=info";

/// `RUST_LOG` replaces the defaults outright, so it can raise as well as
/// lower the level for our own crates.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_LOG_DIRECTIVES),
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so compiled documents on stdout stay clean.
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let mut config = BuilderConfig::load(&project_root)?;
    if cli.strict {
        config.strict = true;
    }

    match &cli.command {
        Commands::Tools { search } => commands::tools::list(&config, search.as_deref()),
        Commands::Classes => commands::tools::classes(&config),
        Commands::Templates => commands::templates::list(&config),
        Commands::Relevant(selection) => commands::compile::relevant(&config, selection),
        Commands::Compile { selection, output } => {
            commands::compile::compile(&config, selection, output)
        }
        Commands::Import { file } => commands::import::execute(&config, file),
    }
}
