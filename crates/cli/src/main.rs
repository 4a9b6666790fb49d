//! Attest CLI
//!
//! Answers security questionnaires from a corpus of policy documents.

mod commands;

use attest_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, CatalogCommand, IndexCommand, RunCommand};
use std::path::PathBuf;
use tracing::Instrument;

/// Attest - grounded answers to security questionnaires
#[derive(Parser, Debug)]
#[command(name = "attest")]
#[command(about = "Answer security questionnaires from your own policy documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ATTEST_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ATTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, openai)
    #[arg(short, long, global = true, env = "ATTEST_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "ATTEST_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the passage index for a corpus
    Index(IndexCommand),

    /// Answer every catalog question
    Run(RunCommand),

    /// Answer one ad-hoc question
    Ask(AskCommand),

    /// List the questionnaire catalog
    Catalog(CatalogCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Index(_) => "index",
            Commands::Run(_) => "run",
            Commands::Ask(_) => "ask",
            Commands::Catalog(_) => "catalog",
        }
    }
}

/// Layer the config file named by `--workspace`/`--config` under the remaining flags.
fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    let mut config = AppConfig::load()?;

    if cli.workspace.is_some() || cli.config.is_some() {
        config = config.with_overrides(
            cli.workspace.clone(),
            cli.config.clone(),
            None,
            None,
            None,
            false,
            false,
        );
        let path = config.config_path();
        if path.exists() {
            config = config.merge_yaml(&path)?;
        }
    }

    Ok(config.with_overrides(
        None,
        None,
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
    ))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Attest CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let span = tracing::info_span!("command", name = cli.command.name());

    let result = async {
        match cli.command {
            Commands::Index(cmd) => cmd.execute(&config).await,
            Commands::Run(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Catalog(cmd) => cmd.execute(),
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
