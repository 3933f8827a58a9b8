//! qaflow CLI - Main Entry Point
//!
//! Runs natural-language browser test cases and reports the results.
//!
//! Exit codes: 0 all cases passed, 1 some case failed, 2 error or interrupt.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use qaflow_cli::commands::{plan, run, summary};
use qaflow_cli::output::{self, OutputFormat};
use qaflow_common::{default_config_path, EngineConfig};
use std::path::PathBuf;

/// qaflow - natural-language browser test execution
#[derive(Parser)]
#[command(name = "qaflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ./qaflow.toml when present)
    #[arg(short, long, global = true, env = "QAFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute test cases in a browser
    Run(run::RunArgs),

    /// Show how test steps map to browser actions
    Plan(plan::PlanArgs),

    /// Print a stored test-results.json
    Summary(summary::SummaryArgs),

    /// Show version information
    Version,
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let path = match path {
        Some(path) if !path.exists() => bail!("configuration file {} not found", path.display()),
        Some(path) => path,
        None => default_config_path(),
    };
    Ok(EngineConfig::load_with_env(&path)?)
}

async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run(args) => run::execute(args, load_config(cli.config)?, cli.format).await,
        Commands::Plan(args) => plan::execute(args, load_config(cli.config)?, cli.format).await,
        Commands::Summary(args) => summary::execute(args, cli.format),
        Commands::Version => {
            println!("qaflow v{}", qaflow_common::VERSION);
            println!("Natural-language browser test execution engine");
            Ok(0)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            2
        }
    };
    std::process::exit(code);
}
