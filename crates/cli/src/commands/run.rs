//! Run Command

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use qaflow_common::{Browser, EngineConfig, Priority, SuiteReport};
use qaflow_engine::{write_results, AutomationGateway, PlaywrightGateway, RunnerConfig, TestRunner};
use std::path::PathBuf;
use tracing::warn;

use super::load_cases;
use crate::output::{print_info, print_report, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Test case files (.json, .yaml, .md) or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Directory for test-results.json
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only run cases whose name contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Only run cases with this priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Skip the delays between steps and cases
    #[arg(long)]
    pub no_pacing: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut EngineConfig) {
        if self.headed {
            config.gateway.headless = false;
        }
        if let Some(browser) = self.browser {
            config.gateway.browser = browser;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if self.no_pacing {
            config.pacing = qaflow_common::PacingConfig::none();
        }
    }
}

/// Returns the process exit code: 0 all passed, 1 some failed, 2 interrupted
pub async fn execute(args: RunArgs, mut config: EngineConfig, format: OutputFormat) -> Result<i32> {
    args.apply(&mut config);

    let selection = load_cases(&args.paths, args.filter.as_deref(), args.priority)?;
    if selection.cases.is_empty() {
        print_warning("No test cases matched");
        return Ok(0);
    }
    print_info(&format!(
        "Running {} test case(s) from {} source(s)",
        selection.cases.len(),
        selection.sources.len()
    ));

    let mut gateway = PlaywrightGateway::launch(&config.gateway, config.application.selectors.clone())
        .await
        .context("could not start the browser session")?;

    let runner = TestRunner::with_config(RunnerConfig::from(&config));
    let started_at = Utc::now();

    let run = tokio::select! {
        run = runner.run_suite(&mut gateway, &selection.cases) => Some(run),
        _ = tokio::signal::ctrl_c() => None,
    };

    if let Err(e) = gateway.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    let Some(run) = run else {
        print_warning("Interrupted; browser session closed, no results written");
        return Ok(2);
    };

    let report = SuiteReport::new(started_at, selection.sources, run.results, run.summary);
    let path = config.results_path();
    write_results(&path, &report)
        .with_context(|| format!("failed to write results to {}", path.display()))?;

    print_report(&report, format);
    if report.all_passed() {
        print_success(&format!("All test cases passed. Results: {}", path.display()));
        Ok(0)
    } else {
        print_warning(&format!(
            "{} of {} test case(s) failed. Results: {}",
            report.summary.failed,
            report.summary.total,
            path.display()
        ));
        Ok(1)
    }
}
